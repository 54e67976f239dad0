#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Referential,
    Persistance,
    Historical,
    Integrity,
    Ordering,
}

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
}

impl Error {
    pub fn new<T: Into<String>>(kind: ErrorKind, message: T) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn new_historical<T: Into<String>>(message: T) -> Self {
        Self::new(ErrorKind::Historical, message)
    }

    /// A sell bigger than the held quantity, or any history that leads to it.
    pub fn new_integrity<T: Into<String>>(message: T) -> Self {
        Self::new(ErrorKind::Integrity, message)
    }

    pub fn new_ordering<T: Into<String>>(message: T) -> Self {
        Self::new(ErrorKind::Ordering, message)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} error: {}", self.kind, self.message)
    }
}

impl std::error::Error for Error {}
