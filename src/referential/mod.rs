mod serialize;

use crate::error::{Error, ErrorKind};
use crate::portfolio::Portfolio;

use log::info;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::new(ErrorKind::Referential, error.to_string())
    }
}

/// Loads a portfolio file, recording each transaction in turn.
pub fn load_portfolio<P: AsRef<Path>>(filename: P) -> Result<Portfolio, Error> {
    let filename = filename.as_ref();
    if !filename.is_file() {
        return Err(Error::new(
            ErrorKind::Referential,
            format!("{} is not valid file", filename.display()),
        ));
    }
    let file = File::open(filename)?;
    let portfolio = serialize::from_reader(BufReader::new(file))?;
    info!(
        "portfolio {} loaded from {} with {} transactions",
        portfolio.name,
        filename.display(),
        portfolio.transactions().len()
    );
    Ok(portfolio)
}
