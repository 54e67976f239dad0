#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Way {
    Buy,
    Sell,
}

impl std::fmt::Display for Way {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Way::Buy => write!(f, "BUY"),
            Way::Sell => write!(f, "SELL"),
        }
    }
}
