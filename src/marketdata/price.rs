use crate::alias::Date;
use rust_decimal::Decimal;

/// Close (or last traded) price of one ticker at a given date.
#[derive(Debug, Clone, PartialEq)]
pub struct Price {
    pub ticker: String,
    pub date: Date,
    pub value: Decimal,
    /// Quote currency as reported by the source, e.g. `USD`.
    pub currency: Option<String>,
}

impl Price {
    pub fn new<T: Into<String>>(ticker: T, date: Date, value: Decimal) -> Self {
        Self {
            ticker: ticker.into(),
            date,
            value,
            currency: None,
        }
    }

    pub fn with_currency(mut self, currency: Option<String>) -> Self {
        self.currency = currency;
        self
    }
}

/// A price lookup that failed for one ticker. Never fatal to a whole valuation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceUnavailable {
    pub ticker: String,
    pub reason: String,
}

impl PriceUnavailable {
    pub fn new<T: Into<String>, R: Into<String>>(ticker: T, reason: R) -> Self {
        Self {
            ticker: ticker.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for PriceUnavailable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "price unavailable for {}: {}", self.ticker, self.reason)
    }
}
