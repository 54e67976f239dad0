use crate::alias::DateTime;
use crate::error::{Error, ErrorKind};
use crate::portfolio::Way;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub ticker: String,
    pub way: Way,
    pub quantity: Decimal,
    pub price: Decimal,
    pub fee: Decimal,
    pub date: DateTime,
    pub notes: Option<String>,
}

impl Transaction {
    pub fn new<T: Into<String>>(
        ticker: T,
        way: Way,
        quantity: Decimal,
        price: Decimal,
        fee: Decimal,
        date: DateTime,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            way,
            quantity,
            price,
            fee,
            date,
            notes: None,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.ticker.is_empty() {
            return Err(Error::new(
                ErrorKind::Referential,
                "transaction ticker must not be empty",
            ));
        }
        if self.quantity <= Decimal::ZERO {
            return Err(Error::new(
                ErrorKind::Referential,
                format!(
                    "{} {} quantity must be positive, got {}",
                    self.way, self.ticker, self.quantity
                ),
            ));
        }
        if self.price < Decimal::ZERO {
            return Err(Error::new(
                ErrorKind::Referential,
                format!(
                    "{} {} price must not be negative, got {}",
                    self.way, self.ticker, self.price
                ),
            ));
        }
        if self.fee < Decimal::ZERO {
            return Err(Error::new(
                ErrorKind::Referential,
                format!(
                    "{} {} fee must not be negative, got {}",
                    self.way, self.ticker, self.fee
                ),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Display for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}x{}", self.way, self.quantity, self.ticker)
    }
}
