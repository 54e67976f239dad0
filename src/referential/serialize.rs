use crate::alias::{Date, DateTime};
use crate::error::{Error, ErrorKind};
use crate::portfolio::{Portfolio, Transaction, Way};

use rust_decimal::Decimal;
use serde::Deserialize;

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::new(ErrorKind::Referential, format!("not json format : {error}"))
    }
}

#[derive(Debug, Deserialize)]
pub struct PortfolioFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub transactions: Vec<TransactionFile>,
}

#[derive(Debug, Deserialize)]
pub struct TransactionFile {
    pub ticker: String,
    #[serde(rename = "type", deserialize_with = "deserialize_way")]
    pub way: Way,
    pub quantity: Decimal,
    pub price: Decimal,
    #[serde(default)]
    pub fee: Decimal,
    #[serde(deserialize_with = "deserialize_date_time")]
    pub date: DateTime,
    #[serde(default)]
    pub notes: Option<String>,
}

fn deserialize_way<'de, D>(deserializer: D) -> Result<Way, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    match value.trim().to_ascii_uppercase().as_str() {
        "BUY" => Ok(Way::Buy),
        "SELL" => Ok(Way::Sell),
        _ => Err(serde::de::Error::custom(format!(
            "unable to convert {value} into transaction type"
        ))),
    }
}

/// Accepts `2024-01-02`, `2024-01-02 15:30:00`, `2024-01-02T15:30:00` and
/// RFC 3339. A date alone means midnight.
fn deserialize_date_time<'de, D>(deserializer: D) -> Result<DateTime, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    let value = value.trim();
    if let Ok(date) = Date::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date.and_time(chrono::NaiveTime::MIN));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|format| DateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|date| date.naive_local())
        })
        .ok_or_else(|| serde::de::Error::custom(format!("unable to convert {value} into date")))
}

impl TransactionFile {
    fn into_transaction(self) -> Transaction {
        let mut transaction = Transaction::new(
            self.ticker.trim().to_uppercase(),
            self.way,
            self.quantity,
            self.price,
            self.fee,
            self.date,
        );
        transaction.notes = self.notes.filter(|notes| !notes.trim().is_empty());
        transaction
    }
}

impl PortfolioFile {
    pub fn into_portfolio(self) -> Result<Portfolio, Error> {
        let mut portfolio = Portfolio::new(self.id, self.name);
        portfolio.description = self.description;
        for transaction in self.transactions {
            portfolio.record_transaction(transaction.into_transaction())?;
        }
        Ok(portfolio)
    }
}

pub fn from_reader<R>(reader: R) -> Result<Portfolio, Error>
where
    R: std::io::Read,
{
    let file: PortfolioFile = serde_json::from_reader(reader)?;
    file.into_portfolio()
}
