use crate::alias::{Date, DateTime};
use crate::error::{Error, ErrorKind};
use crate::historical::{DataFrame, LastPrice, Persistance};
use rusqlite::{Connection, OptionalExtension, Result};
use rust_decimal::Decimal;
use std::str::FromStr;

const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

impl From<rusqlite::Error> for Error {
    fn from(error: rusqlite::Error) -> Self {
        Error::new(ErrorKind::Persistance, format!("sqlite failure : {error}"))
    }
}

fn text_value<'a>(value: rusqlite::types::ValueRef<'a>) -> rusqlite::types::FromSqlResult<&'a str> {
    match value {
        rusqlite::types::ValueRef::Text(txt) => {
            std::str::from_utf8(txt).map_err(|_| rusqlite::types::FromSqlError::InvalidType)
        }
        _ => Err(rusqlite::types::FromSqlError::InvalidType),
    }
}

struct SQLiteDate(Date);
impl rusqlite::types::FromSql for SQLiteDate {
    fn column_result(value: rusqlite::types::ValueRef<'_>) -> rusqlite::types::FromSqlResult<Self> {
        chrono::NaiveDate::parse_from_str(text_value(value)?, "%Y-%m-%d")
            .map(SQLiteDate)
            .map_err(|_| rusqlite::types::FromSqlError::InvalidType)
    }
}

struct SQLiteDateTime(DateTime);
impl rusqlite::types::FromSql for SQLiteDateTime {
    fn column_result(value: rusqlite::types::ValueRef<'_>) -> rusqlite::types::FromSqlResult<Self> {
        chrono::NaiveDateTime::parse_from_str(text_value(value)?, DATE_TIME_FORMAT)
            .map(SQLiteDateTime)
            .map_err(|_| rusqlite::types::FromSqlError::InvalidType)
    }
}

struct SQLiteDecimal(Decimal);
impl rusqlite::types::FromSql for SQLiteDecimal {
    fn column_result(value: rusqlite::types::ValueRef<'_>) -> rusqlite::types::FromSqlResult<Self> {
        Decimal::from_str(text_value(value)?)
            .map(SQLiteDecimal)
            .map_err(|_| rusqlite::types::FromSqlError::InvalidType)
    }
}

pub struct SQLitePersistance {
    connection: Connection,
}

impl SQLitePersistance {
    pub fn new(file: &str) -> Result<Self, Error> {
        let connection = Connection::open(file)?;
        let instance = Self { connection };
        instance.setup()?;
        Ok(instance)
    }

    fn setup(&self) -> Result<(), Error> {
        self.connection.execute(
          "CREATE TABLE IF NOT EXISTS Historical (ticker TEXT, date TEXT, close TEXT, PRIMARY KEY(\"ticker\",\"date\"))",
          (),
        )?;
        self.connection.execute(
            "CREATE TABLE IF NOT EXISTS LastPrice (ticker TEXT PRIMARY KEY, price TEXT, currency TEXT, updated TEXT)",
            (),
        )?;

        // cache files created before currencies were kept
        let has_currency: bool = self.connection.query_row(
            "SELECT COUNT(*) > 0 FROM pragma_table_info('LastPrice') WHERE name = 'currency'",
            (),
            |row| row.get(0),
        )?;
        if !has_currency {
            self.connection
                .execute("ALTER TABLE LastPrice ADD COLUMN currency TEXT", ())?;
        }
        Ok(())
    }
}

impl Persistance for SQLitePersistance {
    fn save(&self, ticker: &str, datas: &[DataFrame]) -> Result<(), Error> {
        self.connection.execute_batch("BEGIN TRANSACTION;")?;
        let mut stmt = self.connection.prepare(
            "INSERT OR REPLACE INTO Historical (ticker, date, close) VALUES(?, ?, ?)",
        )?;

        for data in datas.iter() {
            stmt.execute((ticker, data.date.to_string(), data.close.to_string()))?;
        }

        self.connection.execute_batch("COMMIT TRANSACTION;")?;
        Ok(())
    }

    fn load(&self, ticker: &str) -> Result<Option<(Date, Date, Vec<DataFrame>)>, Error> {
        let mut stmt = self
            .connection
            .prepare("SELECT date, close FROM Historical WHERE ticker = ?")?;

        let rows = stmt.query_map((ticker,), |row| {
            Ok(DataFrame::new(
                row.get::<usize, SQLiteDate>(0)?.0,
                row.get::<usize, SQLiteDecimal>(1)?.0,
            ))
        })?;

        let mut datas = Vec::new();
        for item in rows {
            datas.push(item?);
        }
        datas.sort_by(|left, right| left.date.cmp(&right.date));

        match (datas.first(), datas.last()) {
            (Some(first), Some(last)) => Ok(Some((first.date, last.date, datas.clone()))),
            (_, _) => Ok(None),
        }
    }

    fn save_last_price(&self, last_price: &LastPrice) -> Result<(), Error> {
        self.connection.execute(
            "INSERT OR REPLACE INTO LastPrice (ticker, price, currency, updated) VALUES(?, ?, ?, ?)",
            (
                &last_price.ticker,
                last_price.price.to_string(),
                &last_price.currency,
                last_price.updated.format(DATE_TIME_FORMAT).to_string(),
            ),
        )?;
        Ok(())
    }

    fn load_last_price(&self, ticker: &str) -> Result<Option<LastPrice>, Error> {
        let result = self
            .connection
            .query_row(
                "SELECT price, currency, updated FROM LastPrice WHERE ticker = ?",
                (ticker,),
                |row| {
                    Ok(LastPrice {
                        ticker: ticker.to_string(),
                        price: row.get::<usize, SQLiteDecimal>(0)?.0,
                        currency: row.get::<usize, Option<String>>(1)?,
                        updated: row.get::<usize, SQLiteDateTime>(2)?.0,
                    })
                },
            )
            .optional()?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn make_date_(year: i32, month: u32, day: u32) -> Date {
        Date::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn save_and_load_history() {
        let persistence = SQLitePersistance::new(":memory:").unwrap();
        assert!(persistence.load("AAPL").unwrap().is_none());

        persistence
            .save(
                "AAPL",
                &[
                    DataFrame::new(make_date_(2024, 1, 3), dec!(184.25)),
                    DataFrame::new(make_date_(2024, 1, 2), dec!(185.64)),
                ],
            )
            .unwrap();
        persistence
            .save(
                "AAPL",
                &[DataFrame::new(make_date_(2024, 1, 3), dec!(184.5))],
            )
            .unwrap();
        persistence
            .save("MSFT", &[DataFrame::new(make_date_(2024, 1, 2), dec!(370))])
            .unwrap();

        let (begin, end, datas) = persistence.load("AAPL").unwrap().unwrap();
        assert_eq!(begin, make_date_(2024, 1, 2));
        assert_eq!(end, make_date_(2024, 1, 3));
        assert_eq!(
            datas,
            vec![
                DataFrame::new(make_date_(2024, 1, 2), dec!(185.64)),
                DataFrame::new(make_date_(2024, 1, 3), dec!(184.5)),
            ]
        );
    }

    #[test]
    fn save_and_load_last_price() {
        let persistence = SQLitePersistance::new(":memory:").unwrap();
        assert!(persistence.load_last_price("AAPL").unwrap().is_none());

        let updated = make_date_(2024, 1, 2).and_hms_opt(15, 30, 12).unwrap();
        let last_price = LastPrice {
            ticker: "AAPL".to_string(),
            price: dec!(189.123456),
            currency: Some("USD".to_string()),
            updated,
        };
        persistence.save_last_price(&last_price).unwrap();
        assert_eq!(
            persistence.load_last_price("AAPL").unwrap(),
            Some(last_price)
        );

        let without_currency = LastPrice {
            ticker: "MC.PA".to_string(),
            price: dec!(701.3),
            currency: None,
            updated,
        };
        persistence.save_last_price(&without_currency).unwrap();
        assert_eq!(
            persistence.load_last_price("MC.PA").unwrap(),
            Some(without_currency)
        );
    }

    #[test]
    fn upgrade_last_price_without_currency() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let filename = file.path().to_str().unwrap();
        {
            let connection = Connection::open(filename).unwrap();
            connection
                .execute(
                    "CREATE TABLE LastPrice (ticker TEXT PRIMARY KEY, price TEXT, updated TEXT)",
                    (),
                )
                .unwrap();
            connection
                .execute(
                    "INSERT INTO LastPrice (ticker, price, updated) VALUES('AAPL', '189.5', '2024-01-02 15:30:12')",
                    (),
                )
                .unwrap();
        }

        let persistence = SQLitePersistance::new(filename).unwrap();
        let last_price = persistence.load_last_price("AAPL").unwrap().unwrap();
        assert_eq!(last_price.price, dec!(189.5));
        assert_eq!(last_price.currency, None);

        SQLitePersistance::new(filename).unwrap();
    }
}
