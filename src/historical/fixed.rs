use super::{DataFrame, PriceSource};
use crate::alias::Date;
use crate::error::Error;
use crate::marketdata::{Price, PriceUnavailable};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// In-memory market used by the engine tests.
#[derive(Default)]
pub struct FixedPriceSource {
    closes: HashMap<String, Vec<DataFrame>>,
    current: HashMap<String, (Decimal, Option<String>)>,
    pub fetched: Vec<(String, Date, Date)>,
    pub current_requests: usize,
}

impl FixedPriceSource {
    pub fn with_close(mut self, ticker: &str, date: Date, close: Decimal) -> Self {
        let closes = self.closes.entry(ticker.to_string()).or_default();
        closes.push(DataFrame::new(date, close));
        closes.sort_by(|left, right| left.date.cmp(&right.date));
        self
    }

    pub fn with_current(mut self, ticker: &str, price: Decimal) -> Self {
        self.current.insert(ticker.to_string(), (price, None));
        self
    }

    pub fn with_quote(mut self, ticker: &str, price: Decimal, currency: &str) -> Self {
        self.current
            .insert(ticker.to_string(), (price, Some(currency.to_string())));
        self
    }
}

impl PriceSource for FixedPriceSource {
    fn fetch(&mut self, ticker: &str, begin: Date, end: Date) -> Result<(), Error> {
        self.fetched.push((ticker.to_string(), begin, end));
        Ok(())
    }

    fn price_at(&self, ticker: &str, date: Date) -> Result<Price, PriceUnavailable> {
        self.closes
            .get(ticker)
            .and_then(|closes| closes.iter().rev().find(|item| item.date <= date))
            .map(|item| Price::new(ticker, item.date, item.close))
            .ok_or_else(|| PriceUnavailable::new(ticker, "no close"))
    }

    fn current_price(&mut self, ticker: &str) -> Result<Price, PriceUnavailable> {
        self.current_requests += 1;
        self.current
            .get(ticker)
            .map(|(price, currency)| {
                Price::new(ticker, Date::default(), *price).with_currency(currency.clone())
            })
            .ok_or_else(|| PriceUnavailable::new(ticker, "quote service down"))
    }
}
