use crate::alias::{Date, DateTime};
use crate::marketdata::{Price, PriceUnavailable};
use log::{debug, info, warn};
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::error::Error;

#[cfg(test)]
mod fixed;
mod yahoo;
#[cfg(test)]
pub use fixed::*;
pub use yahoo::*;

pub const PRICE_REFRESH_DELTA_MINUTES: i64 = 15;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DataFrame {
    pub date: Date,
    pub close: Decimal,
}

impl DataFrame {
    #[inline]
    pub fn new(date: Date, close: Decimal) -> Self {
        Self { date, close }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LastPrice {
    pub ticker: String,
    pub price: Decimal,
    pub currency: Option<String>,
    pub updated: DateTime,
}

impl LastPrice {
    fn to_price(&self) -> Price {
        Price::new(self.ticker.clone(), self.updated.date(), self.price)
            .with_currency(self.currency.clone())
    }
}

/// Last traded price as answered by a `Requester`.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub price: Decimal,
    pub currency: Option<String>,
}

/// Market price source as seen by the valuation and time series engines.
pub trait PriceSource {
    /// Makes the closes of `ticker` between `begin` and `end` available to `price_at`.
    fn fetch(&mut self, ticker: &str, begin: Date, end: Date) -> Result<(), Error>;
    /// Latest known close on or before `date`.
    fn price_at(&self, ticker: &str, date: Date) -> Result<Price, PriceUnavailable>;
    fn current_price(&mut self, ticker: &str) -> Result<Price, PriceUnavailable>;
}

pub trait Requester {
    fn request(
        &self,
        ticker: &str,
        begin: Date,
        end: Date,
    ) -> Result<(Date, Date, Vec<DataFrame>), Error>;

    fn request_last_price(&self, ticker: &str) -> Result<Quote, Error>;
}

pub struct NullRequester;
impl Requester for NullRequester {
    fn request(
        &self,
        _ticker: &str,
        _begin: Date,
        _end: Date,
    ) -> Result<(Date, Date, Vec<DataFrame>), Error> {
        Ok((Default::default(), Default::default(), Default::default()))
    }

    fn request_last_price(&self, ticker: &str) -> Result<Quote, Error> {
        Err(Error::new_historical(format!(
            "no spot source configured for {ticker}"
        )))
    }
}

pub trait Persistance {
    fn save(&self, ticker: &str, datas: &[DataFrame]) -> Result<(), Error>;
    fn load(&self, ticker: &str) -> Result<Option<(Date, Date, Vec<DataFrame>)>, Error>;
    fn save_last_price(&self, last_price: &LastPrice) -> Result<(), Error>;
    fn load_last_price(&self, ticker: &str) -> Result<Option<LastPrice>, Error>;
}

struct CacheTicker {
    begin: Date,
    end: Date,
    data: Vec<DataFrame>,
}

impl CacheTicker {
    fn new(begin: Date, end: Date, data: Vec<DataFrame>) -> Self {
        Self { begin, end, data }
    }

    fn latest(&self, date: Date) -> Option<&DataFrame> {
        self.data.iter().rev().find(|item| item.date <= date)
    }

    fn insert(&mut self, begin: Date, end: Date, mut data: Vec<DataFrame>) {
        if begin < self.begin {
            if end > self.end {
                self.begin = begin;
                self.end = end;
                self.data = data;
            } else {
                self.begin = begin;
                data.retain(|item| item.date < self.data.first().map_or(end, |first| first.date));
                data.append(&mut self.data);
                self.data = data;
            }
        } else if end > self.end {
            let last = self.data.last().map(|item| item.date);
            data.retain(|item| last.is_none_or(|last| item.date > last));
            self.data.append(&mut data);
            self.end = end;
        }
    }

    fn not_in_cache(&self, begin: Date, end: Date) -> Option<(Date, Date)> {
        if begin < self.begin {
            if end > self.end {
                Some((begin, end))
            } else {
                Some((begin, self.end))
            }
        } else if end > self.end {
            self.end
                .checked_add_days(chrono::naive::Days::new(1))
                .map(|next| (next, end))
        } else {
            None
        }
    }
}

/// Price source caching daily closes and last prices, first in memory then
/// in a `Persistance`, and asking the `Requester` only for what is missing.
pub struct HistoricalData<'a, P>
where
    P: Persistance,
{
    requester: Box<dyn Requester>,
    persistence: &'a P,
    cache: HashMap<String, CacheTicker>,
    last_prices: HashMap<String, LastPrice>,
}

impl<'a, P> HistoricalData<'a, P>
where
    P: Persistance,
{
    pub fn new(requester: Box<dyn Requester>, persistence: &'a P) -> Self {
        Self {
            requester,
            persistence,
            cache: Default::default(),
            last_prices: Default::default(),
        }
    }

    fn stored_last_price(&self, ticker: &str) -> Option<LastPrice> {
        if let Some(value) = self.last_prices.get(ticker) {
            return Some(value.clone());
        }
        match self.persistence.load_last_price(ticker) {
            Ok(value) => value,
            Err(error) => {
                warn!("unable to load last price of {} : {}", ticker, error);
                None
            }
        }
    }
}

impl<P> PriceSource for HistoricalData<'_, P>
where
    P: Persistance,
{
    fn fetch(&mut self, ticker: &str, begin: Date, end: Date) -> Result<(), Error> {
        info!(
            "try to fetch historic data for {} between {} to {}",
            ticker,
            begin.format("%Y-%m-%d"),
            end.format("%Y-%m-%d")
        );

        if !self.cache.contains_key(ticker) {
            if let Some((db_begin, db_end, db_result)) = self.persistence.load(ticker)? {
                info!(
                    "historic data for {} from persistence found begin:{} end:{} nb_record:{}",
                    ticker,
                    db_begin.format("%Y-%m-%d"),
                    db_end.format("%Y-%m-%d"),
                    db_result.len()
                );
                self.cache.insert(
                    ticker.to_string(),
                    CacheTicker::new(db_begin, db_end, db_result),
                );
            }
        }

        let (request_begin, request_end) = match self.cache.get(ticker) {
            Some(data_cache) => match data_cache.not_in_cache(begin, end) {
                Some(range) => range,
                None => {
                    info!("historic data for {} up to date.", ticker);
                    return Ok(());
                }
            },
            None => (begin, end),
        };

        info!(
            "historic data for {} request from provider begin:{} end:{}",
            ticker,
            request_begin.format("%Y-%m-%d"),
            request_end.format("%Y-%m-%d")
        );

        let (result_begin, result_end, result_data) =
            self.requester.request(ticker, request_begin, request_end)?;

        if result_data.is_empty() {
            info!("historic data for {} from provider return empty", ticker);
            return Ok(());
        }

        info!(
            "historic data for {} from provider found begin:{} end:{} nb_record:{}",
            ticker,
            result_begin.format("%Y-%m-%d"),
            result_end.format("%Y-%m-%d"),
            result_data.len()
        );
        self.persistence.save(ticker, &result_data)?;

        match self.cache.get_mut(ticker) {
            Some(data_cache) => data_cache.insert(request_begin, request_end, result_data),
            None => {
                self.cache.insert(
                    ticker.to_string(),
                    CacheTicker::new(request_begin, request_end, result_data),
                );
            }
        }
        Ok(())
    }

    fn price_at(&self, ticker: &str, date: Date) -> Result<Price, PriceUnavailable> {
        self.cache
            .get(ticker)
            .and_then(|item| item.latest(date))
            .map(|data| Price::new(ticker, data.date, data.close))
            .ok_or_else(|| {
                PriceUnavailable::new(
                    ticker,
                    format!("no close on or before {}", date.format("%Y-%m-%d")),
                )
            })
    }

    fn current_price(&mut self, ticker: &str) -> Result<Price, PriceUnavailable> {
        let now = chrono::Utc::now().naive_utc();
        let stored = self.stored_last_price(ticker);
        if let Some(last_price) = &stored {
            if now - last_price.updated < chrono::Duration::minutes(PRICE_REFRESH_DELTA_MINUTES) {
                debug!(
                    "last price of {} from {} still fresh",
                    ticker, last_price.updated
                );
                return Ok(last_price.to_price());
            }
        }

        match self.requester.request_last_price(ticker) {
            Ok(quote) => {
                let last_price = LastPrice {
                    ticker: ticker.to_string(),
                    price: quote.price,
                    currency: quote.currency,
                    updated: now,
                };
                if let Err(error) = self.persistence.save_last_price(&last_price) {
                    warn!("unable to save last price of {} : {}", ticker, error);
                }
                let result = last_price.to_price();
                self.last_prices.insert(ticker.to_string(), last_price);
                Ok(result)
            }
            Err(error) => match stored {
                Some(last_price) => {
                    warn!(
                        "request last price of {} failed ({}), use price from {}",
                        ticker, error.message, last_price.updated
                    );
                    Ok(last_price.to_price())
                }
                None => Err(PriceUnavailable::new(ticker, error.message)),
            },
        }
    }
}
