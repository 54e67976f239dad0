use super::{DataFrame, Quote, Requester};
use crate::alias::Date;
use crate::error::Error;

use log::{debug, info};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use serde::Deserialize;

pub const PRICE_DECIMALS: u32 = 6;

#[derive(Debug, Deserialize)]
struct YahooResult {
    chart: YahooChart,
}

#[derive(Debug, Deserialize)]
struct YahooChart {
    result: Option<Vec<YahooChartResult>>,
    error: Option<YahooChartError>,
}

#[derive(Debug, Deserialize)]
struct YahooChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct YahooChartResult {
    meta: Option<YahooChartMeta>,
    #[serde(default, deserialize_with = "deserialize_vec_timestamp")]
    timestamp: Vec<Date>,
    indicators: YahooChartIndicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooChartMeta {
    currency: Option<String>,
    regular_market_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct YahooChartIndicators {
    quote: Vec<YahooChartQuote>,
}

#[derive(Debug, Deserialize)]
struct YahooChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

fn deserialize_vec_timestamp<'de, D>(deserializer: D) -> Result<Vec<Date>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values: Vec<i64> = Vec::deserialize(deserializer)?;
    let mut dates = Vec::with_capacity(values.len());
    for value in values {
        let date = chrono::DateTime::from_timestamp(value, 0)
            .ok_or_else(|| {
                serde::de::Error::custom(format!("unable to create date from timestamp {}", value))
            })?
            .naive_utc()
            .date();
        dates.push(date);
    }
    Ok(dates)
}

fn to_decimal(ticker: &str, value: f64) -> Result<Decimal, Error> {
    Decimal::try_from(value)
        .map(|value| value.round_dp(PRICE_DECIMALS))
        .map_err(|error| {
            Error::new_historical(format!(
                "invalid price {value} for ticker:{ticker} error:{error}"
            ))
        })
}

fn parse_chart(ticker: &str, body: &str) -> Result<YahooChartResult, Error> {
    let request_result: YahooResult = serde_json::from_str(body)?;
    if let Some(error) = request_result.chart.error {
        return Err(Error::new_historical(format!(
            "yahoo refused ticker:{ticker} code:{} description:{}",
            error.code, error.description
        )));
    }
    request_result
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| Error::new_historical(format!("no chart result for ticker:{ticker}")))
}

fn closes_from_chart(ticker: &str, result: &YahooChartResult) -> Result<Vec<DataFrame>, Error> {
    let quotes = result.indicators.quote.first().ok_or_else(|| {
        Error::new_historical(format!("unable to get quote for ticker:{ticker}"))
    })?;
    let mut data_frames = Vec::with_capacity(result.timestamp.len());
    for (date_position, date) in result.timestamp.iter().enumerate() {
        let close = quotes.close.get(date_position).ok_or_else(|| {
            Error::new_historical(format!(
                "unable to get close for ticker:{} at date_position:{}",
                ticker, date_position
            ))
        })?;
        match close {
            Some(value) => data_frames.push(DataFrame::new(*date, to_decimal(ticker, *value)?)),
            None => info!("value not available for {} at {}", ticker, date),
        }
    }
    data_frames.dedup_by(|right, left| left.date == right.date);
    Ok(data_frames)
}

fn quote_from_chart(ticker: &str, result: YahooChartResult) -> Result<Quote, Error> {
    let meta = result.meta.ok_or_else(|| {
        Error::new_historical(format!("no meta in answer for ticker:{ticker}"))
    })?;
    let price = meta.regular_market_price.ok_or_else(|| {
        Error::new_historical(format!("no market price in answer for ticker:{ticker}"))
    })?;
    Ok(Quote {
        price: to_decimal(ticker, price)?,
        currency: meta
            .currency
            .map(|currency| currency.trim().to_uppercase())
            .filter(|currency| !currency.is_empty()),
    })
}

pub struct YahooRequester {
    reqwest_client: Client,
}

impl YahooRequester {
    pub fn new() -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        headers.insert("Connection", HeaderValue::from_static("keep-alive"));
        headers.insert("Expires", HeaderValue::from_static("-1"));
        headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));
        headers.insert("User-Agent", HeaderValue::from_static("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"));

        let client = Client::builder()
            .cookie_store(true)
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|error| Error::new_historical(format!("failed to init reqwest : {error}")))?;

        Ok(Self {
            reqwest_client: client,
        })
    }

    fn request_chart(&self, ticker: &str, url: String) -> Result<YahooChartResult, Error> {
        debug!("request data from url {}", url);
        let output = self
            .reqwest_client
            .get(url)
            .send()
            .map_err(|error| {
                Error::new_historical(format!("failed to request ticker:{ticker} error:{error}"))
            })?
            .text()
            .map_err(|error| {
                Error::new_historical(format!(
                    "failed to read body from request ticker:{ticker} error:{error}"
                ))
            })?;
        debug!("request result: {}", output);
        parse_chart(ticker, &output)
    }
}

impl Requester for YahooRequester {
    fn request(
        &self,
        ticker: &str,
        begin: Date,
        end: Date,
    ) -> Result<(Date, Date, Vec<DataFrame>), Error> {
        info!(
            "try to request historic data for {} between {} to {}",
            ticker,
            begin.format("%Y-%m-%d"),
            end.format("%Y-%m-%d")
        );
        let end = end
            .checked_add_days(chrono::Days::new(1))
            .ok_or_else(|| Error::new_historical(format!("unable to compute next day {}", end)))?;

        let url = format!(
            "https://query1.finance.yahoo.com/v8/finance/chart/{}?period1={}&period2={}&interval=1d",
            ticker,
            begin.and_time(chrono::NaiveTime::MIN).and_utc().timestamp(),
            end.and_time(chrono::NaiveTime::MIN).and_utc().timestamp()
        );
        let result = closes_from_chart(ticker, &self.request_chart(ticker, url)?)?;
        let (result_begin, result_end) = match (result.first(), result.last()) {
            (Some(first), Some(last)) => (first.date, last.date),
            _ => (Default::default(), Default::default()),
        };
        info!("request historic data for {} done", ticker);
        Ok((result_begin, result_end, result))
    }

    fn request_last_price(&self, ticker: &str) -> Result<Quote, Error> {
        info!("try to request last price for {}", ticker);
        let url = format!(
            "https://query1.finance.yahoo.com/v8/finance/chart/{}?range=1d&interval=1d",
            ticker
        );
        quote_from_chart(ticker, self.request_chart(ticker, url)?)
    }
}
