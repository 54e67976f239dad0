use super::iterator::DateByStepIterator;
use super::{HoldingsReplay, Step};
use crate::alias::Date;
use crate::error::Error;
use crate::historical::PriceSource;
use crate::marketdata::PriceUnavailable;
use crate::portfolio::Transaction;
use chrono::Days;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info, warn};

/// Days of closes fetched before the first point of a windowed series.
const CLOSE_LOOKBACK_DAYS: u64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sampling {
    /// One point per distinct transaction date.
    TransactionDates { since: Option<Date> },
    /// Transaction dates plus one point per step up to `end`.
    Step {
        step: Step,
        since: Option<Date>,
        end: Date,
    },
}

impl Sampling {
    pub fn transaction_dates() -> Self {
        Sampling::TransactionDates { since: None }
    }

    pub fn step(step: Step, end: Date) -> Self {
        Sampling::Step {
            step,
            since: None,
            end,
        }
    }

    /// Drops the points before `date`. Holdings are still replayed from the
    /// first transaction, and `date` gets its own point.
    pub fn since(self, date: Date) -> Self {
        match self {
            Sampling::TransactionDates { .. } => Sampling::TransactionDates { since: Some(date) },
            Sampling::Step { step, end, .. } => Sampling::Step {
                step,
                since: Some(date),
                end,
            },
        }
    }

    fn begin(&self) -> Option<Date> {
        match self {
            Sampling::TransactionDates { since } | Sampling::Step { since, .. } => *since,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValuePoint {
    pub date: Date,
    /// Market value of the holdings that could be priced, `None` when open
    /// holdings exist and none of them could.
    pub value: Option<Decimal>,
    pub cost_basis: Decimal,
    pub unavailable: Vec<PriceUnavailable>,
}

fn make_dates(transactions: &[Transaction], sampling: Sampling) -> Vec<Date> {
    let mut dates = transactions
        .iter()
        .map(|transaction| transaction.date.date())
        .collect::<BTreeSet<_>>();
    let Some(first) = dates.first().copied() else {
        return Vec::new();
    };
    let begin = sampling.begin().map_or(first, |since| since.max(first));

    let last = match sampling {
        Sampling::TransactionDates { .. } => None,
        Sampling::Step { step, end, .. } => {
            dates.retain(|date| *date <= end);
            if begin <= end {
                dates.extend(DateByStepIterator::new(begin, end, step));
            }
            Some(end)
        }
    };
    if begin > first && last.is_none_or(|end| begin <= end) {
        dates.insert(begin);
    }
    dates.retain(|date| *date >= begin);
    dates.into_iter().collect()
}

fn check_ordering(transactions: &[Transaction]) -> Result<(), Error> {
    match transactions
        .windows(2)
        .find(|pair| pair[1].date < pair[0].date)
    {
        Some(pair) => Err(Error::new_ordering(format!(
            "{} at {} comes after a transaction at {}",
            pair[1], pair[1].date, pair[0].date
        ))),
        None => Ok(()),
    }
}

/// Lazy replay of a transaction history, one `ValuePoint` per sampled date.
///
/// Recreating it from the same transactions and prices yields the same points.
/// An unordered history yields its `Ordering` error before any point. After an
/// error the iterator is exhausted.
pub struct ValuePoints<'a, P>
where
    P: PriceSource,
{
    transactions: &'a [Transaction],
    dates: std::vec::IntoIter<Date>,
    position: usize,
    replay: HoldingsReplay,
    spot_provider: &'a mut P,
    pending_error: Option<Error>,
    failed: bool,
}

impl<'a, P> ValuePoints<'a, P>
where
    P: PriceSource,
{
    pub fn new(
        transactions: &'a [Transaction],
        sampling: Sampling,
        spot_provider: &'a mut P,
    ) -> Self {
        let (dates, pending_error) = match check_ordering(transactions) {
            Ok(()) => (make_dates(transactions, sampling), None),
            Err(error) => (Vec::new(), Some(error)),
        };

        if let (Some(first_point), Some(end)) = (dates.first().copied(), dates.last().copied()) {
            let lookback = first_point
                .checked_sub_days(Days::new(CLOSE_LOOKBACK_DAYS))
                .unwrap_or(first_point);
            let mut first_dates = BTreeMap::new();
            for transaction in transactions {
                first_dates
                    .entry(transaction.ticker.as_str())
                    .or_insert_with(|| transaction.date.date());
            }
            for (ticker, first_date) in first_dates {
                if first_date <= end {
                    let begin = first_date.max(lookback);
                    if let Err(error) = spot_provider.fetch(ticker, begin, end) {
                        warn!("unable to fetch historic data for {} : {}", ticker, error);
                    }
                }
            }
        }

        Self {
            transactions,
            dates: dates.into_iter(),
            position: 0,
            replay: Default::default(),
            spot_provider,
            pending_error,
            failed: false,
        }
    }

    fn make_point(&mut self, date: Date) -> Result<ValuePoint, Error> {
        while let Some(transaction) = self.transactions.get(self.position) {
            if transaction.date.date() > date {
                break;
            }
            self.replay.apply(transaction)?;
            self.position += 1;
        }

        let holdings = self.replay.holdings();
        let mut value = Decimal::ZERO;
        let mut priced = 0;
        let mut unavailable = Vec::new();
        for holding in holdings.iter() {
            match self.spot_provider.price_at(&holding.ticker, date) {
                Ok(price) => {
                    value += holding.quantity * price.value;
                    priced += 1;
                }
                Err(error) => {
                    debug!("{} at {}", error, date);
                    unavailable.push(error);
                }
            }
        }

        Ok(ValuePoint {
            date,
            value: (holdings.is_empty() || priced > 0).then_some(value),
            cost_basis: holdings.cost_basis(),
            unavailable,
        })
    }
}

impl<P> Iterator for ValuePoints<'_, P>
where
    P: PriceSource,
{
    type Item = Result<ValuePoint, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if let Some(error) = self.pending_error.take() {
            self.failed = true;
            return Some(Err(error));
        }
        let date = self.dates.next()?;
        let result = self.make_point(date);
        self.failed = result.is_err();
        Some(result)
    }
}

pub struct ValueSeries {
    pub points: Vec<ValuePoint>,
}

impl ValueSeries {
    pub fn points<'a, P>(
        transactions: &'a [Transaction],
        sampling: Sampling,
        spot_provider: &'a mut P,
    ) -> ValuePoints<'a, P>
    where
        P: PriceSource,
    {
        ValuePoints::new(transactions, sampling, spot_provider)
    }

    pub fn from_transactions<P>(
        transactions: &[Transaction],
        sampling: Sampling,
        spot_provider: &mut P,
    ) -> Result<ValueSeries, Error>
    where
        P: PriceSource,
    {
        info!(
            "start to compute value series over {} transactions",
            transactions.len()
        );
        let points = Self::points(transactions, sampling, spot_provider)
            .collect::<Result<Vec<_>, Error>>()?;
        info!("value series computed with {} points", points.len());
        Ok(ValueSeries { points })
    }

    pub fn unavailable_count(&self) -> usize {
        self.points
            .iter()
            .filter(|point| !point.unavailable.is_empty())
            .count()
    }
}
