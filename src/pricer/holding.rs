use crate::alias::{Date, DateTime};
use crate::error::Error;
use crate::portfolio::{Transaction, Way};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use log::debug;

/// Running state of one ticker while the history is replayed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HoldingState {
    pub quantity: Decimal,
    pub quantity_buy: Decimal,
    pub quantity_sell: Decimal,
    pub total_cost: Decimal,
    /// `None` while nothing is held.
    pub average_cost: Option<Decimal>,
    pub realized_pnl: Decimal,
    pub fees: Decimal,
}

impl HoldingState {
    pub fn apply(&mut self, transaction: &Transaction) -> Result<(), Error> {
        transaction.validate()?;
        match transaction.way {
            Way::Buy => {
                self.total_cost += transaction.quantity * transaction.price + transaction.fee;
                self.quantity += transaction.quantity;
                self.quantity_buy += transaction.quantity;
                self.average_cost = Some(self.total_cost / self.quantity);
            }
            Way::Sell => {
                let average_cost = match self.average_cost {
                    Some(value) if transaction.quantity <= self.quantity => value,
                    _ => {
                        return Err(Error::new_integrity(format!(
                            "sell of {} {} at {} exceeds the {} held",
                            transaction.quantity,
                            transaction.ticker,
                            transaction.date,
                            self.quantity
                        )));
                    }
                };
                self.realized_pnl +=
                    transaction.quantity * (transaction.price - average_cost) - transaction.fee;
                self.total_cost -= transaction.quantity * average_cost;
                self.quantity -= transaction.quantity;
                self.quantity_sell += transaction.quantity;
                if self.quantity.is_zero() {
                    self.total_cost = Decimal::ZERO;
                    self.average_cost = None;
                }
            }
        };
        self.fees += transaction.fee;
        Ok(())
    }

    fn holding(&self, ticker: &str) -> Option<Holding> {
        self.average_cost
            .filter(|_| self.quantity > Decimal::ZERO)
            .map(|average_cost| Holding {
                ticker: ticker.to_string(),
                quantity: self.quantity,
                average_cost,
                quantity_buy: self.quantity_buy,
                quantity_sell: self.quantity_sell,
                realized_pnl: self.realized_pnl,
                fees: self.fees,
            })
    }
}

/// Net open position in one ticker.
#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub ticker: String,
    pub quantity: Decimal,
    /// Weighted purchase price per held unit, buy fees included.
    pub average_cost: Decimal,
    pub quantity_buy: Decimal,
    pub quantity_sell: Decimal,
    pub realized_pnl: Decimal,
    pub fees: Decimal,
}

impl Holding {
    /// Folds the transactions of `ticker` found in `transactions`.
    ///
    /// Returns `None` when the ticker was never traded or is fully sold.
    pub fn from_transactions(
        ticker: &str,
        transactions: &[Transaction],
    ) -> Result<Option<Holding>, Error> {
        let mut replay = HoldingsReplay::default();
        for transaction in transactions.iter().filter(|item| item.ticker == ticker) {
            replay.apply(transaction)?;
        }
        Ok(replay
            .states
            .get(ticker)
            .and_then(|state| state.holding(ticker)))
    }

    pub fn cost_basis(&self) -> Decimal {
        self.quantity * self.average_cost
    }
}

/// Incremental replay of a whole portfolio history.
///
/// Transactions must come in non-decreasing date order; equal dates are
/// applied in the order given.
#[derive(Debug, Clone, Default)]
pub struct HoldingsReplay {
    states: BTreeMap<String, HoldingState>,
    last_date: Option<DateTime>,
}

impl HoldingsReplay {
    pub fn apply(&mut self, transaction: &Transaction) -> Result<(), Error> {
        if let Some(last_date) = self.last_date {
            if transaction.date < last_date {
                return Err(Error::new_ordering(format!(
                    "{} at {} comes after a transaction at {}",
                    transaction, transaction.date, last_date
                )));
            }
        }
        debug!("apply {} at {}", transaction, transaction.date);
        self.states
            .entry(transaction.ticker.clone())
            .or_default()
            .apply(transaction)?;
        self.last_date = Some(transaction.date);
        Ok(())
    }

    pub fn state(&self, ticker: &str) -> Option<&HoldingState> {
        self.states.get(ticker)
    }

    pub fn holdings(&self) -> Holdings {
        let holdings = self
            .states
            .iter()
            .filter_map(|(ticker, state)| {
                state
                    .holding(ticker)
                    .map(|holding| (ticker.clone(), holding))
            })
            .collect();
        let (realized_pnl, fees) = self
            .states
            .values()
            .fold((Decimal::ZERO, Decimal::ZERO), |(realized_pnl, fees), state| {
                (realized_pnl + state.realized_pnl, fees + state.fees)
            });
        Holdings {
            holdings,
            realized_pnl,
            fees,
        }
    }
}

/// Open holdings of a portfolio, keyed by ticker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Holdings {
    pub holdings: BTreeMap<String, Holding>,
    /// Realized over every ticker, closed positions included.
    pub realized_pnl: Decimal,
    pub fees: Decimal,
}

impl Holdings {
    pub fn from_transactions(transactions: &[Transaction]) -> Result<Holdings, Error> {
        let mut replay = HoldingsReplay::default();
        for transaction in transactions {
            replay.apply(transaction)?;
        }
        Ok(replay.holdings())
    }

    /// Holdings at the end of `date`.
    pub fn at(transactions: &[Transaction], date: Date) -> Result<Holdings, Error> {
        let mut replay = HoldingsReplay::default();
        for transaction in transactions
            .iter()
            .filter(|transaction| transaction.date.date() <= date)
        {
            replay.apply(transaction)?;
        }
        Ok(replay.holdings())
    }

    pub fn get(&self, ticker: &str) -> Option<&Holding> {
        self.holdings.get(ticker)
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Holding> {
        self.holdings.values()
    }

    pub fn cost_basis(&self) -> Decimal {
        self.iter().map(Holding::cost_basis).sum()
    }
}
