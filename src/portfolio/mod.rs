mod transaction;
mod way;

pub use transaction::*;
pub use way::*;

use crate::error::{Error, ErrorKind};
use crate::pricer::HoldingState;
use std::collections::BTreeMap;

use log::debug;

/// Read side of the place transactions live in.
///
/// `list_transactions` returns the history ordered by date, ties kept in
/// recording order. `version` changes every time a transaction is recorded.
pub trait TransactionStore {
    fn list_transactions(&self, portfolio_id: &str) -> Result<Vec<Transaction>, Error>;
    fn version(&self, portfolio_id: &str) -> Result<u64, Error>;
}

#[derive(Debug, Default)]
pub struct Portfolio {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    transactions: Vec<Transaction>,
    /// Final state of every ticker, kept in step with `transactions`.
    states: BTreeMap<String, HoldingState>,
    version: u64,
}

impl Portfolio {
    pub fn new<I: Into<String>, N: Into<String>>(id: I, name: N) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn get_ticker_list(&self) -> Vec<String> {
        let mut tickers = self
            .transactions
            .iter()
            .map(|transaction| transaction.ticker.clone())
            .collect::<Vec<_>>();
        tickers.sort();
        tickers.dedup();
        tickers
    }

    /// Records a transaction, keeping the history sorted by date.
    ///
    /// The transaction is rejected if it would make any sell of its ticker
    /// exceed the quantity held at that point, including a back-dated sell.
    pub fn record_transaction(&mut self, transaction: Transaction) -> Result<(), Error> {
        transaction.validate()?;

        let position = self
            .transactions
            .partition_point(|item| item.date <= transaction.date);
        let result = if position == self.transactions.len() {
            let mut state = self
                .states
                .get(&transaction.ticker)
                .cloned()
                .unwrap_or_default();
            state.apply(&transaction).map(|_| state)
        } else {
            // back-dated: replay the ticker with the transaction in place
            let (before, after) = self.transactions.split_at(position);
            let same_ticker = |item: &&Transaction| item.ticker == transaction.ticker;
            before
                .iter()
                .filter(same_ticker)
                .chain(std::iter::once(&transaction))
                .chain(after.iter().filter(same_ticker))
                .try_fold(
                    HoldingState::default(),
                    |mut state, item| -> Result<HoldingState, Error> {
                        state.apply(item)?;
                        Ok(state)
                    },
                )
        };
        let state = result.map_err(|error| {
            Error::new(
                error.kind,
                format!(
                    "unable to record {} in {}: {}",
                    transaction, self.name, error.message
                ),
            )
        })?;

        debug!(
            "record {} in {} at position {}",
            transaction, self.name, position
        );
        self.states.insert(transaction.ticker.clone(), state);
        self.transactions.insert(position, transaction);
        self.version += 1;
        Ok(())
    }
}

impl TransactionStore for Portfolio {
    fn list_transactions(&self, portfolio_id: &str) -> Result<Vec<Transaction>, Error> {
        if portfolio_id != self.id {
            return Err(Error::new(
                ErrorKind::Referential,
                format!("unknown portfolio {portfolio_id}"),
            ));
        }
        Ok(self.transactions.clone())
    }

    fn version(&self, portfolio_id: &str) -> Result<u64, Error> {
        if portfolio_id != self.id {
            return Err(Error::new(
                ErrorKind::Referential,
                format!("unknown portfolio {portfolio_id}"),
            ));
        }
        Ok(self.version)
    }
}
