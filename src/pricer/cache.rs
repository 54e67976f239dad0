use super::Holdings;
use crate::error::Error;
use crate::portfolio::TransactionStore;
use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

struct CacheEntry {
    version: u64,
    holdings: Rc<Holdings>,
}

/// Computed holdings per portfolio, valid for one store version.
#[derive(Default)]
pub struct HoldingsCache {
    entries: HashMap<String, CacheEntry>,
}

impl HoldingsCache {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn holdings<S>(&mut self, store: &S, portfolio_id: &str) -> Result<Rc<Holdings>, Error>
    where
        S: TransactionStore,
    {
        let version = store.version(portfolio_id)?;
        if let Some(entry) = self.entries.get(portfolio_id) {
            if entry.version == version {
                debug!("holdings of {} v{} from cache", portfolio_id, version);
                return Ok(entry.holdings.clone());
            }
        }

        debug!("compute holdings of {} v{}", portfolio_id, version);
        let transactions = store.list_transactions(portfolio_id)?;
        let holdings = Rc::new(Holdings::from_transactions(&transactions)?);
        self.entries.insert(
            portfolio_id.to_string(),
            CacheEntry {
                version,
                holdings: holdings.clone(),
            },
        );
        Ok(holdings)
    }

    pub fn invalidate(&mut self, portfolio_id: &str) {
        self.entries.remove(portfolio_id);
    }
}
