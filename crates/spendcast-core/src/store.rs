//! Record store contract consumed by the aggregator
//!
//! The forecasting core only ever reads transactions. Any backend that can
//! list them satisfies the contract; errors are treated as opaque.

use std::sync::RwLock;

use crate::error::{Error, Result};
use crate::models::{TransactionRecord, TransactionType};

/// Read access to the user's transactions
pub trait TransactionStore: Send + Sync {
    /// Every transaction, regardless of type
    fn fetch_all(&self) -> Result<Vec<TransactionRecord>>;

    /// Transactions of one type
    fn fetch_by_type(&self, kind: TransactionType) -> Result<Vec<TransactionRecord>> {
        Ok(self
            .fetch_all()?
            .into_iter()
            .filter(|tx| tx.kind == kind)
            .collect())
    }
}

/// Vector-backed store for embedding and tests
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<Vec<TransactionRecord>>,
}

impl InMemoryStore {
    pub fn new(records: Vec<TransactionRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    pub fn push(&self, record: TransactionRecord) -> Result<()> {
        self.records
            .write()
            .map_err(|_| Error::InvalidData("In-memory store lock poisoned".into()))?
            .push(record);
        Ok(())
    }

    /// Remove by id, returning whether anything was removed
    pub fn remove(&self, id: i64) -> Result<bool> {
        let mut records = self
            .records
            .write()
            .map_err(|_| Error::InvalidData("In-memory store lock poisoned".into()))?;
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() != before)
    }
}

impl TransactionStore for InMemoryStore {
    fn fetch_all(&self) -> Result<Vec<TransactionRecord>> {
        Ok(self
            .records
            .read()
            .map_err(|_| Error::InvalidData("In-memory store lock poisoned".into()))?
            .clone())
    }
}
