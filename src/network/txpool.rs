//! Transaction pool for pending transactions awaiting block inclusion.
//!
//! Provides thread-safe storage and ordering of unconfirmed transactions,
//! and the admission checks the record endpoint relies on.

use crate::core::transaction::{ATTRIBUTE_MAX_LEN, Transaction, TransactionType};
use crate::types::hash::Hash;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

/// Default transaction pool capacity.
pub const TXPOOL_CAPACITY: usize = 100_000;

/// Reasons a transaction is refused by the pool.
///
/// Each variant maps to the numeric code reported to REST clients.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("transaction {0} is already in the pool")]
    DuplicatedTx(Hash),
    #[error("attribute of {len} bytes exceeds {max}", max = ATTRIBUTE_MAX_LEN)]
    AttributeProgram { len: usize },
    #[error("record transaction without payload data")]
    TransactionPayload,
}

impl SubmitError {
    /// Numeric error code returned in response packs.
    pub fn code(&self) -> i64 {
        match self {
            SubmitError::DuplicatedTx(_) => 45002,
            SubmitError::AttributeProgram { .. } => 45006,
            SubmitError::TransactionPayload => 45008,
        }
    }
}

/// Anything that accepts verified transactions for relay.
pub trait TransactionSink: Send + Sync {
    /// Verifies `tx` and queues it, or explains why it was refused.
    fn submit(&self, tx: Transaction) -> Result<(), SubmitError>;
}

/// Thread-safe pool of pending transactions.
///
/// Keeps insertion order so record transactions are relayed in the order
/// they were submitted, with O(1) duplicate detection via hash lookup.
pub struct TxPool {
    /// Transactions indexed by hash for fast lookup and deduplication.
    transactions: DashMap<Hash, Transaction>,
    /// Insertion order for deterministic transaction ordering in blocks.
    order: RwLock<Vec<Hash>>,
}

impl Default for TxPool {
    fn default() -> Self {
        TxPool::new(None)
    }
}

impl TxPool {
    /// Creates a new transaction pool with the given capacity.
    ///
    /// Uses `TXPOOL_CAPACITY` if `None` is provided.
    pub fn new(capacity: Option<usize>) -> Self {
        let cap = capacity.unwrap_or(TXPOOL_CAPACITY);

        Self {
            transactions: DashMap::with_capacity(cap),
            order: RwLock::new(Vec::with_capacity(cap)),
        }
    }

    // A panic while holding the lock cannot leave the order vector torn,
    // so a poisoned guard is still usable.
    fn order_read(&self) -> RwLockReadGuard<'_, Vec<Hash>> {
        self.order.read().unwrap_or_else(|e| e.into_inner())
    }

    fn order_write(&self) -> RwLockWriteGuard<'_, Vec<Hash>> {
        self.order.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns `true` if the pool contains a transaction with the given hash.
    pub fn contains(&self, hash: &Hash) -> bool {
        self.transactions.contains_key(hash)
    }

    /// Returns the number of transactions in the pool.
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Removes all transactions from the pool.
    pub fn flush(&self) {
        let mut order = self.order_write();
        self.transactions.clear();
        order.clear();
    }

    /// Returns all transactions in insertion order.
    pub fn transactions(&self) -> Vec<Transaction> {
        let order = self.order_read();

        order
            .iter()
            .filter_map(|h| self.transactions.get(h).map(|e| e.clone()))
            .collect()
    }

    fn verify(tx: &Transaction) -> Result<(), SubmitError> {
        if let Some(attr) = tx.attributes.iter().find(|a| a.data.len() > ATTRIBUTE_MAX_LEN) {
            return Err(SubmitError::AttributeProgram {
                len: attr.data.len(),
            });
        }
        if tx.tx_type == TransactionType::Record
            && tx.payload.as_ref().is_none_or(|p| p.data.is_empty())
        {
            return Err(SubmitError::TransactionPayload);
        }
        Ok(())
    }
}

impl TransactionSink for TxPool {
    fn submit(&self, tx: Transaction) -> Result<(), SubmitError> {
        TxPool::verify(&tx)?;

        let hash = tx.hash();
        let mut order = self.order_write();
        match self.transactions.entry(hash) {
            Entry::Occupied(_) => Err(SubmitError::DuplicatedTx(hash)),
            Entry::Vacant(slot) => {
                slot.insert(tx);
                order.push(hash);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transaction::{TxAttribute, description_chunks};

    fn record(data: &str) -> Transaction {
        Transaction::record("record", data.as_bytes())
    }

    #[test]
    fn submit_then_contains() {
        let pool = TxPool::new(None);
        assert!(pool.is_empty());

        let tx = record("hello");
        let hash = tx.hash();
        assert!(!pool.contains(&hash));
        pool.submit(tx).unwrap();
        assert!(pool.contains(&hash));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn duplicate_is_rejected_with_code() {
        let pool = TxPool::default();
        pool.submit(record("same")).unwrap();

        let err = pool.submit(record("same")).unwrap_err();
        assert!(matches!(err, SubmitError::DuplicatedTx(_)));
        assert_eq!(err.code(), 45002);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn oversized_attribute_is_rejected() {
        let pool = TxPool::default();
        let tx = Transaction::transfer_asset(vec![TxAttribute::description(vec![0u8; 253])]);
        let err = pool.submit(tx).unwrap_err();
        assert_eq!(err, SubmitError::AttributeProgram { len: 253 });
        assert_eq!(err.code(), 45006);
        assert!(pool.is_empty());
    }

    #[test]
    fn empty_record_payload_is_rejected() {
        let pool = TxPool::default();
        let err = pool.submit(record("")).unwrap_err();
        assert_eq!(err, SubmitError::TransactionPayload);
        assert_eq!(err.code(), 45008);
    }

    #[test]
    fn chunked_transfer_is_accepted() {
        let pool = TxPool::default();
        let tx = Transaction::transfer_asset(description_chunks(&[1u8; 600]));
        assert!(pool.submit(tx).is_ok());
    }

    #[test]
    fn keeps_insertion_order() {
        let pool = TxPool::new(Some(128));
        let txs: Vec<Transaction> = (0..=100).map(|i| record(&i.to_string())).collect();
        for tx in &txs {
            pool.submit(tx.clone()).unwrap();
        }

        let pooled = pool.transactions();
        for (i, (got, want)) in pooled.iter().zip(&txs).enumerate() {
            assert_eq!(got.hash(), want.hash(), "failed at index {}", i);
        }

        pool.flush();
        assert!(pool.transactions().is_empty());
        assert_eq!(pool.len(), 0);
    }
}
