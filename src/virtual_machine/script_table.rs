//! Lookup of deployed contract code for `APPCALL`.

use crate::types::bytes::Bytes;
use crate::types::hash::Hash;
use dashmap::DashMap;

/// Source of contract code addressed by code hash.
pub trait ScriptTable: Send + Sync {
    /// Returns the script whose code hash is `hash`, if deployed.
    fn get_script(&self, hash: &Hash) -> Option<Bytes>;
}

/// Concurrent in-memory contract table.
///
/// Contracts may be deployed while engines are reading from it; each entry
/// is keyed by the SHA3-256 of its code, the same identity an
/// [`ExecutionContext`](super::context::ExecutionContext) reports.
#[derive(Default)]
pub struct ContractTable {
    scripts: DashMap<Hash, Bytes>,
}

impl ContractTable {
    pub fn new() -> Self {
        Self {
            scripts: DashMap::new(),
        }
    }

    /// Stores a contract and returns its code hash. Redeploying identical code is a no-op.
    pub fn deploy(&self, script: impl Into<Bytes>) -> Hash {
        let script = script.into();
        let hash = Hash::digest(script.as_slice());
        self.scripts.entry(hash).or_insert(script);
        hash
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.scripts.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

impl ScriptTable for ContractTable {
    fn get_script(&self, hash: &Hash) -> Option<Bytes> {
        self.scripts.get(hash).map(|entry| entry.value().clone())
    }
}
