//! 32-byte SHA3-256 hash type and a lazily filled per-object cache.

use crate::types::encoding::{Decode, DecodeError, Encode, EncodeSink};
use sha3::{Digest, Sha3_256};
use std::fmt;
use std::sync::OnceLock;

/// SHA3-256 hash length in bytes.
pub const HASH_LEN: usize = 32;

/// Fixed-size 32-byte hash used for transaction ids and script identities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash, Ord, PartialOrd)]
pub struct Hash(pub [u8; HASH_LEN]);

impl Hash {
    /// Creates a zero-valued hash (all bytes are 0x00).
    pub const fn zero() -> Hash {
        Hash([0u8; HASH_LEN])
    }

    /// Returns the hash as a byte slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Copies the hash into a new vector.
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    /// Builds a hash from a slice, returning `None` unless it is exactly [`HASH_LEN`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Hash> {
        let arr: [u8; HASH_LEN] = bytes.try_into().ok()?;
        Some(Hash(arr))
    }

    /// Lowercase hex representation without prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Creates a new SHA3-256 hash builder for incremental hashing.
    pub fn sha3() -> HashBuilder {
        HashBuilder::new()
    }

    /// Hashes a single buffer in one call.
    pub fn digest(data: &[u8]) -> Hash {
        Hash::sha3().chain(data).finalize()
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl Encode for Hash {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        out.write(&self.0);
    }
}

impl Decode for Hash {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let arr = <[u8; HASH_LEN]>::decode(input)?;
        Ok(Hash(arr))
    }
}

/// Incremental SHA3-256 hash builder.
///
/// Implements [`EncodeSink`] so encodable types can be hashed directly
/// without an intermediate byte buffer.
pub struct HashBuilder {
    hasher: Sha3_256,
}

impl Default for HashBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HashBuilder {
    /// Creates a new hash builder with empty state.
    pub fn new() -> Self {
        Self {
            hasher: Sha3_256::new(),
        }
    }

    /// Feeds data into the hash computation.
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Builder-style variant of [`update`](Self::update).
    pub fn chain(mut self, data: &[u8]) -> Self {
        self.hasher.update(data);
        self
    }

    /// Consumes the builder and returns the final hash.
    pub fn finalize(self) -> Hash {
        Hash(self.hasher.finalize().into())
    }
}

impl EncodeSink for HashBuilder {
    fn write(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }
}

/// Write-once slot for a hash derived from immutable data.
///
/// The owner computes the hash on first access; every later access returns
/// the stored value. Cloning copies the cached value, if any.
#[derive(Debug, Default)]
pub struct HashCache(OnceLock<Hash>);

impl HashCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self(OnceLock::new())
    }

    /// Returns the cached hash, computing it with `f` on first use.
    pub fn get_or_compute<F: FnOnce() -> Hash>(&self, f: F) -> Hash {
        *self.0.get_or_init(f)
    }

    /// Returns the cached hash if it has already been computed.
    pub fn get(&self) -> Option<Hash> {
        self.0.get().copied()
    }
}

impl Clone for HashCache {
    fn clone(&self) -> Self {
        let cache = HashCache::new();
        if let Some(h) = self.get() {
            let _ = cache.0.set(h);
        }
        cache
    }
}

// Cached hashes never participate in equality: two objects with the same
// content are equal whether or not either has been hashed yet.
impl PartialEq for HashCache {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Eq for HashCache {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_matches_builder() {
        let mut h = Hash::sha3();
        h.update(b"te");
        h.update(b"st");
        assert_eq!(h.finalize(), Hash::digest(b"test"));
    }

    #[test]
    fn from_slice_requires_exact_length() {
        assert!(Hash::from_slice(&[0u8; 31]).is_none());
        assert!(Hash::from_slice(&[0u8; 33]).is_none());
        assert_eq!(Hash::from_slice(&[0u8; HASH_LEN]), Some(Hash::zero()));
    }

    #[test]
    fn display_and_hex_agree() {
        let hash = Hash::digest(b"abc");
        assert_eq!(hash.to_string(), hash.to_hex());
        assert_eq!(hash.to_hex().len(), HASH_LEN * 2);
    }

    #[test]
    fn cache_computes_once() {
        let cache = HashCache::new();
        assert_eq!(cache.get(), None);

        let first = cache.get_or_compute(|| Hash::digest(b"a"));
        let second = cache.get_or_compute(|| Hash::digest(b"b"));
        assert_eq!(first, second);
        assert_eq!(cache.get(), Some(Hash::digest(b"a")));
    }

    #[test]
    fn cloned_cache_keeps_value() {
        let cache = HashCache::new();
        cache.get_or_compute(|| Hash::digest(b"x"));
        assert_eq!(cache.clone().get(), Some(Hash::digest(b"x")));
    }
}
