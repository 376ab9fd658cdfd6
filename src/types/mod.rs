//! Core value types shared by the VM, transactions and the REST layer.
//!
//! - `Hash`: fixed-size 32-byte SHA3-256 hashes and a lazy hash cache
//! - `Bytes`: cheaply clonable immutable byte buffers
//! - `encoding`: deterministic binary `Encode`/`Decode`

pub mod bytes;
pub mod encoding;
pub mod hash;
