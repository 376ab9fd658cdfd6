//! Blockchain node library.
//!
//! Provides the contract engine with its interop registry, transactions and
//! the transaction pool, the REST record handlers and the diagnostics page.

pub mod config;
pub mod core;
pub mod network;
pub mod types;
pub mod utils;
pub mod virtual_machine;
