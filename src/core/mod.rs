//! Core chain data structures.
//!
//! Only transactions live here: they are the script containers handed to
//! the VM and the unit the record endpoint submits to the pool.

pub mod transaction;
