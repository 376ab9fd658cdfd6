//! Node-facing surfaces around the VM.
//!
//! - [`txpool`]: pending transaction pool and the submission interface
//! - [`record`]: REST "record" submission handlers
//! - [`nodeinfo`]: diagnostics page model and renderer

pub mod nodeinfo;
pub mod record;
pub mod txpool;
