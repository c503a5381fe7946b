//! Blocks, the ledger that holds them and the chain validator.

pub mod core;
pub use core::*;
