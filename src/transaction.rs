//! Transaction module split into types and payload validation

pub mod types;
pub mod validation;

pub use types::*;
pub use validation::parse_transaction_payload;
