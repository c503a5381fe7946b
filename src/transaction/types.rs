/// Transaction types for SabinaCoin
use serde::{Deserialize, Serialize};

/// A value transfer waiting in the pending pool or embedded in a block.
///
/// Identifiers are free-form strings and `amount` is unchecked: no sign,
/// balance or signature rules apply at this layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub receiver: String,
    pub amount: f64,
}

impl Transaction {
    pub fn new(sender: impl Into<String>, receiver: impl Into<String>, amount: f64) -> Self {
        Transaction {
            sender: sender.into(),
            receiver: receiver.into(),
            amount,
        }
    }
}
