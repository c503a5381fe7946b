/// Boundary validation for transactions submitted by clients
use crate::error::ChainError;
use crate::transaction::types::Transaction;
use serde_json::Value;

/// Keys every submitted transaction must carry.
pub const REQUIRED_KEYS: [&str; 3] = ["sender", "receiver", "amount"];

/// Turn a raw JSON payload into a [`Transaction`].
///
/// Fails with `InvalidTransactionPayload` naming every missing key, or the
/// first key whose value has the wrong type.
pub fn parse_transaction_payload(payload: &Value) -> Result<Transaction, ChainError> {
    let object = payload.as_object().ok_or_else(|| {
        ChainError::InvalidTransactionPayload("payload must be a JSON object".to_string())
    })?;

    let missing: Vec<&str> = REQUIRED_KEYS
        .iter()
        .copied()
        .filter(|key| !object.contains_key(*key))
        .collect();
    if !missing.is_empty() {
        return Err(ChainError::InvalidTransactionPayload(format!(
            "missing keys: {}",
            missing.join(", ")
        )));
    }

    let sender = string_field(payload, "sender")?;
    let receiver = string_field(payload, "receiver")?;
    let amount = payload["amount"].as_f64().ok_or_else(|| {
        ChainError::InvalidTransactionPayload("amount must be a number".to_string())
    })?;

    Ok(Transaction {
        sender,
        receiver,
        amount,
    })
}

fn string_field(payload: &Value, key: &str) -> Result<String, ChainError> {
    payload[key]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ChainError::InvalidTransactionPayload(format!("{} must be a string", key)))
}
