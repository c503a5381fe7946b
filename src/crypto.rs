//! Hashing primitives for SabinaCoin
//!
//! Blocks are hashed over a canonical JSON encoding: every object has its
//! keys in lexicographic order, so two structurally equal values always
//! produce the same bytes regardless of how they were built.

use crate::error::ChainError;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest, 64 lowercase characters.
pub type HexDigest = String;

/// Hex-encoded SHA-256 of arbitrary bytes.
pub fn sha256_hex(data: &[u8]) -> HexDigest {
    hex::encode(Sha256::digest(data))
}

/// Encode `value` as compact JSON with object keys sorted.
///
/// Going through `serde_json::Value` is what sorts the keys: its map type is
/// ordered by key unless the `preserve_order` feature is enabled, which this
/// crate never does.
pub fn canonical_encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ChainError> {
    let value = serde_json::to_value(value)?;
    let bytes = serde_json::to_vec(&value)?;
    Ok(bytes)
}

/// Digest of the canonical encoding of `value`.
pub fn canonical_digest<T: Serialize>(value: &T) -> Result<HexDigest, ChainError> {
    Ok(sha256_hex(&canonical_encode(value)?))
}
