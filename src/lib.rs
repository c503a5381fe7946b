//! SabinaCoin - A single-node proof-of-work ledger with longest-chain consensus
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Blockchain
//! - [`blockchain`] - Blocks, the ledger and chain validation
//! - [`transaction`] - Transaction type and payload validation
//! - [`mempool`] - Pending transaction pool
//!
//! ## Consensus & Mining
//! - [`miner`] - Proof-of-work puzzle
//! - [`consensus`] - Longest-valid-chain resolution
//!
//! ## Cryptography
//! - [`crypto`] - Canonical encoding and SHA-256 digests
//!
//! ## Networking & Integration
//! - [`network`] - Peer set and peer chain fetching
//! - [`node`] - Node context tying ledger, peers and consensus together
//! - [`api`] - HTTP endpoints
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Core Blockchain
// ============================================================================
pub mod blockchain;
pub mod mempool;
pub mod transaction;

// ============================================================================
// Consensus & Mining
// ============================================================================
pub mod consensus;
pub mod miner;

// ============================================================================
// Cryptography
// ============================================================================
pub mod crypto;

// ============================================================================
// Networking & Integration
// ============================================================================
pub mod api;
pub mod network;
pub mod node;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
