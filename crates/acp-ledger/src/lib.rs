//! ACP Ledger - durable job records for ACP agents
//!
//! Job outcomes are recorded on a blockchain through a [`ChainClient`]. The
//! client itself (transport, status polling, wire encoding) is external; this
//! crate only:
//!
//! - builds `create_job` / `update_job_status` operations
//! - signs transactions with the ledger key ([`LedgerSigner`])
//! - adapts query results into [`acp_types::JobRecord`]s ([`Database`])
//!
//! [`MemoryChain`] is an in-process chain that executes the same operations
//! and queries, used by the local demo and by tests.
//!
//! # Invariants
//!
//! 1. A status update is validated before anything reaches the chain client
//! 2. Status updates overwrite, they never append
//! 3. Every transaction is signed by the ledger key

pub mod client;
pub mod database;
pub mod memory;
pub mod signer;

pub use client::{
    ChainClient, Operation, SignedTransaction, Transaction, TransactionReceipt, TxStatus,
};
pub use database::Database;
pub use memory::MemoryChain;
pub use signer::LedgerSigner;

use thiserror::Error;

/// Errors that can occur in ledger operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Invalid status: {status}. Must be 'PENDING', 'COMPLETED', or 'REJECTED'.")]
    InvalidStatus { status: String },

    #[error("Invalid ledger key: {message}")]
    InvalidKey { message: String },

    #[error("Chain transport error: {message}")]
    Transport { message: String },

    #[error("Transaction {tx_rid} rejected: {reason}")]
    Rejected { tx_rid: String, reason: String },

    #[error("Unknown query: {name}")]
    UnknownQuery { name: String },

    #[error("Malformed chain response: {message}")]
    Decode { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

pub type Result<T> = std::result::Result<T, LedgerError>;
