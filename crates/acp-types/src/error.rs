//! Error types for parsing ACP domain values

use thiserror::Error;

/// Errors raised when a raw value does not map onto a domain type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    /// Status string outside PENDING / COMPLETED / REJECTED
    #[error("Invalid status: {status}. Must be 'PENDING', 'COMPLETED', or 'REJECTED'.")]
    InvalidStatus { status: String },

    /// Numeric status code outside 0..=2
    #[error("Invalid status code: {code}")]
    InvalidStatusCode { code: i64 },

    /// Phase name not part of the protocol
    #[error("Invalid phase: {phase}")]
    InvalidPhase { phase: String },

    /// Wallet address is not a 0x-prefixed 20-byte hex string
    #[error("Invalid wallet address: {address}")]
    InvalidAddress { address: String },
}
