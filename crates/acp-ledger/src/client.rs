//! Chain client boundary and transaction types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{LedgerError, Result};

/// A single named operation with positional arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub op_name: String,
    pub args: Vec<serde_json::Value>,
}

impl Operation {
    pub fn new(op_name: impl Into<String>, args: Vec<serde_json::Value>) -> Self {
        Self {
            op_name: op_name.into(),
            args,
        }
    }
}

/// Unsigned transaction: operations plus the public keys that must sign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub operations: Vec<Operation>,
    /// Hex-encoded compressed secp256k1 public keys
    pub signers: Vec<String>,
}

impl Transaction {
    pub fn new(operations: Vec<Operation>, signers: Vec<String>) -> Self {
        Self {
            operations,
            signers,
        }
    }

    /// Canonical bytes that signers sign over
    pub fn signing_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| LedgerError::Serialization {
            message: e.to_string(),
        })
    }

    /// Transaction id: hex SHA-256 of the canonical bytes
    pub fn rid(&self) -> Result<String> {
        let bytes = self.signing_bytes()?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }
}

/// Transaction with one hex signature per signer, in signer order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub signatures: Vec<String>,
    pub tx_rid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    /// Accepted but not yet confirmed (no status polling requested)
    Waiting,
    Confirmed,
    Rejected { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub tx_rid: String,
    pub status: TxStatus,
}

/// Query/transaction client for the chain holding job records.
///
/// Transport errors come back as `Err`; a transaction the chain refused
/// comes back as a receipt with [`TxStatus::Rejected`].
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn query(&self, name: &str, args: serde_json::Value) -> Result<serde_json::Value>;

    async fn send_transaction(
        &self,
        tx: SignedTransaction,
        poll_status: bool,
    ) -> Result<TransactionReceipt>;
}
