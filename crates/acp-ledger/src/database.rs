//! Job-record database over a chain client
//!
//! `Database` adapts call shapes: it turns method calls into signed
//! operations or named queries, and query results into typed records.

use std::sync::Arc;

use acp_types::{JobRecord, JobStatus};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::client::{ChainClient, Operation, TransactionReceipt, TxStatus};
use crate::signer::LedgerSigner;
use crate::{LedgerError, Result};

/// Record shape returned by the chain's job queries
#[derive(Debug, Deserialize)]
struct RawJobRecord {
    id: String,
    evm_address: String,
    result: String,
    status: i64,
}

impl TryFrom<RawJobRecord> for JobRecord {
    type Error = LedgerError;

    fn try_from(raw: RawJobRecord) -> Result<Self> {
        let status = JobStatus::from_code(raw.status).map_err(|e| LedgerError::Decode {
            message: e.to_string(),
        })?;
        Ok(JobRecord {
            id: raw.id,
            evm_address: raw.evm_address,
            result: raw.result,
            status,
        })
    }
}

/// Job records stored on chain
#[derive(Clone)]
pub struct Database {
    client: Arc<dyn ChainClient>,
    signer: LedgerSigner,
}

impl Database {
    pub fn new(client: Arc<dyn ChainClient>, signer: LedgerSigner) -> Self {
        Self { client, signer }
    }

    pub fn signer(&self) -> &LedgerSigner {
        &self.signer
    }

    pub async fn total_jobs(&self) -> Result<u64> {
        let value = self.client.query("total_jobs", json!({})).await?;
        value.as_u64().ok_or_else(|| LedgerError::Decode {
            message: format!("total_jobs returned {}", value),
        })
    }

    /// Record a delivered job with status PENDING
    pub async fn create_job(
        &self,
        id: &str,
        evm_address: &str,
        result: &str,
    ) -> Result<TransactionReceipt> {
        let operation = Operation::new("create_job", vec![json!(id), json!(evm_address), json!(result)]);
        self.submit(operation).await
    }

    pub async fn get_job(&self, job_id: &str) -> Result<Option<JobRecord>> {
        let value = self.client.query("get_job", json!({ "job_id": job_id })).await?;
        if value.is_null() {
            return Ok(None);
        }
        let raw: RawJobRecord = decode(value)?;
        raw.try_into().map(Some)
    }

    pub async fn get_all_jobs(&self) -> Result<Vec<JobRecord>> {
        let value = self.client.query("get_all_jobs", json!({})).await?;
        let raw: Vec<RawJobRecord> = decode(value)?;
        raw.into_iter().map(JobRecord::try_from).collect()
    }

    /// Overwrite a record's status.
    ///
    /// `status` must be exactly `PENDING`, `COMPLETED` or `REJECTED`; anything
    /// else fails before the chain client is called.
    pub async fn update_job_status(&self, job_id: &str, status: &str) -> Result<TransactionReceipt> {
        let status: JobStatus = status.parse().map_err(|_| LedgerError::InvalidStatus {
            status: status.to_string(),
        })?;
        self.set_job_status(job_id, status).await
    }

    pub async fn set_job_status(&self, job_id: &str, status: JobStatus) -> Result<TransactionReceipt> {
        let operation = Operation::new(
            "update_job_status",
            vec![json!(job_id), json!(status.code())],
        );
        self.submit(operation).await
    }

    /// Sign, send and wait for confirmation
    async fn submit(&self, operation: Operation) -> Result<TransactionReceipt> {
        let op_name = operation.op_name.clone();
        let signed = self.signer.sign(self.signer.transaction(vec![operation]))?;
        let tx_rid = signed.tx_rid.clone();
        debug!(op = %op_name, tx_rid = %tx_rid, "sending ledger transaction");

        let receipt = self.client.send_transaction(signed, true).await?;
        match &receipt.status {
            TxStatus::Rejected { reason } => Err(LedgerError::Rejected {
                tx_rid,
                reason: reason.clone(),
            }),
            _ => {
                debug!(op = %op_name, tx_rid = %receipt.tx_rid, status = ?receipt.status, "ledger transaction done");
                Ok(receipt)
            }
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| LedgerError::Decode {
        message: e.to_string(),
    })
}
