//! In-process chain holding job records
//!
//! Executes the operations and queries the [`Database`](crate::Database)
//! issues, verifying transaction signatures the way a node would. Used by the
//! local demo and by tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::warn;

use crate::client::{ChainClient, Operation, SignedTransaction, TransactionReceipt, TxStatus};
use crate::signer::verify_signatures;
use crate::{LedgerError, Result};

#[derive(Debug, Clone)]
struct StoredJob {
    evm_address: String,
    result: String,
    status: i64,
}

impl StoredJob {
    fn to_value(&self, id: &str) -> Value {
        json!({
            "id": id,
            "evm_address": self.evm_address,
            "result": self.result,
            "status": self.status,
        })
    }
}

/// In-memory chain.
///
/// Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct MemoryChain {
    jobs: Arc<RwLock<BTreeMap<String, StoredJob>>>,
    /// Applied transaction ids
    applied: Arc<RwLock<Vec<String>>>,
    queries: Arc<AtomicUsize>,
    transactions: Arc<AtomicUsize>,
    /// Calls left to fail with a transport error
    failures: Arc<AtomicUsize>,
}

impl MemoryChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` calls (queries or transactions) with a transport error
    pub fn fail_next(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    /// Number of queries received
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Number of transactions received, including refused ones
    pub fn transaction_count(&self) -> usize {
        self.transactions.load(Ordering::SeqCst)
    }

    /// Ids of transactions that were applied
    pub async fn applied_transactions(&self) -> Vec<String> {
        self.applied.read().await.clone()
    }

    fn take_failure(&self) -> bool {
        self.failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

fn apply(
    jobs: &mut BTreeMap<String, StoredJob>,
    operation: &Operation,
) -> std::result::Result<(), String> {
    match (operation.op_name.as_str(), operation.args.as_slice()) {
        ("create_job", [Value::String(id), Value::String(evm_address), Value::String(result)]) => {
            if jobs.contains_key(id) {
                return Err(format!("job {} already exists", id));
            }
            jobs.insert(
                id.clone(),
                StoredJob {
                    evm_address: evm_address.clone(),
                    result: result.clone(),
                    status: 0,
                },
            );
            Ok(())
        }
        ("update_job_status", [Value::String(id), status]) => {
            let status = status
                .as_i64()
                .filter(|s| (0..=2).contains(s))
                .ok_or_else(|| format!("invalid status {}", status))?;
            let job = jobs
                .get_mut(id)
                .ok_or_else(|| format!("job {} not found", id))?;
            job.status = status;
            Ok(())
        }
        (name, args) => Err(format!("unknown operation {} with {} args", name, args.len())),
    }
}

#[async_trait]
impl ChainClient for MemoryChain {
    async fn query(&self, name: &str, args: Value) -> Result<Value> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.take_failure() {
            return Err(LedgerError::Transport {
                message: format!("query {} failed", name),
            });
        }

        let jobs = self.jobs.read().await;
        match name {
            "total_jobs" => Ok(json!(jobs.len())),
            "get_job" => {
                let id = args
                    .get("job_id")
                    .and_then(Value::as_str)
                    .ok_or_else(|| LedgerError::Decode {
                        message: "get_job requires a string job_id".to_string(),
                    })?;
                Ok(jobs.get(id).map(|job| job.to_value(id)).unwrap_or(Value::Null))
            }
            "get_all_jobs" => Ok(Value::Array(
                jobs.iter().map(|(id, job)| job.to_value(id)).collect(),
            )),
            other => Err(LedgerError::UnknownQuery {
                name: other.to_string(),
            }),
        }
    }

    async fn send_transaction(
        &self,
        tx: SignedTransaction,
        poll_status: bool,
    ) -> Result<TransactionReceipt> {
        self.transactions.fetch_add(1, Ordering::SeqCst);
        if self.take_failure() {
            return Err(LedgerError::Transport {
                message: format!("transaction {} not delivered", tx.tx_rid),
            });
        }

        let rejected = |reason: String| -> Result<TransactionReceipt> {
            warn!(tx_rid = %tx.tx_rid, %reason, "transaction rejected");
            Ok(TransactionReceipt {
                tx_rid: tx.tx_rid.clone(),
                status: TxStatus::Rejected { reason },
            })
        };

        if let Err(e) = verify_signatures(&tx) {
            return rejected(e.to_string());
        }
        match tx.transaction.rid() {
            Ok(rid) if rid == tx.tx_rid => {}
            _ => return rejected("transaction id mismatch".to_string()),
        }

        // All operations of a transaction apply or none do.
        {
            let mut jobs = self.jobs.write().await;
            let mut staged = jobs.clone();
            for operation in &tx.transaction.operations {
                if let Err(reason) = apply(&mut staged, operation) {
                    return rejected(reason);
                }
            }
            *jobs = staged;
        }
        self.applied.write().await.push(tx.tx_rid.clone());

        Ok(TransactionReceipt {
            tx_rid: tx.tx_rid.clone(),
            status: if poll_status {
                TxStatus::Confirmed
            } else {
                TxStatus::Waiting
            },
        })
    }
}
