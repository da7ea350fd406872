//! Jobs, memos and phase-change notifications

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::EvmAddress;
use crate::phase::Phase;

/// Commerce job identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Memo identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemoId(pub u64);

impl fmt::Display for MemoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Snapshot of a job as seen by an agent.
///
/// The commerce backend owns the job. Agents receive copies and request
/// transitions by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub phase: Phase,
    /// Service requirement sent by the client
    pub requirement: Option<serde_json::Value>,
    /// Deliverable submitted by the provider
    pub deliverable: Option<serde_json::Value>,
    /// Buyer wallet
    pub client_address: EvmAddress,
    /// Seller wallet
    pub provider_address: EvmAddress,
    pub evaluator_address: Option<EvmAddress>,
    pub price: f64,
    pub expires_at: DateTime<Utc>,
}

/// A proposed phase transition awaiting one party's signature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memo {
    pub id: MemoId,
    pub job_id: JobId,
    /// Phase the job enters once the memo is signed
    pub next_phase: Phase,
    pub content: String,
    pub sender: EvmAddress,
}

impl Memo {
    pub fn proposes(&self, phase: Phase) -> bool {
        self.next_phase == phase
    }
}

/// Delivered to an agent on every phase change of a job it takes part in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub job: Job,
    /// Memo the receiving agent is expected to act on, if any
    pub memo: Option<Memo>,
}

impl Notification {
    pub fn new(job: Job, memo: Option<Memo>) -> Self {
        Self { job, memo }
    }
}

/// Payload a provider submits as the job's deliverable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverablePayload {
    pub response: String,
    pub is_success: bool,
}
