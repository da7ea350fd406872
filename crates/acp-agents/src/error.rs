//! Agent and commerce errors

use acp_ledger::LedgerError;
use acp_types::{JobId, MemoId, Phase};
use thiserror::Error;

/// Errors reported by a commerce client
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommerceError {
    #[error("Job not found: {job_id}")]
    JobNotFound { job_id: JobId },

    #[error("Memo not found: {memo_id}")]
    MemoNotFound { memo_id: MemoId },

    #[error("Memo {memo_id} already signed")]
    MemoAlreadySigned { memo_id: MemoId },

    #[error("Cannot {action} job {job_id} in phase {phase}")]
    InvalidTransition {
        job_id: JobId,
        phase: Phase,
        action: String,
    },

    #[error("{address} is not allowed to {action} job {job_id}")]
    NotParticipant {
        job_id: JobId,
        address: String,
        action: String,
    },

    #[error("Job offering not found: {name}")]
    OfferingNotFound { name: String },

    #[error("Commerce client disconnected: {message}")]
    Disconnected { message: String },
}

/// Errors that can occur while an agent handles a job
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Commerce error: {0}")]
    Commerce(#[from] CommerceError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("No agents matched keyword {keyword:?}")]
    NoAgentsFound { keyword: String },

    #[error("Agent {agent} has no job offerings")]
    NoOfferings { agent: String },

    #[error("Deliverable production failed: {message}")]
    Deliverable { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;
