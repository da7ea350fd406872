//! Seller extension hooks
//!
//! A real seller plugs its business logic in here: whether a requirement is
//! acceptable, and what to deliver once paid.

use acp_types::{DeliverablePayload, Job};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};

/// Outcome of evaluating a job requirement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Accept,
    Reject { reason: String },
}

pub trait RequirementEvaluator: Send + Sync {
    fn evaluate(&self, job: &Job) -> Verdict;
}

/// Accepts every requirement
#[derive(Debug, Default, Clone)]
pub struct AcceptAll;

impl RequirementEvaluator for AcceptAll {
    fn evaluate(&self, _job: &Job) -> Verdict {
        Verdict::Accept
    }
}

/// Produces the deliverable for a paid job
#[async_trait]
pub trait DeliverableProducer: Send + Sync {
    async fn produce(&self, job: &Job) -> Result<serde_json::Value>;
}

/// Delivers the same payload for every job
#[derive(Debug, Clone)]
pub struct StaticDeliverable {
    payload: DeliverablePayload,
}

impl StaticDeliverable {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            payload: DeliverablePayload {
                response: response.into(),
                is_success: true,
            },
        }
    }
}

impl Default for StaticDeliverable {
    fn default() -> Self {
        Self::new("This is a test response")
    }
}

#[async_trait]
impl DeliverableProducer for StaticDeliverable {
    async fn produce(&self, _job: &Job) -> Result<serde_json::Value> {
        serde_json::to_value(&self.payload).map_err(AgentError::from)
    }
}
