//! Buyer Agent - browses sellers, initiates jobs, pays on requirement
//!
//! The buyer flow:
//! 1. Browses agents by keyword and initiates a job on the first offering
//! 2. Pays when the seller's requirement memo proposes TRANSACTION
//! 3. Countersigns a seller's rejection memo
//! 4. Logs the deliverable once the job completes

use std::sync::Arc;

use acp_types::{BrowseQuery, EvmAddress, Job, JobId, Memo, MemoId, Notification, Phase};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::json;
use tracing::info;

use crate::commerce::CommerceClient;
use crate::env::AgentRole;
use crate::error::{AgentError, Result};
use crate::runtime::TaskHandler;

pub const ACCEPT_REJECTION_REASON: &str = "Accepts job rejection";
pub const CONTEST_REJECTION_REASON: &str = "Buyer contests job rejection";

/// Buyer configuration
#[derive(Debug, Clone)]
pub struct BuyerConfig {
    /// Agent search used to pick a seller
    pub browse: BrowseQuery,
    /// Service requirement sent with the job
    pub requirement: serde_json::Value,
    pub evaluator: Option<EvmAddress>,
    /// How long an initiated job stays open
    pub job_ttl: Duration,
    /// Sign seller rejection memos as accepted
    pub accept_rejections: bool,
}

impl Default for BuyerConfig {
    fn default() -> Self {
        Self {
            browse: BrowseQuery::new("Chromia's EVAL"),
            requirement: json!({ "details": "testing transaction" }),
            evaluator: None,
            job_ttl: Duration::days(1),
            accept_rejections: true,
        }
    }
}

/// What the buyer does with one notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuyerAction {
    PayAndAccept,
    SignRejection { memo_id: MemoId, accept: bool },
    LogDeliverable,
    LogRejected,
    Ignore,
}

/// The Buyer Agent
pub struct BuyerAgent {
    client: Arc<dyn CommerceClient>,
    config: BuyerConfig,
}

impl BuyerAgent {
    pub fn new(client: Arc<dyn CommerceClient>, config: BuyerConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &BuyerConfig {
        &self.config
    }

    /// Pick the action for a (phase, memo) pair. No side effects.
    pub fn decide(&self, job: &Job, memo: Option<&Memo>) -> BuyerAction {
        match (job.phase, memo) {
            (Phase::Negotiation, Some(memo)) if memo.proposes(Phase::Transaction) => {
                BuyerAction::PayAndAccept
            }
            (Phase::Transaction, Some(memo)) if memo.proposes(Phase::Rejected) => {
                BuyerAction::SignRejection {
                    memo_id: memo.id,
                    accept: self.config.accept_rejections,
                }
            }
            (Phase::Completed, _) => BuyerAction::LogDeliverable,
            (Phase::Rejected, _) => BuyerAction::LogRejected,
            _ => BuyerAction::Ignore,
        }
    }

    /// React to a phase change
    pub async fn on_new_task(&self, job: Job, memo: Option<Memo>) -> Result<BuyerAction> {
        let action = self.decide(&job, memo.as_ref());

        match &action {
            BuyerAction::PayAndAccept => {
                info!(job_id = %job.id, "paying for job");
                self.client.pay_and_accept_requirement(job.id).await?;
                info!(job_id = %job.id, "job paid");
            }
            BuyerAction::SignRejection { memo_id, accept } => {
                let content = memo.as_ref().map(|m| m.content.as_str()).unwrap_or_default();
                info!(job_id = %job.id, memo_id = %memo_id, rejection_reason = %content, "signing job rejection memo");
                let reason = if *accept {
                    ACCEPT_REJECTION_REASON
                } else {
                    CONTEST_REJECTION_REASON
                };
                self.client.sign_memo(*memo_id, *accept, reason).await?;
                info!(job_id = %job.id, accepted = *accept, "job rejection memo signed");
            }
            BuyerAction::LogDeliverable => {
                info!(job_id = %job.id, deliverable = ?job.deliverable, "job completed, received deliverable");
            }
            BuyerAction::LogRejected => {
                info!(job_id = %job.id, "job rejected by seller");
            }
            BuyerAction::Ignore => {}
        }

        Ok(action)
    }

    /// Browse sellers and open a job on the first offering of the first match
    pub async fn initiate_job(&self) -> Result<JobId> {
        let agents = self.client.browse_agents(&self.config.browse).await?;
        info!(count = agents.len(), keyword = %self.config.browse.keyword, "relevant agents");

        let chosen = agents.first().ok_or_else(|| AgentError::NoAgentsFound {
            keyword: self.config.browse.keyword.clone(),
        })?;
        let offering = chosen
            .job_offerings
            .first()
            .ok_or_else(|| AgentError::NoOfferings {
                agent: chosen.name.clone(),
            })?;

        let expires_at = Utc::now() + self.config.job_ttl;
        let job_id = self
            .client
            .initiate_job(
                offering,
                self.config.requirement.clone(),
                self.config.evaluator.clone(),
                expires_at,
            )
            .await?;

        info!(
            job_id = %job_id,
            client = %self.client.wallet_address(),
            agent = %chosen.name,
            offering = %offering.name,
            "job initiated"
        );
        Ok(job_id)
    }
}

#[async_trait]
impl TaskHandler for BuyerAgent {
    fn role(&self) -> AgentRole {
        AgentRole::Buyer
    }

    async fn handle(&self, notification: Notification) -> Result<()> {
        self.on_new_task(notification.job, notification.memo).await?;
        Ok(())
    }
}
