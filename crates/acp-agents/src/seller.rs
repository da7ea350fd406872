//! Seller Agent - answers job requests, delivers, records outcomes
//!
//! The seller flow:
//! 1. Evaluates incoming requests and accepts (sending a payment requirement)
//!    or rejects them
//! 2. Once paid, delivers and records the job on the ledger as PENDING
//! 3. Marks the record COMPLETED or REJECTED when the job ends

use std::sync::Arc;

use acp_ledger::Database;
use acp_types::{Job, Memo, Notification, Phase};
use async_trait::async_trait;
use tracing::info;

use crate::commerce::CommerceClient;
use crate::env::AgentRole;
use crate::error::Result;
use crate::policy::{AcceptAll, DeliverableProducer, RequirementEvaluator, StaticDeliverable, Verdict};
use crate::runtime::TaskHandler;

pub const ACCEPT_REASON: &str = "Job requirement matches agent capability";
pub const REJECT_REASON: &str = "Job requirement does not meet agent capability";

/// Seller configuration
#[derive(Debug, Clone, Default)]
pub struct SellerConfig {
    /// Reject jobs after the buyer has paid instead of delivering
    pub reject_after_payment: bool,
}

/// What the seller does with one notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SellerAction {
    Respond(Verdict),
    RejectAfterPayment,
    Deliver,
    MarkCompleted,
    MarkRejected,
    Ignore,
}

/// The Seller Agent
pub struct SellerAgent {
    client: Arc<dyn CommerceClient>,
    database: Database,
    config: SellerConfig,
    evaluator: Arc<dyn RequirementEvaluator>,
    producer: Arc<dyn DeliverableProducer>,
}

impl SellerAgent {
    /// Create a seller that accepts every requirement and delivers a fixed payload
    pub fn new(client: Arc<dyn CommerceClient>, database: Database, config: SellerConfig) -> Self {
        Self {
            client,
            database,
            config,
            evaluator: Arc::new(AcceptAll),
            producer: Arc::new(StaticDeliverable::default()),
        }
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn RequirementEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn with_producer(mut self, producer: Arc<dyn DeliverableProducer>) -> Self {
        self.producer = producer;
        self
    }

    pub fn config(&self) -> &SellerConfig {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Pick the action for a (phase, memo) pair. No side effects.
    pub fn decide(&self, job: &Job, memo: Option<&Memo>) -> SellerAction {
        match (job.phase, memo) {
            (Phase::Request, Some(memo)) if memo.proposes(Phase::Negotiation) => {
                SellerAction::Respond(self.evaluator.evaluate(job))
            }
            (Phase::Transaction, Some(memo)) if memo.proposes(Phase::Evaluation) => {
                if self.config.reject_after_payment {
                    SellerAction::RejectAfterPayment
                } else {
                    SellerAction::Deliver
                }
            }
            (Phase::Completed, _) => SellerAction::MarkCompleted,
            (Phase::Rejected, _) => SellerAction::MarkRejected,
            _ => SellerAction::Ignore,
        }
    }

    /// React to a phase change
    pub async fn on_new_task(&self, job: Job, memo: Option<Memo>) -> Result<SellerAction> {
        info!(job_id = %job.id, phase = %job.phase, wallet = %self.client.wallet_address(), "received job");
        let action = self.decide(&job, memo.as_ref());

        match &action {
            SellerAction::Respond(verdict) => {
                info!(job_id = %job.id, requirement = ?job.requirement, "responding to job");
                match verdict {
                    Verdict::Accept => {
                        self.client.accept(job.id, ACCEPT_REASON).await?;
                        let requirement =
                            format!("Job {} accepted, please make payment to proceed", job.id);
                        self.client.create_requirement(job.id, &requirement).await?;
                    }
                    Verdict::Reject { reason } => {
                        self.client.reject(job.id, reason).await?;
                    }
                }
                info!(job_id = %job.id, accepted = matches!(verdict, Verdict::Accept), "job responded");
            }
            SellerAction::RejectAfterPayment => {
                info!(job_id = %job.id, reason = REJECT_REASON, "rejecting job");
                self.client.reject(job.id, REJECT_REASON).await?;
                info!(job_id = %job.id, "job rejected");
            }
            SellerAction::Deliver => self.deliver(&job).await?,
            SellerAction::MarkCompleted => {
                info!(job_id = %job.id, "job completed");
                self.database
                    .update_job_status(&job.id.to_string(), "COMPLETED")
                    .await?;
            }
            SellerAction::MarkRejected => {
                info!(job_id = %job.id, "job rejected");
                self.database
                    .update_job_status(&job.id.to_string(), "REJECTED")
                    .await?;
            }
            SellerAction::Ignore => {}
        }

        Ok(action)
    }

    async fn deliver(&self, job: &Job) -> Result<()> {
        let deliverable = self.producer.produce(job).await?;
        info!(job_id = %job.id, deliverable = %deliverable, "delivering job");
        self.client.deliver(job.id, &deliverable).await?;

        let result = serde_json::to_string(&deliverable)?;
        let receipt = self
            .database
            .create_job(&job.id.to_string(), job.client_address.as_str(), &result)
            .await?;

        info!(job_id = %job.id, tx_rid = %receipt.tx_rid, "job delivered");
        Ok(())
    }
}

#[async_trait]
impl TaskHandler for SellerAgent {
    fn role(&self) -> AgentRole {
        AgentRole::Seller
    }

    async fn handle(&self, notification: Notification) -> Result<()> {
        self.on_new_task(notification.job, notification.memo).await?;
        Ok(())
    }
}
