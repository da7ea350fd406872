//! Commerce client boundary
//!
//! The commerce backend owns jobs, memos and phase transitions. Agents hold a
//! client bound to their own wallet and request transitions through it; the
//! backend reports every phase change back as a
//! [`Notification`](acp_types::Notification) on the agent's inbox channel.

use acp_types::{AgentProfile, BrowseQuery, EvmAddress, JobId, JobOffering, MemoId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CommerceError;

pub type CommerceResult<T> = std::result::Result<T, CommerceError>;

#[async_trait]
pub trait CommerceClient: Send + Sync {
    /// Wallet this client acts for
    fn wallet_address(&self) -> &EvmAddress;

    /// Pay for the job and accept the provider's requirement memo
    async fn pay_and_accept_requirement(&self, job_id: JobId) -> CommerceResult<()>;

    /// Accept a job request (provider side)
    async fn accept(&self, job_id: JobId, reason: &str) -> CommerceResult<()>;

    async fn reject(&self, job_id: JobId, reason: &str) -> CommerceResult<()>;

    /// Send the payment requirement to the client
    async fn create_requirement(&self, job_id: JobId, content: &str) -> CommerceResult<()>;

    async fn deliver(&self, job_id: JobId, deliverable: &serde_json::Value) -> CommerceResult<()>;

    async fn sign_memo(&self, memo_id: MemoId, accept: bool, reason: &str) -> CommerceResult<()>;

    async fn browse_agents(&self, query: &BrowseQuery) -> CommerceResult<Vec<AgentProfile>>;

    async fn initiate_job(
        &self,
        offering: &JobOffering,
        requirement: serde_json::Value,
        evaluator: Option<EvmAddress>,
        expires_at: DateTime<Utc>,
    ) -> CommerceResult<JobId>;
}
