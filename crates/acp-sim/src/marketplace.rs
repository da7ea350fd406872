//! Local marketplace - jobs, memos and phase transitions in process
//!
//! Each connected wallet gets a [`LocalClient`] and an inbox receiver. Every
//! phase change is pushed to both parties of the job; the memo a party is
//! expected to sign is attached only to that party's copy.
//!
//! Evaluation is automatic: a delivered job moves straight on to COMPLETED.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use acp_agents::{CommerceClient, CommerceError, CommerceResult, WalletCredentials};
use acp_types::{
    AgentProfile, BrowseQuery, EvmAddress, Job, JobId, JobOffering, Memo, MemoId, Notification,
    Phase,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::browse::browse;

/// Inbox buffer per connected wallet
pub const INBOX_CAPACITY: usize = 256;

type Delivery = (EvmAddress, Notification);

#[derive(Debug, Clone)]
struct StoredMemo {
    memo: Memo,
    recipient: EvmAddress,
    signed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Party {
    Client,
    Provider,
}

#[derive(Debug)]
struct JobEntry {
    job: Job,
    memos: Vec<StoredMemo>,
}

impl JobEntry {
    fn require_party(&self, actor: &EvmAddress, party: Party, action: &str) -> CommerceResult<()> {
        let expected = match party {
            Party::Client => &self.job.client_address,
            Party::Provider => &self.job.provider_address,
        };
        if expected == actor {
            Ok(())
        } else {
            Err(CommerceError::NotParticipant {
                job_id: self.job.id,
                address: actor.to_string(),
                action: action.to_string(),
            })
        }
    }

    fn require_phase(&self, allowed: &[Phase], action: &str) -> CommerceResult<()> {
        if allowed.contains(&self.job.phase) {
            Ok(())
        } else {
            Err(self.invalid(action))
        }
    }

    fn invalid(&self, action: &str) -> CommerceError {
        CommerceError::InvalidTransition {
            job_id: self.job.id,
            phase: self.job.phase,
            action: action.to_string(),
        }
    }

    /// Mark the open memo proposing `next_phase` as signed
    fn sign_pending(&mut self, next_phase: Phase, action: &str) -> CommerceResult<()> {
        let invalid = self.invalid(action);
        let memo = self
            .memos
            .iter_mut()
            .find(|m| !m.signed && m.memo.proposes(next_phase))
            .ok_or(invalid)?;
        memo.signed = true;
        Ok(())
    }

    fn close_pending(&mut self) {
        for memo in self.memos.iter_mut() {
            memo.signed = true;
        }
    }

    fn add_memo(
        &mut self,
        id: MemoId,
        next_phase: Phase,
        content: String,
        sender: EvmAddress,
        recipient: EvmAddress,
    ) -> Memo {
        let memo = Memo {
            id,
            job_id: self.job.id,
            next_phase,
            content,
            sender,
        };
        self.memos.push(StoredMemo {
            memo: memo.clone(),
            recipient,
            signed: false,
        });
        memo
    }

    fn advance(&mut self, phase: Phase) {
        debug!(job_id = %self.job.id, from = %self.job.phase, to = %phase, "phase change");
        self.job.phase = phase;
    }

    /// One notification per party; `memo` goes to its recipient only
    fn notify_both(&self, memo: Option<&Memo>, recipient: Option<&EvmAddress>) -> Vec<Delivery> {
        [&self.job.client_address, &self.job.provider_address]
            .into_iter()
            .map(|party| {
                let attached = match recipient {
                    Some(r) if r == party => memo.cloned(),
                    _ => None,
                };
                (party.clone(), Notification::new(self.job.clone(), attached))
            })
            .collect()
    }
}

/// Whether a signed memo may move a job from `from` to `to`
fn can_advance(from: Phase, to: Phase) -> bool {
    matches!(
        (from, to),
        (Phase::Request, Phase::Negotiation)
            | (Phase::Negotiation, Phase::Transaction)
            | (Phase::Transaction, Phase::Evaluation)
            | (Phase::Evaluation, Phase::Completed)
            | (Phase::Request | Phase::Negotiation | Phase::Transaction, Phase::Rejected)
    )
}

#[derive(Default)]
struct Inner {
    jobs: DashMap<JobId, JobEntry>,
    memo_jobs: DashMap<MemoId, JobId>,
    agents: DashMap<EvmAddress, (u64, AgentProfile)>,
    inboxes: DashMap<EvmAddress, mpsc::Sender<Notification>>,
    next_job_id: AtomicU64,
    next_memo_id: AtomicU64,
    next_agent_seq: AtomicU64,
}

/// In-process commerce backend shared by every connected agent
#[derive(Clone, Default)]
pub struct LocalMarketplace {
    inner: Arc<Inner>,
}

impl LocalMarketplace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish (or replace) an agent profile for browsing
    pub fn register_agent(&self, profile: AgentProfile) {
        let seq = self.inner.next_agent_seq.fetch_add(1, Ordering::Relaxed);
        info!(agent = %profile.name, wallet = %profile.wallet_address, "agent registered");
        self.inner
            .agents
            .insert(profile.wallet_address.clone(), (seq, profile));
    }

    /// Client for `address` plus the inbox its notifications arrive on.
    ///
    /// Connecting the same wallet again replaces the previous inbox.
    pub fn connect(&self, address: EvmAddress) -> (LocalClient, mpsc::Receiver<Notification>) {
        let (sender, receiver) = mpsc::channel(INBOX_CAPACITY);
        self.inner.inboxes.insert(address.clone(), sender);
        debug!(wallet = %address, "wallet connected");
        let client = LocalClient {
            market: self.clone(),
            address,
        };
        (client, receiver)
    }

    pub fn connect_with(
        &self,
        credentials: &WalletCredentials,
    ) -> (LocalClient, mpsc::Receiver<Notification>) {
        self.connect(credentials.agent_wallet_address.clone())
    }

    /// Current snapshot of a job
    pub fn job(&self, job_id: JobId) -> Option<Job> {
        self.inner.jobs.get(&job_id).map(|entry| entry.job.clone())
    }

    pub fn job_count(&self) -> usize {
        self.inner.jobs.len()
    }

    fn next_memo_id(&self) -> MemoId {
        MemoId(self.inner.next_memo_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn agents(&self) -> Vec<AgentProfile> {
        let mut agents: Vec<(u64, AgentProfile)> = self
            .inner
            .agents
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        agents.sort_by_key(|(seq, _)| *seq);
        agents.into_iter().map(|(_, profile)| profile).collect()
    }

    /// Run `f` against a job while holding its map entry. Nothing is sent
    /// until the entry is released.
    async fn transition<F>(&self, job_id: JobId, f: F) -> CommerceResult<()>
    where
        F: FnOnce(&mut JobEntry) -> CommerceResult<Vec<Delivery>>,
    {
        let deliveries = {
            let mut entry = self
                .inner
                .jobs
                .get_mut(&job_id)
                .ok_or(CommerceError::JobNotFound { job_id })?;
            f(&mut *entry)?
        };
        self.dispatch(deliveries).await;
        Ok(())
    }

    async fn dispatch(&self, deliveries: Vec<Delivery>) {
        for (address, notification) in deliveries {
            let sender = self.inner.inboxes.get(&address).map(|s| s.clone());
            let Some(sender) = sender else {
                debug!(wallet = %address, "no inbox connected, dropping notification");
                continue;
            };
            let job_id = notification.job.id;
            if sender.send(notification).await.is_err() {
                warn!(wallet = %address, job_id = %job_id, "inbox closed, dropping notification");
                self.inner.inboxes.remove(&address);
            }
        }
    }

    async fn initiate_job(
        &self,
        actor: &EvmAddress,
        offering: &JobOffering,
        requirement: serde_json::Value,
        evaluator: Option<EvmAddress>,
        expires_at: DateTime<Utc>,
    ) -> CommerceResult<JobId> {
        let listed = self
            .inner
            .agents
            .get(&offering.provider_address)
            .map(|entry| entry.1.job_offerings.iter().any(|o| o.name == offering.name))
            .unwrap_or(false);
        if !listed {
            return Err(CommerceError::OfferingNotFound {
                name: offering.name.clone(),
            });
        }

        let job_id = JobId(self.inner.next_job_id.fetch_add(1, Ordering::Relaxed) + 1);
        let mut entry = JobEntry {
            job: Job {
                id: job_id,
                phase: Phase::Request,
                requirement: Some(requirement.clone()),
                deliverable: None,
                client_address: actor.clone(),
                provider_address: offering.provider_address.clone(),
                evaluator_address: evaluator,
                price: offering.price,
                expires_at,
            },
            memos: Vec::new(),
        };
        let memo = entry.add_memo(
            self.next_memo_id(),
            Phase::Negotiation,
            requirement.to_string(),
            actor.clone(),
            offering.provider_address.clone(),
        );
        let deliveries = entry.notify_both(Some(&memo), Some(&offering.provider_address));

        self.inner.memo_jobs.insert(memo.id, job_id);
        self.inner.jobs.insert(job_id, entry);
        info!(job_id = %job_id, offering = %offering.name, provider = %offering.provider_address, "job initiated");

        self.dispatch(deliveries).await;
        Ok(job_id)
    }

    async fn accept(&self, actor: &EvmAddress, job_id: JobId, reason: &str) -> CommerceResult<()> {
        self.transition(job_id, |entry| {
            entry.require_party(actor, Party::Provider, "accept")?;
            entry.require_phase(&[Phase::Request], "accept")?;
            entry.sign_pending(Phase::Negotiation, "accept")?;
            entry.advance(Phase::Negotiation);
            info!(job_id = %job_id, reason, "job accepted");
            Ok(entry.notify_both(None, None))
        })
        .await
    }

    async fn reject(&self, actor: &EvmAddress, job_id: JobId, reason: &str) -> CommerceResult<()> {
        let memo_id = self.next_memo_id();
        self.transition(job_id, |entry| {
            entry.require_party(actor, Party::Provider, "reject")?;
            match entry.job.phase {
                Phase::Request | Phase::Negotiation => {
                    entry.close_pending();
                    entry.advance(Phase::Rejected);
                    info!(job_id = %job_id, reason, "job rejected");
                    Ok(entry.notify_both(None, None))
                }
                Phase::Transaction => {
                    let client = entry.job.client_address.clone();
                    let memo = entry.add_memo(
                        memo_id,
                        Phase::Rejected,
                        reason.to_string(),
                        actor.clone(),
                        client.clone(),
                    );
                    self.inner.memo_jobs.insert(memo_id, job_id);
                    info!(job_id = %job_id, memo_id = %memo_id, reason, "rejection proposed to client");
                    Ok(entry.notify_both(Some(&memo), Some(&client)))
                }
                _ => Err(entry.invalid("reject")),
            }
        })
        .await
    }

    async fn create_requirement(
        &self,
        actor: &EvmAddress,
        job_id: JobId,
        content: &str,
    ) -> CommerceResult<()> {
        let memo_id = self.next_memo_id();
        self.transition(job_id, |entry| {
            entry.require_party(actor, Party::Provider, "create requirement for")?;
            entry.require_phase(&[Phase::Negotiation], "create requirement for")?;
            let client = entry.job.client_address.clone();
            let memo = entry.add_memo(
                memo_id,
                Phase::Transaction,
                content.to_string(),
                actor.clone(),
                client.clone(),
            );
            self.inner.memo_jobs.insert(memo_id, job_id);
            Ok(entry.notify_both(Some(&memo), Some(&client)))
        })
        .await
    }

    async fn pay_and_accept_requirement(&self, actor: &EvmAddress, job_id: JobId) -> CommerceResult<()> {
        let memo_id = self.next_memo_id();
        self.transition(job_id, |entry| {
            entry.require_party(actor, Party::Client, "pay for")?;
            entry.require_phase(&[Phase::Negotiation], "pay for")?;
            entry.sign_pending(Phase::Transaction, "pay for")?;
            entry.advance(Phase::Transaction);

            let provider = entry.job.provider_address.clone();
            let content = format!("Payment of {} received", entry.job.price);
            let memo = entry.add_memo(
                memo_id,
                Phase::Evaluation,
                content,
                actor.clone(),
                provider.clone(),
            );
            self.inner.memo_jobs.insert(memo_id, job_id);
            info!(job_id = %job_id, price = entry.job.price, "job paid");
            Ok(entry.notify_both(Some(&memo), Some(&provider)))
        })
        .await
    }

    async fn deliver(
        &self,
        actor: &EvmAddress,
        job_id: JobId,
        deliverable: &serde_json::Value,
    ) -> CommerceResult<()> {
        self.transition(job_id, |entry| {
            entry.require_party(actor, Party::Provider, "deliver")?;
            entry.require_phase(&[Phase::Transaction], "deliver")?;
            entry.sign_pending(Phase::Evaluation, "deliver")?;
            entry.job.deliverable = Some(deliverable.clone());
            entry.advance(Phase::Evaluation);
            let mut deliveries = entry.notify_both(None, None);

            entry.advance(Phase::Completed);
            info!(job_id = %job_id, "deliverable approved, job completed");
            deliveries.extend(entry.notify_both(None, None));
            Ok(deliveries)
        })
        .await
    }

    async fn sign_memo(
        &self,
        actor: &EvmAddress,
        memo_id: MemoId,
        accept: bool,
        reason: &str,
    ) -> CommerceResult<()> {
        let job_id = self
            .inner
            .memo_jobs
            .get(&memo_id)
            .map(|entry| *entry)
            .ok_or(CommerceError::MemoNotFound { memo_id })?;

        self.transition(job_id, |entry| {
            let phase = entry.job.phase;
            let stored = entry
                .memos
                .iter_mut()
                .find(|m| m.memo.id == memo_id)
                .ok_or(CommerceError::MemoNotFound { memo_id })?;
            if stored.signed {
                return Err(CommerceError::MemoAlreadySigned { memo_id });
            }
            if &stored.recipient != actor {
                return Err(CommerceError::NotParticipant {
                    job_id,
                    address: actor.to_string(),
                    action: "sign memo for".to_string(),
                });
            }
            let next_phase = stored.memo.next_phase;
            if accept && !can_advance(phase, next_phase) {
                return Err(CommerceError::InvalidTransition {
                    job_id,
                    phase,
                    action: format!("move to {}", next_phase),
                });
            }
            stored.signed = true;

            info!(job_id = %job_id, memo_id = %memo_id, accept, reason, "memo signed");
            if accept {
                entry.advance(next_phase);
                Ok(entry.notify_both(None, None))
            } else {
                Ok(Vec::new())
            }
        })
        .await
    }
}

/// Commerce client bound to one wallet of a [`LocalMarketplace`]
#[derive(Clone)]
pub struct LocalClient {
    market: LocalMarketplace,
    address: EvmAddress,
}

#[async_trait]
impl CommerceClient for LocalClient {
    fn wallet_address(&self) -> &EvmAddress {
        &self.address
    }

    async fn pay_and_accept_requirement(&self, job_id: JobId) -> CommerceResult<()> {
        self.market.pay_and_accept_requirement(&self.address, job_id).await
    }

    async fn accept(&self, job_id: JobId, reason: &str) -> CommerceResult<()> {
        self.market.accept(&self.address, job_id, reason).await
    }

    async fn reject(&self, job_id: JobId, reason: &str) -> CommerceResult<()> {
        self.market.reject(&self.address, job_id, reason).await
    }

    async fn create_requirement(&self, job_id: JobId, content: &str) -> CommerceResult<()> {
        self.market.create_requirement(&self.address, job_id, content).await
    }

    async fn deliver(&self, job_id: JobId, deliverable: &serde_json::Value) -> CommerceResult<()> {
        self.market.deliver(&self.address, job_id, deliverable).await
    }

    async fn sign_memo(&self, memo_id: MemoId, accept: bool, reason: &str) -> CommerceResult<()> {
        self.market.sign_memo(&self.address, memo_id, accept, reason).await
    }

    async fn browse_agents(&self, query: &BrowseQuery) -> CommerceResult<Vec<AgentProfile>> {
        Ok(browse(&self.market.agents(), query, &self.address))
    }

    async fn initiate_job(
        &self,
        offering: &JobOffering,
        requirement: serde_json::Value,
        evaluator: Option<EvmAddress>,
        expires_at: DateTime<Utc>,
    ) -> CommerceResult<JobId> {
        self.market
            .initiate_job(&self.address, offering, requirement, evaluator, expires_at)
            .await
    }
}
