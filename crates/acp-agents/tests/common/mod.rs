#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use acp_agents::{CommerceClient, CommerceError, CommerceResult};
use acp_ledger::{
    ChainClient, Database, LedgerSigner, MemoryChain, SignedTransaction, TransactionReceipt,
};
use acp_types::{
    AgentProfile, BrowseQuery, EvmAddress, Job, JobId, JobOffering, Memo, MemoId, Phase,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

pub const BUYER: &str = "0x1234567890abcdef1234567890abcdef12345678";
pub const SELLER: &str = "0xabcdefabcdefabcdefabcdefabcdefabcdefabcd";
pub const CHR_KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

/// Every side effect an agent caused, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    PayAndAccept(JobId),
    Accept(JobId, String),
    Reject(JobId, String),
    CreateRequirement(JobId, String),
    Deliver(JobId, Value),
    SignMemo(MemoId, bool, String),
    Browse(String),
    Initiate {
        offering: String,
        requirement: Value,
        expires_at: DateTime<Utc>,
    },
    Ledger(String, Vec<Value>),
}

pub type CallLog = Arc<Mutex<Vec<Call>>>;

pub fn calls(log: &CallLog) -> Vec<Call> {
    log.lock().unwrap().clone()
}

pub struct RecordingClient {
    address: EvmAddress,
    log: CallLog,
    agents: Vec<AgentProfile>,
    fail_with: Option<CommerceError>,
}

impl RecordingClient {
    pub fn new(address: &str, log: CallLog) -> Self {
        Self {
            address: EvmAddress::parse(address).unwrap(),
            log,
            agents: Vec::new(),
            fail_with: None,
        }
    }

    pub fn with_agents(mut self, agents: Vec<AgentProfile>) -> Self {
        self.agents = agents;
        self
    }

    pub fn failing(mut self, error: CommerceError) -> Self {
        self.fail_with = Some(error);
        self
    }

    fn record(&self, call: Call) -> CommerceResult<()> {
        self.log.lock().unwrap().push(call);
        match &self.fail_with {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CommerceClient for RecordingClient {
    fn wallet_address(&self) -> &EvmAddress {
        &self.address
    }

    async fn pay_and_accept_requirement(&self, job_id: JobId) -> CommerceResult<()> {
        self.record(Call::PayAndAccept(job_id))
    }

    async fn accept(&self, job_id: JobId, reason: &str) -> CommerceResult<()> {
        self.record(Call::Accept(job_id, reason.to_string()))
    }

    async fn reject(&self, job_id: JobId, reason: &str) -> CommerceResult<()> {
        self.record(Call::Reject(job_id, reason.to_string()))
    }

    async fn create_requirement(&self, job_id: JobId, content: &str) -> CommerceResult<()> {
        self.record(Call::CreateRequirement(job_id, content.to_string()))
    }

    async fn deliver(&self, job_id: JobId, deliverable: &Value) -> CommerceResult<()> {
        self.record(Call::Deliver(job_id, deliverable.clone()))
    }

    async fn sign_memo(&self, memo_id: MemoId, accept: bool, reason: &str) -> CommerceResult<()> {
        self.record(Call::SignMemo(memo_id, accept, reason.to_string()))
    }

    async fn browse_agents(&self, query: &BrowseQuery) -> CommerceResult<Vec<AgentProfile>> {
        self.record(Call::Browse(query.keyword.clone()))?;
        Ok(self.agents.clone())
    }

    async fn initiate_job(
        &self,
        offering: &JobOffering,
        requirement: Value,
        _evaluator: Option<EvmAddress>,
        expires_at: DateTime<Utc>,
    ) -> CommerceResult<JobId> {
        self.record(Call::Initiate {
            offering: offering.name.clone(),
            requirement,
            expires_at,
        })?;
        Ok(JobId(1))
    }
}

/// Chain client that logs each operation into the shared call log before
/// executing it on a [`MemoryChain`]
pub struct RecordingChain {
    pub inner: MemoryChain,
    log: CallLog,
}

impl RecordingChain {
    pub fn new(inner: MemoryChain, log: CallLog) -> Self {
        Self { inner, log }
    }
}

#[async_trait]
impl ChainClient for RecordingChain {
    async fn query(&self, name: &str, args: Value) -> acp_ledger::Result<Value> {
        self.inner.query(name, args).await
    }

    async fn send_transaction(
        &self,
        tx: SignedTransaction,
        poll_status: bool,
    ) -> acp_ledger::Result<TransactionReceipt> {
        {
            let mut log = self.log.lock().unwrap();
            for op in &tx.transaction.operations {
                log.push(Call::Ledger(op.op_name.clone(), op.args.clone()));
            }
        }
        self.inner.send_transaction(tx, poll_status).await
    }
}

/// Database over a recording chain sharing `log`
pub fn recording_database(log: &CallLog) -> (Database, MemoryChain) {
    let chain = MemoryChain::new();
    let recording = RecordingChain::new(chain.clone(), log.clone());
    let signer = LedgerSigner::from_hex(CHR_KEY).unwrap();
    (Database::new(Arc::new(recording), signer), chain)
}

pub fn job(id: u64, phase: Phase) -> Job {
    Job {
        id: JobId(id),
        phase,
        requirement: Some(json!({ "details": "testing transaction" })),
        deliverable: None,
        client_address: EvmAddress::parse(BUYER).unwrap(),
        provider_address: EvmAddress::parse(SELLER).unwrap(),
        evaluator_address: None,
        price: 0.01,
        expires_at: Utc::now() + chrono::Duration::days(1),
    }
}

pub fn memo(id: u64, job_id: u64, next_phase: Phase, content: &str, sender: &str) -> Memo {
    Memo {
        id: MemoId(id),
        job_id: JobId(job_id),
        next_phase,
        content: content.to_string(),
        sender: EvmAddress::parse(sender).unwrap(),
    }
}

pub fn seller_profile(name: &str, offerings: &[&str]) -> AgentProfile {
    let wallet_address = EvmAddress::parse(SELLER).unwrap();
    AgentProfile {
        name: name.to_string(),
        description: "Chromia's EVAL seller".to_string(),
        wallet_address: wallet_address.clone(),
        successful_job_count: 3,
        success_rate: 1.0,
        unique_buyer_count: 1,
        minutes_from_last_online: 0,
        graduated: true,
        online: true,
        job_offerings: offerings
            .iter()
            .map(|name| JobOffering {
                name: name.to_string(),
                price: 0.01,
                provider_address: wallet_address.clone(),
            })
            .collect(),
    }
}
