//! ACP Agents - buyer and seller job-lifecycle dispatchers
//!
//! Two reference agents that transact through a [`CommerceClient`]:
//!
//! - **BuyerAgent**: browses sellers, initiates a job, pays when asked,
//!   countersigns rejections
//! - **SellerAgent**: accepts or rejects requests, delivers once paid and
//!   records the outcome through the ledger [`Database`](acp_ledger::Database)
//!
//! Each agent splits into a pure `decide(job, memo)` step and an async
//! `on_new_task` step that performs the chosen action. The [`AgentRuntime`]
//! feeds notifications from the commerce backend into either agent.
//!
//! # Key Principle
//!
//! **Agents request transitions, they never own them.** Phase changes are
//! enforced by the commerce backend; an agent only reacts to the
//! notifications it receives.

pub mod buyer;
pub mod commerce;
pub mod env;
pub mod error;
pub mod policy;
pub mod runtime;
pub mod seller;

pub use buyer::{BuyerAction, BuyerAgent, BuyerConfig};
pub use commerce::{CommerceClient, CommerceResult};
pub use env::{AgentRole, EnvError, WalletCredentials, WalletKey};
pub use error::{AgentError, CommerceError, Result};
pub use policy::{AcceptAll, DeliverableProducer, RequirementEvaluator, StaticDeliverable, Verdict};
pub use runtime::{AgentRuntime, RunSummary, RuntimeConfig, TaskHandler};
pub use seller::{SellerAction, SellerAgent, SellerConfig};
