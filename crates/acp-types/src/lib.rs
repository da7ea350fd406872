//! ACP Types - Canonical domain types for Agent Commerce Protocol agents
//!
//! This crate has zero dependencies on other acp crates. It defines:
//!
//! - Job phases and their protocol ordering
//! - Jobs, memos and the notification delivered on every phase change
//! - Job records persisted to the ledger (with their status enumeration)
//! - Agent discovery types (profiles, offerings, browse queries)
//!
//! # Job Lifecycle
//!
//! ```text
//! REQUEST → NEGOTIATION → TRANSACTION → EVALUATION → COMPLETED
//!     └──────────┴──────────────┴──→ REJECTED
//! ```
//!
//! The lifecycle is owned by the commerce backend. Agents only read these
//! types and ask the backend to move a job forward.

pub mod address;
pub mod discovery;
pub mod error;
pub mod job;
pub mod phase;
pub mod record;

pub use address::*;
pub use discovery::*;
pub use error::*;
pub use job::*;
pub use phase::*;
pub use record::*;
