//! ACP Sim - in-process commerce backend
//!
//! [`LocalMarketplace`] stands in for the hosted ACP service so buyer and
//! seller agents can run against each other in one process:
//!
//! - jobs move through REQUEST, NEGOTIATION, TRANSACTION, EVALUATION and end
//!   COMPLETED or REJECTED
//! - a party may only perform the actions of its side of the job
//! - each phase change is pushed to both parties over their inbox channels
//!
//! Nothing here settles payments; "paying" only advances the phase.

pub mod browse;
pub mod marketplace;

pub use browse::browse;
pub use marketplace::{LocalClient, LocalMarketplace, INBOX_CAPACITY};
