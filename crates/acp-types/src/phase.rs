//! Job phases as tracked by the commerce protocol

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypesError;

/// A stage in a job's lifecycle.
///
/// Codes follow the protocol: `Request = 0` through `Completed = 4`, with
/// `Rejected = 5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Request,
    Negotiation,
    Transaction,
    Evaluation,
    Completed,
    Rejected,
}

impl Phase {
    pub const ALL: [Phase; 6] = [
        Phase::Request,
        Phase::Negotiation,
        Phase::Transaction,
        Phase::Evaluation,
        Phase::Completed,
        Phase::Rejected,
    ];

    /// Protocol code of the phase
    pub fn code(&self) -> u8 {
        match self {
            Phase::Request => 0,
            Phase::Negotiation => 1,
            Phase::Transaction => 2,
            Phase::Evaluation => 3,
            Phase::Completed => 4,
            Phase::Rejected => 5,
        }
    }

    /// No further transitions happen from a terminal phase
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Completed | Phase::Rejected)
    }

    /// Upper-case protocol name
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Request => "REQUEST",
            Phase::Negotiation => "NEGOTIATION",
            Phase::Transaction => "TRANSACTION",
            Phase::Evaluation => "EVALUATION",
            Phase::Completed => "COMPLETED",
            Phase::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Phase::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| TypesError::InvalidPhase {
                phase: s.to_string(),
            })
    }
}
