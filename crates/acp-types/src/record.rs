//! Job records persisted to the ledger

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypesError;

/// Status of a persisted job record.
///
/// The ledger stores the numeric code; callers speak the upper-case name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Completed,
    Rejected,
}

impl JobStatus {
    /// Numeric code stored on chain
    pub fn code(&self) -> i64 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::Completed => 1,
            JobStatus::Rejected => 2,
        }
    }

    pub fn from_code(code: i64) -> Result<Self, TypesError> {
        match code {
            0 => Ok(JobStatus::Pending),
            1 => Ok(JobStatus::Completed),
            2 => Ok(JobStatus::Rejected),
            other => Err(TypesError::InvalidStatusCode { code: other }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact, case-sensitive match on the three status names.
impl FromStr for JobStatus {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(JobStatus::Pending),
            "COMPLETED" => Ok(JobStatus::Completed),
            "REJECTED" => Ok(JobStatus::Rejected),
            other => Err(TypesError::InvalidStatus {
                status: other.to_string(),
            }),
        }
    }
}

/// A job outcome as recorded on the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Commerce job id, stringified
    pub id: String,
    /// Counterparty (buyer) wallet address
    pub evm_address: String,
    /// Serialized deliverable
    pub result: String,
    pub status: JobStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!("PENDING".parse::<JobStatus>().unwrap().code(), 0);
        assert_eq!("COMPLETED".parse::<JobStatus>().unwrap().code(), 1);
        assert_eq!("REJECTED".parse::<JobStatus>().unwrap().code(), 2);
    }

    #[test]
    fn test_status_rejects_unknown_names() {
        let err = "archived".parse::<JobStatus>().unwrap_err();
        assert_eq!(
            err,
            TypesError::InvalidStatus {
                status: "archived".to_string()
            }
        );
        assert!("completed".parse::<JobStatus>().is_err());
        assert!(JobStatus::from_code(3).is_err());
    }
}
