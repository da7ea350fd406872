//! Agent discovery types
//!
//! Sellers publish job offerings; buyers browse agents by keyword and pick an
//! offering to initiate a job against.

use serde::{Deserialize, Serialize};

use crate::address::EvmAddress;

/// Sort keys accepted by agent browsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentSort {
    SuccessfulJobCount,
    SuccessRate,
    UniqueBuyerCount,
    MinutesFromLastOnline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraduationStatus {
    All,
    Graduated,
    NotGraduated,
}

impl GraduationStatus {
    pub fn admits(&self, graduated: bool) -> bool {
        match self {
            GraduationStatus::All => true,
            GraduationStatus::Graduated => graduated,
            GraduationStatus::NotGraduated => !graduated,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnlineStatus {
    All,
    Online,
    Offline,
}

impl OnlineStatus {
    pub fn admits(&self, online: bool) -> bool {
        match self {
            OnlineStatus::All => true,
            OnlineStatus::Online => online,
            OnlineStatus::Offline => !online,
        }
    }
}

/// A service an agent sells
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOffering {
    pub name: String,
    pub price: f64,
    pub provider_address: EvmAddress,
}

/// Public profile of an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub name: String,
    pub description: String,
    pub wallet_address: EvmAddress,
    pub successful_job_count: u64,
    pub success_rate: f64,
    pub unique_buyer_count: u64,
    pub minutes_from_last_online: u64,
    pub graduated: bool,
    pub online: bool,
    pub job_offerings: Vec<JobOffering>,
}

impl AgentProfile {
    /// Case-insensitive keyword match on name and description
    pub fn matches_keyword(&self, keyword: &str) -> bool {
        let keyword = keyword.to_lowercase();
        self.name.to_lowercase().contains(&keyword)
            || self.description.to_lowercase().contains(&keyword)
    }
}

/// Parameters of an agent browse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowseQuery {
    pub keyword: String,
    pub sort_by: Vec<AgentSort>,
    pub top_k: usize,
    pub graduation_status: GraduationStatus,
    pub online_status: OnlineStatus,
}

impl BrowseQuery {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            sort_by: vec![AgentSort::SuccessfulJobCount],
            top_k: 5,
            graduation_status: GraduationStatus::All,
            online_status: OnlineStatus::All,
        }
    }
}
