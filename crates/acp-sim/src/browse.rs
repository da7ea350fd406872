//! Agent search over registered profiles

use std::cmp::Ordering;

use acp_types::{AgentProfile, AgentSort, BrowseQuery, EvmAddress};

/// Filter, rank and truncate `agents` for `query`.
///
/// The caller's own wallet never shows up in its results. Counts and rates
/// sort descending, minutes since last online ascending; ties keep
/// registration order.
pub fn browse(agents: &[AgentProfile], query: &BrowseQuery, caller: &EvmAddress) -> Vec<AgentProfile> {
    let mut matches: Vec<AgentProfile> = agents
        .iter()
        .filter(|a| &a.wallet_address != caller)
        .filter(|a| a.matches_keyword(&query.keyword))
        .filter(|a| query.graduation_status.admits(a.graduated))
        .filter(|a| query.online_status.admits(a.online))
        .cloned()
        .collect();

    matches.sort_by(|a, b| {
        query
            .sort_by
            .iter()
            .map(|key| compare(*key, a, b))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
    matches.truncate(query.top_k);
    matches
}

fn compare(key: AgentSort, a: &AgentProfile, b: &AgentProfile) -> Ordering {
    match key {
        AgentSort::SuccessfulJobCount => b.successful_job_count.cmp(&a.successful_job_count),
        AgentSort::SuccessRate => b
            .success_rate
            .partial_cmp(&a.success_rate)
            .unwrap_or(Ordering::Equal),
        AgentSort::UniqueBuyerCount => b.unique_buyer_count.cmp(&a.unique_buyer_count),
        AgentSort::MinutesFromLastOnline => a.minutes_from_last_online.cmp(&b.minutes_from_last_online),
    }
}
