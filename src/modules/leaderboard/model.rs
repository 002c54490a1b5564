use serde::{Deserialize, Serialize};

use crate::utils::pagination::PaginationMeta;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub profile_id: String,
    pub display_name: String,
    pub votes: u64,
}

/// One page of a ranking, either platform-wide or for a single contest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardPage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contest_id: Option<String>,
    pub data: Vec<LeaderboardEntry>,
    pub meta: PaginationMeta,
}
