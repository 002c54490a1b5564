use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;
use voteboard_cache::keys::ParticipantQuery;

use crate::utils::pagination::{PaginationMeta, PaginationParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContestStatus {
    Draft,
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contest {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: ContestStatus,
    pub participant_count: u64,
    pub vote_count: u64,
    pub updated_at: DateTime<Utc>,
}

/// Contest listing filters. The whole struct is hashed into the list cache key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestFilterParams {
    pub status: Option<ContestStatus>,
    pub search: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

impl ContestFilterParams {
    /// Resolve defaults so equivalent requests share one cache key.
    pub fn normalized(self) -> Self {
        let pagination = PaginationParams::new(self.pagination.page(), self.pagination.limit());
        Self {
            status: self.status,
            search: self
                .search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            pagination,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedContestsResponse {
    pub data: Vec<Contest>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub profile_id: String,
    pub contest_id: String,
    pub display_name: String,
    pub votes: u64,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedParticipantsResponse {
    pub data: Vec<Participant>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ParticipantFilterParams {
    #[validate(length(max = 100))]
    pub search: Option<String>,
    #[validate(length(max = 20))]
    pub status: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

impl ParticipantFilterParams {
    /// Normalised form used for the cache key and the repository query.
    pub fn to_query(&self) -> ParticipantQuery {
        ParticipantQuery {
            page: Some(self.pagination.page()),
            limit: Some(self.pagination.limit()),
            search: self.search.clone().filter(|s| !s.trim().is_empty()),
            status: self.status.clone().filter(|s| !s.trim().is_empty()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateContestDto {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub status: Option<ContestStatus>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct JoinContestDto {
    #[validate(length(min = 1, max = 64))]
    pub profile_id: String,
}
