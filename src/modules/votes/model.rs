use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CastVoteDto {
    #[validate(length(min = 1, max = 64))]
    pub contest_id: String,
    #[validate(length(min = 1, max = 64))]
    pub profile_id: String,
    #[validate(length(min = 1, max = 64))]
    pub voter_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub id: Uuid,
    pub contest_id: String,
    pub profile_id: String,
    pub voter_id: String,
    pub cast_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteTally {
    pub contest_id: String,
    pub total_votes: u64,
    pub unique_voters: u64,
}
