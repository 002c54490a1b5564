//! Persistence boundary.
//!
//! Services only ever reach stored data through [`VotingRepository`]; the
//! storage engine behind it is opaque to the cache layer. Write methods
//! return once the change is committed, which is what makes it safe for the
//! caller to invalidate afterwards.

use async_trait::async_trait;
use voteboard_cache::keys::ParticipantQuery;

use crate::modules::analytics::{AnalyticsRollup, Period};
use crate::modules::contests::{
    Contest, ContestFilterParams, PaginatedContestsResponse, PaginatedParticipantsResponse,
    Participant, UpdateContestDto,
};
use crate::modules::leaderboard::LeaderboardPage;
use crate::modules::profiles::{Profile, ProfileRank, ProfileStats, UpdateProfileDto};
use crate::modules::votes::{CastVoteDto, Vote, VoteTally};

#[async_trait]
pub trait VotingRepository: Send + Sync {
    async fn leaderboard(&self, page: u32, limit: u32) -> anyhow::Result<LeaderboardPage>;

    async fn contest_leaderboard(
        &self,
        contest_id: &str,
        page: u32,
        limit: u32,
    ) -> anyhow::Result<LeaderboardPage>;

    async fn contest(&self, contest_id: &str) -> anyhow::Result<Option<Contest>>;

    async fn contests(
        &self,
        filters: &ContestFilterParams,
    ) -> anyhow::Result<PaginatedContestsResponse>;

    async fn participants(
        &self,
        contest_id: &str,
        query: &ParticipantQuery,
    ) -> anyhow::Result<PaginatedParticipantsResponse>;

    /// Enter a profile into a contest. `None` when the contest does not exist.
    async fn add_participant(
        &self,
        contest_id: &str,
        profile_id: &str,
    ) -> anyhow::Result<Option<Participant>>;

    async fn update_contest(
        &self,
        contest_id: &str,
        dto: &UpdateContestDto,
    ) -> anyhow::Result<Option<Contest>>;

    async fn profile(&self, profile_id: &str) -> anyhow::Result<Option<Profile>>;

    async fn profile_rank(&self, profile_id: &str) -> anyhow::Result<Option<ProfileRank>>;

    async fn profile_stats(&self, profile_id: &str) -> anyhow::Result<Option<ProfileStats>>;

    async fn update_profile(
        &self,
        profile_id: &str,
        dto: &UpdateProfileDto,
    ) -> anyhow::Result<Option<Profile>>;

    async fn analytics(&self, scope: &str, period: Period) -> anyhow::Result<AnalyticsRollup>;

    async fn record_vote(&self, vote: &CastVoteDto) -> anyhow::Result<Vote>;

    async fn vote_tally(&self, contest_id: &str) -> anyhow::Result<VoteTally>;
}
