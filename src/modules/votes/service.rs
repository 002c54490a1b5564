use tracing::{info, instrument};
use validator::Validate;
use voteboard_cache::{CacheOptions, keys};

use crate::modules::votes::model::{CastVoteDto, Vote, VoteTally};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub struct VoteService;

impl VoteService {
    /// Record a vote, then invalidate everything that ranks or counts it.
    ///
    /// The vote is committed before invalidation runs; an invalidation
    /// failure is logged by the cache layer and does not fail the vote.
    #[instrument(
        skip(state, dto),
        fields(contest.id = %dto.contest_id, profile.id = %dto.profile_id)
    )]
    pub async fn cast_vote(state: &AppState, dto: CastVoteDto) -> Result<Vote, AppError> {
        dto.validate().map_err(AppError::bad_request)?;

        let vote = state.repo.record_vote(&dto).await?;

        let report = state
            .cache
            .invalidate_vote(&vote.contest_id, &vote.profile_id)
            .await;

        info!(
            vote.id = %vote.id,
            cache.removed = report.removed,
            cache.failures = report.failures,
            "Vote recorded"
        );

        Ok(vote)
    }

    #[instrument(skip(state), fields(contest.id = %contest_id))]
    pub async fn get_tally(state: &AppState, contest_id: &str) -> Result<VoteTally, AppError> {
        let options = CacheOptions::new()
            .ttl(state.ttl.contest())
            .tags(keys::votes::tags());

        state
            .cache
            .get_or_compute(&keys::votes::tally(contest_id), &options, || async {
                state.repo.vote_tally(contest_id).await.map_err(AppError::internal)
            })
            .await
    }
}
