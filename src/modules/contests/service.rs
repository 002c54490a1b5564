use tracing::{info, instrument};
use validator::Validate;
use voteboard_cache::{CacheOptions, ContestChange, keys};

use crate::modules::contests::model::{
    Contest, ContestFilterParams, JoinContestDto, PaginatedContestsResponse,
    PaginatedParticipantsResponse, Participant, ParticipantFilterParams, UpdateContestDto,
};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub struct ContestService;

impl ContestService {
    #[instrument(skip(state), fields(contest.id = %contest_id))]
    pub async fn get_contest(state: &AppState, contest_id: &str) -> Result<Contest, AppError> {
        // Absent contests are not cached, so a contest created later is seen at once.
        let options = CacheOptions::<Option<Contest>>::new()
            .ttl(state.ttl.contest())
            .tags(keys::contests::tags())
            .should_cache(|contest| contest.is_some());

        state
            .cache
            .get_or_compute(&keys::contests::by_id(contest_id), &options, || async {
                state.repo.contest(contest_id).await.map_err(AppError::internal)
            })
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Contest not found")))
    }

    #[instrument(skip(state))]
    pub async fn list_contests(
        state: &AppState,
        filters: ContestFilterParams,
    ) -> Result<PaginatedContestsResponse, AppError> {
        let filters = filters.normalized();
        let key = keys::contests::list(&keys::hash_filters(&filters));
        let options = CacheOptions::new()
            .ttl(state.ttl.contest())
            .tags(keys::contests::tags());

        state
            .cache
            .get_or_compute(&key, &options, || async {
                state.repo.contests(&filters).await.map_err(AppError::internal)
            })
            .await
    }

    #[instrument(skip(state), fields(contest.id = %contest_id))]
    pub async fn list_participants(
        state: &AppState,
        contest_id: &str,
        filters: ParticipantFilterParams,
    ) -> Result<PaginatedParticipantsResponse, AppError> {
        filters.validate().map_err(AppError::bad_request)?;

        let query = filters.to_query();
        let options = CacheOptions::new()
            .ttl(state.ttl.participants())
            .tags(keys::contests::tags());

        state
            .cache
            .get_or_compute(&keys::contests::participants(contest_id, &query), &options, || async {
                state
                    .repo
                    .participants(contest_id, &query)
                    .await
                    .map_err(AppError::internal)
            })
            .await
    }

    /// Enter a profile into a contest, then drop contest and leaderboard caches.
    #[instrument(skip(state, dto), fields(contest.id = %contest_id, profile.id = %dto.profile_id))]
    pub async fn join_contest(
        state: &AppState,
        contest_id: &str,
        dto: JoinContestDto,
    ) -> Result<Participant, AppError> {
        dto.validate().map_err(AppError::bad_request)?;

        let participant = state
            .repo
            .add_participant(contest_id, &dto.profile_id)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Contest not found")))?;

        state
            .cache
            .invalidate_contest_cache(contest_id, ContestChange::Participation)
            .await;

        info!(contest.id = %contest_id, profile.id = %dto.profile_id, "Participant joined contest");
        Ok(participant)
    }

    #[instrument(skip(state, dto), fields(contest.id = %contest_id))]
    pub async fn update_contest(
        state: &AppState,
        contest_id: &str,
        dto: UpdateContestDto,
    ) -> Result<Contest, AppError> {
        dto.validate().map_err(AppError::bad_request)?;

        let contest = state
            .repo
            .update_contest(contest_id, &dto)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Contest not found")))?;

        state
            .cache
            .invalidate_contest_cache(contest_id, ContestChange::Update)
            .await;

        Ok(contest)
    }
}
