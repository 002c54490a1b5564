use tracing::instrument;
use validator::Validate;
use voteboard_cache::{CacheOptions, ProfileChange, keys};

use crate::modules::profiles::model::{Profile, ProfileRank, ProfileStats, UpdateProfileDto};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub struct ProfileService;

impl ProfileService {
    #[instrument(skip(state), fields(profile.id = %profile_id))]
    pub async fn get_profile(state: &AppState, profile_id: &str) -> Result<Profile, AppError> {
        let options = CacheOptions::<Option<Profile>>::new()
            .ttl(state.ttl.profile())
            .tags(keys::profiles::tags())
            .should_cache(|profile| profile.is_some());

        state
            .cache
            .get_or_compute(&keys::profiles::by_id(profile_id), &options, || async {
                state.repo.profile(profile_id).await.map_err(AppError::internal)
            })
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Profile not found")))
    }

    /// Rank moves with every vote, so it is also tagged as leaderboard data.
    #[instrument(skip(state), fields(profile.id = %profile_id))]
    pub async fn get_profile_rank(
        state: &AppState,
        profile_id: &str,
    ) -> Result<ProfileRank, AppError> {
        let options = CacheOptions::<Option<ProfileRank>>::new()
            .ttl(state.ttl.profile())
            .tags(keys::profiles::rank_tags())
            .should_cache(|rank| rank.is_some());

        state
            .cache
            .get_or_compute(&keys::profiles::rank(profile_id), &options, || async {
                state.repo.profile_rank(profile_id).await.map_err(AppError::internal)
            })
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Profile not ranked")))
    }

    #[instrument(skip(state), fields(profile.id = %profile_id))]
    pub async fn get_profile_stats(
        state: &AppState,
        profile_id: &str,
    ) -> Result<ProfileStats, AppError> {
        let options = CacheOptions::<Option<ProfileStats>>::new()
            .ttl(state.ttl.profile())
            .tags(keys::profiles::tags())
            .should_cache(|stats| stats.is_some());

        state
            .cache
            .get_or_compute(&keys::profiles::stats(profile_id), &options, || async {
                state.repo.profile_stats(profile_id).await.map_err(AppError::internal)
            })
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Profile not found")))
    }

    /// Update a profile, then drop every key scoped to it.
    #[instrument(skip(state, dto), fields(profile.id = %profile_id))]
    pub async fn update_profile(
        state: &AppState,
        profile_id: &str,
        dto: UpdateProfileDto,
    ) -> Result<Profile, AppError> {
        dto.validate().map_err(AppError::bad_request)?;

        let profile = state
            .repo
            .update_profile(profile_id, &dto)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Profile not found")))?;

        state
            .cache
            .invalidate_profile_cache(profile_id, ProfileChange::Stats)
            .await;

        // Display names appear in leaderboard rows.
        if dto.display_name.is_some() {
            state
                .cache
                .invalidate_profile_cache(profile_id, ProfileChange::Rank)
                .await;
        }

        Ok(profile)
    }
}
