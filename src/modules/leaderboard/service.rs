use tracing::instrument;
use voteboard_cache::{CacheOptions, keys, with_cache};

use crate::modules::leaderboard::model::LeaderboardPage;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::pagination::PaginationParams;

pub struct LeaderboardService;

impl LeaderboardService {
    #[instrument(skip(state), fields(cache.domain = "leaderboard"))]
    pub async fn get_leaderboard(
        state: &AppState,
        params: PaginationParams,
    ) -> Result<LeaderboardPage, AppError> {
        let (page, limit) = (params.page(), params.limit());
        let options = CacheOptions::new()
            .ttl(state.ttl.leaderboard())
            .tags(keys::leaderboard::tags());

        state
            .cache
            .get_or_compute(&keys::leaderboard::main(page, limit), &options, || async {
                state.repo.leaderboard(page, limit).await.map_err(AppError::internal)
            })
            .await
    }

    #[instrument(skip(state), fields(cache.domain = "leaderboard", contest.id = %contest_id))]
    pub async fn get_contest_leaderboard(
        state: &AppState,
        contest_id: &str,
        params: PaginationParams,
    ) -> Result<LeaderboardPage, AppError> {
        let ranking = with_cache(
            &state.cache,
            |(contest_id, page, limit): (String, u32, u32)| async move {
                state
                    .repo
                    .contest_leaderboard(&contest_id, page, limit)
                    .await
                    .map_err(AppError::internal)
            },
            |(contest_id, page, limit): &(String, u32, u32)| {
                keys::leaderboard::contest(contest_id, *page, *limit)
            },
            CacheOptions::<LeaderboardPage>::new()
                .ttl(state.ttl.leaderboard())
                .tags(keys::leaderboard::contest_tags()),
        );

        ranking
            .call((contest_id.to_string(), params.page(), params.limit()))
            .await
    }
}
