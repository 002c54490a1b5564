use tracing::{info, instrument};
use voteboard_cache::{CacheOptions, GlobalChange, InvalidationReport, keys};

use crate::modules::analytics::model::{AnalyticsRollup, Period};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub struct AnalyticsService;

impl AnalyticsService {
    #[instrument(skip(state))]
    pub async fn get_rollup(
        state: &AppState,
        scope: &str,
        period: Period,
    ) -> Result<AnalyticsRollup, AppError> {
        if scope.trim().is_empty() {
            return Err(AppError::bad_request(anyhow::anyhow!("Scope is required")));
        }

        let options = CacheOptions::new()
            .ttl(state.ttl.analytics())
            .tags(keys::analytics::tags());

        state
            .cache
            .get_or_compute(&keys::analytics::rollup(scope, period.as_str()), &options, || async {
                state.repo.analytics(scope, period).await.map_err(AppError::internal)
            })
            .await
    }

    /// Drop every cached rollup, e.g. after a batch import or recomputation.
    #[instrument(skip(state))]
    pub async fn refresh(state: &AppState) -> InvalidationReport {
        let report = state
            .cache
            .invalidate_global_cache(GlobalChange::Analytics)
            .await;
        info!(cache.removed = report.removed, "Analytics caches refreshed");
        report
    }
}
