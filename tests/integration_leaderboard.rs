mod common;

use common::{test_state, vote};
use voteboard::modules::leaderboard::service::LeaderboardService;
use voteboard::modules::votes::service::VoteService;
use voteboard::utils::errors::ErrorKind;
use voteboard::utils::pagination::PaginationParams;

#[tokio::test]
async fn test_leaderboard_served_from_cache_on_second_read() {
    let (state, repo) = test_state();

    let first = LeaderboardService::get_leaderboard(&state, PaginationParams::default())
        .await
        .unwrap();
    let second = LeaderboardService::get_leaderboard(&state, PaginationParams::default())
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(repo.calls("leaderboard"), 1);
    assert_eq!(state.cache.stats().hits, 1);
}

#[tokio::test]
async fn test_vote_invalidates_leaderboard() {
    let (state, repo) = test_state();

    let before = LeaderboardService::get_leaderboard(&state, PaginationParams::default())
        .await
        .unwrap();
    assert!(before.data.iter().all(|row| row.votes == 0));

    VoteService::cast_vote(&state, vote("c1", "p3", "voter-1"))
        .await
        .unwrap();

    let after = LeaderboardService::get_leaderboard(&state, PaginationParams::default())
        .await
        .unwrap();

    assert_eq!(repo.calls("leaderboard"), 2);
    assert_eq!(after.data[0].profile_id, "p3");
    assert_eq!(after.data[0].votes, 1);
}

#[tokio::test]
async fn test_pages_are_cached_separately() {
    let (state, repo) = test_state();

    let page_one = LeaderboardService::get_leaderboard(&state, PaginationParams::new(1, 2))
        .await
        .unwrap();
    let page_two = LeaderboardService::get_leaderboard(&state, PaginationParams::new(2, 2))
        .await
        .unwrap();

    assert_eq!(repo.calls("leaderboard"), 2);
    assert_eq!(page_one.data.len(), 2);
    assert_eq!(page_two.data.len(), 1);
    assert!(page_one.meta.has_more);
}

#[tokio::test]
async fn test_contest_leaderboard_cached_per_contest() {
    let (state, repo) = test_state();
    let params = PaginationParams::default();

    LeaderboardService::get_contest_leaderboard(&state, "c1", params.clone())
        .await
        .unwrap();
    let cached = LeaderboardService::get_contest_leaderboard(&state, "c1", params.clone())
        .await
        .unwrap();
    LeaderboardService::get_contest_leaderboard(&state, "c2", params.clone())
        .await
        .unwrap();

    assert_eq!(cached.contest_id.as_deref(), Some("c1"));
    assert_eq!(repo.calls("contest_leaderboard"), 2);

    VoteService::cast_vote(&state, vote("c1", "p2", "voter-1"))
        .await
        .unwrap();
    let fresh = LeaderboardService::get_contest_leaderboard(&state, "c1", params)
        .await
        .unwrap();

    assert_eq!(repo.calls("contest_leaderboard"), 3);
    assert_eq!(fresh.data[0].profile_id, "p2");
}

#[tokio::test]
async fn test_repository_errors_are_not_cached() {
    let (state, repo) = test_state();

    repo.set_failing(true);
    let err = LeaderboardService::get_leaderboard(&state, PaginationParams::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Internal);

    repo.set_failing(false);
    LeaderboardService::get_leaderboard(&state, PaginationParams::default())
        .await
        .unwrap();
    LeaderboardService::get_leaderboard(&state, PaginationParams::default())
        .await
        .unwrap();

    assert_eq!(repo.calls("leaderboard"), 2);
}
