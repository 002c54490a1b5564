mod common;

use common::{test_state, vote};
use voteboard::modules::profiles::UpdateProfileDto;
use voteboard::modules::profiles::service::ProfileService;
use voteboard::modules::votes::service::VoteService;
use voteboard::utils::errors::ErrorKind;

#[tokio::test]
async fn test_profile_reads_cached() {
    let (state, repo) = test_state();

    for _ in 0..3 {
        ProfileService::get_profile(&state, "p1").await.unwrap();
        ProfileService::get_profile_stats(&state, "p1").await.unwrap();
    }

    assert_eq!(repo.calls("profile"), 1);
    assert_eq!(repo.calls("profile_stats"), 1);
}

#[tokio::test]
async fn test_missing_profile_is_not_cached() {
    let (state, repo) = test_state();

    for _ in 0..2 {
        let err = ProfileService::get_profile(&state, "nobody").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    assert_eq!(repo.calls("profile"), 2);
}

#[tokio::test]
async fn test_update_invalidates_every_profile_key() {
    let (state, repo) = test_state();

    ProfileService::get_profile(&state, "p1").await.unwrap();
    ProfileService::get_profile_stats(&state, "p1").await.unwrap();
    ProfileService::get_profile_rank(&state, "p1").await.unwrap();
    ProfileService::get_profile(&state, "p2").await.unwrap();

    let dto = UpdateProfileDto {
        display_name: Some("Ada L.".to_string()),
        ..Default::default()
    };
    ProfileService::update_profile(&state, "p1", dto).await.unwrap();

    let profile = ProfileService::get_profile(&state, "p1").await.unwrap();
    ProfileService::get_profile_stats(&state, "p1").await.unwrap();
    ProfileService::get_profile_rank(&state, "p1").await.unwrap();
    ProfileService::get_profile(&state, "p2").await.unwrap();

    assert_eq!(profile.display_name, "Ada L.");
    assert_eq!(repo.calls("profile"), 3);
    assert_eq!(repo.calls("profile_stats"), 2);
    assert_eq!(repo.calls("profile_rank"), 2);
}

#[tokio::test]
async fn test_vote_refreshes_profile_rank() {
    let (state, repo) = test_state();

    let before = ProfileService::get_profile_rank(&state, "p3").await.unwrap();
    assert_eq!(before.rank, 3);

    VoteService::cast_vote(&state, vote("c1", "p3", "voter-1"))
        .await
        .unwrap();

    let after = ProfileService::get_profile_rank(&state, "p3").await.unwrap();
    assert_eq!(after.rank, 1);
    assert_eq!(after.votes, 1);
    assert_eq!(repo.calls("profile_rank"), 2);
}

#[tokio::test]
async fn test_update_rejects_invalid_dto() {
    let (state, repo) = test_state();

    let dto = UpdateProfileDto {
        bio: Some("x".repeat(501)),
        ..Default::default()
    };
    let err = ProfileService::update_profile(&state, "p1", dto).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::BadRequest);
    assert_eq!(repo.calls("update_profile"), 0);
}
