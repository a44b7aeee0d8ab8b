use std::sync::Arc;

use feedback_portal::{
    backend::{FeedbackBackend, MemoryBackend},
    clock::ManualClock,
    context::ExecutionContext,
    models::{FeatureSort, FeatureStatus},
    rate_limit::RateLimitConfig,
    storage::{KeyValueStore, MemoryStore},
    voting::{OptimisticVoter, VoteOutcome, VoteRejection, VoteState},
};

fn voter(store: &MemoryStore, backend: &Arc<MemoryBackend>, clock: &Arc<ManualClock>) -> OptimisticVoter {
    OptimisticVoter::new(
        ExecutionContext::device(store.clone()),
        clock.clone(),
        backend.clone(),
        RateLimitConfig::VOTE,
    )
}

#[tokio::test]
async fn vote_survives_reload_of_the_same_device() {
    let backend = Arc::new(MemoryBackend::new());
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let store = MemoryStore::new();
    let id = backend.seed_feature("f1", FeatureStatus::Open, 7);

    let first = voter(&store, &backend, &clock);
    first
        .load(&backend.list_features(FeatureSort::Votes).await.unwrap())
        .await;
    assert_eq!(first.vote(&id).await.unwrap(), VoteOutcome::Recorded);
    assert_eq!(first.displayed_votes(&id), Some(8));

    // 新页面：同一设备存储，新的看板
    let reloaded = voter(&store, &backend, &clock);
    reloaded
        .load(&backend.list_features(FeatureSort::Votes).await.unwrap())
        .await;
    assert_eq!(reloaded.state(&id), VoteState::Voted);
    assert_eq!(reloaded.displayed_votes(&id), Some(8));
    assert_eq!(
        reloaded.vote(&id).await.unwrap(),
        VoteOutcome::Rejected(VoteRejection::AlreadyVoted)
    );
    assert_eq!(backend.vote_count(&id), 8);
}

#[tokio::test]
async fn cleared_voted_set_falls_back_to_server_uniqueness() {
    let backend = Arc::new(MemoryBackend::new());
    let clock = Arc::new(ManualClock::new(0));
    let store = MemoryStore::new();
    let id = backend.seed_feature("f1", FeatureStatus::Open, 0);

    let first = voter(&store, &backend, &clock);
    first
        .load(&backend.list_features(FeatureSort::Votes).await.unwrap())
        .await;
    first.vote(&id).await.unwrap();

    // 只清掉已投集合，令牌仍在
    store.remove("voted_features").await.unwrap();

    let again = voter(&store, &backend, &clock);
    again
        .load(&backend.list_features(FeatureSort::Votes).await.unwrap())
        .await;
    assert_eq!(again.state(&id), VoteState::Unvoted);
    assert_eq!(again.vote(&id).await.unwrap(), VoteOutcome::AlreadyRecorded);
    assert_eq!(again.state(&id), VoteState::Voted);
    assert_eq!(backend.vote_count(&id), 1);
}

#[tokio::test]
async fn vote_quota_recovers_after_window() {
    let backend = Arc::new(MemoryBackend::new());
    let clock = Arc::new(ManualClock::new(0));
    let store = MemoryStore::new();
    let ids: Vec<String> = (0..21)
        .map(|n| backend.seed_feature(&format!("f{}", n), FeatureStatus::Open, 0))
        .collect();

    let voter = voter(&store, &backend, &clock);
    voter
        .load(&backend.list_features(FeatureSort::Votes).await.unwrap())
        .await;

    for id in &ids[..20] {
        assert_eq!(voter.vote(id).await.unwrap(), VoteOutcome::Recorded);
    }
    assert!(matches!(
        voter.vote(&ids[20]).await.unwrap(),
        VoteOutcome::Rejected(VoteRejection::RateLimited { .. })
    ));

    clock.advance(60_001);
    assert_eq!(voter.vote(&ids[20]).await.unwrap(), VoteOutcome::Recorded);
}
