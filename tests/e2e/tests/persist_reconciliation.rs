//! Persist reconciliation
//!
//! Fire-and-forget writes: failures kept locally and retried, acks arriving
//! out of order, superseded acks, and writes outliving their session.

use std::sync::Arc;
use std::time::Duration;

use cadence_core::{
    AckEffect, OutcomeSink, Outcome, PersistAck, PersistDispatcher, PersistFailure,
    PersistRequest, PersistStatus, ReviewConfig, SessionCoordinator, SessionState, Storage,
};
use cadence_e2e_tests::harness::TestDatabaseManager;
use cadence_e2e_tests::mocks::{FailingSink, RecordingSink, SlowSink, TestDataFactory};
use chrono::Utc;

#[tokio::test]
async fn test_failure_does_not_block_and_retry_recovers() {
    let now = TestDataFactory::fixed_now();
    let sink = Arc::new(FailingSink::failing_for(&["a"]));
    let mut session =
        SessionCoordinator::new(ReviewConfig::default(), TestDataFactory::seed(&["a", "b"], now), now);
    let (dispatcher, mut acks) = PersistDispatcher::new(sink.clone());

    for _ in 0..2 {
        session.present(now).unwrap();
        let judgement = session.judge(Outcome::Remembered, now).unwrap();
        dispatcher.dispatch(judgement.request).await.unwrap();
    }
    // The session finished even though one write failed
    assert_eq!(session.state(), &SessionState::Complete);

    session.drain_acks(&mut acks);
    let failed = session.failed_persists();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].request.item_id, "a");
    assert_eq!(failed[0].request.new_tier, 1);
    assert!(matches!(
        &failed[0].status,
        PersistStatus::Failed { message } if message.contains("connection reset")
    ));

    sink.heal();
    let retries = session.retry_all_failed();
    assert_eq!(retries.len(), 1);
    assert_eq!(session.pending().get("a").unwrap().attempts, 2);
    for request in retries {
        dispatcher.dispatch(request).await.unwrap();
    }
    session.drain_acks(&mut acks);

    assert!(session.pending().is_empty());
    let saved: Vec<String> = sink.saved().into_iter().map(|r| r.item_id).collect();
    assert_eq!(saved, vec!["b".to_string(), "a".to_string()]);
}

#[tokio::test]
async fn test_retry_resubmits_the_stored_schedule() {
    let now = TestDataFactory::fixed_now();
    let sink = Arc::new(FailingSink::failing_for(&["a"]));
    let mut session =
        SessionCoordinator::new(ReviewConfig::default(), TestDataFactory::seed(&["a"], now), now);
    let (dispatcher, mut acks) = PersistDispatcher::new(sink.clone());

    session.present(now).unwrap();
    let original = session.judge(Outcome::Remembered, now).unwrap().request;
    dispatcher.dispatch(original.clone()).await.unwrap();
    session.drain_acks(&mut acks);

    // Retrying later must not recompute from a newer clock
    let retried = session.retry("a").unwrap();
    assert_eq!(retried, original);
}

#[tokio::test]
async fn test_out_of_order_acks_all_confirm() {
    let now = TestDataFactory::fixed_now();
    let sink = Arc::new(SlowSink::with_delays(&[("a", 80), ("b", 0)]));
    let mut session =
        SessionCoordinator::new(ReviewConfig::default(), TestDataFactory::seed(&["a", "b"], now), now);
    let (dispatcher, mut acks) = PersistDispatcher::new(sink.clone());

    let mut handles = Vec::new();
    for _ in 0..2 {
        session.present(now).unwrap();
        let judgement = session.judge(Outcome::Remembered, now).unwrap();
        handles.push(dispatcher.dispatch(judgement.request));
    }
    assert_eq!(session.pending().in_flight_count(), 2);

    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(sink.completion_order(), vec!["b".to_string(), "a".to_string()]);

    let first = acks.recv().await.unwrap();
    assert_eq!(first.item_id, "b");
    assert_eq!(session.apply_persist_result(first), AckEffect::Confirmed);
    let second = acks.recv().await.unwrap();
    assert_eq!(session.apply_persist_result(second), AckEffect::Confirmed);
    assert!(session.pending().is_empty());
}

#[tokio::test]
async fn test_superseded_ack_is_stale() {
    let now = TestDataFactory::fixed_now();
    let mut session = SessionCoordinator::new(
        ReviewConfig::default(),
        TestDataFactory::seed(&["a", "b"], now),
        now,
    );

    session.present(now).unwrap();
    let first = session.judge(Outcome::Forgotten, now).unwrap().request; // a requeued
    session.judge(Outcome::Remembered, now).unwrap(); // b retired
    let second = session.judge(Outcome::Remembered, now).unwrap().request; // a again

    assert_eq!(first.item_id, second.item_id);
    assert!(second.sequence > first.sequence);

    // The older write failing must not flag the newer one
    let effect = session.apply_persist_result(PersistAck::failed(&first, "timeout"));
    assert_eq!(effect, AckEffect::Stale);
    assert!(session.failed_persists().is_empty());
    assert_eq!(
        session.pending().get("a").unwrap().request.sequence,
        second.sequence
    );

    let effect = session.apply_persist_result(PersistAck::confirmed(&second));
    assert_eq!(effect, AckEffect::Confirmed);
}

#[tokio::test]
async fn test_dismissed_failure_leaves_session_alone() {
    let now = TestDataFactory::fixed_now();
    let sink = Arc::new(FailingSink::failing_for(&["a"]));
    let mut session = SessionCoordinator::new(
        ReviewConfig::default(),
        TestDataFactory::seed(&["a", "b"], now),
        now,
    );
    let (dispatcher, mut acks) = PersistDispatcher::new(sink);

    session.present(now).unwrap();
    let judgement = session.judge(Outcome::Remembered, now).unwrap();
    dispatcher.dispatch(judgement.request).await.unwrap();
    session.drain_acks(&mut acks);

    let before = session.snapshot();
    assert_eq!(before.failed_persists, 1);
    assert!(session.dismiss_failure("a"));
    assert!(!session.dismiss_failure("a"));

    let after = session.snapshot();
    assert_eq!(after.failed_persists, 0);
    assert_eq!(after.front_item, before.front_item);
    assert_eq!(after.completed_count, 1);
}

#[tokio::test]
async fn test_writes_outlive_an_abandoned_session() {
    let now = TestDataFactory::fixed_now();
    let sink = Arc::new(RecordingSink::default());
    let mut session = SessionCoordinator::new(
        ReviewConfig::default(),
        TestDataFactory::seed(&["a", "b"], now),
        now,
    );
    let (dispatcher, acks) = PersistDispatcher::new(sink.clone());

    session.present(now).unwrap();
    let judgement = session.judge(Outcome::Remembered, now).unwrap();
    let handle = dispatcher.dispatch(judgement.request);

    // Walk away mid-session
    drop(session);
    drop(acks);

    handle.await.unwrap();
    assert_eq!(sink.saved().len(), 1);
}

#[tokio::test]
async fn test_storage_failure_surfaces_as_persist_failure() {
    let db = TestDatabaseManager::new_temp();
    let now = Utc::now();
    let ids = db.seed_cards(2, now);

    let due = db.storage.due_items(now, 10).unwrap();
    let mut session = SessionCoordinator::new(ReviewConfig::default(), due, now);
    let (dispatcher, mut acks) = PersistDispatcher::new(db.storage.clone());

    // Another device deletes the card while it is on screen
    session.present(now).unwrap();
    assert!(db.storage.delete_item(&ids[0]).unwrap());

    let judgement = session.judge(Outcome::Remembered, now).unwrap();
    dispatcher.dispatch(judgement.request).await.unwrap();
    session.drain_acks(&mut acks);

    let failed = session.failed_persists();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].request.item_id, ids[0]);
    match &failed[0].status {
        PersistStatus::Failed { message } => assert!(message.contains("not found")),
        other => panic!("expected failure, got {:?}", other),
    }

    // The rest of the session carries on
    assert_eq!(session.front().unwrap().id, ids[1]);
}

/// Storage behind a slow link for the first write of a session
struct LaggyStorage {
    storage: Arc<Storage>,
    lag: Duration,
}

impl OutcomeSink for LaggyStorage {
    async fn persist(&self, request: PersistRequest) -> Result<(), PersistFailure> {
        if request.sequence == 1 {
            tokio::time::sleep(self.lag).await;
        }
        self.storage.persist(request).await
    }
}

#[tokio::test]
async fn test_requeued_card_keeps_its_latest_judgement() {
    let db = TestDatabaseManager::new_temp();
    let now = Utc::now();
    let id = db.seed_at_tier(3, now);

    let due = db.storage.due_items(now, 10).unwrap();
    let mut session = SessionCoordinator::new(ReviewConfig::default(), due, now);
    let sink = Arc::new(LaggyStorage {
        storage: db.storage.clone(),
        lag: Duration::from_millis(80),
    });
    let (dispatcher, mut acks) = PersistDispatcher::new(sink);

    // Forgotten (slow write), requeued, then remembered straight away
    session.present(now).unwrap();
    let forgotten = session.judge(Outcome::Forgotten, now).unwrap();
    assert_eq!(forgotten.request.sequence, 1);
    let slow = dispatcher.dispatch(forgotten.request);

    session.present(now).unwrap();
    let remembered = session.judge(Outcome::Remembered, now).unwrap();
    assert_eq!(remembered.update.new_tier, 1);
    let fast = dispatcher.dispatch(remembered.request);

    slow.await.unwrap();
    fast.await.unwrap();
    session.drain_acks(&mut acks);
    assert!(session.pending().is_empty());
    assert!(session.failed_persists().is_empty());

    let stored = db.storage.get_item(&id).unwrap().unwrap();
    assert_eq!(stored.current_tier, 1);
    assert_eq!(stored.last_outcome, Some(Outcome::Remembered));
    let history = db.storage.review_history(&id, 10).unwrap();
    assert_eq!(history[0].sequence, 2);
}
