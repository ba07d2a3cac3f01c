//! Ladder scenarios
//!
//! The reference review walkthroughs: tier movement on the default ladder,
//! queue reordering after a miss, session completion, and rejection of an
//! unknown outcome.

use cadence_core::{
    Outcome, PartialPolicy, ReviewConfig, ScheduleEngine, ScheduleError, SessionCoordinator,
    SessionError, SessionState,
};
use cadence_e2e_tests::mocks::TestDataFactory;
use chrono::Duration;

// ============================================================================
// SCHEDULE ENGINE
// ============================================================================

#[test]
fn test_mid_ladder_remembered_climbs_one_rung() {
    let now = TestDataFactory::fixed_now();
    let engine = ScheduleEngine::default();

    let update = engine.apply_outcome(2, Outcome::Remembered, now).unwrap();
    assert_eq!(update.new_tier, 3);
    assert_eq!(update.next_review_at, now + Duration::days(14));
}

#[test]
fn test_mid_ladder_forgotten_resets() {
    let now = TestDataFactory::fixed_now();
    let engine = ScheduleEngine::default();

    let update = engine.apply_outcome(2, Outcome::Forgotten, now).unwrap();
    assert_eq!(update.new_tier, 0);
    assert_eq!(update.next_review_at, now + Duration::days(1));
}

#[test]
fn test_unknown_outcome_rejected_without_state_change() {
    let now = TestDataFactory::fixed_now();
    let scenario = TestDataFactory::mid_ladder_scenario(now);
    let engine = scenario.config.engine();

    let err = engine.apply_outcome_name(2, "excellent", now).unwrap_err();
    assert!(matches!(err, ScheduleError::InvalidOutcome(_)));

    // Through the coordinator: nothing moves
    let mut session = SessionCoordinator::new(scenario.config.clone(), scenario.seed(), now);
    session.present(now).unwrap();
    let before = session.snapshot();

    let err = session.judge_name("excellent", now).unwrap_err();
    assert!(matches!(err, SessionError::Schedule(ScheduleError::InvalidOutcome(_))));
    assert_eq!(session.snapshot(), before);
    assert_eq!(session.front().unwrap().current_tier, 2);
    assert!(session.pending().is_empty());
}

#[test]
fn test_every_tier_remembered_and_forgotten() {
    let now = TestDataFactory::fixed_now();
    let engine = ScheduleEngine::default();
    let ladder = engine.ladder().clone();

    for tier in 0..=ladder.last_tier() {
        let up = engine.apply_outcome(tier, Outcome::Remembered, now).unwrap();
        let expected = (tier + 1).min(ladder.last_tier());
        assert_eq!(up.new_tier, expected);
        assert_eq!(
            up.next_review_at,
            now + Duration::days(i64::from(ladder.days_at(expected)))
        );

        let down = engine.apply_outcome(tier, Outcome::Forgotten, now).unwrap();
        assert_eq!(down.new_tier, 0);
        assert_eq!(down.next_review_at, now + Duration::days(1));
    }
}

#[test]
fn test_top_rung_saturates() {
    let now = TestDataFactory::fixed_now();
    let engine = ScheduleEngine::default();
    let mut tier = 0;
    for _ in 0..20 {
        tier = engine.apply_outcome(tier, Outcome::Remembered, now).unwrap().new_tier;
    }
    assert_eq!(tier, 4);
}

// ============================================================================
// SESSION COORDINATOR
// ============================================================================

#[test]
fn test_forgotten_front_moves_to_back() {
    let now = TestDataFactory::fixed_now();
    let scenario = TestDataFactory::three_card_scenario(now);
    let mut session = SessionCoordinator::new(scenario.config.clone(), scenario.seed(), now);

    session.present(now).unwrap();
    session.judge(Outcome::Forgotten, now).unwrap();

    let order: Vec<&str> = session.queue().items().map(|i| i.id.as_str()).collect();
    assert_eq!(order, vec!["item2", "item3", "item1"]);
    assert_eq!(session.queue().completed_count(), 0);
    assert_eq!(
        session.state(),
        &SessionState::Presenting {
            item_id: "item2".into()
        }
    );
}

#[test]
fn test_single_card_remembered_completes() {
    let now = TestDataFactory::fixed_now();
    let seed = TestDataFactory::seed(&["only"], now);
    let mut session = SessionCoordinator::new(ReviewConfig::default(), seed, now);

    session.present(now).unwrap();
    let judgement = session.judge(Outcome::Remembered, now).unwrap();

    assert!(judgement.retired);
    assert!(session.queue().is_empty());
    assert_eq!(session.queue().completed_count(), 1);
    assert_eq!(session.state(), &SessionState::Complete);
    assert_eq!(session.progress(), 1.0);
    assert_eq!(session.present(now).unwrap_err(), SessionError::EmptyQueue);
}

#[test]
fn test_full_ladder_session_conserves_items() {
    let now = TestDataFactory::fixed_now();
    let scenario = TestDataFactory::full_ladder_scenario(now);
    let seeded = scenario.items.len();
    let mut session = SessionCoordinator::new(scenario.config.clone(), scenario.seed(), now);

    let script = [
        Outcome::Forgotten,
        Outcome::Partial,
        Outcome::Forgotten,
        Outcome::Remembered,
        Outcome::Remembered,
        Outcome::Partial,
    ];
    for outcome in script {
        if session.state().is_complete() {
            break;
        }
        session.present(now).unwrap();
        session.judge(outcome, now).unwrap();
        if !session.state().is_complete() {
            assert_eq!(
                session.queue().len() + session.queue().completed_count(),
                seeded
            );
        }
    }
    assert_eq!(scenario.name, "full-ladder");
    assert!(session.state().is_complete());
    assert_eq!(session.queue().completed_count(), seeded);
}

#[test]
fn test_partial_policies_differ_only_in_retirement() {
    let now = TestDataFactory::fixed_now();
    for (policy, retired) in [
        (PartialPolicy::HoldAndRequeue, false),
        (PartialPolicy::HoldAndRetire, true),
    ] {
        let config = TestDataFactory::config(&[1, 3, 7, 14, 30], true, policy);
        let seed = TestDataFactory::seed(&["a", "b"], now);
        let mut session = SessionCoordinator::new(config, seed, now);
        session.present(now).unwrap();
        let judgement = session.judge(Outcome::Partial, now).unwrap();

        assert_eq!(judgement.retired, retired, "policy {}", policy);
        assert_eq!(judgement.update.new_tier, 0);
        assert_eq!(judgement.update.next_review_at, now + Duration::days(1));
    }
}

#[test]
fn test_two_outcome_mode_rejects_partial() {
    let now = TestDataFactory::fixed_now();
    let seed = TestDataFactory::seed(&["a"], now);
    let mut session = SessionCoordinator::new(ReviewConfig::two_outcome(), seed, now);
    session.present(now).unwrap();

    let err = session.judge(Outcome::Partial, now).unwrap_err();
    assert!(matches!(err, SessionError::Schedule(ScheduleError::InvalidOutcome(_))));
    assert_eq!(session.queue().len(), 1);
}
