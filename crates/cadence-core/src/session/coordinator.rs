//! Session Coordinator
//!
//! Drives one review run over a seeded queue of due items.
//!
//! ```text
//! Idle ──present──▶ Presenting(front) ──judge──▶ Presenting(next)
//!                          ▲                 └──▶ Complete (queue empty)
//!                          └───── requeued front / next item
//! ```
//!
//! A judgement is applied optimistically: the schedule result is computed,
//! recorded as a pending persist request, and the queue moves on without
//! waiting for storage. Failed persists stay in the pending set until the
//! caller retries or dismisses them; the queue is never rolled back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use super::events::SessionEvent;
use super::pending::{AckEffect, PendingPersist, PendingPersists};
use super::queue::SessionQueue;
use crate::config::{PartialPolicy, ReviewConfig};
use crate::item::ReviewableItem;
use crate::persist::{PersistAck, PersistRequest};
use crate::schedule::{Outcome, ScheduleEngine, ScheduleError, ScheduleUpdate};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Session error type
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// No front item to present or judge
    #[error("Review queue is empty")]
    EmptyQueue,
    /// `judge` called before the front item was presented
    #[error("No card is being presented")]
    NotPresenting,
    /// Session already complete
    #[error("Session is complete")]
    Closed,
    /// Outcome rejected by the schedule engine
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

// ============================================================================
// TYPES
// ============================================================================

/// Snapshot of items due as of a query time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueItems {
    pub items: Vec<ReviewableItem>,
    /// All due items, which may exceed `items.len()` when the query was limited
    pub total: usize,
}

/// Observable session state
///
/// Judging is instantaneous from the outside: a judged card moves straight
/// on to the next `Presenting` or to `Complete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum SessionState {
    Idle,
    Presenting {
        #[serde(rename = "itemId")]
        item_id: String,
    },
    Complete,
}

impl SessionState {
    pub fn is_complete(&self) -> bool {
        matches!(self, SessionState::Complete)
    }
}

/// Result of one `judge` call
#[derive(Debug, Clone, PartialEq)]
pub struct Judgement {
    /// Request to hand to the persistence layer
    pub request: PersistRequest,
    pub update: ScheduleUpdate,
    /// Whether the card left the session
    pub retired: bool,
    pub state: SessionState,
}

/// What the UI renders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub front_item: Option<ReviewableItem>,
    pub remaining_count: usize,
    pub completed_count: usize,
    pub progress_fraction: f64,
    pub session_state: SessionState,
    pub pending_persists: usize,
    pub failed_persists: usize,
}

/// Per-session review tallies
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub reviews: usize,
    pub remembered: usize,
    pub partial: usize,
    pub forgotten: usize,
    pub completed: usize,
    pub remaining: usize,
    pub total_elapsed_seconds: i64,
    pub average_elapsed_seconds: f64,
}

impl SessionSummary {
    fn record(&mut self, outcome: Outcome, elapsed_seconds: i64) {
        self.reviews += 1;
        match outcome {
            Outcome::Remembered => self.remembered += 1,
            Outcome::Partial => self.partial += 1,
            Outcome::Forgotten => self.forgotten += 1,
        }
        self.total_elapsed_seconds = self.total_elapsed_seconds.saturating_add(elapsed_seconds);
        self.average_elapsed_seconds = self.total_elapsed_seconds as f64 / self.reviews as f64;
    }
}

/// `completed / (completed + remaining)`, zero for an empty session
pub fn progress_fraction(completed: usize, remaining: usize) -> f64 {
    let total = completed + remaining;
    if total == 0 {
        0.0
    } else {
        completed as f64 / total as f64
    }
}

// ============================================================================
// COORDINATOR
// ============================================================================

/// Owns the working set of one review run
pub struct SessionCoordinator {
    config: ReviewConfig,
    engine: ScheduleEngine,
    queue: SessionQueue,
    state: SessionState,
    pending: PendingPersists,
    summary: SessionSummary,
    next_sequence: u64,
    started_at: DateTime<Utc>,
    events: Option<broadcast::Sender<SessionEvent>>,
}

impl SessionCoordinator {
    /// Start a session from a due-items snapshot
    ///
    /// Repeated ids are dropped (first wins). An empty seed is already complete.
    pub fn new(config: ReviewConfig, seed: DueItems, now: DateTime<Utc>) -> Self {
        let (queue, dropped) = SessionQueue::from_seed(seed.items);
        if !dropped.is_empty() {
            warn!(count = dropped.len(), ids = ?dropped, "Dropped duplicate items from session seed");
        }

        let state = if queue.is_empty() {
            SessionState::Complete
        } else {
            SessionState::Idle
        };

        info!(
            items = queue.len(),
            total_due = seed.total,
            ladder = ?config.ladder_days.days(),
            partial_policy = %config.partial_policy,
            "Review session started"
        );

        Self {
            engine: config.engine(),
            config,
            queue,
            state,
            pending: PendingPersists::default(),
            summary: SessionSummary::default(),
            next_sequence: 0,
            started_at: now,
            events: None,
        }
    }

    /// Attach an event channel; announces the session on it
    pub fn with_events(mut self, events: broadcast::Sender<SessionEvent>) -> Self {
        self.events = Some(events);
        self.emit(SessionEvent::SessionStarted {
            item_count: self.queue.len(),
            timestamp: self.started_at,
        });
        self
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn config(&self) -> &ReviewConfig {
        &self.config
    }

    pub fn engine(&self) -> &ScheduleEngine {
        &self.engine
    }

    pub fn queue(&self) -> &SessionQueue {
        &self.queue
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn front(&self) -> Option<&ReviewableItem> {
        self.queue.front()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn pending(&self) -> &PendingPersists {
        &self.pending
    }

    pub fn failed_persists(&self) -> Vec<&PendingPersist> {
        self.pending.failures()
    }

    pub fn progress(&self) -> f64 {
        progress_fraction(self.queue.completed_count(), self.queue.len())
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            completed: self.queue.completed_count(),
            remaining: self.queue.len(),
            ..self.summary.clone()
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            front_item: self.queue.front().cloned(),
            remaining_count: self.queue.len(),
            completed_count: self.queue.completed_count(),
            progress_fraction: self.progress(),
            session_state: self.state.clone(),
            pending_persists: self.pending.len(),
            failed_persists: self.pending.failures().len(),
        }
    }

    // ========================================================================
    // TRANSITIONS
    // ========================================================================

    /// Show the front item, stamping its start time
    ///
    /// Calling again while presenting returns the same item and keeps the
    /// original stamp.
    pub fn present(&mut self, now: DateTime<Utc>) -> Result<ReviewableItem, SessionError> {
        match self.state {
            SessionState::Complete => Err(SessionError::EmptyQueue),
            SessionState::Presenting { .. } => {
                self.queue.front().cloned().ok_or(SessionError::EmptyQueue)
            }
            SessionState::Idle => {
                let front = self.queue.front().cloned().ok_or(SessionError::EmptyQueue)?;
                self.show(&front, now);
                Ok(front)
            }
        }
    }

    /// Apply a review outcome to the presented item
    pub fn judge(&mut self, outcome: Outcome, now: DateTime<Utc>) -> Result<Judgement, SessionError> {
        match self.state {
            SessionState::Presenting { .. } => {}
            SessionState::Idle => return Err(SessionError::NotPresenting),
            SessionState::Complete => return Err(SessionError::EmptyQueue),
        }
        let front = self.queue.front().ok_or(SessionError::EmptyQueue)?;

        // Engine errors leave every piece of state untouched
        let update = self.engine.apply_outcome(front.current_tier, outcome, now)?;

        let started = self.queue.card_started_at().unwrap_or(now);
        let elapsed_seconds = (now - started).num_seconds().max(0);

        self.next_sequence += 1;
        let request = PersistRequest {
            item_id: front.id.clone(),
            new_tier: update.new_tier,
            next_review_at: update.next_review_at,
            outcome,
            elapsed_seconds,
            sequence: self.next_sequence,
        };
        self.pending.track(request.clone());

        if let Some(front) = self.queue.front_mut() {
            front.apply(outcome, &update);
        }

        let retired = match outcome {
            Outcome::Remembered => true,
            Outcome::Forgotten => false,
            Outcome::Partial => self.config.partial_policy == PartialPolicy::HoldAndRetire,
        };
        if retired {
            self.queue.retire_front();
        } else {
            self.queue.requeue_front();
        }
        self.summary.record(outcome, elapsed_seconds);

        debug!(
            item_id = %request.item_id,
            outcome = %outcome,
            new_tier = update.new_tier,
            elapsed_seconds,
            retired,
            remaining = self.queue.len(),
            "Card judged"
        );

        self.emit(SessionEvent::CardJudged {
            item_id: request.item_id.clone(),
            outcome,
            new_tier: update.new_tier,
            next_review_at: update.next_review_at,
            elapsed_seconds,
            retired,
            remaining: self.queue.len(),
            completed: self.queue.completed_count(),
            timestamp: now,
        });

        match self.queue.front().cloned() {
            Some(next) => self.show(&next, now),
            None => self.complete(now),
        }

        Ok(Judgement {
            request,
            update,
            retired,
            state: self.state.clone(),
        })
    }

    /// [`judge`](Self::judge) with a raw outcome name
    pub fn judge_name(&mut self, outcome: &str, now: DateTime<Utc>) -> Result<Judgement, SessionError> {
        let outcome = Outcome::parse_name(outcome)?;
        self.judge(outcome, now)
    }

    /// Add an item from outside the seed
    ///
    /// Returns `false` if the id is already queued.
    pub fn enqueue(&mut self, item: ReviewableItem) -> Result<bool, SessionError> {
        if self.state.is_complete() {
            return Err(SessionError::Closed);
        }
        Ok(self.queue.push_back(item))
    }

    fn show(&mut self, item: &ReviewableItem, now: DateTime<Utc>) {
        self.queue.stamp(now);
        self.state = SessionState::Presenting {
            item_id: item.id.clone(),
        };
        self.emit(SessionEvent::CardPresented {
            item_id: item.id.clone(),
            tier: item.current_tier,
            timestamp: now,
        });
    }

    fn complete(&mut self, now: DateTime<Utc>) {
        self.queue.clear_stamp();
        self.state = SessionState::Complete;
        info!(
            completed = self.queue.completed_count(),
            reviews = self.summary.reviews,
            pending_persists = self.pending.len(),
            "Review session complete"
        );
        self.emit(SessionEvent::SessionCompleted {
            completed: self.queue.completed_count(),
            reviews: self.summary.reviews,
            timestamp: now,
        });
    }

    // ========================================================================
    // PERSISTENCE RECONCILIATION
    // ========================================================================

    /// Fold one persist ack into the pending set
    pub fn apply_persist_result(&mut self, ack: PersistAck) -> AckEffect {
        let item_id = ack.item_id.clone();
        let sequence = ack.sequence;
        let effect = self.pending.apply(ack);

        match &effect {
            AckEffect::Confirmed => {
                self.emit(SessionEvent::PersistConfirmed { item_id, sequence });
            }
            AckEffect::Failed(failure) => {
                warn!(item_id = %item_id, sequence, "Review kept locally, persist failed: {}", failure.message);
                self.emit(SessionEvent::PersistFailed {
                    item_id,
                    sequence,
                    message: failure.message.clone(),
                });
            }
            AckEffect::Stale => {
                debug!(item_id = %item_id, sequence, "Ignoring stale persist ack");
            }
        }
        effect
    }

    /// Apply every ack currently waiting on `acks` without blocking
    pub fn drain_acks(&mut self, acks: &mut mpsc::UnboundedReceiver<PersistAck>) -> usize {
        let mut applied = 0;
        while let Ok(ack) = acks.try_recv() {
            self.apply_persist_result(ack);
            applied += 1;
        }
        applied
    }

    /// Stored request for a failed persist, ready to dispatch again
    pub fn retry(&mut self, item_id: &str) -> Option<PersistRequest> {
        let request = self.pending.retry(item_id)?;
        info!(item_id = %item_id, sequence = request.sequence, "Retrying persist");
        Some(request)
    }

    /// Every failed request, marked in flight again
    pub fn retry_all_failed(&mut self) -> Vec<PersistRequest> {
        let ids: Vec<String> = self
            .pending
            .failures()
            .into_iter()
            .map(|entry| entry.request.item_id.clone())
            .collect();
        ids.iter().filter_map(|id| self.retry(id)).collect()
    }

    /// Forget a failed persist; the local session state is unaffected
    pub fn dismiss_failure(&mut self, item_id: &str) -> bool {
        self.pending.dismiss(item_id)
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(tx) = &self.events {
            // No receivers is fine
            let _ = tx.send(event);
        }
    }
}
