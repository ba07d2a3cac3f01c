//! Session events
//!
//! Emitted by the coordinator and broadcast to any listeners (UI, analytics)
//! via a tokio broadcast channel.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::schedule::Outcome;

/// Every session transition emits one of these events.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum SessionEvent {
    SessionStarted {
        item_count: usize,
        timestamp: DateTime<Utc>,
    },
    CardPresented {
        item_id: String,
        tier: u32,
        timestamp: DateTime<Utc>,
    },
    CardJudged {
        item_id: String,
        outcome: Outcome,
        new_tier: u32,
        next_review_at: DateTime<Utc>,
        elapsed_seconds: i64,
        retired: bool,
        remaining: usize,
        completed: usize,
        timestamp: DateTime<Utc>,
    },
    PersistConfirmed {
        item_id: String,
        sequence: u64,
    },
    PersistFailed {
        item_id: String,
        sequence: u64,
        message: String,
    },
    SessionCompleted {
        completed: usize,
        reviews: usize,
        timestamp: DateTime<Utc>,
    },
}
