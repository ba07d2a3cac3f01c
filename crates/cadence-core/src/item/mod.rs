//! Reviewable items
//!
//! The scheduling view of one piece of learned content, plus the authoring
//! input used to create it.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::schedule::{Outcome, ScheduleUpdate};

/// One piece of content under spaced repetition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewableItem {
    /// Stable identifier (UUID v4 when created by storage)
    pub id: String,
    /// Position on the interval ladder
    pub current_tier: u32,
    /// Item is due once `now >= next_review_at`
    pub next_review_at: DateTime<Utc>,
    /// Most recent outcome, `None` before the first review
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_outcome: Option<Outcome>,
}

impl ReviewableItem {
    /// A freshly authored item: tier 0, due at `due_at`
    pub fn new(id: impl Into<String>, due_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            current_tier: 0,
            next_review_at: due_at,
            last_outcome: None,
        }
    }

    /// Check if the item is due for review
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.next_review_at
    }

    /// Fold a schedule update into this snapshot
    pub fn apply(&mut self, outcome: Outcome, update: &ScheduleUpdate) {
        self.current_tier = update.new_tier;
        self.next_review_at = update.next_review_at;
        self.last_outcome = Some(outcome);
    }
}

/// Input for authoring a new item
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItemInput {
    /// Prompt side
    pub front: String,
    /// Answer side
    #[serde(default)]
    pub back: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Days until the first review; `0` means due immediately
    #[serde(default)]
    pub initial_offset_days: u32,
}

impl NewItemInput {
    pub fn new(front: impl Into<String>) -> Self {
        Self {
            front: front.into(),
            ..Default::default()
        }
    }

    /// First due time for an item authored at `now`
    pub fn first_due(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_signed(Duration::days(i64::from(self.initial_offset_days)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Stored card: scheduling state plus authored content
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRecord {
    pub item: ReviewableItem,
    pub front: String,
    pub back: Option<String>,
    pub tags: Vec<String>,
    pub review_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
