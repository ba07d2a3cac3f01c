//! Schedule Engine
//!
//! Pure mapping from `(current tier, outcome, now)` to `(new tier, next review)`.
//!
//! | Outcome      | New tier                  | Next review               |
//! |--------------|---------------------------|---------------------------|
//! | `remembered` | `min(tier + 1, last)`     | `now + ladder[new] days`  |
//! | `partial`    | `tier` (held)             | `now + ladder[tier] days` |
//! | `forgotten`  | `0`                       | `now + ladder[0] days`    |
//!
//! The engine never reads a clock: `now` is always supplied by the caller.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{IntervalLadder, Outcome, OutcomeMode, ScheduleError};

/// Result of applying one outcome to one item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleUpdate {
    pub new_tier: u32,
    pub next_review_at: DateTime<Utc>,
    /// Day offset that produced `next_review_at`
    pub interval_days: u32,
}

/// What each outcome would do, for labelling review buttons
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulePreview {
    pub current_tier: u32,
    pub options: Vec<PreviewOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewOption {
    pub outcome: Outcome,
    pub update: ScheduleUpdate,
    /// Short human label for the interval, e.g. `2w`
    pub label: String,
}

/// Stateless scheduler over a fixed ladder and outcome vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScheduleEngine {
    ladder: IntervalLadder,
    mode: OutcomeMode,
}

impl ScheduleEngine {
    pub fn new(ladder: IntervalLadder, mode: OutcomeMode) -> Self {
        Self { ladder, mode }
    }

    pub fn ladder(&self) -> &IntervalLadder {
        &self.ladder
    }

    pub fn mode(&self) -> OutcomeMode {
        self.mode
    }

    /// Compute the new tier and next review time for one outcome
    ///
    /// `current_tier` above the top of the ladder is treated as the top tier.
    /// Fails with [`ScheduleError::InvalidOutcome`] when `outcome` is outside
    /// the configured vocabulary.
    pub fn apply_outcome(
        &self,
        current_tier: u32,
        outcome: Outcome,
        now: DateTime<Utc>,
    ) -> Result<ScheduleUpdate, ScheduleError> {
        if !self.mode.allows(outcome) {
            return Err(ScheduleError::InvalidOutcome(outcome.as_str().to_string()));
        }

        let tier = self.ladder.clamp_tier(current_tier);
        let new_tier = match outcome {
            Outcome::Remembered => self.ladder.clamp_tier(tier.saturating_add(1)),
            Outcome::Partial => tier,
            Outcome::Forgotten => 0,
        };
        let interval_days = self.ladder.days_at(new_tier);

        Ok(ScheduleUpdate {
            new_tier,
            next_review_at: add_days_saturating(now, interval_days),
            interval_days,
        })
    }

    /// Same as [`apply_outcome`](Self::apply_outcome) for a raw outcome name
    pub fn apply_outcome_name(
        &self,
        current_tier: u32,
        outcome: &str,
        now: DateTime<Utc>,
    ) -> Result<ScheduleUpdate, ScheduleError> {
        let outcome = Outcome::parse_name(outcome)?;
        self.apply_outcome(current_tier, outcome, now)
    }

    /// Preview every outcome in the vocabulary
    pub fn preview(&self, current_tier: u32, now: DateTime<Utc>) -> SchedulePreview {
        let options = self
            .mode
            .outcomes()
            .into_iter()
            .filter_map(|outcome| {
                self.apply_outcome(current_tier, outcome, now)
                    .ok()
                    .map(|update| PreviewOption {
                        outcome,
                        label: format_interval(update.interval_days),
                        update,
                    })
            })
            .collect();

        SchedulePreview {
            current_tier: self.ladder.clamp_tier(current_tier),
            options,
        }
    }
}

/// `now + days`, pinned to the largest representable instant on overflow
fn add_days_saturating(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    now.checked_add_signed(Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Format an interval in days to a short label
pub fn format_interval(days: u32) -> String {
    match days {
        0 => "now".to_string(),
        1..=6 => format!("{}d", days),
        7..=29 => format!("{}w", days / 7),
        30..=364 => format!("{}mo", days / 30),
        _ => format!("{}y", days / 365),
    }
}
