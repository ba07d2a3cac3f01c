//! Review Scheduling Module
//!
//! Fixed-ladder spaced repetition. Each item sits on a tier of an interval
//! ladder (default `[1, 3, 7, 14, 30]` days); review outcomes move it up,
//! hold it, or reset it to the bottom rung.
//!
//! ## Outcomes:
//! - `remembered`: advance one tier, saturating at the top
//! - `partial`: hold the current tier (three-outcome mode only)
//! - `forgotten`: reset to tier 0

mod engine;
mod ladder;
mod outcome;

pub use engine::{format_interval, PreviewOption, ScheduleEngine, SchedulePreview, ScheduleUpdate};
pub use ladder::{IntervalLadder, DEFAULT_LADDER_DAYS, MAX_LADDER_DAYS};
pub use outcome::{Outcome, OutcomeMode};

/// Schedule error type
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    /// Outcome name is unknown, or not part of the configured vocabulary
    #[error("Invalid outcome: {0}")]
    InvalidOutcome(String),
    /// Interval ladder failed validation
    #[error("Invalid interval ladder: {0}")]
    InvalidLadder(String),
}
