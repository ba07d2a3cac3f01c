//! Interval ladder
//!
//! The forgetting-curve policy as a fixed, ordered list of day offsets. Tier
//! `n` of an item maps to `days[n]`; the last entry is the longest interval
//! an item can ever reach.

use serde::{Deserialize, Serialize};

use super::ScheduleError;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Default ladder: 1, 3, 7, 14, 30 days
pub const DEFAULT_LADDER_DAYS: [u32; 5] = [1, 3, 7, 14, 30];

/// Upper bound on a single rung, roughly a century
pub const MAX_LADDER_DAYS: u32 = 36_500;

// ============================================================================
// LADDER
// ============================================================================

/// Validated interval ladder
///
/// Always non-empty, non-decreasing, and bounded by [`MAX_LADDER_DAYS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct IntervalLadder {
    days: Vec<u32>,
}

impl IntervalLadder {
    /// Build a ladder from day offsets
    pub fn new(days: Vec<u32>) -> Result<Self, ScheduleError> {
        if days.is_empty() {
            return Err(ScheduleError::InvalidLadder(
                "ladder must contain at least one interval".to_string(),
            ));
        }
        if let Some(&too_long) = days.iter().find(|d| **d > MAX_LADDER_DAYS) {
            return Err(ScheduleError::InvalidLadder(format!(
                "interval of {} days exceeds the maximum of {}",
                too_long, MAX_LADDER_DAYS
            )));
        }
        if days.windows(2).any(|w| w[1] < w[0]) {
            return Err(ScheduleError::InvalidLadder(format!(
                "intervals must be non-decreasing: {:?}",
                days
            )));
        }
        Ok(Self { days })
    }

    /// Parse a comma-separated list such as `"1,3,7,14,30"`
    pub fn parse_list(s: &str) -> Result<Self, ScheduleError> {
        let days = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.parse::<u32>().map_err(|e| {
                    ScheduleError::InvalidLadder(format!("invalid interval '{}': {}", part, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(days)
    }

    /// Index of the top tier
    pub fn last_tier(&self) -> u32 {
        // Non-empty by construction
        (self.days.len() - 1) as u32
    }

    /// Number of tiers
    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Saturate a tier at the top of the ladder
    pub fn clamp_tier(&self, tier: u32) -> u32 {
        tier.min(self.last_tier())
    }

    /// Day offset for a tier (tiers past the top use the longest interval)
    pub fn days_at(&self, tier: u32) -> u32 {
        self.days[self.clamp_tier(tier) as usize]
    }

    /// The raw day offsets
    pub fn days(&self) -> &[u32] {
        &self.days
    }
}

impl Default for IntervalLadder {
    fn default() -> Self {
        Self {
            days: DEFAULT_LADDER_DAYS.to_vec(),
        }
    }
}

impl TryFrom<Vec<u32>> for IntervalLadder {
    type Error = ScheduleError;

    fn try_from(days: Vec<u32>) -> Result<Self, Self::Error> {
        Self::new(days)
    }
}

impl From<IntervalLadder> for Vec<u32> {
    fn from(ladder: IntervalLadder) -> Self {
        ladder.days
    }
}
