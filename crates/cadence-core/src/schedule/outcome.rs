//! Review outcome vocabulary

use serde::{Deserialize, Serialize};

use super::ScheduleError;

/// Result of a single review, as judged by the learner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Recalled correctly; the item advances one tier
    Remembered,
    /// Recalled with difficulty; the item holds its tier
    Partial,
    /// Not recalled; the item drops back to tier 0
    Forgotten,
}

impl Outcome {
    /// Every outcome, in button order
    pub const ALL: [Outcome; 3] = [Outcome::Remembered, Outcome::Partial, Outcome::Forgotten];

    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Remembered => "remembered",
            Outcome::Partial => "partial",
            Outcome::Forgotten => "forgotten",
        }
    }

    /// Parse from string name
    ///
    /// Accepts the canonical names case-insensitively. Anything else is an
    /// [`ScheduleError::InvalidOutcome`].
    pub fn parse_name(s: &str) -> Result<Self, ScheduleError> {
        match s.trim().to_lowercase().as_str() {
            "remembered" => Ok(Outcome::Remembered),
            "partial" => Ok(Outcome::Partial),
            "forgotten" => Ok(Outcome::Forgotten),
            _ => Err(ScheduleError::InvalidOutcome(s.to_string())),
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Outcome {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Outcome::parse_name(s)
    }
}

/// Which outcomes a product surface offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OutcomeMode {
    /// `remembered` and `forgotten` only
    TwoOutcome,
    /// `remembered`, `partial` and `forgotten`
    #[default]
    ThreeOutcome,
}

impl OutcomeMode {
    pub fn from_supports_partial(supports_partial: bool) -> Self {
        if supports_partial {
            OutcomeMode::ThreeOutcome
        } else {
            OutcomeMode::TwoOutcome
        }
    }

    /// Whether `outcome` belongs to this vocabulary
    pub fn allows(&self, outcome: Outcome) -> bool {
        match self {
            OutcomeMode::ThreeOutcome => true,
            OutcomeMode::TwoOutcome => outcome != Outcome::Partial,
        }
    }

    /// Outcomes offered in this mode, in button order
    pub fn outcomes(&self) -> Vec<Outcome> {
        Outcome::ALL
            .into_iter()
            .filter(|o| self.allows(*o))
            .collect()
    }
}
