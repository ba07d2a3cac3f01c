//! Review configuration
//!
//! Which interval ladder to use, whether the `partial` outcome exists, and
//! how a `partial` card is treated inside a running session.
//!
//! Serialized as camelCase JSON:
//!
//! ```json
//! { "ladderDays": [1, 3, 7, 14, 30], "supportsPartial": true, "partialPolicy": "hold-and-requeue" }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::schedule::{IntervalLadder, OutcomeMode, ScheduleEngine, ScheduleError};

/// Env var overriding the ladder, comma-separated days
pub const ENV_LADDER_DAYS: &str = "CADENCE_LADDER_DAYS";

/// Env var overriding the partial policy
pub const ENV_PARTIAL_POLICY: &str = "CADENCE_PARTIAL_POLICY";

/// Configuration error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed JSON
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// Invalid ladder or outcome settings
    #[error("Invalid configuration: {0}")]
    Schedule(#[from] ScheduleError),
    /// Unrecognized value for a setting
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// How a `partial` outcome affects the card's place in the session
///
/// The schedule tier is held in both cases; only session retirement differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PartialPolicy {
    /// Move the card to the back of the queue, like `forgotten`
    #[default]
    HoldAndRequeue,
    /// Retire the card for this session, like `remembered`
    HoldAndRetire,
}

impl PartialPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartialPolicy::HoldAndRequeue => "hold-and-requeue",
            PartialPolicy::HoldAndRetire => "hold-and-retire",
        }
    }

    pub fn parse_name(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "hold-and-requeue" | "requeue" => Some(PartialPolicy::HoldAndRequeue),
            "hold-and-retire" | "retire" => Some(PartialPolicy::HoldAndRetire),
            _ => None,
        }
    }
}

impl std::fmt::Display for PartialPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Settings shared by the schedule engine and session coordinator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReviewConfig {
    /// Interval ladder in days
    pub ladder_days: IntervalLadder,
    /// Three-outcome mode when true, two-outcome otherwise
    pub supports_partial: bool,
    /// Session handling of `partial`; ignored in two-outcome mode
    pub partial_policy: PartialPolicy,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            ladder_days: IntervalLadder::default(),
            supports_partial: true,
            partial_policy: PartialPolicy::default(),
        }
    }
}

impl ReviewConfig {
    /// Two-outcome configuration over the default ladder
    pub fn two_outcome() -> Self {
        Self {
            supports_partial: false,
            ..Self::default()
        }
    }

    /// Parse from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json(&content)?;
        tracing::debug!(path = %path.display(), "Loaded review configuration");
        Ok(config)
    }

    /// Apply `CADENCE_LADDER_DAYS` / `CADENCE_PARTIAL_POLICY` overrides
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(
            std::env::var(ENV_LADDER_DAYS).ok().as_deref(),
            std::env::var(ENV_PARTIAL_POLICY).ok().as_deref(),
        )
    }

    /// Apply explicit overrides; `None` leaves a setting unchanged
    pub fn with_overrides(
        mut self,
        ladder_days: Option<&str>,
        partial_policy: Option<&str>,
    ) -> Result<Self, ConfigError> {
        if let Some(days) = ladder_days.filter(|s| !s.trim().is_empty()) {
            self.ladder_days = IntervalLadder::parse_list(days)?;
        }
        if let Some(policy) = partial_policy.filter(|s| !s.trim().is_empty()) {
            self.partial_policy =
                PartialPolicy::parse_name(policy).ok_or_else(|| ConfigError::InvalidValue {
                    key: ENV_PARTIAL_POLICY,
                    value: policy.to_string(),
                })?;
        }
        Ok(self)
    }

    pub fn outcome_mode(&self) -> OutcomeMode {
        OutcomeMode::from_supports_partial(self.supports_partial)
    }

    /// Build the schedule engine for this configuration
    pub fn engine(&self) -> ScheduleEngine {
        ScheduleEngine::new(self.ladder_days.clone(), self.outcome_mode())
    }
}
