//! Planner configuration.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, Result};

/// Global allowlist enforcement mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllowlistMode {
    /// Only commands matching an active pattern are allowed.
    #[default]
    Strict,
    /// Every command is allowed.
    Off,
}

impl FromStr for AllowlistMode {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "off" => Ok(Self::Off),
            other => Err(PlannerError::InvalidMode(other.to_string())),
        }
    }
}

impl std::fmt::Display for AllowlistMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AllowlistMode::Strict => write!(f, "strict"),
            AllowlistMode::Off => write!(f, "off"),
        }
    }
}

/// Everything the planner needs to know at startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlannerConfig {
    /// Comma-separated list of active rule-set names.
    pub allowlist: String,
    pub allowlist_mode: AllowlistMode,
    /// Operator-defined rule-sets. A name shared with a built-in set replaces it.
    pub custom_sets: BTreeMap<String, Vec<String>>,
    pub max_stages: usize,
    /// Maximum trimmed command length, in characters.
    pub max_command_length: usize,
    pub cache_ttl_ms: u64,
    /// Per-attempt generator timeout (milliseconds).
    pub generator_timeout_ms: u64,
    /// Total generator attempts (1 = no retries).
    pub max_attempts: u32,
    /// Base delay for exponential backoff between attempts (milliseconds).
    pub backoff_base_ms: u64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            allowlist: "base".to_string(),
            allowlist_mode: AllowlistMode::Strict,
            custom_sets: BTreeMap::new(),
            max_stages: 12,
            max_command_length: 500,
            cache_ttl_ms: 300_000,
            generator_timeout_ms: 30_000,
            max_attempts: 3,
            backoff_base_ms: 500,
        }
    }
}

impl PlannerConfig {
    /// Reject configurations that could never produce a usable plan.
    pub fn validate(&self) -> Result<()> {
        if self.max_stages == 0 {
            return Err(PlannerError::InvalidConfig(
                "max_stages must be at least 1".to_string(),
            ));
        }
        if self.max_command_length == 0 {
            return Err(PlannerError::InvalidConfig(
                "max_command_length must be at least 1".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(PlannerError::InvalidConfig(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Active rule-set names, in the order given. Blank entries are skipped.
    pub fn active_set_names(&self) -> Vec<String> {
        self.allowlist
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff_base: Duration::from_millis(self.backoff_base_ms),
            attempt_timeout: Duration::from_millis(self.generator_timeout_ms),
        }
    }
}

/// Bounded retry schedule for generator calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    /// Delay to wait before the zero-based `attempt`.
    ///
    /// Attempt 0 never waits; attempt `k` waits `backoff_base * 2^(k-1)`.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(attempt - 1);
        self.backoff_base.saturating_mul(factor)
    }

    /// Worst-case wall-clock time of a full retry run.
    pub fn worst_case(&self) -> Duration {
        (0..self.max_attempts).fold(Duration::ZERO, |acc, attempt| {
            acc.saturating_add(self.attempt_timeout)
                .saturating_add(self.delay_before(attempt))
        })
    }
}
