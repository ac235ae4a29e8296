//! Engine configuration
//!
//! Passed explicitly to the reconciler; nothing here is read from ambient
//! process state.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry configuration for conflicting operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first call
    pub max_attempts: u32,

    /// Initial delay between retries
    #[serde(with = "millis")]
    pub initial_delay: Duration,

    /// Maximum delay between retries
    #[serde(with = "millis")]
    pub max_delay: Duration,

    /// Backoff multiplier
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    /// Delay before retry number `attempt` (0-based), capped at `max_delay`
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(attempt.min(i32::MAX as u32) as i32);
        let delay = self.initial_delay.as_secs_f64() * factor;
        if !delay.is_finite() || delay >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(delay)
        }
    }

    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 60,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

/// Per-operation deadlines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    #[serde(with = "millis")]
    pub create: Duration,
    #[serde(with = "millis")]
    pub read: Duration,
    #[serde(with = "millis")]
    pub update: Duration,
    #[serde(with = "millis")]
    pub delete: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: Duration::from_secs(60 * 60),
            read: Duration::from_secs(60),
            update: Duration::from_secs(60 * 60),
            delete: Duration::from_secs(30 * 60),
        }
    }
}

/// Reconciliation engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub retry: RetryConfig,

    pub timeouts: Timeouts,

    /// Interval between operation status polls
    #[serde(with = "millis")]
    pub poll_interval: Duration,

    /// Treat a vanished delete target as already deleted
    pub ignore_missing_on_delete: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            timeouts: Timeouts::default(),
            poll_interval: Duration::from_secs(1),
            ignore_missing_on_delete: true,
        }
    }
}

/// Durations as integer milliseconds
mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
