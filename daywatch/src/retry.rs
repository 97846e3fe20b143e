//! Retry policy for the run controller
//!
//! Classifies failures into retryable and fatal, bounds the number of
//! attempts inside one run and computes the backoff between attempts.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::RunError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Retryable,
    Fatal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Attempts per run; `None` retries until an attempt succeeds or fails fatally.
    pub max_attempts: Option<u32>,
    /// Delay before the second attempt (0 = restart immediately)
    pub initial_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub max_backoff_ms: u64,
    /// Treat a missing executable as fatal instead of retrying the launch
    pub fatal_on_missing_executable: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Some(10),
            initial_backoff_ms: 0,
            backoff_multiplier: 2.0,
            max_backoff_ms: 60_000,
            fatal_on_missing_executable: true,
        }
    }
}

impl RetryPolicy {
    /// Unbounded, immediate restarts.
    pub fn unbounded() -> Self {
        Self {
            max_attempts: None,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_backoff(mut self, initial: Duration, multiplier: f64, max: Duration) -> Self {
        self.initial_backoff_ms = initial.as_millis() as u64;
        self.backoff_multiplier = multiplier;
        self.max_backoff_ms = max.as_millis() as u64;
        self
    }

    pub fn classify(&self, error: &RunError) -> ErrorClass {
        match error {
            RunError::ExecutableMissing(_) if self.fatal_on_missing_executable => ErrorClass::Fatal,
            RunError::InvalidPattern(_) | RunError::UnsupportedPlatform(_) => ErrorClass::Fatal,
            _ => ErrorClass::Retryable,
        }
    }

    /// Whether another attempt may follow attempt number `attempt` (1-based).
    pub fn allows_another(&self, attempt: u32) -> bool {
        match self.max_attempts {
            Some(max) => attempt < max,
            None => true,
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        if self.initial_backoff_ms == 0 {
            return Duration::ZERO;
        }
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let millis = self.initial_backoff_ms as f64 * self.backoff_multiplier.max(1.0).powi(exponent);
        Duration::from_millis(millis.min(self.max_backoff_ms as f64) as u64)
    }
}
