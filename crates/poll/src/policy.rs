//! Poll cadence and deadline

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

/// What the poller does after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Sleep for the given duration, then evaluate again
    Retry(Duration),
    /// Stop and surface the last failure
    GiveUp,
}

/// Fixed-interval polling policy.
///
/// Durations serialize in human-readable form (`"500ms"`, `"5s"`).
///
/// A policy whose `timeout` is shorter than its `interval` is degenerate:
/// the condition is evaluated exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPolicy")]
pub struct PollPolicy {
    /// Sleep between attempts
    #[serde(with = "humantime_serde")]
    interval: Duration,
    /// Total budget, measured from the first attempt
    #[serde(with = "humantime_serde")]
    timeout: Duration,
}

#[derive(Deserialize)]
struct RawPolicy {
    #[serde(with = "humantime_serde")]
    interval: Duration,
    #[serde(with = "humantime_serde")]
    timeout: Duration,
}

impl TryFrom<RawPolicy> for PollPolicy {
    type Error = PolicyError;

    fn try_from(raw: RawPolicy) -> Result<Self, Self::Error> {
        Self::new(raw.interval, raw.timeout)
    }
}

impl PollPolicy {
    /// Create a policy. `interval` must be non-zero.
    pub fn new(interval: Duration, timeout: Duration) -> Result<Self, PolicyError> {
        if interval.is_zero() {
            return Err(PolicyError::ZeroInterval);
        }
        Ok(Self { interval, timeout })
    }

    /// Create a policy from millisecond values
    pub fn from_millis(interval_ms: u64, timeout_ms: u64) -> Result<Self, PolicyError> {
        Self::new(
            Duration::from_millis(interval_ms),
            Duration::from_millis(timeout_ms),
        )
    }

    /// Sleep between attempts
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Total polling budget
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `true` when only a single attempt fits in the budget
    pub fn is_degenerate(&self) -> bool {
        self.timeout < self.interval
    }

    /// Decide what follows a failed attempt that finished `elapsed` after
    /// the first one started.
    ///
    /// Another attempt is scheduled only if it would begin no later than the
    /// deadline, so the poller never sleeps past the budget just to fail.
    pub fn next_step(&self, elapsed: Duration) -> Step {
        match elapsed.checked_add(self.interval) {
            Some(next) if next <= self.timeout => Step::Retry(self.interval),
            _ => Step::GiveUp,
        }
    }
}
