//! Rate-limited boolean waits
//!
//! Where [`Poller`](crate::Poller) works with fallible conditions that carry
//! a diagnostic, a [`Waiter`] checks a plain predicate at a fixed rate and
//! reports only what it was waiting for.

use std::time::Duration;

use tracing::{debug, warn};

use crate::clock::{Clock, Pacer, SystemClock};
use crate::error::{PolicyError, WaitError};

/// Evaluations per second used by [`wait_for`]
pub const DEFAULT_RATE: u32 = 5;

/// Rate-limited predicate wait
#[derive(Debug, Clone)]
pub struct Waiter<C = SystemClock> {
    description: String,
    rate: u32,
    clock: C,
}

impl Waiter {
    /// Create a waiter evaluating [`DEFAULT_RATE`] times per second
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            rate: DEFAULT_RATE,
            clock: SystemClock,
        }
    }
}

impl<C: Clock> Waiter<C> {
    /// Set the number of evaluations per second
    pub fn rate(mut self, per_second: u32) -> Result<Self, PolicyError> {
        if per_second == 0 {
            return Err(PolicyError::ZeroRate);
        }
        self.rate = per_second;
        Ok(self)
    }

    /// Replace the time source
    pub fn with_clock<D: Clock>(self, clock: D) -> Waiter<D> {
        Waiter {
            description: self.description,
            rate: self.rate,
            clock,
        }
    }

    /// Spacing between two evaluations
    pub fn spacing(&self) -> Duration {
        Duration::from_secs(1) / self.rate
    }

    /// Number of evaluations a `timeout` allows: whole seconds times the
    /// rate, and never less than one
    pub fn attempts_for(&self, timeout: Duration) -> u64 {
        timeout
            .as_secs()
            .saturating_mul(u64::from(self.rate))
            .max(1)
    }

    /// Evaluate `predicate` until it returns `true` or the evaluation budget
    /// for `timeout` is spent
    pub fn wait<F>(&self, timeout: Duration, mut predicate: F) -> Result<(), WaitError>
    where
        F: FnMut() -> bool,
    {
        let attempts = self.attempts_for(timeout);
        let mut pacer = Pacer::per_second(self.rate);

        for attempt in 1..=attempts {
            pacer.acquire(&self.clock);
            if predicate() {
                debug!(description = %self.description, attempt, "Wait finished");
                return Ok(());
            }
        }

        warn!(description = %self.description, attempts, "Wait timed out");
        Err(WaitError::TimedOut {
            description: self.description.clone(),
            attempts,
        })
    }
}

/// Wait for `predicate` at [`DEFAULT_RATE`] evaluations per second
pub fn wait_for<F>(description: impl Into<String>, timeout: Duration, predicate: F) -> Result<(), WaitError>
where
    F: FnMut() -> bool,
{
    Waiter::new(description).wait(timeout, predicate)
}
