//! Blocking fixed-interval poller
//!
//! Re-evaluates a condition until it returns `Ok` or the policy's deadline
//! leaves no room for another attempt. The condition is always evaluated at
//! least once, and the error surfaced on timeout is the one from the final
//! evaluation.

use std::borrow::Cow;
use std::fmt;

use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::Unsatisfied;
use crate::policy::{PollPolicy, Step};

/// Bounded poller bound to a policy and a clock
#[derive(Debug, Clone)]
pub struct Poller<C = SystemClock> {
    policy: PollPolicy,
    clock: C,
    label: Cow<'static, str>,
}

impl Poller {
    /// Create a poller on the system clock
    pub fn new(policy: PollPolicy) -> Self {
        Self {
            policy,
            clock: SystemClock,
            label: Cow::Borrowed("poll"),
        }
    }
}

impl<C: Clock> Poller<C> {
    /// Replace the time source
    pub fn with_clock<D: Clock>(self, clock: D) -> Poller<D> {
        Poller {
            policy: self.policy,
            clock,
            label: self.label,
        }
    }

    /// Label attached to log events
    pub fn named(mut self, label: impl Into<Cow<'static, str>>) -> Self {
        self.label = label.into();
        self
    }

    /// The policy this poller runs with
    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Evaluate `condition` until it succeeds or the deadline passes.
    ///
    /// Returns the first `Ok` value. On timeout the returned
    /// [`Unsatisfied`] wraps the error from the last evaluation.
    pub fn run<T, E, F>(&self, mut condition: F) -> Result<T, Unsatisfied<E>>
    where
        F: FnMut() -> Result<T, E>,
        E: fmt::Display,
    {
        let start = self.clock.now();
        let mut attempt: u32 = 1;

        loop {
            match condition() {
                Ok(value) => {
                    if attempt > 1 {
                        info!(
                            poller = %self.label,
                            attempts = attempt,
                            elapsed_ms = self.clock.now().saturating_duration_since(start).as_millis(),
                            "Condition satisfied"
                        );
                    }
                    return Ok(value);
                }
                Err(err) => {
                    let elapsed = self.clock.now().saturating_duration_since(start);
                    match self.policy.next_step(elapsed) {
                        Step::Retry(delay) => {
                            debug!(
                                poller = %self.label,
                                attempt,
                                elapsed_ms = elapsed.as_millis(),
                                error = %err,
                                "Condition not yet satisfied"
                            );
                            self.clock.sleep(delay);
                            attempt = attempt.saturating_add(1);
                        }
                        Step::GiveUp => {
                            warn!(
                                poller = %self.label,
                                attempts = attempt,
                                elapsed_ms = elapsed.as_millis(),
                                timeout_ms = self.policy.timeout().as_millis(),
                                error = %err,
                                "Condition unsatisfied by deadline"
                            );
                            return Err(Unsatisfied::new(attempt, elapsed, err));
                        }
                    }
                }
            }
        }
    }
}

/// Poll `condition` on the system clock with `policy`
pub fn poll<T, E, F>(policy: PollPolicy, condition: F) -> Result<T, Unsatisfied<E>>
where
    F: FnMut() -> Result<T, E>,
    E: fmt::Display,
{
    Poller::new(policy).run(condition)
}
