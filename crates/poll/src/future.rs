//! Async poller on the tokio timer

use std::borrow::Cow;
use std::fmt;
use std::future::Future;

use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::error::Unsatisfied;
use crate::policy::{PollPolicy, Step};

/// Async counterpart of [`Poller`](crate::Poller).
///
/// Same attempt schedule and failure semantics, but the wait between
/// attempts yields to the runtime instead of blocking the thread. Elapsed
/// time comes from `tokio::time::Instant`, so paused test time applies.
#[derive(Debug, Clone)]
pub struct AsyncPoller {
    policy: PollPolicy,
    label: Cow<'static, str>,
}

impl AsyncPoller {
    /// Create an async poller
    pub fn new(policy: PollPolicy) -> Self {
        Self {
            policy,
            label: Cow::Borrowed("poll"),
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

    /// Evaluate `condition` until it resolves to `Ok` or the deadline passes
    pub async fn run<T, E, F, Fut>(&self, mut condition: F) -> Result<T, Unsatisfied<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let start = Instant::now();
        let mut attempt: u32 = 1;

        loop {
            match condition().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(
                            poller = %self.label,
                            attempts = attempt,
                            elapsed_ms = start.elapsed().as_millis(),
                            "Condition satisfied"
                        );
                    }
                    return Ok(value);
                }
                Err(err) => {
                    let elapsed = start.elapsed();
                    match self.policy.next_step(elapsed) {
                        Step::Retry(delay) => {
                            debug!(
                                poller = %self.label,
                                attempt,
                                elapsed_ms = elapsed.as_millis(),
                                error = %err,
                                "Condition not yet satisfied"
                            );
                            sleep(delay).await;
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
