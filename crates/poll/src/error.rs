//! Error types for polling, waiting and probing

use std::time::Duration;
use thiserror::Error;

/// A condition was still failing when the poll deadline was reached.
///
/// Displays exactly as the last condition error, so whatever diagnostic the
/// condition attached ("previous run time: X, new run time: X") reaches the
/// user unchanged. The attempt count and elapsed time are available for
/// callers that want to log them separately.
#[derive(Error, Debug)]
#[error("{last}")]
pub struct Unsatisfied<E> {
    attempts: u32,
    elapsed: Duration,
    #[source]
    last: E,
}

impl<E> Unsatisfied<E> {
    pub(crate) fn new(attempts: u32, elapsed: Duration, last: E) -> Self {
        Self {
            attempts,
            elapsed,
            last,
        }
    }

    /// Number of times the condition was evaluated
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Time spent polling, measured after the final evaluation
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// The error returned by the final evaluation
    pub fn last(&self) -> &E {
        &self.last
    }

    /// Take the final condition error
    pub fn into_inner(self) -> E {
        self.last
    }
}

/// Invalid polling or probing parameters
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyError {
    /// Poll interval was zero
    #[error("poll interval must be greater than zero")]
    ZeroInterval,

    /// Rate was zero evaluations per second
    #[error("rate must be at least one evaluation per second")]
    ZeroRate,
}

/// A rate-limited predicate wait ran out of evaluations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WaitError {
    /// The predicate never returned `true`
    #[error("Failed to wait for {description}.")]
    TimedOut {
        /// What was being waited for
        description: String,
        /// Number of predicate evaluations performed
        attempts: u64,
    },
}

/// The availability probe could not be started
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The background probing thread failed to spawn
    #[error("failed to spawn probe thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// A check condition did not hold
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct Mismatch {
    message: String,
}

impl Mismatch {
    /// Create a mismatch with the given message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The failure message
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn unsatisfied_displays_last_error_verbatim() {
        let err = Unsatisfied::new(3, Duration::from_millis(200), Mismatch::new("not yet: 3"));
        assert_eq!(err.to_string(), "not yet: 3");
        assert_eq!(err.attempts(), 3);
        assert_eq!(err.elapsed(), Duration::from_millis(200));
        assert_eq!(err.source().map(ToString::to_string).as_deref(), Some("not yet: 3"));
    }

    #[test]
    fn unsatisfied_works_with_plain_string_errors() {
        let err = Unsatisfied::new(1, Duration::ZERO, String::from("status was 503"));
        assert_eq!(err.to_string(), "status was 503");
        assert_eq!(err.into_inner(), "status was 503");
    }

    #[test]
    fn wait_error_message() {
        let err = WaitError::TimedOut {
            description: "elasticsearch".into(),
            attempts: 50,
        };
        assert_eq!(err.to_string(), "Failed to wait for elasticsearch.");
    }
}
