//! Limited re-runs of whole operations that failed for a known transient
//! reason, such as a pooled connection that was still allocated.

use std::fmt;

use tracing::info;

/// Default number of runs, including the first
pub const DEFAULT_RERUN_LIMIT: u32 = 3;

/// Decides whether a failed operation is worth running again
pub struct RerunGate<E> {
    limit: u32,
    reruns: u32,
    classifier: Box<dyn Fn(&E) -> bool + Send + Sync>,
}

impl<E> RerunGate<E> {
    /// Gate that re-runs while `classifier` accepts the failure and fewer
    /// than `limit` decisions have been made
    pub fn new(limit: u32, classifier: impl Fn(&E) -> bool + Send + Sync + 'static) -> Self {
        Self {
            limit,
            reruns: 0,
            classifier: Box::new(classifier),
        }
    }

    /// Gate with [`DEFAULT_RERUN_LIMIT`]
    pub fn with_default_limit(classifier: impl Fn(&E) -> bool + Send + Sync + 'static) -> Self {
        Self::new(DEFAULT_RERUN_LIMIT, classifier)
    }

    /// Record a failure and decide whether to run again.
    ///
    /// Every call counts toward the limit, whatever the classifier says.
    pub fn should_rerun(&mut self, error: &E) -> bool
    where
        E: fmt::Display,
    {
        self.reruns = self.reruns.saturating_add(1);
        if self.reruns >= self.limit {
            info!(rerun = self.reruns, limit = self.limit, error = %error, "Rerun limit reached");
            return false;
        }
        let rerun = (self.classifier)(error);
        info!(rerun = self.reruns, should_rerun = rerun, error = %error, "Rerun decision");
        rerun
    }

    /// Decisions made so far
    pub fn reruns(&self) -> u32 {
        self.reruns
    }
}

impl<E> fmt::Debug for RerunGate<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RerunGate")
            .field("limit", &self.limit)
            .field("reruns", &self.reruns)
            .finish_non_exhaustive()
    }
}

/// Run `operation` until it succeeds or `gate` refuses another run
pub fn run_with_reruns<T, E, F>(gate: &mut RerunGate<E>, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    E: fmt::Display,
{
    loop {
        match operation() {
            Ok(value) => return Ok(value),
            Err(err) if gate.should_rerun(&err) => {}
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transient(message: &String) -> bool {
        message.contains("connection still allocated")
    }

    #[test]
    fn transient_failures_are_rerun_up_to_limit() {
        let mut gate = RerunGate::with_default_limit(transient);
        let err = String::from("IllegalState: connection still allocated");

        assert!(gate.should_rerun(&err));
        assert!(gate.should_rerun(&err));
        assert!(!gate.should_rerun(&err));
        assert_eq!(gate.reruns(), 3);
    }

    #[test]
    fn other_failures_are_not_rerun() {
        let mut gate = RerunGate::with_default_limit(transient);
        assert!(!gate.should_rerun(&String::from("expected 200, got 404")));
    }

    #[test]
    fn limit_counts_rejected_decisions_too() {
        let mut gate = RerunGate::new(2, transient);
        assert!(!gate.should_rerun(&String::from("assertion failed")));
        assert!(!gate.should_rerun(&String::from("connection still allocated")));
    }

    #[test]
    fn run_with_reruns_returns_first_success() {
        let mut gate = RerunGate::with_default_limit(transient);
        let mut runs = 0;

        let result = run_with_reruns(&mut gate, || {
            runs += 1;
            if runs == 1 {
                Err(String::from("connection still allocated"))
            } else {
                Ok(runs)
            }
        });

        assert_eq!(result, Ok(2));
    }

    #[test]
    fn run_with_reruns_returns_last_error() {
        let mut gate = RerunGate::with_default_limit(transient);
        let mut runs = 0;

        let result: Result<(), String> = run_with_reruns(&mut gate, || {
            runs += 1;
            Err(format!("connection still allocated (run {runs})"))
        });

        assert_eq!(result.unwrap_err(), "connection still allocated (run 3)");
    }
}
