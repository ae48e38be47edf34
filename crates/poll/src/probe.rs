//! Background availability probe
//!
//! Calls a probing function at a fixed rate on a dedicated thread while the
//! caller does something disruptive (an upgrade, a reindex), then reports
//! how many probes succeeded.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::clock::{Clock, Pacer, SystemClock};
use crate::error::{PolicyError, ProbeError};

/// How long [`RunningProbe::stop`] waits for the probe thread to exit
pub const STOP_GRACE: Duration = Duration::from_secs(10);

/// Result of a single probe
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProbeOutcome {
    /// The service answered as expected
    Ok,
    /// The service answered, but not as expected
    Fail,
    /// The probe itself failed; the string names the failure class
    Failure(String),
}

impl ProbeOutcome {
    /// Outcome for a failed probe call, classified by the error's variant
    /// or type name as it appears in its `Debug` output
    pub fn from_error<E: fmt::Debug>(error: &E) -> Self {
        let rendered = format!("{error:?}");
        let kind: String = rendered
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == ':')
            .collect();
        if kind.is_empty() {
            Self::Fail
        } else {
            Self::Failure(kind)
        }
    }

    /// `true` for [`ProbeOutcome::Ok`]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => f.write_str("OK"),
            Self::Fail => f.write_str("FAIL"),
            Self::Failure(kind) => f.write_str(kind),
        }
    }
}

/// Snapshot of probe outcome counts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeStats {
    results: BTreeMap<ProbeOutcome, u64>,
}

impl ProbeStats {
    /// Number of probes that produced `outcome`
    pub fn count(&self, outcome: &ProbeOutcome) -> u64 {
        self.results.get(outcome).copied().unwrap_or(0)
    }

    /// Total number of probes
    pub fn total(&self) -> u64 {
        self.results.values().sum()
    }

    /// Successful probes as an integer percentage, truncated
    pub fn success_ratio_percent(&self) -> u32 {
        let ok = self.count(&ProbeOutcome::Ok);
        if ok == 0 {
            return 0;
        }
        (((ok * 1000) / self.total()) / 10) as u32
    }

    /// Iterate outcomes and counts in a stable order
    pub fn iter(&self) -> impl Iterator<Item = (&ProbeOutcome, u64)> {
        self.results.iter().map(|(outcome, count)| (outcome, *count))
    }

    fn record(&mut self, outcome: ProbeOutcome) {
        *self.results.entry(outcome).or_insert(0) += 1;
    }
}

impl fmt::Display for ProbeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (outcome, count)) in self.results.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{outcome}={count}")?;
        }
        f.write_str("}")
    }
}

impl FromIterator<ProbeOutcome> for ProbeStats {
    fn from_iter<I: IntoIterator<Item = ProbeOutcome>>(iter: I) -> Self {
        let mut stats = Self::default();
        for outcome in iter {
            stats.record(outcome);
        }
        stats
    }
}

/// Availability probe that has not been started yet
pub struct AvailabilityProbe<F, C = SystemClock> {
    rate: u32,
    probe: F,
    clock: C,
}

impl<F> AvailabilityProbe<F>
where
    F: FnMut() -> ProbeOutcome + Send + 'static,
{
    /// Probe `requests_per_second` times per second using `probe`
    pub fn new(requests_per_second: u32, probe: F) -> Result<Self, PolicyError> {
        if requests_per_second == 0 {
            return Err(PolicyError::ZeroRate);
        }
        Ok(Self {
            rate: requests_per_second,
            probe,
            clock: SystemClock,
        })
    }
}

impl<F, C> AvailabilityProbe<F, C>
where
    F: FnMut() -> ProbeOutcome + Send + 'static,
    C: Clock + 'static,
{
    /// Replace the time source used to pace probes
    pub fn with_clock<D: Clock + 'static>(self, clock: D) -> AvailabilityProbe<F, D> {
        AvailabilityProbe {
            rate: self.rate,
            probe: self.probe,
            clock,
        }
    }

    /// Spawn the probing thread
    pub fn start(self) -> Result<RunningProbe, ProbeError> {
        let stats = Arc::new(Mutex::new(ProbeStats::default()));
        let stop = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = mpsc::channel::<()>();

        let Self {
            rate,
            mut probe,
            clock,
        } = self;
        let thread_stats = Arc::clone(&stats);
        let thread_stop = Arc::clone(&stop);

        let handle = std::thread::Builder::new()
            .name("settle-probe".into())
            .spawn(move || {
                // dropped on exit, including unwinding, which wakes `stop`
                let _done = done_tx;
                let mut pacer = Pacer::per_second(rate);
                while !thread_stop.load(Ordering::Acquire) {
                    pacer.acquire(&clock);
                    if thread_stop.load(Ordering::Acquire) {
                        break;
                    }
                    let outcome = probe();
                    thread_stats.lock().record(outcome);
                }
            })?;

        debug!(rate, "Availability probe started");
        Ok(RunningProbe {
            stats,
            stop,
            done: done_rx,
            handle: Some(handle),
        })
    }
}

impl<F, C: fmt::Debug> fmt::Debug for AvailabilityProbe<F, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvailabilityProbe")
            .field("rate", &self.rate)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

/// Handle to a probe running on its own thread
#[derive(Debug)]
pub struct RunningProbe {
    stats: Arc<Mutex<ProbeStats>>,
    stop: Arc<AtomicBool>,
    done: mpsc::Receiver<()>,
    handle: Option<JoinHandle<()>>,
}

impl RunningProbe {
    /// Current outcome counts
    pub fn stats(&self) -> ProbeStats {
        self.stats.lock().clone()
    }

    /// Stop probing and return the final counts.
    ///
    /// Waits up to [`STOP_GRACE`] for an in-flight probe to finish; a probe
    /// thread that does not exit in time is left detached.
    pub fn stop(self) -> ProbeStats {
        self.stop_with_grace(STOP_GRACE)
    }

    /// [`RunningProbe::stop`] with a custom grace period
    pub fn stop_with_grace(mut self, grace: Duration) -> ProbeStats {
        self.stop.store(true, Ordering::Release);

        match self.done.recv_timeout(grace) {
            Err(RecvTimeoutError::Timeout) => {
                warn!(grace_ms = grace.as_millis(), "Probe thread did not stop in time");
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if let Some(handle) = self.handle.take()
                    && handle.join().is_err()
                {
                    warn!("Probe thread panicked");
                }
            }
        }

        let stats = self.stats();
        debug!(total = stats.total(), ratio = stats.success_ratio_percent(), "Availability probe stopped");
        stats
    }
}

impl Drop for RunningProbe {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    #[derive(Debug)]
    #[allow(dead_code)]
    enum HttpError {
        ConnectionRefused(String),
        Timeout,
    }

    #[test]
    fn ratio_truncates_to_whole_percent() {
        let stats: ProbeStats = std::iter::repeat_n(ProbeOutcome::Ok, 2)
            .chain(std::iter::once(ProbeOutcome::Fail))
            .collect();
        assert_eq!(stats.total(), 3);
        assert_eq!(stats.success_ratio_percent(), 66);
    }

    #[test]
    fn ratio_is_zero_without_successes() {
        assert_eq!(ProbeStats::default().success_ratio_percent(), 0);
        let stats: ProbeStats = [ProbeOutcome::Fail].into_iter().collect();
        assert_eq!(stats.success_ratio_percent(), 0);
    }

    #[test]
    fn ratio_is_full_when_all_succeed() {
        let stats: ProbeStats = std::iter::repeat_n(ProbeOutcome::Ok, 7).collect();
        assert_eq!(stats.success_ratio_percent(), 100);
    }

    #[test]
    fn failures_are_grouped_by_error_kind() {
        let stats: ProbeStats = [
            ProbeOutcome::from_error(&HttpError::ConnectionRefused("a".into())),
            ProbeOutcome::from_error(&HttpError::ConnectionRefused("b".into())),
            ProbeOutcome::from_error(&HttpError::Timeout),
            ProbeOutcome::Ok,
        ]
        .into_iter()
        .collect();

        assert_eq!(stats.count(&ProbeOutcome::Failure("ConnectionRefused".into())), 2);
        assert_eq!(stats.count(&ProbeOutcome::Failure("Timeout".into())), 1);
        assert_eq!(stats.to_string(), "{OK=1, ConnectionRefused=2, Timeout=1}");
    }

    #[test]
    fn error_without_name_is_plain_fail() {
        assert_eq!(ProbeOutcome::from_error(&"quoted"), ProbeOutcome::Fail);
    }

    #[test]
    fn zero_rate_is_rejected() {
        let result = AvailabilityProbe::new(0, || ProbeOutcome::Ok);
        assert_eq!(result.unwrap_err(), PolicyError::ZeroRate);
    }

    #[test]
    fn running_probe_counts_outcomes() {
        let calls = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&calls);
        let probe = AvailabilityProbe::new(200, move || {
            if counter.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
                ProbeOutcome::Ok
            } else {
                ProbeOutcome::Fail
            }
        })
        .unwrap()
        .start()
        .unwrap();

        std::thread::sleep(Duration::from_millis(100));
        let stats = probe.stop();

        assert!(stats.total() > 0);
        assert_eq!(stats.total(), calls.load(Ordering::SeqCst));
        assert!(stats.count(&ProbeOutcome::Ok) >= stats.count(&ProbeOutcome::Fail));
    }

    #[test]
    fn stop_does_not_probe_after_returning() {
        let calls = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&calls);
        let probe = AvailabilityProbe::new(1000, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            ProbeOutcome::Ok
        })
        .unwrap()
        .start()
        .unwrap();

        std::thread::sleep(Duration::from_millis(20));
        let stats = probe.stop();
        let after_stop = calls.load(Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(20));

        assert_eq!(calls.load(Ordering::SeqCst), after_stop);
        assert_eq!(stats.success_ratio_percent(), 100);
    }

    #[test]
    fn stuck_thread_is_detached_after_grace() {
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let mut first = true;
        let probe = AvailabilityProbe::new(100, move || {
            if std::mem::take(&mut first) {
                ProbeOutcome::Ok
            } else {
                // hangs until the test releases it
                match release_rx.recv() {
                    Ok(()) => ProbeOutcome::Ok,
                    Err(_) => ProbeOutcome::Fail,
                }
            }
        })
        .unwrap()
        .start()
        .unwrap();

        std::thread::sleep(Duration::from_millis(50));
        let started = std::time::Instant::now();
        let stats = probe.stop_with_grace(Duration::from_millis(50));

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(stats.total(), 1);
        assert_eq!(stats.count(&ProbeOutcome::Ok), 1);
        let _ = release_tx.send(());
    }
}
