//! Time sources for the blocking poller

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Source of monotonic time and blocking sleep.
///
/// The pollers only ever compare instants taken from the same clock, so an
/// implementation is free to run on virtual time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current monotonic instant
    fn now(&self) -> Instant;

    /// Block the calling thread for `duration`
    fn sleep(&self, duration: Duration);
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration);
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration);
    }
}

/// Wall clock: `Instant::now` and `std::thread::sleep`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Virtual clock for deterministic tests.
///
/// `sleep` returns immediately and moves the clock forward by the requested
/// duration. Clones share one timeline, so a condition closure holding a
/// clone observes the same time as the poller.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl ManualClock {
    /// Create a clock whose virtual time starts at zero
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Move virtual time forward without sleeping
    pub fn advance(&self, duration: Duration) {
        *self.offset.lock() += duration;
    }

    /// Virtual time elapsed since the clock was created
    pub fn elapsed(&self) -> Duration {
        *self.offset.lock()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

/// Fixed-rate permit schedule.
///
/// The first permit is immediate; each later one is granted `spacing` after
/// the previous grant, or right away when the caller is already late.
#[derive(Debug, Clone)]
pub(crate) struct Pacer {
    spacing: Duration,
    next: Option<Instant>,
}

impl Pacer {
    pub(crate) fn per_second(rate: u32) -> Self {
        Self {
            spacing: Duration::from_secs(1) / rate.max(1),
            next: None,
        }
    }

    /// Block on `clock` until the next permit and return the grant instant
    pub(crate) fn acquire(&mut self, clock: &impl Clock) -> Instant {
        let now = clock.now();
        let granted = match self.next {
            Some(slot) if slot > now => {
                clock.sleep(slot - now);
                slot
            }
            _ => now,
        };
        self.next = Some(granted + self.spacing);
        granted
    }
}
