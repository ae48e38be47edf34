//! # Settle
//!
//! Bounded polling for code that waits on eventually-consistent systems:
//! a search index catching up, a subsystem restarting, a scheduled job
//! reporting a new run time.
//!
//! ## Features
//!
//! - **Poller**: re-evaluate a fallible condition at a fixed interval until
//!   it succeeds or the deadline passes, surfacing the last failure verbatim
//! - **AsyncPoller**: the same schedule on the tokio timer
//! - **Waiter**: rate-limited boolean waits
//! - **AvailabilityProbe**: background success-ratio measurement
//! - **RerunGate**: bounded re-runs for known transient failures
//! - **check**: assertion-style helpers returning `Result`
//!
//! ## Quick Start
//!
//! ```rust
//! use settle_poll::{PollPolicy, Poller, check::check_eq};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let policy = PollPolicy::from_millis(10, 500)?;
//! let mut observed = 0;
//!
//! let reindexed = Poller::new(policy).named("reindex").run(|| {
//!     observed += 1;
//!     check_eq(&observed.min(3), &3, "indexed documents")?;
//!     Ok::<_, settle_poll::Mismatch>(observed)
//! })?;
//!
//! assert_eq!(reindexed, 3);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod check;
pub mod clock;
pub mod error;
mod future;
mod policy;
mod poller;
pub mod probe;
mod rerun;
mod wait;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Mismatch, PolicyError, ProbeError, Unsatisfied, WaitError};
pub use future::AsyncPoller;
pub use policy::{PollPolicy, Step};
pub use poller::{Poller, poll};
pub use probe::{AvailabilityProbe, ProbeOutcome, ProbeStats, RunningProbe};
pub use rerun::{DEFAULT_RERUN_LIMIT, RerunGate, run_with_reruns};
pub use wait::{DEFAULT_RATE, Waiter, wait_for};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::check::{check, check_contains, check_eq, check_ne};
    pub use crate::{AsyncPoller, PollPolicy, Poller, Unsatisfied, poll};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
