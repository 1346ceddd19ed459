//! # Time Sources
//!
//! The ledger never asks the operating system what time it is. The host
//! hands it a [`Clock`], and deadlines are plain comparisons against
//! whatever that clock reports. There are no timers and no scheduled
//! events: a campaign "expires" only in the sense that the next call sees
//! `now >= deadline`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;

/// Unix timestamp in whole seconds.
pub type Timestamp = u64;

/// A source of the current time.
pub trait Clock {
    /// Current unix time in seconds.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time via `chrono`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now().timestamp().max(0) as Timestamp
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same underlying counter, so a test can hand one clone
/// to the chain and keep another to fast-forward past a deadline.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start)),
        }
    }

    /// Creates a manual clock starting at the current wall-clock time.
    pub fn starting_now() -> Self {
        Self::new(SystemClock.now())
    }

    /// Moves the clock forward by `seconds` and returns the new time.
    /// Saturates at `Timestamp::MAX` rather than wrapping.
    pub fn advance(&self, seconds: u64) -> Timestamp {
        let step = |t: Timestamp| Some(t.saturating_add(seconds));
        let prev = match self.now.fetch_update(Ordering::SeqCst, Ordering::SeqCst, step) {
            Ok(prev) | Err(prev) => prev,
        };
        tracing::debug!(from = prev, by = seconds, "manual clock advanced");
        prev.saturating_add(seconds)
    }

    /// Jumps the clock to an absolute time. Going backwards is allowed;
    /// the ledger does not care, tests sometimes do.
    pub fn set(&self, timestamp: Timestamp) {
        self.now.store(timestamp, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}
