//! Clock abstraction for rate-limit deadlines.
//!
//! Bucket reset times are stored as millisecond offsets on the clock's own
//! timeline, derived from server-reported deltas. A monotonic source avoids
//! wall-clock skew between client and server; tests drive time by hand with
//! [`ManualClock`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::time::Instant;

/// Source of "now" in milliseconds on an arbitrary but monotonic timeline.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now_millis(&self) -> u64;
}

/// Monotonic clock backed by the tokio timer.
///
/// The timeline starts at clock construction and resets with the process;
/// deadlines derived from it must never be persisted. Follows tokio's
/// virtual time under a paused test runtime, so sleeps and deadlines stay on
/// one timeline.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self { epoch: Instant::now() }
    }
}

impl Clock for MonotonicClock {
    fn now_millis(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Hand-driven clock for tests.
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward by `millis`.
    pub fn advance(&self, millis: u64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
