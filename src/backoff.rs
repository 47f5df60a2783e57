//! Backoff and jitter for transient-failure retries.
//!
//! Attempt semantics: attempt `0` is the initial call and carries no delay;
//! the first retry uses `delay(1)`. Delays saturate at [`MAX_BACKOFF`] so
//! pathological attempt counts can never overflow. Jitter randomizes the
//! computed delay to keep concurrent buckets from retrying in lockstep.

use rand::{rng, Rng};
use std::time::Duration;

/// Ceiling applied to every computed delay.
pub const MAX_BACKOFF: Duration = Duration::from_secs(5 * 60);

/// Delay schedule for retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    kind: Kind,
    max: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    Constant(Duration),
    Exponential(Duration),
}

impl Backoff {
    /// Same delay before every retry.
    pub fn constant(delay: Duration) -> Self {
        Self { kind: Kind::Constant(delay), max: MAX_BACKOFF }
    }

    /// Doubling delay: `base`, `2*base`, `4*base`, ...
    pub fn exponential(base: Duration) -> Self {
        Self { kind: Kind::Exponential(base), max: MAX_BACKOFF }
    }

    /// Cap every computed delay at `max` (itself clamped to [`MAX_BACKOFF`]).
    pub fn with_max(mut self, max: Duration) -> Self {
        self.max = max.min(MAX_BACKOFF);
        self
    }

    /// Delay before the given attempt (0 = initial call, no delay).
    pub fn delay(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let raw = match self.kind {
            Kind::Constant(delay) => delay,
            Kind::Exponential(base) => {
                let exponent = attempt.saturating_sub(1).min(u32::MAX as usize) as u32;
                let nanos = base.as_nanos().saturating_mul(2u128.saturating_pow(exponent));
                Duration::from_nanos(nanos.min(MAX_BACKOFF.as_nanos()) as u64)
            }
        };
        raw.min(self.max)
    }
}

/// Randomization applied on top of the backoff delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Jitter {
    /// Use the exact backoff delay; deterministic, good for tests.
    None,
    /// Uniform in `[0, delay]`.
    Full,
    /// Uniform in `[delay/2, delay]`; keeps a floor while spreading load.
    Equal,
}

impl Jitter {
    pub fn apply(&self, delay: Duration) -> Duration {
        if delay.is_zero() {
            return delay;
        }
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        match self {
            Jitter::None => delay,
            Jitter::Full => Duration::from_millis(rng().random_range(0..=millis)),
            Jitter::Equal => {
                let half = millis / 2;
                Duration::from_millis(half + rng().random_range(0..=millis - half))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_backoff_is_flat() {
        let backoff = Backoff::constant(Duration::from_millis(100));
        assert_eq!(backoff.delay(0), Duration::ZERO);
        assert_eq!(backoff.delay(1), Duration::from_millis(100));
        assert_eq!(backoff.delay(7), Duration::from_millis(100));
    }

    #[test]
    fn exponential_backoff_doubles() {
        let backoff = Backoff::exponential(Duration::from_millis(100));
        assert_eq!(backoff.delay(1), Duration::from_millis(100));
        assert_eq!(backoff.delay(2), Duration::from_millis(200));
        assert_eq!(backoff.delay(3), Duration::from_millis(400));
        assert_eq!(backoff.delay(4), Duration::from_millis(800));
    }

    #[test]
    fn exponential_backoff_respects_cap() {
        let backoff =
            Backoff::exponential(Duration::from_millis(100)).with_max(Duration::from_secs(1));
        assert_eq!(backoff.delay(4), Duration::from_millis(800));
        assert_eq!(backoff.delay(5), Duration::from_secs(1));
        assert_eq!(backoff.delay(50), Duration::from_secs(1));
    }

    #[test]
    fn huge_attempt_saturates_instead_of_overflowing() {
        let backoff = Backoff::exponential(Duration::from_secs(1));
        assert_eq!(backoff.delay(1_000_000_000), MAX_BACKOFF);
    }

    #[test]
    fn full_jitter_stays_within_delay() {
        let base = Duration::from_millis(100);
        for _ in 0..64 {
            assert!(Jitter::Full.apply(base) <= base);
        }
    }

    #[test]
    fn equal_jitter_keeps_a_floor() {
        let base = Duration::from_millis(100);
        for _ in 0..64 {
            let jittered = Jitter::Equal.apply(base);
            assert!(jittered >= Duration::from_millis(50));
            assert!(jittered <= base);
        }
    }

    #[test]
    fn no_jitter_is_identity() {
        let base = Duration::from_millis(123);
        assert_eq!(Jitter::None.apply(base), base);
        assert_eq!(Jitter::Full.apply(Duration::ZERO), Duration::ZERO);
    }
}
