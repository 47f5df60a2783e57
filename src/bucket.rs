//! Per-bucket rate-limit accounting.
//!
//! The tracker is a purely in-memory predictor kept in sync by observed
//! response headers; it never performs network calls. A bucket that has not
//! been observed yet always proceeds (optimistic initial state), and a
//! `Proceed` decision optimistically decrements the local counter so
//! back-to-back admits cannot overrun a known window. Reset deadlines are
//! anchored on the injected [`Clock`] from server-reported deltas, so client
//! wall-clock skew is irrelevant.
//!
//! Per-bucket state is only ever mutated on behalf of that bucket's single
//! dispatch worker; the mutex here exists for the map itself and for the
//! account-wide global deadline, which gates every bucket at once.

use crate::clock::Clock;
use crate::route::BucketKey;
use crate::transport::RateLimitHeaders;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Admission decision for one outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admit {
    /// Dispatch now.
    Proceed,
    /// Hold the request for this long, then ask again.
    Wait(Duration),
}

#[derive(Debug)]
struct BucketState {
    remaining: u32,
    /// Deadline in clock millis.
    reset_at: u64,
}

#[derive(Debug, Default)]
struct Inner {
    buckets: HashMap<BucketKey, BucketState>,
    global_reset_at: Option<u64>,
}

/// Tracks remaining quota and reset deadlines per bucket key.
#[derive(Debug)]
pub struct BucketTracker {
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

impl BucketTracker {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock, inner: Mutex::new(Inner::default()) }
    }

    /// May a request for `key` fire now?
    ///
    /// Proceeds when the bucket is unknown, has remaining quota, or its reset
    /// deadline has passed; otherwise reports how long to hold the request.
    pub fn admit(&self, key: &BucketKey) -> Admit {
        let now = self.clock.now_millis();
        let mut inner = self.inner.lock().unwrap();
        if let Some(reset_at) = inner.global_reset_at {
            if now < reset_at {
                return Admit::Wait(Duration::from_millis(reset_at - now));
            }
            inner.global_reset_at = None;
        }
        match inner.buckets.get_mut(key) {
            None => Admit::Proceed,
            Some(state) if now >= state.reset_at => {
                // Window rolled over; proceed until the next response reports
                // the fresh budget.
                Admit::Proceed
            }
            Some(state) if state.remaining > 0 => {
                state.remaining -= 1;
                Admit::Proceed
            }
            Some(state) => Admit::Wait(Duration::from_millis(state.reset_at - now)),
        }
    }

    /// Record server-reported quota for `key`.
    pub fn update(&self, key: &BucketKey, remaining: u32, reset_after: Duration) {
        let reset_at = self.deadline(reset_after);
        let mut inner = self.inner.lock().unwrap();
        inner.buckets.insert(key.clone(), BucketState { remaining, reset_at });
    }

    /// Record a 429: the bucket (or every bucket, when global) is exhausted
    /// until `retry_after` has elapsed. An already-later deadline is kept.
    pub fn note_rate_limited(&self, key: &BucketKey, retry_after: Duration, global: bool) {
        let reset_at = self.deadline(retry_after);
        let mut inner = self.inner.lock().unwrap();
        if global {
            inner.global_reset_at = Some(inner.global_reset_at.unwrap_or(0).max(reset_at));
        }
        let state = inner
            .buckets
            .entry(key.clone())
            .or_insert(BucketState { remaining: 0, reset_at });
        state.remaining = 0;
        state.reset_at = state.reset_at.max(reset_at);
    }

    /// Fold a response's rate-limit headers into the tracked state.
    pub fn observe(&self, key: &BucketKey, headers: &RateLimitHeaders) {
        if let (Some(remaining), Some(reset_after)) = (headers.remaining, headers.reset_after) {
            self.update(key, remaining, reset_after);
        }
    }

    fn deadline(&self, delta: Duration) -> u64 {
        let millis = u64::try_from(delta.as_millis()).unwrap_or(u64::MAX);
        self.clock.now_millis().saturating_add(millis)
    }
}
