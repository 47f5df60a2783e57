//! Sleep seam for the dispatcher's suspension points.
//!
//! Every wait the dispatcher performs (bucket reset, retry backoff, 429
//! retry-after) goes through this trait so tests can run without real delays
//! or assert on the exact delays requested.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Non-blocking sleep; the worker yields rather than occupying a thread.
pub trait Sleeper: Send + Sync + std::fmt::Debug {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>>;
}

/// Production sleeper backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Sleeper that completes immediately; for tests where timing is irrelevant.
#[derive(Debug, Default, Clone, Copy)]
pub struct InstantSleeper;

impl Sleeper for InstantSleeper {
    fn sleep(&self, _duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async {})
    }
}

/// Sleeper that records every requested delay without sleeping.
#[derive(Debug, Default, Clone)]
pub struct TrackingSleeper {
    recorded: Arc<Mutex<Vec<Duration>>>,
}

impl TrackingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// All delays requested so far, in order.
    pub fn recorded(&self) -> Vec<Duration> {
        self.recorded.lock().unwrap().clone()
    }
}

impl Sleeper for TrackingSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        self.recorded.lock().unwrap().push(duration);
        Box::pin(async {})
    }
}
