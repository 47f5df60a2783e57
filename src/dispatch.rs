//! The rate-limit-respecting dispatcher.
//!
//! One logical FIFO queue per bucket key, each drained by a single worker
//! task, so a bucket never has more than one request in flight and
//! same-bucket completion order equals submission order. Distinct buckets run
//! fully in parallel; only the account-wide global limit pauses them all.
//!
//! Per request the worker runs the state machine
//! `Pending → InFlight → {Succeeded | RateLimited → Pending | Failed}`:
//! the bucket tracker gates timing, 429s retry the same request at the head
//! of its queue (bounded so a persistently-limited request cannot starve its
//! bucket forever), 5xx and transport failures retry with exponential backoff
//! up to a bounded attempt count, and any other 4xx resolves the caller's
//! pending result with a terminal error.
//!
//! Workers retire after an idle grace period; memory tracks recently-active
//! buckets, not the full route catalogue. Retirement and submission
//! synchronize on the registry lock so no job can be dropped in the gap.

use crate::backoff::{Backoff, Jitter};
use crate::bucket::{Admit, BucketTracker};
use crate::clock::{Clock, MonotonicClock};
use crate::error::{Error, TransientFailure};
use crate::request::OutboundRequest;
use crate::route::BucketKey;
use crate::sleeper::{Sleeper, TokioSleeper};
use crate::transform::ResponsePayload;
use crate::transport::{Transport, TransportError};
use http::StatusCode;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Used when a 429 arrives without any usable delay header.
const FALLBACK_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Tuning for the dispatcher. Builder-style setters, sane defaults.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Prefix for every request URL, e.g. `https://api.example.chat/v1`.
    pub base_url: String,
    /// Total exchanges allowed per request for 5xx/transport failures.
    pub max_attempts: usize,
    /// How many 429 responses one request may survive before giving up.
    pub max_rate_limit_retries: usize,
    /// Delay schedule between transient retries.
    pub backoff: Backoff,
    /// Randomization applied to each backoff delay.
    pub jitter: Jitter,
    /// Deadline for a single HTTP exchange.
    pub request_timeout: Duration,
    /// How long an empty bucket queue lingers before its worker retires.
    pub idle_grace: Duration,
}

impl DispatchConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            max_attempts: 3,
            max_rate_limit_retries: 5,
            backoff: Backoff::exponential(Duration::from_millis(500))
                .with_max(Duration::from_secs(30)),
            jitter: Jitter::Full,
            request_timeout: Duration::from_secs(15),
            idle_grace: Duration::from_secs(30),
        }
    }

    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn max_rate_limit_retries(mut self, retries: usize) -> Self {
        self.max_rate_limit_retries = retries;
        self
    }

    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn jitter(mut self, jitter: Jitter) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn idle_grace(mut self, grace: Duration) -> Self {
        self.idle_grace = grace;
        self
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self::new("")
    }
}

/// Asynchronous handle to one request's eventual outcome.
///
/// Resolves exactly once. Dropping it cancels the request: before dispatch
/// the job is skipped entirely; after dispatch the response is discarded.
#[derive(Debug)]
pub struct PendingResult {
    rx: oneshot::Receiver<Result<ResponsePayload, Error>>,
}

impl Future for PendingResult {
    type Output = Result<ResponsePayload, Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| match received {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::Cancelled),
        })
    }
}

struct Job {
    request: OutboundRequest,
    reply: oneshot::Sender<Result<ResponsePayload, Error>>,
}

struct Shared {
    transport: Arc<dyn Transport>,
    tracker: BucketTracker,
    config: DispatchConfig,
    sleeper: Arc<dyn Sleeper>,
    queues: Mutex<HashMap<BucketKey, mpsc::UnboundedSender<Job>>>,
}

/// Accepts outbound requests and drains them per bucket, in order, within the
/// server's rate-limit contract. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct Dispatcher {
    shared: Arc<Shared>,
}

impl Dispatcher {
    /// Build with production seams (tokio sleeper, monotonic clock).
    pub fn new(transport: Arc<dyn Transport>, config: DispatchConfig) -> Self {
        Self::builder(transport).config(config).build()
    }

    pub fn builder(transport: Arc<dyn Transport>) -> DispatcherBuilder {
        DispatcherBuilder {
            transport,
            config: DispatchConfig::default(),
            sleeper: Arc::new(TokioSleeper),
            clock: Arc::new(MonotonicClock::default()),
        }
    }

    /// Queue a request under its bucket key. Must be called within a tokio
    /// runtime; workers are spawned lazily per bucket.
    pub fn submit(&self, request: OutboundRequest) -> PendingResult {
        let (tx, rx) = oneshot::channel();
        self.enqueue(Job { request, reply: tx });
        PendingResult { rx }
    }

    /// Number of bucket queues currently alive (not yet retired).
    pub fn active_buckets(&self) -> usize {
        self.shared.queues.lock().unwrap().len()
    }

    fn enqueue(&self, job: Job) {
        let bucket = job.request.bucket().clone();
        let mut queues = self.shared.queues.lock().unwrap();
        match queues.entry(bucket.clone()) {
            Entry::Occupied(mut entry) => {
                if let Err(rejected) = entry.get().send(job) {
                    // The worker died without deregistering; replace it.
                    let sender = spawn_worker(self.shared.clone(), bucket);
                    let _ = sender.send(rejected.0);
                    entry.insert(sender);
                }
            }
            Entry::Vacant(entry) => {
                let sender = spawn_worker(self.shared.clone(), bucket);
                let _ = sender.send(job);
                entry.insert(sender);
            }
        }
    }
}

/// Builder injecting the time seams; tests swap in manual clocks and
/// recording sleepers.
pub struct DispatcherBuilder {
    transport: Arc<dyn Transport>,
    config: DispatchConfig,
    sleeper: Arc<dyn Sleeper>,
    clock: Arc<dyn Clock>,
}

impl DispatcherBuilder {
    pub fn config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> Dispatcher {
        Dispatcher {
            shared: Arc::new(Shared {
                transport: self.transport,
                tracker: BucketTracker::new(self.clock),
                config: self.config,
                sleeper: self.sleeper,
                queues: Mutex::new(HashMap::new()),
            }),
        }
    }
}

fn spawn_worker(shared: Arc<Shared>, bucket: BucketKey) -> mpsc::UnboundedSender<Job> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(run_worker(shared, bucket, rx));
    tx
}

async fn run_worker(
    shared: Arc<Shared>,
    bucket: BucketKey,
    mut rx: mpsc::UnboundedReceiver<Job>,
) {
    tracing::debug!(bucket = %bucket, "bucket worker started");
    loop {
        let job = match tokio::time::timeout(shared.config.idle_grace, rx.recv()).await {
            Ok(Some(job)) => job,
            Ok(None) => break,
            Err(_idle) => {
                // Idle past the grace period. Deregister under the registry
                // lock unless a job raced in; submissions also send under that
                // lock, so an empty channel here means none can slip past us.
                let mut queues = shared.queues.lock().unwrap();
                match rx.try_recv() {
                    Ok(job) => {
                        drop(queues);
                        job
                    }
                    Err(_) => {
                        queues.remove(&bucket);
                        break;
                    }
                }
            }
        };
        if job.reply.is_closed() {
            tracing::debug!(bucket = %bucket, "request cancelled before dispatch");
            continue;
        }
        process(&shared, &bucket, job).await;
    }
    tracing::debug!(bucket = %bucket, "bucket worker retired");
}

/// Drive one request through the dispatch state machine to a terminal
/// outcome, then resolve its pending result.
async fn process(shared: &Shared, bucket: &BucketKey, job: Job) {
    let Job { request, reply } = job;
    let wire = request.to_wire(&shared.config.base_url);
    let mut transient_failures = 0usize;
    let mut rate_limit_retries = 0usize;

    let outcome = loop {
        loop {
            match shared.tracker.admit(bucket) {
                Admit::Proceed => break,
                Admit::Wait(delay) => {
                    tracing::debug!(bucket = %bucket, ?delay, "bucket exhausted, holding request");
                    shared.sleeper.sleep(delay).await;
                }
            }
        }
        if reply.is_closed() {
            tracing::debug!(bucket = %bucket, "request cancelled while waiting for admission");
            return;
        }

        let exchange =
            tokio::time::timeout(shared.config.request_timeout, shared.transport.send(wire.clone()))
                .await
                .unwrap_or(Err(TransportError::DeadlineExceeded(shared.config.request_timeout)));

        let failure = match exchange {
            Ok(response) => {
                let limits = response.rate_limit();
                shared.tracker.observe(bucket, &limits);
                let status = response.status;

                if status == StatusCode::TOO_MANY_REQUESTS {
                    // The local predictor was wrong (shared token, drift).
                    // Trust the server's delay, keep this request at the head
                    // of its queue, and let the admit gate wait it out.
                    let retry_after = limits
                        .retry_after
                        .or(limits.reset_after)
                        .unwrap_or(FALLBACK_RETRY_AFTER);
                    shared.tracker.note_rate_limited(bucket, retry_after, limits.global);
                    rate_limit_retries += 1;
                    tracing::warn!(
                        bucket = %bucket,
                        ?retry_after,
                        global = limits.global,
                        retries = rate_limit_retries,
                        "rate limited by server"
                    );
                    if rate_limit_retries > shared.config.max_rate_limit_retries {
                        break Err(Error::RateLimited {
                            bucket: bucket.to_string(),
                            attempts: rate_limit_retries,
                            retry_after,
                        });
                    }
                    continue;
                }
                if status.is_server_error() {
                    TransientFailure::Server(status)
                } else if status.is_client_error() {
                    break Err(Error::Rejected {
                        status,
                        message: server_message(&response.body, status),
                    });
                } else {
                    tracing::debug!(bucket = %bucket, %status, "request succeeded");
                    break Ok(ResponsePayload::new(status, response.body));
                }
            }
            Err(err) => TransientFailure::Transport(err),
        };

        transient_failures += 1;
        tracing::warn!(
            bucket = %bucket,
            attempt = transient_failures,
            max = shared.config.max_attempts,
            failure = %failure,
            "transient failure"
        );
        if transient_failures >= shared.config.max_attempts {
            break Err(Error::TransportExhausted { attempts: transient_failures, last: failure });
        }
        let delay = shared.config.jitter.apply(shared.config.backoff.delay(transient_failures));
        shared.sleeper.sleep(delay).await;
    };

    if reply.send(outcome).is_err() {
        // Caller cancelled mid-flight; the result is discarded, not delivered.
        tracing::debug!(bucket = %bucket, "caller gone, response discarded");
    }
}

/// Best-effort extraction of the server's error message from a 4xx body.
fn server_message(body: &[u8], status: StatusCode) -> String {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
            return message.to_string();
        }
    }
    status.canonical_reason().unwrap_or("request rejected").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_are_bounded() {
        let config = DispatchConfig::default();
        assert!(config.max_attempts >= 1);
        assert!(config.request_timeout > Duration::ZERO);
        assert!(config.idle_grace > Duration::ZERO);
    }

    #[test]
    fn max_attempts_cannot_be_zeroed() {
        let config = DispatchConfig::default().max_attempts(0);
        assert_eq!(config.max_attempts, 1);
    }

    #[test]
    fn server_message_prefers_json_message_field() {
        let body = br#"{"message": "Missing Access", "code": 50001}"#;
        assert_eq!(server_message(body, StatusCode::FORBIDDEN), "Missing Access");
    }

    #[test]
    fn server_message_falls_back_to_canonical_reason() {
        assert_eq!(server_message(b"not json", StatusCode::NOT_FOUND), "Not Found");
        assert_eq!(server_message(b"{}", StatusCode::NOT_FOUND), "Not Found");
    }
}
