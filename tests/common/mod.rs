//! Scripted transport for integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use catwalk::{Transport, TransportError, WireRequest, WireResponse};
use http::StatusCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

type Handler =
    Box<dyn Fn(usize, &WireRequest) -> Result<WireResponse, TransportError> + Send + Sync>;

/// Transport that answers from a scripted handler and records every exchange.
///
/// The handler receives the zero-based call index, so scripts can answer
/// "429 first, then 200" style sequences. Optional latency is tokio-timer
/// based and therefore virtual under a paused test runtime.
pub struct MockTransport {
    handler: Handler,
    latency: Duration,
    calls: AtomicUsize,
    log: Mutex<Vec<(WireRequest, Instant)>>,
}

impl MockTransport {
    pub fn new(
        handler: impl Fn(usize, &WireRequest) -> Result<WireResponse, TransportError>
            + Send
            + Sync
            + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
        })
    }

    pub fn with_latency(
        latency: Duration,
        handler: impl Fn(usize, &WireRequest) -> Result<WireResponse, TransportError>
            + Send
            + Sync
            + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            latency,
            calls: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
        })
    }

    /// Number of exchanges started so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Request URLs in dispatch order.
    pub fn urls(&self) -> Vec<String> {
        self.log.lock().unwrap().iter().map(|(r, _)| r.url.clone()).collect()
    }

    /// Instants at which each exchange started, in dispatch order.
    pub fn dispatch_times(&self) -> Vec<Instant> {
        self.log.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }

    pub fn requests(&self) -> Vec<WireRequest> {
        self.log.lock().unwrap().iter().map(|(r, _)| r.clone()).collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: WireRequest) -> Result<WireResponse, TransportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push((request.clone(), Instant::now()));
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        (self.handler)(call, &request)
    }
}

pub fn ok_json(value: serde_json::Value) -> WireResponse {
    WireResponse {
        status: StatusCode::OK,
        headers: vec![("content-type".into(), "application/json".into())],
        body: serde_json::to_vec(&value).unwrap(),
    }
}

/// 200 with quota headers, the shape a well-behaved server always sends.
pub fn ok_with_limits(
    value: serde_json::Value,
    remaining: u32,
    reset_after: Duration,
) -> WireResponse {
    WireResponse {
        status: StatusCode::OK,
        headers: vec![
            ("x-ratelimit-remaining".into(), remaining.to_string()),
            ("x-ratelimit-reset-after".into(), reset_after.as_secs_f64().to_string()),
        ],
        body: serde_json::to_vec(&value).unwrap(),
    }
}

pub fn no_content() -> WireResponse {
    WireResponse { status: StatusCode::NO_CONTENT, headers: vec![], body: Vec::new() }
}

pub fn too_many_requests(retry_after: Duration, global: bool) -> WireResponse {
    let mut headers = vec![("retry-after".into(), retry_after.as_secs_f64().to_string())];
    if global {
        headers.push(("x-ratelimit-global".into(), "true".into()));
    }
    WireResponse {
        status: StatusCode::TOO_MANY_REQUESTS,
        headers,
        body: br#"{"message": "You are being rate limited."}"#.to_vec(),
    }
}

/// 429 with no delay headers at all; the dispatcher must pick its own hold.
pub fn too_many_requests_headerless() -> WireResponse {
    WireResponse {
        status: StatusCode::TOO_MANY_REQUESTS,
        headers: vec![],
        body: br#"{"message": "You are being rate limited."}"#.to_vec(),
    }
}

pub fn server_error() -> WireResponse {
    WireResponse {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        headers: vec![],
        body: Vec::new(),
    }
}

pub fn rejected(status: StatusCode, message: &str) -> WireResponse {
    WireResponse {
        status,
        headers: vec![("content-type".into(), "application/json".into())],
        body: serde_json::to_vec(&serde_json::json!({ "message": message })).unwrap(),
    }
}
