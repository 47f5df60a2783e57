//! Error taxonomy for the dispatch core.
//!
//! Two phases, two propagation styles:
//! - Preconditions (`EmptyPayload`) and route construction (`InvalidRouteParams`)
//!   fail before anything touches the network.
//! - Network-phase failures resolve the pending result instead: bounded
//!   rate-limit retries end in `RateLimited`, bounded transient retries end in
//!   `TransportExhausted`, and non-429 4xx responses end in `Rejected`.
//!
//! Retries themselves are internal; callers only observe the terminal outcome.

use crate::transport::TransportError;
use http::StatusCode;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Terminal error for any dispatch-core operation.
#[derive(Debug, Error)]
pub enum Error {
    /// The message payload had neither content nor an embed. Never sent.
    #[error("message payload has no content and no embed")]
    EmptyPayload,

    /// A route template placeholder was left unbound.
    #[error("route `{template}` is missing required parameter `{name}`")]
    InvalidRouteParams {
        template: &'static str,
        name: String,
    },

    /// The server kept returning 429 until the rate-limit retry budget ran out.
    #[error("rate limited on bucket `{bucket}` after {attempts} retries (last retry-after {retry_after:?})")]
    RateLimited {
        bucket: String,
        attempts: usize,
        retry_after: Duration,
    },

    /// 5xx or transport-level failures exhausted the transient retry budget.
    #[error("transport failed after {attempts} attempts: {last}")]
    TransportExhausted {
        attempts: usize,
        last: TransientFailure,
    },

    /// Terminal 4xx other than 429; carries the server's status and message.
    #[error("server rejected request with {status}: {message}")]
    Rejected {
        status: StatusCode,
        message: String,
    },

    /// The response body's JSON kind did not match what the operation expects.
    #[error("response body was {got}, expected {expected}")]
    UnexpectedShape { expected: Shape, got: Shape },

    /// Transformed JSON did not match the entity schema.
    #[error("entity did not match the expected schema: {0}")]
    MalformedEntity(#[source] serde_json::Error),

    /// The pending result was dropped before a response was delivered.
    #[error("request was cancelled before completion")]
    Cancelled,
}

impl Error {
    /// True for caller-side failures that never reach the network.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::EmptyPayload | Self::InvalidRouteParams { .. })
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    pub fn is_transport_exhausted(&self) -> bool {
        matches!(self, Self::TransportExhausted { .. })
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// The server status carried by a `Rejected` error, if any.
    pub fn rejected_status(&self) -> Option<StatusCode> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// One transient failure observed during the retry loop.
///
/// 5xx responses and transport-level errors share a retry budget; this records
/// which kind the final attempt hit.
#[derive(Debug, Clone)]
pub enum TransientFailure {
    /// The transport could not complete the exchange.
    Transport(TransportError),
    /// The server answered with a 5xx status.
    Server(StatusCode),
}

impl fmt::Display for TransientFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "{}", e),
            Self::Server(status) => write!(f, "server error {}", status),
        }
    }
}

/// JSON kind observed or expected by the response transformer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Object,
    Array,
    String,
    Number,
    Bool,
    Null,
    /// Zero-length (or whitespace-only) body.
    Empty,
    /// Body bytes that were not valid JSON at all.
    Invalid,
}

impl Shape {
    /// Classify a parsed JSON value.
    pub fn of(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Object(_) => Self::Object,
            serde_json::Value::Array(_) => Self::Array,
            serde_json::Value::String(_) => Self::String,
            serde_json::Value::Number(_) => Self::Number,
            serde_json::Value::Bool(_) => Self::Bool,
            serde_json::Value::Null => Self::Null,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Object => "a JSON object",
            Self::Array => "a JSON array",
            Self::String => "a JSON string",
            Self::Number => "a JSON number",
            Self::Bool => "a JSON boolean",
            Self::Null => "JSON null",
            Self::Empty => "an empty body",
            Self::Invalid => "not valid JSON",
        };
        write!(f, "{}", name)
    }
}
