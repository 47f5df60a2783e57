//! Transport boundary: a dumb HTTP exchange primitive.
//!
//! The dispatcher owns all retry and rate-limit policy; a [`Transport`] only
//! performs one request/response exchange. Any HTTP client can sit behind the
//! trait — the crate itself never opens a connection.

use async_trait::async_trait;
use http::{Method, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// A request as handed to the transport.
#[derive(Debug, Clone)]
pub struct WireRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

/// A response as returned by the transport.
#[derive(Debug, Clone)]
pub struct WireResponse {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl WireResponse {
    /// Parse the rate-limit view of this response's headers.
    pub fn rate_limit(&self) -> RateLimitHeaders {
        RateLimitHeaders::from_headers(self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str())))
    }
}

/// Exchange-level failure. Retryable by the dispatcher, never terminal on its
/// own.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The exchange could not complete (DNS, connect, reset, ...).
    #[error("connection failed: {0}")]
    Connection(String),
    /// The per-request deadline expired before a response arrived.
    #[error("request deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
}

/// One HTTP exchange; the dispatcher decides everything else.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: WireRequest) -> Result<WireResponse, TransportError>;
}

/// Server-reported rate-limit state, parsed tolerantly from response headers.
///
/// Absent headers mean "no information", not zero. Reset and retry times are
/// deltas; the tracker anchors them on its own clock rather than trusting
/// absolute server timestamps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitHeaders {
    /// Calls left in the current window (`x-ratelimit-remaining`).
    pub remaining: Option<u32>,
    /// Window size (`x-ratelimit-limit`).
    pub limit: Option<u32>,
    /// Time until the window resets (`x-ratelimit-reset-after`, seconds).
    pub reset_after: Option<Duration>,
    /// Delay demanded by a 429 (`retry-after`, seconds).
    pub retry_after: Option<Duration>,
    /// Whether the account-wide ceiling was hit (`x-ratelimit-global`).
    pub global: bool,
}

impl RateLimitHeaders {
    pub fn from_headers<'a>(headers: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut parsed = Self::default();
        for (name, value) in headers {
            if name.eq_ignore_ascii_case("x-ratelimit-remaining") {
                parsed.remaining = value.trim().parse().ok();
            } else if name.eq_ignore_ascii_case("x-ratelimit-limit") {
                parsed.limit = value.trim().parse().ok();
            } else if name.eq_ignore_ascii_case("x-ratelimit-reset-after") {
                parsed.reset_after = parse_seconds(value);
            } else if name.eq_ignore_ascii_case("retry-after") {
                parsed.retry_after = parse_seconds(value);
            } else if name.eq_ignore_ascii_case("x-ratelimit-global") {
                parsed.global = value.trim().eq_ignore_ascii_case("true");
            }
        }
        parsed
    }
}

/// Seconds as integer or decimal fraction, e.g. `"2"` or `"0.75"`.
fn parse_seconds(value: &str) -> Option<Duration> {
    let seconds: f64 = value.trim().parse().ok()?;
    if seconds.is_finite() && seconds >= 0.0 {
        Some(Duration::from_secs_f64(seconds))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_header_set() {
        let parsed = RateLimitHeaders::from_headers(vec![
            ("X-RateLimit-Remaining", "4"),
            ("X-RateLimit-Limit", "5"),
            ("X-RateLimit-Reset-After", "2.5"),
            ("X-RateLimit-Global", "true"),
            ("Retry-After", "1"),
        ]);
        assert_eq!(parsed.remaining, Some(4));
        assert_eq!(parsed.limit, Some(5));
        assert_eq!(parsed.reset_after, Some(Duration::from_millis(2500)));
        assert_eq!(parsed.retry_after, Some(Duration::from_secs(1)));
        assert!(parsed.global);
    }

    #[test]
    fn absent_headers_mean_no_information() {
        let parsed = RateLimitHeaders::from_headers(vec![("content-type", "application/json")]);
        assert_eq!(parsed, RateLimitHeaders::default());
        assert!(!parsed.global);
    }

    #[test]
    fn garbage_values_are_ignored_not_errors() {
        let parsed = RateLimitHeaders::from_headers(vec![
            ("x-ratelimit-remaining", "many"),
            ("retry-after", "-3"),
            ("x-ratelimit-reset-after", "NaN"),
        ]);
        assert_eq!(parsed.remaining, None);
        assert_eq!(parsed.retry_after, None);
        assert_eq!(parsed.reset_after, None);
    }

    #[test]
    fn header_names_are_case_insensitive() {
        let parsed = RateLimitHeaders::from_headers(vec![("X-RATELIMIT-REMAINING", "0")]);
        assert_eq!(parsed.remaining, Some(0));
    }
}
