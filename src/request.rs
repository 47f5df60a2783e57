//! Outbound request value object.
//!
//! One [`OutboundRequest`] is built per domain call and handed to the
//! dispatcher, which owns it for the rest of its life. Query parameters keep
//! insertion order so operations control the final query-string precedence;
//! an explicit pre-built query string takes priority over the pairs.

use crate::route::{BoundRoute, BucketKey};
use crate::transport::WireRequest;

/// A fully-specified, not-yet-sent API call.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    route: BoundRoute,
    query: Vec<(String, String)>,
    query_string: Option<String>,
    body: Option<serde_json::Value>,
}

impl OutboundRequest {
    pub fn new(route: BoundRoute) -> Self {
        Self { route, query: Vec::new(), query_string: None, body: None }
    }

    /// Append one query parameter; order of calls is the order on the wire.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Use a pre-built query string verbatim (leading `?` optional).
    pub fn query_string(mut self, raw: impl Into<String>) -> Self {
        self.query_string = Some(raw.into());
        self
    }

    pub fn body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn route(&self) -> &BoundRoute {
        &self.route
    }

    pub fn bucket(&self) -> &BucketKey {
        self.route.bucket()
    }

    /// Assemble the transport-level request against `base_url`.
    pub(crate) fn to_wire(&self, base_url: &str) -> WireRequest {
        let mut url = String::with_capacity(base_url.len() + self.route.path().len() + 16);
        url.push_str(base_url);
        url.push_str(self.route.path());
        match &self.query_string {
            Some(raw) if !raw.is_empty() => {
                if !raw.starts_with('?') {
                    url.push('?');
                }
                url.push_str(raw);
            }
            _ => {
                for (i, (name, value)) in self.query.iter().enumerate() {
                    url.push(if i == 0 { '?' } else { '&' });
                    url.push_str(&urlencoding::encode(name));
                    url.push('=');
                    url.push_str(&urlencoding::encode(value));
                }
            }
        }
        // Serializing an in-memory `Value` is infallible (string keys, no
        // custom Serialize), so the default arm is unreachable.
        let body = self
            .body
            .as_ref()
            .map(|value| serde_json::to_vec(value).unwrap_or_default());
        let mut headers = Vec::new();
        if body.is_some() {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }
        WireRequest { method: self.route.method().clone(), url, headers, body }
    }
}
