//! Route catalogue and bucket-key resolution.
//!
//! A [`Route`] is the static identity of one API operation: HTTP method, path
//! template with `{name}` placeholders, and the name of the major parameter —
//! the single path parameter the server partitions rate limits by. Binding a
//! route substitutes parameter values (percent-encoded, reserved-safe) into
//! the path and derives the [`BucketKey`] the dispatcher queues under.
//!
//! Two bound routes with the same template but different major-parameter
//! values land in different buckets; non-major parameters never affect the
//! bucket key.

use crate::error::Error;
use http::Method;
use std::fmt;

/// Static identity of one API operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    method: Method,
    template: &'static str,
    major_param: Option<&'static str>,
}

impl Route {
    pub const fn new(
        method: Method,
        template: &'static str,
        major_param: Option<&'static str>,
    ) -> Self {
        Self { method, template, major_param }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn template(&self) -> &'static str {
        self.template
    }

    /// Substitute every placeholder from `params` and derive the bucket key.
    ///
    /// Parameter values are percent-encoded with the reserved-safe set
    /// (space becomes `%20`). Fails with [`Error::InvalidRouteParams`] when a
    /// placeholder has no matching parameter.
    pub fn bind(&self, params: &[(&str, &str)]) -> Result<BoundRoute, Error> {
        let mut path = String::with_capacity(self.template.len());
        let mut major_value: Option<&str> = None;
        let mut rest = self.template;
        while let Some(open) = rest.find('{') {
            path.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(|| Error::InvalidRouteParams {
                template: self.template,
                name: after.to_string(),
            })?;
            let name = &after[..close];
            let value = params
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| *v)
                .ok_or_else(|| Error::InvalidRouteParams {
                    template: self.template,
                    name: name.to_string(),
                })?;
            path.push_str(&urlencoding::encode(value));
            if self.major_param == Some(name) {
                major_value = Some(value);
            }
            rest = &after[close + 1..];
        }
        path.push_str(rest);
        Ok(BoundRoute {
            method: self.method.clone(),
            bucket: BucketKey::derive(&self.method, self.template, major_value),
            path,
        })
    }
}

/// A route with its path parameters bound: resolved path plus bucket key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundRoute {
    method: Method,
    path: String,
    bucket: BucketKey,
}

impl BoundRoute {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn bucket(&self) -> &BucketKey {
        &self.bucket
    }
}

/// Rate-limit accounting unit: method + template + major-parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketKey(String);

impl BucketKey {
    fn derive(method: &Method, template: &'static str, major_value: Option<&str>) -> Self {
        Self(format!("{}:{}:{}", method, template, major_value.unwrap_or("")))
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The in-scope operation catalogue. Shared read-only; binding is pure.
pub mod routes {
    use super::Route;
    use http::Method;

    pub const CREATE_MESSAGE: Route =
        Route::new(Method::POST, "/channels/{channel.id}/messages", Some("channel.id"));
    pub const GET_CHANNEL_MESSAGES: Route =
        Route::new(Method::GET, "/channels/{channel.id}/messages", Some("channel.id"));
    pub const GET_CHANNEL_MESSAGE: Route = Route::new(
        Method::GET,
        "/channels/{channel.id}/messages/{message.id}",
        Some("channel.id"),
    );
    pub const EDIT_MESSAGE: Route = Route::new(
        Method::PATCH,
        "/channels/{channel.id}/messages/{message.id}",
        Some("channel.id"),
    );
    pub const DELETE_MESSAGE: Route = Route::new(
        Method::DELETE,
        "/channels/{channel.id}/messages/{message.id}",
        Some("channel.id"),
    );
    pub const CREATE_REACTION: Route = Route::new(
        Method::PUT,
        "/channels/{channel.id}/messages/{message.id}/reactions/{emoji}/@me",
        Some("channel.id"),
    );
    pub const DELETE_OWN_REACTION: Route = Route::new(
        Method::DELETE,
        "/channels/{channel.id}/messages/{message.id}/reactions/{emoji}/@me",
        Some("channel.id"),
    );
    pub const TRIGGER_TYPING_INDICATOR: Route =
        Route::new(Method::POST, "/channels/{channel.id}/typing", Some("channel.id"));
}
