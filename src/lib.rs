#![forbid(unsafe_code)]
#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # Catwalk
//!
//! Rate-limit-aware REST dispatch for chat-platform APIs that throttle per
//! endpoint-and-resource bucket.
//!
//! High-level operations become correctly-routed, correctly-ordered,
//! correctly-retried HTTP calls:
//!
//! - **Routes and buckets**: a static catalogue of path templates; binding
//!   one derives the bucket key from its major parameter.
//! - **Per-bucket FIFO queues**: one in-flight request per bucket, buckets
//!   fully parallel, completion order equals submission order.
//! - **Bucket tracking**: an in-memory predictor fed by response headers
//!   decides whether a request fires now or waits for the window reset.
//! - **Bounded retries**: 429s retry the same request at the head of its
//!   queue; 5xx and transport failures back off exponentially; other 4xx
//!   resolve the caller's pending result with a terminal error.
//!
//! The HTTP exchange itself is behind the [`Transport`] trait — bring any
//! client.
//!
//! ## Quick start
//!
//! ```rust
//! use catwalk::{routes, OutboundRequest};
//!
//! // Binding a route resolves the path and the rate-limit bucket.
//! let route = routes::CREATE_MESSAGE.bind(&[("channel.id", "123")]).unwrap();
//! assert_eq!(route.path(), "/channels/123/messages");
//!
//! let request = OutboundRequest::new(route)
//!     .body(serde_json::json!({"content": "hello"}));
//! // dispatcher.submit(request) queues it under the channel's bucket.
//! # let _ = request;
//! ```

pub mod backoff;
pub mod bucket;
pub mod clock;
pub mod dispatch;
pub mod entity;
pub mod error;
pub mod request;
pub mod rest;
pub mod route;
pub mod sleeper;
pub mod transform;
pub mod transport;

pub use backoff::{Backoff, Jitter};
pub use bucket::{Admit, BucketTracker};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use dispatch::{DispatchConfig, Dispatcher, DispatcherBuilder, PendingResult};
pub use entity::{Embed, Message, User};
pub use error::{Error, Shape, TransientFailure};
pub use request::OutboundRequest;
pub use rest::{CreateMessage, GetMessages, Rest};
pub use route::{routes, BoundRoute, BucketKey, Route};
pub use sleeper::{InstantSleeper, Sleeper, TokioSleeper, TrackingSleeper};
pub use transform::ResponsePayload;
pub use transport::{RateLimitHeaders, Transport, TransportError, WireRequest, WireResponse};
