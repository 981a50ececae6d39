//! Mock transport for testing.
//!
//! [`MockTransport`] answers requests from a script instead of the network,
//! records every request it sees, and can hold each request for a fixed
//! latency so tests can observe in-flight behavior deterministically.
//!
//! # Basic Usage
//!
//! ```
//! use querykit::http::mock::MockTransport;
//! use querykit::http::{Method, RawResponse};
//! use serde_json::json;
//!
//! let mock = MockTransport::new();
//! mock.respond(Method::Get, "/all?fields=name", Ok(RawResponse::ok(json!([]))));
//! assert_eq!(mock.call_count("/all?fields=name"), 0);
//! ```
//!
//! One-shot responses take priority over the standing response for a route,
//! which makes "first call fails, replay succeeds" sequences easy to script:
//!
//! ```
//! use querykit::ApiError;
//! use querykit::http::mock::MockTransport;
//! use querykit::http::{Method, RawResponse};
//! use serde_json::{Value, json};
//!
//! let mock = MockTransport::new();
//! mock.respond_once(
//!     Method::Get,
//!     "incidents",
//!     Err(ApiError::Http { status: 401, body: Value::Null }),
//! );
//! mock.respond(Method::Get, "incidents", Ok(RawResponse::ok(json!([1, 2]))));
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use dashmap::DashMap;
use futures::future::BoxFuture;
use serde_json::json;
use tokio::sync::broadcast;

use crate::error::ApiError;

use super::executor::Transport;
use super::request::{Method, RawResponse, RequestDescriptor};

type Reply = Result<RawResponse, ApiError>;

#[derive(Debug, Default)]
struct Route {
    once: VecDeque<Reply>,
    always: Option<Reply>,
}

#[derive(Debug)]
struct Inner {
    routes: DashMap<(Method, String), Route>,
    calls: Mutex<Vec<RequestDescriptor>>,
    latency: Mutex<Option<Duration>>,
    sender: broadcast::Sender<RequestDescriptor>,
}

/// A scripted, recording [`Transport`].
///
/// Cloning shares the script and the call log, so a clone can be handed to
/// the client while the test keeps one for assertions.
#[derive(Debug, Clone)]
pub struct MockTransport {
    inner: Arc<Inner>,
}

impl MockTransport {
    /// Creates a mock with an empty script.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _rx) = broadcast::channel(100);
        Self {
            inner: Arc::new(Inner {
                routes: DashMap::new(),
                calls: Mutex::new(Vec::new()),
                latency: Mutex::new(None),
                sender,
            }),
        }
    }

    /// Delays every response by `latency`.
    #[must_use]
    pub fn with_latency(self, latency: Duration) -> Self {
        *self
            .inner
            .latency
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(latency);
        self
    }

    /// Sets the standing response for a route.
    pub fn respond(&self, method: Method, url: impl Into<String>, reply: Reply) {
        self.inner
            .routes
            .entry((method, url.into()))
            .or_default()
            .always = Some(reply);
    }

    /// Queues a response that is returned once, before the standing one.
    pub fn respond_once(&self, method: Method, url: impl Into<String>, reply: Reply) {
        self.inner
            .routes
            .entry((method, url.into()))
            .or_default()
            .once
            .push_back(reply);
    }

    /// Returns every request seen so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RequestDescriptor> {
        self.inner
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns how many requests targeted `url`.
    #[must_use]
    pub fn call_count(&self, url: &str) -> usize {
        self.inner
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|call| call.url == url)
            .count()
    }

    /// Subscribes to requests as they arrive.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RequestDescriptor> {
        self.inner.sender.subscribe()
    }

    fn reply_for(&self, request: &RequestDescriptor) -> Reply {
        let key = (request.method, request.url.clone());
        let Some(mut route) = self.inner.routes.get_mut(&key) else {
            return Err(ApiError::Http {
                status: 404,
                body: json!({ "error": { "message": "NO_MOCK_ROUTE" } }),
            });
        };
        if let Some(reply) = route.once.pop_front() {
            return reply;
        }
        route.always.clone().unwrap_or_else(|| {
            Err(ApiError::Http {
                status: 404,
                body: json!({ "error": { "message": "NO_MOCK_ROUTE" } }),
            })
        })
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn execute<'a>(&'a self, request: &'a RequestDescriptor) -> BoxFuture<'a, Reply> {
        Box::pin(async move {
            self.inner
                .calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(request.clone());
            let _ = self.inner.sender.send(request.clone());

            let latency = *self
                .inner
                .latency
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }
            self.reply_for(request)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[tokio::test]
    async fn test_unscripted_route_is_404() {
        let mock = MockTransport::new();
        let err = mock
            .execute(&RequestDescriptor::get("missing"))
            .await
            .expect_err("unscripted route should fail");
        assert_eq!(err.status(), Some(404));
        assert_eq!(mock.call_count("missing"), 1);
    }

    #[tokio::test]
    async fn test_once_precedes_standing_reply() {
        let mock = MockTransport::new();
        mock.respond(Method::Get, "a", Ok(RawResponse::ok(json!("always"))));
        mock.respond_once(
            Method::Get,
            "a",
            Err(ApiError::Http {
                status: 401,
                body: Value::Null,
            }),
        );

        let req = RequestDescriptor::get("a");
        assert!(mock.execute(&req).await.is_err());
        let ok = mock.execute(&req).await.expect("standing reply");
        assert_eq!(ok.body, json!("always"));
        let ok = mock.execute(&req).await.expect("standing reply repeats");
        assert_eq!(ok.body, json!("always"));
        assert_eq!(mock.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_clone_shares_log() {
        let mock1 = MockTransport::new();
        let mock2 = mock1.clone();
        let mut rx = mock1.subscribe();

        mock1.respond(Method::Post, "b", Ok(RawResponse::ok(Value::Null)));
        let _ = mock2.execute(&RequestDescriptor::post("b", json!({}))).await;

        assert_eq!(mock1.call_count("b"), 1);
        let seen = rx.recv().await.expect("request should be broadcast");
        assert_eq!(seen.method, Method::Post);
    }
}
