//! Access logging middleware.
//!
//! Logs one line per request on the `boilerplate::access` target once the
//! response is ready:
//!
//! ```text
//! POST /api/login 200 12ms {"body":{"user":"bob"}}
//! ```
//!
//! The JSON meta object is only appended when it has content. It holds the
//! whitelisted properties of the parsed request body and any extra logging
//! data attached by a route through [`body_logger`](crate::body_logger).
//!
//! # Example
//!
//! ```ignore
//! use boilerplate_web::middleware::{access_log_layer, AccessLogOptions};
//!
//! let app = Router::new()
//!     .route("/api/users", get(list_users))
//!     .layer(access_log_layer(AccessLogOptions::default()));
//! ```
//!
//! # Flow
//!
//! 1. **Prepare** a [`RouteLogSlot`] in the request extensions
//! 2. **Run** the rest of the pipeline; later stages may fill the slot
//! 3. **Log** method, URI, status, elapsed time and the slot content

use crate::extractors::{ParsedBody, RequestHead};
use axum::{extract::Request, http::StatusCode, response::Response};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};

/// Target of access log events.
pub const ACCESS_LOG_TARGET: &str = "boilerplate::access";

/// Predicate deciding whether a request is left out of the access log.
pub type SkipFn = Arc<dyn Fn(&RequestHead, StatusCode) -> bool + Send + Sync>;

/// Access logger options.
#[derive(Clone, Default)]
pub struct AccessLogOptions {
    /// Body properties logged for every request
    pub body_whitelist: Vec<String>,
    /// Requests for which this returns true are not logged
    pub skip: Option<SkipFn>,
}

impl fmt::Debug for AccessLogOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessLogOptions")
            .field("body_whitelist", &self.body_whitelist)
            .field("skip", &self.skip.is_some())
            .finish()
    }
}

/// Per-request data logged with the access line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteLogData {
    /// Whitelisted body properties
    pub body: Option<Map<String, Value>>,
    /// Extra logging data
    pub extra: Option<Map<String, Value>>,
}

impl RouteLogData {
    /// Meta object appended to the access line, if it has content.
    #[must_use]
    pub fn meta(&self) -> Option<Value> {
        let mut meta = Map::new();
        if let Some(body) = self.body.as_ref().filter(|b| !b.is_empty()) {
            meta.insert("body".to_string(), Value::Object(body.clone()));
        }
        if let Some(extra) = &self.extra {
            for (key, value) in extra {
                meta.insert(key.clone(), value.clone());
            }
        }
        (!meta.is_empty()).then_some(Value::Object(meta))
    }
}

/// Shared slot where later stages record what the access line should show.
#[derive(Debug, Clone, Default)]
pub struct RouteLogSlot(Arc<Mutex<RouteLogData>>);

impl RouteLogSlot {
    /// Replace the logged body properties.
    pub fn set_body(&self, body: Map<String, Value>) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).body = Some(body);
    }

    /// Replace the extra logging data.
    pub fn set_extra(&self, extra: Map<String, Value>) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).extra = Some(extra);
    }

    /// Current content.
    #[must_use]
    pub fn snapshot(&self) -> RouteLogData {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// Create a layer that logs every request.
#[must_use]
pub fn access_log_layer(options: AccessLogOptions) -> AccessLogLayer {
    AccessLogLayer {
        options: Arc::new(options),
    }
}

/// Layer for access logging.
#[derive(Clone, Debug)]
pub struct AccessLogLayer {
    options: Arc<AccessLogOptions>,
}

impl<S> Layer<S> for AccessLogLayer {
    type Service = AccessLog<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AccessLog {
            inner,
            options: Arc::clone(&self.options),
        }
    }
}

/// Middleware service for access logging.
#[derive(Clone, Debug)]
pub struct AccessLog<S> {
    inner: S,
    options: Arc<AccessLogOptions>,
}

impl<S> Service<Request> for AccessLog<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let started = Instant::now();
        let head = RequestHead::from_request(&req);

        let slot = RouteLogSlot::default();
        if !self.options.body_whitelist.is_empty() {
            if let Some(body) = req.extensions().get::<ParsedBody>() {
                slot.set_body(body.whitelisted(&self.options.body_whitelist));
            }
        }
        req.extensions_mut().insert(slot.clone());

        let options = Arc::clone(&self.options);
        let fut = self.inner.call(req);

        Box::pin(async move {
            let response = fut.await?;
            let status = response.status();
            if options.skip.as_ref().is_some_and(|skip| skip(&head, status)) {
                return Ok(response);
            }
            let elapsed = started.elapsed().as_millis();
            let meta = slot
                .snapshot()
                .meta()
                .map(|meta| format!(" {meta}"))
                .unwrap_or_default();
            tracing::info!(
                target: ACCESS_LOG_TARGET,
                "{} {} {} {}ms{}",
                head.method,
                head.uri,
                status.as_u16(),
                elapsed,
                meta
            );
            Ok(response)
        })
    }
}

/// Extension trait for reaching the access log slot from a request.
///
/// # Example
///
/// ```ignore
/// use boilerplate_web::middleware::RouteLogExt;
///
/// async fn handler(req: Request) -> &'static str {
///     if let Some(slot) = req.route_log() {
///         slot.set_extra(serde_json::Map::new());
///     }
///     "ok"
/// }
/// ```
pub trait RouteLogExt {
    /// The slot, when the access logger is installed.
    fn route_log(&self) -> Option<&RouteLogSlot>;
}

impl RouteLogExt for Request {
    fn route_log(&self) -> Option<&RouteLogSlot> {
        self.extensions().get::<RouteLogSlot>()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use axum::{body::Body, routing::get, Router};
    use boilerplate_testing::capture_logs;
    use serde_json::json;
    use tower::ServiceExt;

    #[tokio::test(flavor = "current_thread")]
    async fn test_request_is_logged() {
        let (logs, _guard) = capture_logs();
        let app = Router::new()
            .route("/test", get(|| async { "ok" }))
            .layer(access_log_layer(AccessLogOptions::default()));

        let request = Request::builder()
            .uri("/test?x=1")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), 200);
        assert!(logs.contains(ACCESS_LOG_TARGET));
        assert!(logs.contains("GET /test?x=1 200 "));
        assert!(!logs.contains("{"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_slot_content_is_logged() {
        let (logs, _guard) = capture_logs();
        let app = Router::new()
            .route(
                "/test",
                get(|req: Request| async move {
                    let slot = req.route_log().expect("Access logger should be installed");
                    let mut extra = Map::new();
                    extra.insert("user".to_string(), json!("bob"));
                    slot.set_extra(extra);
                    "ok"
                }),
            )
            .layer(access_log_layer(AccessLogOptions::default()));

        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        app.oneshot(request).await.unwrap();

        assert!(logs.contains(r#"GET /test 200 "#));
        assert!(logs.contains(r#"{"user":"bob"}"#));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_skip() {
        let (logs, _guard) = capture_logs();
        let options = AccessLogOptions {
            skip: Some(Arc::new(|_head, status| status == StatusCode::OK)),
            ..AccessLogOptions::default()
        };
        let app = Router::new()
            .route("/test", get(|| async { "ok" }))
            .layer(access_log_layer(options));

        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        app.oneshot(request).await.unwrap();

        assert!(!logs.contains("/test"));
    }

    #[test]
    fn test_meta() {
        assert_eq!(RouteLogData::default().meta(), None);
        let data = RouteLogData {
            body: Some(Map::new()),
            extra: None,
        };
        assert_eq!(data.meta(), None);

        let mut body = Map::new();
        body.insert("name".to_string(), json!("x"));
        let mut extra = Map::new();
        extra.insert("tenant".to_string(), json!(3));
        let data = RouteLogData {
            body: Some(body),
            extra: Some(extra),
        };
        assert_eq!(data.meta(), Some(json!({"body": {"name": "x"}, "tenant": 3})));
    }
}
