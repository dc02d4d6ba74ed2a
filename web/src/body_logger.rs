//! Per-route access log details.
//!
//! Put [`body_logger`] in a route's middleware chain to choose which body
//! properties the access line shows for that route, and to attach extra data
//! to it.
//!
//! ```ignore
//! let login = Route::new(
//!     "/login",
//!     RouteHandler::chain([
//!         body_logger(Some(vec!["user".into()]), ExtraLoggingData::None),
//!         Middleware::from_fn(login_handler),
//!     ]),
//! )
//! .with_method(RouteMethod::Post);
//! ```

use crate::error::HttpError;
use crate::extractors::{ParsedBody, RequestHead};
use crate::middleware::RouteLogExt;
use crate::service::{Middleware, Next};
use axum::extract::Request;
use futures::future::{self, BoxFuture, FutureExt};
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Extra logging data as returned by a dynamic source
pub type ExtraData = Option<Map<String, Value>>;

type ExtraFn = dyn Fn(RequestHead) -> BoxFuture<'static, Result<ExtraData, HttpError>> + Send + Sync;

/// Extra data attached to the access line of a route
#[derive(Clone, Default)]
pub enum ExtraLoggingData {
    /// Nothing extra
    #[default]
    None,
    /// The same data for every request
    Static(Map<String, Value>),
    /// Data computed from each request; an error is forwarded
    Dynamic(Arc<ExtraFn>),
}

impl ExtraLoggingData {
    /// Compute the data from each request.
    pub fn dynamic<F, Fut>(f: F) -> Self
    where
        F: Fn(RequestHead) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ExtraData, HttpError>> + Send + 'static,
    {
        Self::Dynamic(Arc::new(move |head| f(head).boxed()))
    }

    fn resolve(&self, req: &Request) -> BoxFuture<'static, Result<ExtraData, HttpError>> {
        match self {
            Self::None => future::ready(Ok(None)).boxed(),
            Self::Static(data) => future::ready(Ok(Some(data.clone()))).boxed(),
            Self::Dynamic(f) => f(RequestHead::from_request(req)),
        }
    }
}

impl fmt::Debug for ExtraLoggingData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Static(data) => f.debug_tuple("Static").field(data).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Middleware recording the body whitelist and extra data of a route for the
/// access logger.
///
/// `fields` replaces the logged body properties when set. Without an access
/// logger in the pipeline, only the dynamic data source runs (its error still
/// fails the request).
#[must_use]
pub fn body_logger(fields: Option<Vec<String>>, extra: ExtraLoggingData) -> Middleware {
    let fields = Arc::new(fields);
    Middleware::from_fn(move |req: Request, next: Next| {
        let fields = Arc::clone(&fields);
        let pending = extra.resolve(&req);
        async move {
            let extra = pending.await?;
            if let Some(slot) = req.route_log() {
                if let Some(fields) = fields.as_ref() {
                    let body = req
                        .extensions()
                        .get::<ParsedBody>()
                        .map(|body| body.whitelisted(fields))
                        .unwrap_or_default();
                    slot.set_body(body);
                }
                if let Some(extra) = extra {
                    slot.set_extra(extra);
                }
            }
            Ok::<_, HttpError>(next.run(req).await)
        }
    })
}
