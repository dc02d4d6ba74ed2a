//! Type-erased pipeline services and middleware.
//!
//! A pipeline is a chain of stages. Each stage receives the request and the
//! rest of the chain ([`Next`]); it either answers the request itself or hands
//! it on. Stages are type-erased into [`PipelineService`] so that stages of
//! different kinds (axum routers, tower layers, async functions) can be
//! chained freely.

use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::future::{BoxFuture, FutureExt};
use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service, ServiceExt};

type HandlerFn = dyn Fn(Request) -> BoxFuture<'static, Response> + Send + Sync;
type WrapFn = dyn Fn(PipelineService) -> PipelineService + Send + Sync;

/// Clonable, type-erased request handler.
#[derive(Clone)]
pub struct PipelineService {
    inner: Arc<HandlerFn>,
}

impl PipelineService {
    /// Erase any infallible tower service.
    pub fn new<S>(service: S) -> Self
    where
        S: Service<Request, Response = Response, Error = Infallible>
            + Clone
            + Send
            + Sync
            + 'static,
        S::Future: Send + 'static,
    {
        Self::from_fn(move |req| {
            let service = service.clone();
            async move {
                match service.oneshot(req).await {
                    Ok(response) => response,
                    Err(never) => match never {},
                }
            }
        })
    }

    /// Wrap an async function.
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self {
            inner: Arc::new(move |req| f(req).boxed()),
        }
    }

    /// End of a pipeline: `404 Cannot <METHOD> <path>`.
    #[must_use]
    pub fn not_found() -> Self {
        Self::from_fn(|req: Request| async move {
            (
                StatusCode::NOT_FOUND,
                format!("Cannot {} {}", req.method(), req.uri().path()),
            )
                .into_response()
        })
    }

    /// Handle one request.
    pub fn run(&self, req: Request) -> BoxFuture<'static, Response> {
        (self.inner)(req)
    }
}

impl fmt::Debug for PipelineService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineService").finish_non_exhaustive()
    }
}

impl Service<Request> for PipelineService {
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let fut = self.run(req);
        Box::pin(async move { Ok(fut.await) })
    }
}

/// The remainder of the pipeline, handed to a middleware.
#[derive(Clone, Debug)]
pub struct Next(PipelineService);

impl Next {
    /// Pass the request on.
    pub async fn run(self, req: Request) -> Response {
        self.0.run(req).await
    }
}

/// A pipeline stage.
///
/// # Example
///
/// ```
/// use boilerplate_web::{Middleware, Next};
/// use axum::extract::Request;
///
/// let stamp = Middleware::from_fn(|req: Request, next: Next| async move {
///     let mut response = next.run(req).await;
///     response.headers_mut().insert("x-stamped", "yes".parse().unwrap());
///     response
/// });
/// # drop(stamp);
/// ```
#[derive(Clone)]
pub struct Middleware {
    wrap: Arc<WrapFn>,
}

impl Middleware {
    /// Build a stage from an async function of the request and the rest of
    /// the pipeline.
    ///
    /// The function may return anything convertible into a response,
    /// including `Result<_, HttpError>`; errors are forwarded.
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoResponse,
    {
        let f = Arc::new(f);
        Self {
            wrap: Arc::new(move |next: PipelineService| {
                let f = Arc::clone(&f);
                PipelineService::from_fn(move |req| {
                    let fut = f(req, Next(next.clone()));
                    async move { fut.await.into_response() }
                })
            }),
        }
    }

    /// Build a stage from a tower layer.
    pub fn from_layer<L>(layer: L) -> Self
    where
        L: Layer<PipelineService> + Send + Sync + 'static,
        L::Service: Service<Request, Response = Response, Error = Infallible>
            + Clone
            + Send
            + Sync
            + 'static,
        <L::Service as Service<Request>>::Future: Send + 'static,
    {
        Self {
            wrap: Arc::new(move |next| PipelineService::new(layer.layer(next))),
        }
    }

    /// Build a stage from a function receiving the rest of the pipeline.
    pub(crate) fn from_wrap<F>(wrap: F) -> Self
    where
        F: Fn(PipelineService) -> PipelineService + Send + Sync + 'static,
    {
        Self {
            wrap: Arc::new(wrap),
        }
    }

    /// Put this stage in front of `next`.
    #[must_use]
    pub fn wrap(&self, next: PipelineService) -> PipelineService {
        (self.wrap)(next)
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Middleware").finish_non_exhaustive()
    }
}

/// Chain `stages` in order in front of `terminal`.
#[must_use]
pub fn chain_stages(stages: &[Middleware], terminal: PipelineService) -> PipelineService {
    stages
        .iter()
        .rev()
        .fold(terminal, |next, stage| stage.wrap(next))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::{ForwardedError, HttpError};
    use axum::body::Body;
    use std::sync::Mutex;

    fn request(uri: &str) -> Request {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn recorder(log: &Arc<Mutex<Vec<String>>>, name: &'static str) -> Middleware {
        let log = Arc::clone(log);
        Middleware::from_fn(move |req: Request, next: Next| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(name.to_string());
                next.run(req).await
            }
        })
    }

    #[tokio::test]
    async fn test_terminal_not_found() {
        let response = PipelineService::not_found().run(request("/nope")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"Cannot GET /nope");
    }

    #[tokio::test]
    async fn test_stages_run_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let stages = vec![recorder(&log, "a"), recorder(&log, "b"), recorder(&log, "c")];
        let service = chain_stages(&stages, PipelineService::not_found());
        let _ = service.run(request("/")).await;
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_stage_can_short_circuit() {
        let stop = Middleware::from_fn(|_req: Request, _next: Next| async { "stopped" });
        let service = chain_stages(&[stop], PipelineService::not_found());
        let response = service.run(request("/")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_result_errors_are_forwarded() {
        let failing = Middleware::from_fn(|_req: Request, _next: Next| async {
            Err::<Response, _>(HttpError::bad_request("bad"))
        });
        let service = chain_stages(&[failing], PipelineService::not_found());
        let response = service.run(request("/")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(ForwardedError::from_response(&response).is_some());
    }

    #[tokio::test]
    async fn test_service_impl() {
        let response = PipelineService::not_found()
            .oneshot(request("/x"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
