//! Error handlers.
//!
//! Error handlers run, in order, on every response carrying a forwarded
//! [`HttpError`](crate::HttpError). Each one either answers the request, lets
//! the error through to the next handler, or swaps it for another error.
//! When no handler answers, the bare status response produced for the error
//! is returned as-is.

pub mod default_error;

pub use default_error::{default_error_handler, default_error_response};

use crate::error::{forward, ForwardedError, HttpError};
use crate::extractors::RequestHead;
use crate::service::{Middleware, Next};
use axum::extract::Request;
use axum::response::Response;
use std::fmt;
use std::sync::Arc;

/// What an error handler did with an error
#[derive(Debug)]
pub enum ErrorOutcome {
    /// The error is answered with this response
    Handled(Response),
    /// Pass the error on unchanged
    Forward,
    /// Pass this error on instead
    Replace(HttpError),
}

type HandleFn = dyn Fn(&HttpError, &RequestHead) -> ErrorOutcome + Send + Sync;

/// One error processing step.
///
/// # Example
///
/// ```
/// use boilerplate_web::handlers::{ErrorHandler, ErrorOutcome};
/// use axum::http::StatusCode;
/// use axum::response::IntoResponse;
///
/// let teapot = ErrorHandler::new(|err, _head| {
///     if err.status() == StatusCode::IM_A_TEAPOT {
///         ErrorOutcome::Handled("short and stout".into_response())
///     } else {
///         ErrorOutcome::Forward
///     }
/// });
/// # drop(teapot);
/// ```
#[derive(Clone)]
pub struct ErrorHandler {
    handle: Arc<HandleFn>,
}

impl ErrorHandler {
    /// Wrap a handler function.
    pub fn new<F>(handle: F) -> Self
    where
        F: Fn(&HttpError, &RequestHead) -> ErrorOutcome + Send + Sync + 'static,
    {
        Self {
            handle: Arc::new(handle),
        }
    }

    /// Process one error.
    #[must_use]
    pub fn handle(&self, err: &HttpError, head: &RequestHead) -> ErrorOutcome {
        (self.handle)(err, head)
    }
}

impl fmt::Debug for ErrorHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorHandler").finish_non_exhaustive()
    }
}

/// Run `handlers` over the error carried by `response`, if any.
#[must_use]
pub fn process_errors(response: Response, head: &RequestHead, handlers: &[ErrorHandler]) -> Response {
    let Some(mut err) = ForwardedError::from_response(&response) else {
        return response;
    };
    let mut replaced = false;
    for handler in handlers {
        match handler.handle(&err, head) {
            ErrorOutcome::Handled(handled) => return handled,
            ErrorOutcome::Forward => {}
            ErrorOutcome::Replace(other) => {
                err = Arc::new(other);
                replaced = true;
            }
        }
    }
    if replaced {
        forward(err)
    } else {
        response
    }
}

/// Stage applying `handlers` to errors raised anywhere after it.
#[must_use]
pub fn error_stage(handlers: Vec<ErrorHandler>) -> Middleware {
    let handlers: Arc<[ErrorHandler]> = handlers.into();
    Middleware::from_fn(move |req: Request, next: Next| {
        let handlers = Arc::clone(&handlers);
        async move {
            let head = RequestHead::from_request(&req);
            let response = next.run(req).await;
            process_errors(response, &head, &handlers)
        }
    })
}
