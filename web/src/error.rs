//! HTTP errors forwarded through the pipeline.
//!
//! A stage reports a failure by returning an [`HttpError`] as its response.
//! The response it produces is a bare status response carrying the error in a
//! [`ForwardedError`] extension; the error stages of the pipeline (error
//! logger, error handlers, default handler) pick it up from there.
//!
//! # Examples
//!
//! ```ignore
//! async fn handler(Path(id): Path<u32>) -> Result<Json<User>, HttpError> {
//!     let user = find_user(id).await
//!         .map_err(|e| HttpError::not_found(format!("User {id} not found")).with_source(e))?;
//!     Ok(Json(user))
//! }
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::backtrace::Backtrace;
use std::fmt;
use std::sync::Arc;

/// Error carrying an HTTP status.
///
/// `expose` tells the default error handler whether `message` may be sent to
/// the client. It defaults to `true` for client errors and `false` for server
/// errors.
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    message: String,
    expose: bool,
    source: Option<anyhow::Error>,
    fields: Vec<String>,
    causes: Vec<anyhow::Error>,
    backtrace: Backtrace,
}

impl HttpError {
    /// Create a new error.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            expose: status.as_u16() < 500,
            source: None,
            fields: Vec::new(),
            causes: Vec::new(),
            backtrace: Backtrace::capture(),
        }
    }

    /// Create an error whose message is the status reason phrase.
    #[must_use]
    pub fn from_status(status: StatusCode) -> Self {
        Self::new(status, reason_phrase(status))
    }

    /// Attach the underlying error.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Override whether the message is sent to clients.
    #[must_use]
    pub const fn with_expose(mut self, expose: bool) -> Self {
        self.expose = expose;
        self
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Create a 413 Payload Too Large error.
    #[must_use]
    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, message)
    }

    /// Create a 415 Unsupported Media Type error.
    #[must_use]
    pub fn unsupported_media_type(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNSUPPORTED_MEDIA_TYPE, message)
    }

    /// Create a 422 Unprocessable Entity error listing the offending fields
    /// and the errors found while validating them.
    #[must_use]
    pub fn unprocessable_entity(
        message: impl Into<String>,
        fields: impl IntoIterator<Item = impl Into<String>>,
        causes: impl IntoIterator<Item = anyhow::Error>,
    ) -> Self {
        let mut err = Self::new(StatusCode::UNPROCESSABLE_ENTITY, message);
        err.fields = fields.into_iter().map(Into::into).collect();
        err.causes = causes.into_iter().collect();
        err
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// HTTP status
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Error message
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether the message may be sent to clients
    #[must_use]
    pub const fn expose(&self) -> bool {
        self.expose
    }

    /// Fields rejected by a 422 error
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Validation errors attached to a 422 error
    #[must_use]
    pub fn causes(&self) -> &[anyhow::Error] {
        &self.causes
    }

    /// Backtrace captured when the error was created
    #[must_use]
    pub const fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// One-line summary of a 422 error:
    /// `<message>: fields=["a","b"], errors=["..."]`.
    ///
    /// `None` for other statuses, or unless both fields and causes are set.
    #[must_use]
    pub fn unprocessable_summary(&self) -> Option<String> {
        if self.status != StatusCode::UNPROCESSABLE_ENTITY
            || self.fields.is_empty()
            || self.causes.is_empty()
        {
            return None;
        }
        let errors: Vec<String> = self.causes.iter().map(ToString::to_string).collect();
        Some(format!(
            "{}: fields={}, errors={}",
            self.message,
            serde_json::Value::from(self.fields.clone()),
            serde_json::Value::from(errors),
        ))
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HttpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error travelling with a response to the error stages
#[derive(Debug, Clone)]
pub struct ForwardedError(pub Arc<HttpError>);

impl ForwardedError {
    /// Error carried by `response`, if any
    #[must_use]
    pub fn from_response(response: &Response) -> Option<Arc<HttpError>> {
        response
            .extensions()
            .get::<Self>()
            .map(|forwarded| Arc::clone(&forwarded.0))
    }
}

/// Reason phrase of `status`, or its code when it has none
pub(crate) fn reason_phrase(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map_or_else(|| status.as_u16().to_string(), str::to_string)
}

/// Bare status response carrying `err` for later error stages.
pub(crate) fn forward(err: Arc<HttpError>) -> Response {
    let status = err.status();
    let mut response = (status, reason_phrase(status)).into_response();
    response.extensions_mut().insert(ForwardedError(err));
    response
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        forward(Arc::new(self))
    }
}

/// Convert `anyhow::Error` to `HttpError`.
impl From<anyhow::Error> for HttpError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}
