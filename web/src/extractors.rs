//! Custom Axum extractors.
//!
//! - `RequestHead`: method, URI and headers of the request, as seen by error
//!   handlers and loggers
//! - `ParsedBody`: the body decoded by the pipeline's body parsers
//!
//! # Examples
//!
//! ```ignore
//! use boilerplate_web::extractors::ParsedBody;
//!
//! async fn handler(body: ParsedBody) -> String {
//!     match body {
//!         ParsedBody::Json(value) => value.to_string(),
//!         other => format!("{other:?}"),
//!     }
//! }
//! ```

use crate::error::HttpError;
use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap, Method, Uri},
};
use serde_json::Value;
use std::convert::Infallible;

/// Request line and headers, detached from the body.
#[derive(Debug, Clone)]
pub struct RequestHead {
    /// Request method
    pub method: Method,
    /// Request URI
    pub uri: Uri,
    /// Request headers
    pub headers: HeaderMap,
}

impl RequestHead {
    /// Copy the head of `req`.
    #[must_use]
    pub fn from_request(req: &Request) -> Self {
        Self {
            method: req.method().clone(),
            uri: req.uri().clone(),
            headers: req.headers().clone(),
        }
    }

    /// Copy the head of request parts.
    #[must_use]
    pub fn from_parts(parts: &Parts) -> Self {
        Self {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
        }
    }

    /// Request path
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Raw `Accept` header, if present and valid
    #[must_use]
    pub fn accept(&self) -> Option<&str> {
        self.headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestHead
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

/// Body decoded by one of the pipeline's body parsers.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBody {
    /// `application/json`
    Json(Value),
    /// `application/x-www-form-urlencoded`, as a JSON object
    Form(Value),
    /// `text/plain`
    Text(String),
    /// `application/octet-stream`
    Raw(Bytes),
}

impl ParsedBody {
    /// Structured view of the body (JSON or form)
    #[must_use]
    pub const fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Json(value) | Self::Form(value) => Some(value),
            Self::Text(_) | Self::Raw(_) => None,
        }
    }

    /// Keep only the listed top-level properties of a structured body.
    ///
    /// Returns an empty object for text and raw bodies.
    #[must_use]
    pub fn whitelisted(&self, fields: &[String]) -> serde_json::Map<String, Value> {
        let mut kept = serde_json::Map::new();
        if let Some(Value::Object(map)) = self.as_value() {
            for field in fields {
                if let Some(value) = map.get(field) {
                    kept.insert(field.clone(), value.clone());
                }
            }
        }
        kept
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ParsedBody
where
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| HttpError::unsupported_media_type("Request body was not parsed"))
    }
}
