//! Content-negotiating default error handler.
//!
//! Answers every error it sees:
//!
//! - `json` clients get `{"statusCode": <code>, "message": <message>}`
//! - others get the message as `text/html`, or the status reason phrase as
//!   `text/plain` when the message is hidden
//!
//! The message is only sent when the error allows it (`expose`).

use super::{ErrorHandler, ErrorOutcome};
use crate::error::{reason_phrase, HttpError};
use crate::extractors::RequestHead;
use crate::negotiate::preferred_type;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Types offered to the client, in preference order when it has none
const OFFERED: &[&str] = &["text", "html", "json"];

/// Error response body (JSON).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
}

/// Response the default handler sends for `err`.
#[must_use]
pub fn default_error_response(err: &HttpError, head: &RequestHead) -> Response {
    let status = err.status();
    let message = err.expose().then(|| err.message());
    if preferred_type(head.accept(), OFFERED) == Some("json") {
        return (
            status,
            Json(ErrorBody {
                status_code: status.as_u16(),
                message,
            }),
        )
            .into_response();
    }
    match message {
        Some(message) => (
            status,
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            message.to_string(),
        )
            .into_response(),
        None => (status, reason_phrase(status)).into_response(),
    }
}

/// The default error handler.
#[must_use]
pub fn default_error_handler() -> ErrorHandler {
    ErrorHandler::new(|err, head| ErrorOutcome::Handled(default_error_response(err, head)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};

    fn head(accept: Option<&'static str>) -> RequestHead {
        let mut headers = HeaderMap::new();
        if let Some(accept) = accept {
            headers.insert(header::ACCEPT, HeaderValue::from_static(accept));
        }
        RequestHead {
            method: Method::GET,
            uri: Uri::from_static("/thing"),
            headers,
        }
    }

    async fn body(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_text_by_default() {
        let err = HttpError::bad_request("missing name");
        let response = default_error_response(&err, &head(None));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/html; charset=utf-8"
        );
        assert_eq!(body(response).await, "missing name");

        let response = default_error_response(&err, &head(Some("text/plain")));
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/html; charset=utf-8"
        );
    }

    #[tokio::test]
    async fn test_hidden_message_uses_reason() {
        let err = HttpError::internal("database password is hunter2");
        let response = default_error_response(&err, &head(Some("text/plain")));
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
        assert_eq!(body(response).await, "Internal Server Error");
    }

    #[tokio::test]
    async fn test_json_body() {
        let err = HttpError::not_found("no such thing");
        let response = default_error_response(&err, &head(Some("application/json")));
        let value: serde_json::Value = serde_json::from_str(&body(response).await).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"statusCode": 404, "message": "no such thing"})
        );
    }

    #[tokio::test]
    async fn test_json_body_without_message() {
        let err = HttpError::internal("secret");
        let response = default_error_response(&err, &head(Some("application/json")));
        assert_eq!(body(response).await, r#"{"statusCode":500}"#);
    }

    #[tokio::test]
    async fn test_html_client() {
        let err = HttpError::bad_request("nope");
        let response = default_error_response(&err, &head(Some("text/html")));
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/html"));
        assert_eq!(body(response).await, "nope");
    }

    #[tokio::test]
    async fn test_unacceptable_falls_back_to_text() {
        let err = HttpError::bad_request("nope");
        let response = default_error_response(&err, &head(Some("image/png")));
        assert_eq!(body(response).await, "nope");
    }
}
