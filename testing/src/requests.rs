//! Request builders and response readers.
//!
//! These helpers panic on malformed input since they only run in tests.

#![allow(clippy::expect_used, clippy::missing_panics_doc)]

use axum::body::{Body, Bytes};
use axum::extract::Request;
use axum::response::Response;
use axum::Router;
use http::Method;
use tower::ServiceExt;

/// Upper bound on bodies read back in tests
const MAX_BODY: usize = 16 * 1024 * 1024;

/// Empty-bodied request
#[must_use]
pub fn request(method: Method, uri: &str) -> Request {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("valid test request")
}

/// `GET` request
#[must_use]
pub fn get(uri: &str) -> Request {
    request(Method::GET, uri)
}

/// Request with a body and content type
#[must_use]
pub fn with_body(method: Method, uri: &str, content_type: &str, body: impl Into<Body>) -> Request {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, content_type)
        .body(body.into())
        .expect("valid test request")
}

/// `GET` request with an `Accept` header
#[must_use]
pub fn get_accepting(uri: &str, accept: &str) -> Request {
    Request::builder()
        .uri(uri)
        .header(http::header::ACCEPT, accept)
        .body(Body::empty())
        .expect("valid test request")
}

/// Drive one request through a clone of `app`
pub async fn send(app: &Router, req: Request) -> Response {
    app.clone()
        .oneshot(req)
        .await
        .expect("router services are infallible")
}

/// Collect the response body
pub async fn body_bytes(response: Response) -> Bytes {
    axum::body::to_bytes(response.into_body(), MAX_BODY)
        .await
        .expect("readable body")
}

/// Collect the response body as UTF-8
pub async fn body_string(response: Response) -> String {
    String::from_utf8(body_bytes(response).await.to_vec()).expect("utf-8 body")
}

/// Collect the response body as JSON
pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).expect("json body")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::routing::post;

    #[tokio::test]
    async fn test_send_and_read() {
        let app = Router::new().route("/echo", post(|body: String| async move { body }));
        let response = send(&app, with_body(Method::POST, "/echo", "text/plain", "hello")).await;
        assert_eq!(response.status(), 200);
        assert_eq!(body_string(response).await, "hello");
    }

    #[test]
    fn test_accept_header_is_set() {
        let req = get_accepting("/", "application/json");
        assert_eq!(req.headers()[http::header::ACCEPT], "application/json");
    }
}
