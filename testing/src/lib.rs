//! # Boilerplate Testing
//!
//! Testing utilities shared by the boilerplate crates.
//!
//! This crate provides:
//! - Request builders and body readers for driving axum routers with
//!   `tower::ServiceExt::oneshot`
//! - A captured log writer for asserting on `tracing` output
//! - Property-based testing strategies
//!
//! ## Example
//!
//! ```ignore
//! use boilerplate_testing::{body_string, get, send};
//!
//! #[tokio::test]
//! async fn test_hello() {
//!     let app = axum::Router::new().route("/", axum::routing::get(|| async { "hi" }));
//!     let response = send(&app, get("/")).await;
//!     assert_eq!(body_string(response).await, "hi");
//! }
//! ```

pub mod logs;
pub mod requests;

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;

    /// Lower camel case identifiers (`fooBar`, `enableHTTPServer`)
    pub fn camel_identifier() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9]{0,6}([A-Z][a-z0-9]{0,5}){0,3}"
    }

    /// Task or target names as used by build configurations
    pub fn task_name() -> impl Strategy<Value = String> {
        "[a-zA-Z][a-zA-Z0-9]{0,11}"
    }

    /// Dotted JSON property paths (`a`, `a.b`, `a.b.c`)
    pub fn dotted_path() -> impl Strategy<Value = String> {
        proptest::collection::vec("[a-z]{1,6}", 1..4).prop_map(|parts| parts.join("."))
    }
}

pub use requests::{
    body_bytes, body_json, body_string, get, get_accepting, request, send, with_body,
};
pub use logs::{capture_logs, CapturedLogs};
