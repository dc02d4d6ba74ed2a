//! Middleware pipeline builder for axum.
//!
//! This crate assembles request-handling stages into a single router with a
//! fixed order, layered error handling and request/error logging.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  error stage                            │  ← error logger, error handlers,
//! │                                         │    default error handler
//! ├─────────────────────────────────────────┤
//! │  body parsers                           │  ← urlencoded, text, raw, json
//! │  top levels                             │
//! │  access logger                          │
//! │  routes                                 │  ← routers, routes, middleware
//! │  statics                                │  ← ServeDir
//! │  post statics                           │
//! ├─────────────────────────────────────────┤
//! │  404 Cannot <METHOD> <path>             │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Request Flow
//!
//! 1. **Request** enters the error stage, which hands it on
//! 2. **Stages** run in order; each answers or calls the next one
//! 3. **Errors** returned by any stage travel back up with the response
//! 4. **Error stage** runs the error handlers over them
//!
//! # Example
//!
//! ```ignore
//! use boilerplate_web::{
//!     app_start, create_pipeline, HttpError, LogOptions, PipelineOptions,
//!     PipelineSettings, Route, RouteHandler, StartOptions,
//! };
//!
//! async fn hello() -> Result<&'static str, HttpError> {
//!     Ok("hello")
//! }
//!
//! let settings = PipelineSettings::default()
//!     .with_route(Route::new("/hello", RouteHandler::handler(hello)))
//!     .with_options(PipelineOptions {
//!         log: Some(LogOptions::all()),
//!         default_error_handler: true,
//!         ..PipelineOptions::default()
//!     });
//! let app = create_pipeline(settings, None)?;
//! let server = app_start(app, StartOptions::default()).await?;
//! server.wait().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod autoclose;
pub mod body_logger;
pub mod error;
pub mod error_log;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod negotiate;
pub mod parsers;
pub mod pipeline;
pub mod routes;
pub mod server;
pub mod service;
pub mod spa;
pub mod statics;

// Re-export key types for convenience
pub use autoclose::{
    close_servers, has_signal_handler, set_ref, set_signal_handler, unset_ref, ServerHandle,
};
pub use body_logger::{body_logger, ExtraLoggingData};
pub use error::{ForwardedError, HttpError};
pub use error_log::{error_logger, ErrorLogOptions};
pub use extractors::{ParsedBody, RequestHead};
pub use handlers::{default_error_handler, ErrorHandler, ErrorOutcome};
pub use middleware::{access_log_layer, AccessLogOptions, RouteLogExt};
pub use parsers::BodyParsers;
pub use pipeline::{
    create_pipeline, DebugLog, LogOptions, PipelineBuilder, PipelineError, PipelineOptions,
    PipelineSettings,
};
pub use routes::{Route, RouteDefinition, RouteHandler, RouteMethod};
pub use server::{app_start, RunningServer, ServerError, StartOptions};
pub use service::{Middleware, Next, PipelineService};
pub use spa::{single_page_app, SinglePageAppConfig};
pub use statics::{StaticDefinition, StaticOptions};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, HttpError>;
