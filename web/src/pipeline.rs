//! Pipeline builder.
//!
//! Assembles the stages of a [`PipelineSettings`] into a single [`Router`], in
//! this order:
//!
//! 1. body parsers (urlencoded, text, raw, json)
//! 2. top-level routes and middleware
//! 3. access logger
//! 4. routes
//! 5. statics
//! 6. post-static routes
//! 7. error logger
//! 8. error handlers
//! 9. default error handler
//!
//! A request no stage answers ends with `404 Cannot <METHOD> <path>`.
//!
//! # Example
//!
//! ```ignore
//! let settings = PipelineSettings::default()
//!     .with_route(Route::new("/api/hello", RouteHandler::handler(hello)))
//!     .with_static("public")
//!     .with_options(PipelineOptions {
//!         log: Some(LogOptions::default()),
//!         default_error_handler: true,
//!         ..PipelineOptions::default()
//!     });
//! let app = create_pipeline(settings, None)?;
//! ```

use crate::error_log::{error_logger, ErrorLogOptions};
use crate::handlers::{default_error_handler, error_stage, ErrorHandler};
use crate::middleware::{access_log_layer, AccessLogOptions};
use crate::parsers::BodyParsers;
use crate::routes::RouteDefinition;
use crate::service::{chain_stages, Middleware, PipelineService};
use crate::statics::StaticDefinition;
use axum::Router;
use boilerplate_logging::{set_config, LogConfig};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Pipeline construction errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// A route or static mount point is not usable
    #[error("Invalid route \"{path}\": {reason}")]
    InvalidRoute {
        /// Offending path
        path: String,
        /// What is wrong with it
        reason: String,
    },
}

/// Receives the builder's debug messages.
pub type DebugLog = Arc<dyn Fn(&str) + Send + Sync>;

/// Logging setup of a pipeline.
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Log each request
    pub route: Option<AccessLogOptions>,
    /// Log each error
    pub error: Option<ErrorLogOptions>,
    /// Prefix log lines with a timestamp
    pub timestamp: bool,
}

impl LogOptions {
    /// Request and error logging with default options.
    #[must_use]
    pub fn all() -> Self {
        Self {
            route: Some(AccessLogOptions::default()),
            error: Some(ErrorLogOptions::default()),
            timestamp: false,
        }
    }
}

/// Pipeline-wide options.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Logging; nothing is logged when unset
    pub log: Option<LogOptions>,
    /// Body parsers, none by default
    pub middleware: BodyParsers,
    /// Answer unhandled errors with the content-negotiating default handler
    pub default_error_handler: bool,
}

/// Everything a pipeline is built from.
#[derive(Debug, Clone, Default)]
pub struct PipelineSettings {
    /// Definitions placed before the access logger
    pub top_levels: Vec<Option<RouteDefinition>>,
    /// Routes
    pub routes: Vec<Option<RouteDefinition>>,
    /// Static directories
    pub statics: Vec<StaticDefinition>,
    /// Definitions placed after the static directories
    pub post_statics: Vec<Option<RouteDefinition>>,
    /// Error handlers, in order
    pub error_handlers: Vec<ErrorHandler>,
    /// Options
    pub options: PipelineOptions,
}

impl PipelineSettings {
    /// Add a top-level definition.
    #[must_use]
    pub fn with_top_level(mut self, def: impl Into<RouteDefinition>) -> Self {
        self.top_levels.push(Some(def.into()));
        self
    }

    /// Add a route.
    #[must_use]
    pub fn with_route(mut self, def: impl Into<RouteDefinition>) -> Self {
        self.routes.push(Some(def.into()));
        self
    }

    /// Add several routes.
    #[must_use]
    pub fn with_routes(mut self, defs: impl IntoIterator<Item = RouteDefinition>) -> Self {
        self.routes.extend(defs.into_iter().map(Some));
        self
    }

    /// Add a static directory.
    #[must_use]
    pub fn with_static(mut self, def: impl Into<StaticDefinition>) -> Self {
        self.statics.push(def.into());
        self
    }

    /// Add a route handled after the static directories.
    #[must_use]
    pub fn with_post_static(mut self, def: impl Into<RouteDefinition>) -> Self {
        self.post_statics.push(Some(def.into()));
        self
    }

    /// Add an error handler.
    #[must_use]
    pub fn with_error_handler(mut self, handler: ErrorHandler) -> Self {
        self.error_handlers.push(handler);
        self
    }

    /// Replace the options.
    #[must_use]
    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }
}

/// Builds pipelines, reporting each step to an optional debug function.
#[derive(Clone, Default)]
pub struct PipelineBuilder {
    debug_log: Option<DebugLog>,
}

impl fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("debug_log", &self.debug_log.is_some())
            .finish()
    }
}

impl PipelineBuilder {
    /// Create a builder.
    #[must_use]
    pub fn new(debug_log: Option<DebugLog>) -> Self {
        Self { debug_log }
    }

    fn debug(&self, message: &str) {
        if let Some(log) = &self.debug_log {
            log(message);
        }
    }

    /// Build the pipeline as a router.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidRoute`] when a route or static mount
    /// point is invalid.
    pub fn create_pipeline(&self, settings: PipelineSettings) -> Result<Router, PipelineError> {
        let service = self.build_service(settings)?;
        Ok(Router::new().fallback_service(service))
    }

    /// Build the pipeline as a service.
    ///
    /// # Errors
    ///
    /// See [`create_pipeline`](Self::create_pipeline).
    pub fn build_service(&self, settings: PipelineSettings) -> Result<PipelineService, PipelineError> {
        let PipelineSettings {
            top_levels,
            routes,
            statics,
            post_statics,
            error_handlers,
            options,
        } = settings;
        self.debug("createPipeline()");

        if let Some(log) = &options.log {
            set_config(LogConfig {
                timestamp: log.timestamp,
                collapse_dependency_frames: log
                    .error
                    .map_or(true, |error| error.collapse_dependency_frames),
            });
        }

        let mut stages = Vec::new();
        self.debug("add body parsers");
        for (name, stage) in options.middleware.stages() {
            self.debug(&format!("{name} parser"));
            stages.push(stage);
        }

        self.debug("add top level routes/middleware");
        self.add_routes(&mut stages, top_levels)?;

        self.debug("add logger (route call)");
        if let Some(route) = options.log.as_ref().and_then(|log| log.route.clone()) {
            self.debug("Adding route logger");
            stages.push(Middleware::from_layer(access_log_layer(route)));
        }

        self.debug("add routes");
        self.add_routes(&mut stages, routes)?;

        self.debug("add statics");
        for def in statics {
            self.debug(&def.describe());
            stages.push(def.into_middleware()?);
        }

        self.debug("add post statics routes");
        self.add_routes(&mut stages, post_statics)?;

        let mut handlers = Vec::new();
        self.debug("add logger (errors)");
        if options.log.as_ref().is_some_and(|log| log.error.is_some()) {
            self.debug("Adding error logger");
            handlers.push(error_logger());
        }
        self.debug("add error handlers");
        handlers.extend(error_handlers);
        self.debug("add default error handlers");
        if options.default_error_handler {
            self.debug("Adding default error handler");
            handlers.push(default_error_handler());
        }
        if !handlers.is_empty() {
            stages.insert(0, error_stage(handlers));
        }

        Ok(chain_stages(&stages, PipelineService::not_found()))
    }

    fn add_routes(
        &self,
        stages: &mut Vec<Middleware>,
        defs: Vec<Option<RouteDefinition>>,
    ) -> Result<(), PipelineError> {
        for def in defs.into_iter().flatten() {
            self.debug(&def.describe());
            stages.push(def.into_middleware()?);
        }
        Ok(())
    }
}

/// Build a pipeline router from `settings`.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidRoute`] when a route or static mount point
/// is invalid.
pub fn create_pipeline(
    settings: PipelineSettings,
    debug_log: Option<DebugLog>,
) -> Result<Router, PipelineError> {
    if let Some(log) = &debug_log {
        log("Creating PipelineBuilder");
    }
    PipelineBuilder::new(debug_log).create_pipeline(settings)
}
