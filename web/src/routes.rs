//! Route definitions accepted by the pipeline builder.
//!
//! A definition either answers a request or lets it continue to the next
//! stage of the pipeline:
//!
//! - a raw [`Router`] continues with requests none of its routes match,
//!   including requests for a known path with another method;
//! - a [`Route`] continues with requests of another path or method;
//! - a [`Middleware`] decides by itself.

use crate::pipeline::PipelineError;
use crate::service::{chain_stages, Middleware, PipelineService};
use axum::extract::Request;
use axum::handler::Handler;
use axum::routing::{on_service, MethodFilter};
use axum::Router;
use std::fmt;

/// HTTP method a [`Route`] answers to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RouteMethod {
    /// GET (also answers HEAD)
    #[default]
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// OPTIONS
    Options,
    /// DELETE
    Delete,
    /// PATCH
    Patch,
    /// HEAD
    Head,
}

impl RouteMethod {
    const fn filter(self) -> MethodFilter {
        match self {
            Self::Get => MethodFilter::GET,
            Self::Post => MethodFilter::POST,
            Self::Put => MethodFilter::PUT,
            Self::Options => MethodFilter::OPTIONS,
            Self::Delete => MethodFilter::DELETE,
            Self::Patch => MethodFilter::PATCH,
            Self::Head => MethodFilter::HEAD,
        }
    }

    /// Lowercase method name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Put => "put",
            Self::Options => "options",
            Self::Delete => "delete",
            Self::Patch => "patch",
            Self::Head => "head",
        }
    }
}

impl fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What answers a matched [`Route`].
#[derive(Clone, Debug)]
pub enum RouteHandler {
    /// A single handler
    Endpoint(PipelineService),
    /// Middleware called in sequence; the last one handing the request on
    /// continues to the next pipeline stage
    Chain(Vec<Middleware>),
}

impl RouteHandler {
    /// Use an axum handler.
    pub fn handler<H, T>(handler: H) -> Self
    where
        H: Handler<T, ()> + Sync,
        T: 'static,
    {
        Self::Endpoint(PipelineService::new(handler.with_state(())))
    }

    /// Call `stages` in sequence.
    pub fn chain(stages: impl IntoIterator<Item = Middleware>) -> Self {
        Self::Chain(stages.into_iter().collect())
    }
}

/// A handler bound to a path and a method.
///
/// Paths use axum syntax: `/users/:id`, `/files/*rest`.
#[derive(Clone, Debug)]
pub struct Route {
    /// Path pattern
    pub path: String,
    /// Method, `get` by default
    pub method: RouteMethod,
    /// Handler
    pub handler: RouteHandler,
}

impl Route {
    /// GET route.
    #[must_use]
    pub fn new(path: impl Into<String>, handler: RouteHandler) -> Self {
        Self {
            path: path.into(),
            method: RouteMethod::default(),
            handler,
        }
    }

    /// Answer `method` instead.
    #[must_use]
    pub const fn with_method(mut self, method: RouteMethod) -> Self {
        self.method = method;
        self
    }
}

/// Anything that can be added to the routes of a pipeline.
#[derive(Clone, Debug)]
pub enum RouteDefinition {
    /// A raw router
    Router(Router),
    /// A single route
    Route(Route),
    /// A middleware running for every request
    Middleware(Middleware),
}

impl RouteDefinition {
    /// Debug message emitted when the definition is added.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Router(_) => "Adding raw router".to_string(),
            Self::Route(route) => format!("Adding route \"{}\" [{}]", route.path, route.method),
            Self::Middleware(_) => "Adding middleware".to_string(),
        }
    }

    /// Build the pipeline stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidRoute`] when a route path is not a
    /// valid pattern.
    pub fn into_middleware(self) -> Result<Middleware, PipelineError> {
        match self {
            Self::Router(router) => Ok(Middleware::from_wrap(move |next| {
                let on_wrong_method = next.clone();
                PipelineService::new(
                    router
                        .clone()
                        .method_not_allowed_fallback(move |req: Request| on_wrong_method.run(req))
                        .fallback_service(next),
                )
            })),
            Self::Route(route) => {
                validate_path(&route.path)?;
                Ok(route_stage(route))
            }
            Self::Middleware(middleware) => Ok(middleware),
        }
    }
}

impl From<Router> for RouteDefinition {
    fn from(router: Router) -> Self {
        Self::Router(router)
    }
}

impl From<Route> for RouteDefinition {
    fn from(route: Route) -> Self {
        Self::Route(route)
    }
}

impl From<Middleware> for RouteDefinition {
    fn from(middleware: Middleware) -> Self {
        Self::Middleware(middleware)
    }
}

fn route_stage(route: Route) -> Middleware {
    let Route {
        path,
        method,
        handler,
    } = route;
    Middleware::from_wrap(move |next| {
        let endpoint = match &handler {
            RouteHandler::Endpoint(service) => service.clone(),
            RouteHandler::Chain(stages) => chain_stages(stages, next.clone()),
        };
        let method_router = on_service(method.filter(), endpoint).fallback_service(next.clone());
        PipelineService::new(Router::new().route(&path, method_router).fallback_service(next))
    })
}

/// Check that `path` is a pattern the router accepts.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidRoute`] describing the first problem found.
pub fn validate_path(path: &str) -> Result<(), PipelineError> {
    let invalid = |reason: &str| {
        Err(PipelineError::InvalidRoute {
            path: path.to_string(),
            reason: reason.to_string(),
        })
    };
    if !path.starts_with('/') {
        return invalid("route path must start with '/'");
    }
    let segments: Vec<&str> = path[1..].split('/').collect();
    for (i, segment) in segments.iter().enumerate() {
        if let Some(name) = segment.strip_prefix(':').or_else(|| segment.strip_prefix('*')) {
            if name.is_empty() {
                return invalid("parameters need a name");
            }
            if segment.starts_with('*') && i + 1 != segments.len() {
                return invalid("wildcards must be the last segment");
            }
        }
        if segment.chars().skip(1).any(|c| c == ':' || c == '*') {
            return invalid("parameters must span a whole segment");
        }
    }
    Ok(())
}
