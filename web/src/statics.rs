//! Static file stages.
//!
//! Files are served by [`ServeDir`]. A request the directory cannot answer
//! (missing file, method other than GET/HEAD, path outside the mount point)
//! continues down the pipeline untouched.

use crate::error::HttpError;
use crate::pipeline::PipelineError;
use crate::service::{Middleware, Next};
use axum::body::Body;
use axum::extract::Request;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use tower_http::services::ServeDir;

/// How a static directory is served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticOptions {
    /// Serve `index.html` for directory requests
    pub index_html: bool,
    /// `Cache-Control` max-age of served files
    pub max_age: Duration,
    /// Let missing files continue to the next stage; when false they become a
    /// forwarded 404 error
    pub fallthrough: bool,
}

impl Default for StaticOptions {
    fn default() -> Self {
        Self {
            index_html: true,
            max_age: Duration::ZERO,
            fallthrough: true,
        }
    }
}

/// A directory served by the pipeline.
///
/// ```
/// use boilerplate_web::StaticDefinition;
///
/// let plain = StaticDefinition::from("public");
/// let mounted = StaticDefinition::new("dist/assets").at("/assets");
/// assert_eq!(mounted.route.as_deref(), Some("/assets"));
/// # drop(plain);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticDefinition {
    /// Directory on disk
    pub root: PathBuf,
    /// Mount point; files are served from the pipeline root when unset
    pub route: Option<String>,
    /// Serving options
    pub options: StaticOptions,
}

impl StaticDefinition {
    /// Serve `root` at the pipeline root with default options.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            route: None,
            options: StaticOptions::default(),
        }
    }

    /// Mount the directory under `route`.
    #[must_use]
    pub fn at(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    /// Replace the serving options.
    #[must_use]
    pub fn with_options(mut self, options: StaticOptions) -> Self {
        self.options = options;
        self
    }

    /// Debug message emitted when the definition is added.
    #[must_use]
    pub fn describe(&self) -> String {
        match &self.route {
            Some(route) => format!("Adding statics for route \"{route}\""),
            None => "Adding statics".to_string(),
        }
    }

    /// Build the pipeline stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidRoute`] when the mount point does not
    /// start with `/`.
    pub fn into_middleware(self) -> Result<Middleware, PipelineError> {
        if let Some(route) = &self.route {
            if !route.starts_with('/') {
                return Err(PipelineError::InvalidRoute {
                    path: route.clone(),
                    reason: "static mount point must start with '/'".to_string(),
                });
            }
        }
        Ok(static_stage(self.root, self.route, self.options))
    }
}

impl From<&str> for StaticDefinition {
    fn from(root: &str) -> Self {
        Self::new(root)
    }
}

impl From<String> for StaticDefinition {
    fn from(root: String) -> Self {
        Self::new(root)
    }
}

impl From<&Path> for StaticDefinition {
    fn from(root: &Path) -> Self {
        Self::new(root)
    }
}

impl From<PathBuf> for StaticDefinition {
    fn from(root: PathBuf) -> Self {
        Self::new(root)
    }
}

struct StaticStage {
    dir: ServeDir,
    mount: Option<String>,
    options: StaticOptions,
}

impl StaticStage {
    async fn handle(&self, req: Request, next: Next) -> Response {
        if req.method() != Method::GET && req.method() != Method::HEAD {
            return next.run(req).await;
        }
        let Some(probe) = strip_mount(req.uri().path(), self.mount.as_deref())
            .and_then(|relative| probe_request(&req, relative))
        else {
            return next.run(req).await;
        };

        let response = match self.dir.clone().oneshot(probe).await {
            Ok(response) => response,
            Err(never) => match never {},
        };
        if response.status() == StatusCode::NOT_FOUND {
            if self.options.fallthrough {
                return next.run(req).await;
            }
            return HttpError::not_found(format!("File not found: {}", req.uri().path()))
                .into_response();
        }

        let mut response = response.map(Body::new);
        if response.status().is_redirection() {
            self.prefix_location(&mut response);
        }
        if response.status().is_success() || response.status() == StatusCode::NOT_MODIFIED {
            let cache = format!("public, max-age={}", self.options.max_age.as_secs());
            if let Ok(value) = HeaderValue::from_str(&cache) {
                response.headers_mut().insert(header::CACHE_CONTROL, value);
            }
        }
        response
    }

    fn prefix_location(&self, response: &mut Response) {
        let Some(mount) = self.mount.as_deref().map(|m| m.trim_end_matches('/')) else {
            return;
        };
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .filter(|l| l.starts_with('/'))
            .map(|l| format!("{mount}{l}"));
        if let Some(value) = location.and_then(|l| HeaderValue::from_str(&l).ok()) {
            response.headers_mut().insert(header::LOCATION, value);
        }
    }
}

/// Stage serving `root`, optionally mounted under `mount`.
pub(crate) fn static_stage(
    root: impl Into<PathBuf>,
    mount: Option<String>,
    options: StaticOptions,
) -> Middleware {
    let stage = Arc::new(StaticStage {
        dir: ServeDir::new(root.into()).append_index_html_on_directories(options.index_html),
        mount,
        options,
    });
    Middleware::from_fn(move |req: Request, next: Next| {
        let stage = Arc::clone(&stage);
        async move { stage.handle(req, next).await }
    })
}

/// Path relative to `mount`, when `path` is at or below it.
fn strip_mount<'a>(path: &'a str, mount: Option<&str>) -> Option<&'a str> {
    let mount = match mount.map(|m| m.trim_end_matches('/')) {
        None | Some("") => return Some(path),
        Some(mount) => mount,
    };
    let rest = path.strip_prefix(mount)?;
    if rest.is_empty() {
        Some("/")
    } else if rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

/// Body-less copy of `req` addressed to `path`.
fn probe_request(req: &Request, path: &str) -> Option<Request> {
    let uri = match req.uri().query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };
    let mut probe = Request::builder()
        .method(req.method().clone())
        .uri(uri)
        .body(Body::empty())
        .ok()?;
    *probe.headers_mut() = req.headers().clone();
    Some(probe)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ForwardedError;
    use crate::service::{chain_stages, PipelineService};
    use boilerplate_testing::{body_string, get, request};
    use std::fs;
    use tempfile::TempDir;

    fn site() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();
        fs::create_dir(dir.path().join("css")).unwrap();
        fs::write(dir.path().join("css/site.css"), "body {}").unwrap();
        dir
    }

    fn serve(def: StaticDefinition) -> PipelineService {
        chain_stages(&[def.into_middleware().unwrap()], PipelineService::not_found())
    }

    #[test]
    fn test_strip_mount() {
        assert_eq!(strip_mount("/a/b", None), Some("/a/b"));
        assert_eq!(strip_mount("/a/b", Some("/")), Some("/a/b"));
        assert_eq!(strip_mount("/assets/x.js", Some("/assets")), Some("/x.js"));
        assert_eq!(strip_mount("/assets/x.js", Some("/assets/")), Some("/x.js"));
        assert_eq!(strip_mount("/assets", Some("/assets")), Some("/"));
        assert_eq!(strip_mount("/assetsx/y", Some("/assets")), None);
        assert_eq!(strip_mount("/other", Some("/assets")), None);
    }

    #[test]
    fn test_describe() {
        assert_eq!(StaticDefinition::from("x").describe(), "Adding statics");
        assert_eq!(
            StaticDefinition::new("x").at("/y").describe(),
            "Adding statics for route \"/y\""
        );
    }

    #[test]
    fn test_relative_mount_is_rejected() {
        let err = StaticDefinition::new("x").at("assets").into_middleware().unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRoute { .. }));
    }

    #[tokio::test]
    async fn test_serves_files_and_index() {
        let dir = site();
        let service = serve(StaticDefinition::new(dir.path()));

        let response = service.run(get("/css/site.css")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "public, max-age=0"
        );
        assert_eq!(body_string(response).await, "body {}");

        let response = service.run(get("/")).await;
        assert_eq!(body_string(response).await, "<h1>home</h1>");
    }

    #[tokio::test]
    async fn test_missing_file_falls_through() {
        let dir = site();
        let service = serve(StaticDefinition::new(dir.path()));
        let response = service.run(get("/missing.txt")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(response).await, "Cannot GET /missing.txt");
    }

    #[tokio::test]
    async fn test_missing_file_without_fallthrough() {
        let dir = site();
        let options = StaticOptions {
            fallthrough: false,
            ..StaticOptions::default()
        };
        let service = serve(StaticDefinition::new(dir.path()).with_options(options));
        let response = service.run(get("/missing.txt")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(ForwardedError::from_response(&response).is_some());
    }

    #[tokio::test]
    async fn test_other_methods_fall_through() {
        let dir = site();
        let service = serve(StaticDefinition::new(dir.path()));
        let response = service.run(request(Method::POST, "/css/site.css")).await;
        assert_eq!(body_string(response).await, "Cannot POST /css/site.css");
    }

    #[tokio::test]
    async fn test_mounted_directory() {
        let dir = site();
        let options = StaticOptions {
            max_age: Duration::from_secs(60),
            ..StaticOptions::default()
        };
        let service = serve(StaticDefinition::new(dir.path()).at("/static").with_options(options));

        let response = service.run(get("/static/css/site.css")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "public, max-age=60"
        );

        let response = service.run(get("/css/site.css")).await;
        assert_eq!(body_string(response).await, "Cannot GET /css/site.css");

        let response = service.run(get("/static/css")).await;
        assert!(response.status().is_redirection());
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/static/css/");
    }
}
