//! Single-page application serving.
//!
//! Every GET/HEAD request outside the static directories receives the
//! application HTML file, so that a browser-side router can handle the path.
//! Requests under a static directory (`/js/...`, `/css/...` by default) are
//! served as files from the same root.

use crate::error::HttpError;
use crate::routes::RouteDefinition;
use crate::service::{Middleware, Next};
use crate::statics::{static_stage, StaticOptions};
use axum::body::Body;
use axum::extract::Request;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeFile;

/// Layout of a single-page application on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinglePageAppConfig {
    /// Directory holding the HTML file and the static directories
    pub root_dir: PathBuf,
    /// Application HTML file, relative to `root_dir`
    pub html_file: String,
    /// Top-level directories served as plain files
    pub static_root_directories: Vec<String>,
}

impl SinglePageAppConfig {
    /// Default layout rooted at `root_dir`: `index.html`, with `js`, `css`
    /// and `img` served as files.
    #[must_use]
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            html_file: "index.html".to_string(),
            static_root_directories: ["js", "css", "img"].map(String::from).to_vec(),
        }
    }
}

/// Route definitions serving a single-page application.
///
/// ```ignore
/// let settings = PipelineSettings::default()
///     .with_routes(single_page_app(SinglePageAppConfig::new("dist/webapp")));
/// ```
#[must_use]
pub fn single_page_app(config: SinglePageAppConfig) -> Vec<RouteDefinition> {
    let root_dir = absolute(&config.root_dir);
    let html = Arc::new(ServeFile::new(root_dir.join(&config.html_file)));
    let static_dirs: Arc<[String]> = config
        .static_root_directories
        .iter()
        .map(|dir| format!("/{}", dir.trim_matches('/')))
        .collect();

    let app_route = Middleware::from_fn(move |req: Request, next: Next| {
        let html = Arc::clone(&html);
        let static_dirs = Arc::clone(&static_dirs);
        async move {
            let is_page = (req.method() == Method::GET || req.method() == Method::HEAD)
                && !static_dirs.iter().any(|dir| under(req.uri().path(), dir));
            if is_page {
                serve_html(&html, req).await
            } else {
                next.run(req).await
            }
        }
    });

    vec![
        RouteDefinition::Middleware(app_route),
        RouteDefinition::Middleware(static_stage(root_dir, None, StaticOptions::default())),
    ]
}

async fn serve_html(html: &ServeFile, req: Request) -> Response {
    let path = req.uri().path().to_string();
    let response = match html.clone().oneshot(req).await {
        Ok(response) => response,
        Err(never) => match never {},
    };
    if response.status() == StatusCode::NOT_FOUND {
        return HttpError::not_found(format!("Application file missing for {path}"))
            .with_expose(false)
            .into_response();
    }
    response.map(Body::new)
}

/// `path` is `dir` or below it
fn under(path: &str, dir: &str) -> bool {
    path.strip_prefix(dir)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
