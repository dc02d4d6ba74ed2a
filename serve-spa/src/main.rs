//! Serve a built single-page application.
//!
//! Files under the static directories are served as-is; every other GET
//! request receives the application's HTML file.
//!
//! Run with: `serve-spa --root dist/webapp --port 8080`

use anyhow::Context;
use boilerplate_logging::LoggingConfig;
use boilerplate_web::{
    app_start, create_pipeline, single_page_app, LogOptions, PipelineOptions, PipelineSettings,
    SinglePageAppConfig, StartOptions,
};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "serve-spa", version, about = "Serve a built single-page application")]
struct Cli {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Directory holding the built application
    #[arg(long, default_value = "dist/webapp")]
    root: PathBuf,

    /// HTML file served for application routes, relative to the root
    #[arg(long, default_value = "index.html")]
    index: String,

    /// Directory served as static files, relative to the root
    #[arg(long = "static", value_name = "DIR", default_values = ["js", "css", "img"])]
    statics: Vec<String>,

    /// Listen on every interface instead of localhost only
    #[arg(long)]
    allow_non_local: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logging = LoggingConfig::from_env().context("Invalid logging configuration")?;
    boilerplate_logging::init(&logging)?;

    let spa = SinglePageAppConfig {
        html_file: cli.index,
        static_root_directories: cli.statics,
        ..SinglePageAppConfig::new(cli.root)
    };
    let settings = PipelineSettings::default()
        .with_routes(single_page_app(spa))
        .with_options(PipelineOptions {
            log: Some(LogOptions::all()),
            default_error_handler: true,
            ..PipelineOptions::default()
        });
    let app = create_pipeline(settings, None)?;

    let server = app_start(
        app,
        StartOptions {
            allow_non_local: cli.allow_non_local,
            port: cli.port,
            on_shutdown: Some(Box::new(|| info!("Server stopped"))),
        },
    )
    .await?;
    info!("SPA served on port {}", server.port);

    server.wait().await?;
    Ok(())
}
