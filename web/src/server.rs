//! Server start.

use crate::autoclose::{closed, set_ref, set_signal_handler, unset_ref, ServerHandle};
use axum::Router;
use std::fmt;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::{JoinError, JoinHandle};
use tracing::info;

/// Server errors.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The listening socket could not be opened
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Requested address
        addr: SocketAddr,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// The server failed while running
    #[error("Server error: {0}")]
    Serve(#[source] io::Error),

    /// The server task panicked or was cancelled
    #[error("Server task failed: {0}")]
    Task(#[from] JoinError),
}

/// How to start a server.
#[derive(Default)]
pub struct StartOptions {
    /// Listen on every interface instead of localhost only
    pub allow_non_local: bool,
    /// Port; 0 picks a free one
    pub port: u16,
    /// Called once the server has stopped
    pub on_shutdown: Option<Box<dyn FnOnce() + Send>>,
}

impl fmt::Debug for StartOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartOptions")
            .field("allow_non_local", &self.allow_non_local)
            .field("port", &self.port)
            .field("on_shutdown", &self.on_shutdown.is_some())
            .finish()
    }
}

/// A started server.
#[derive(Debug)]
pub struct RunningServer {
    /// Port the server listens on
    pub port: u16,
    /// Handle closing the server
    pub handle: ServerHandle,
    task: JoinHandle<io::Result<()>>,
}

impl RunningServer {
    /// Stop the server. Open connections are allowed to finish.
    pub fn close(&self) {
        self.handle.close();
    }

    /// Wait until the server has stopped.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] if serving failed or the server task died.
    pub async fn wait(self) -> Result<(), ServerError> {
        self.task.await?.map_err(ServerError::Serve)
    }
}

/// Start serving `router`.
///
/// The server is registered for autoclose and the signal handler is
/// installed.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the port cannot be opened.
pub async fn app_start(router: Router, options: StartOptions) -> Result<RunningServer, ServerError> {
    let ip = if options.allow_non_local {
        Ipv4Addr::UNSPECIFIED
    } else {
        Ipv4Addr::LOCALHOST
    };
    let addr = SocketAddr::from((ip, options.port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    let port = listener.local_addr().map_err(ServerError::Serve)?.port();
    info!("Listening on port {port} (PID: {})", std::process::id());

    let (handle, shutdown) = ServerHandle::new();
    set_ref(&handle);
    set_signal_handler();

    let registered = handle.clone();
    let on_shutdown = options.on_shutdown;
    let task = tokio::spawn(async move {
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(closed(shutdown))
            .await;
        unset_ref(&registered);
        if let Some(on_shutdown) = on_shutdown {
            on_shutdown();
        }
        result
    });

    Ok(RunningServer { port, handle, task })
}
