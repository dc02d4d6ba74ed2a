//! Process-wide registry of running servers.
//!
//! Servers started with [`app_start`](crate::server::app_start) register
//! here, and the signal handler closes all of them on Ctrl+C or SIGTERM.
//!
//! ## Usage
//!
//! ```ignore
//! let server = app_start(router, StartOptions::default()).await?;
//!
//! // Somewhere else, e.g. at the end of a test run
//! close_servers();
//!
//! server.wait().await?;
//! ```

use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::{info, warn};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);
static SERVERS: Lazy<Mutex<Vec<ServerHandle>>> = Lazy::new(|| Mutex::new(Vec::new()));
static SIGNAL_HANDLER: AtomicBool = AtomicBool::new(false);

/// Handle used to close a running server.
#[derive(Clone, Debug)]
pub struct ServerHandle {
    id: u64,
    shutdown: Arc<watch::Sender<bool>>,
}

impl ServerHandle {
    /// New open handle and the receiver its server waits on.
    pub(crate) fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        let handle = Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            shutdown: Arc::new(tx),
        };
        (handle, rx)
    }

    /// Ask the server to stop accepting connections and shut down.
    pub fn close(&self) {
        self.shutdown.send_replace(true);
    }

    /// Whether [`close`](Self::close) was called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.shutdown.borrow()
    }
}

impl PartialEq for ServerHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ServerHandle {}

/// Resolve once the handle is closed.
pub(crate) async fn closed(mut rx: watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

fn servers() -> std::sync::MutexGuard<'static, Vec<ServerHandle>> {
    SERVERS.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Register a server for closing. Registering twice has no effect.
pub fn set_ref(handle: &ServerHandle) {
    let mut servers = servers();
    if !servers.contains(handle) {
        servers.push(handle.clone());
    }
}

/// Remove a server from the registry.
pub fn unset_ref(handle: &ServerHandle) {
    servers().retain(|registered| registered != handle);
}

/// Whether a server is registered.
#[must_use]
pub fn is_registered(handle: &ServerHandle) -> bool {
    servers().contains(handle)
}

/// Close every registered server and empty the registry.
pub fn close_servers() {
    let closing: Vec<ServerHandle> = servers().drain(..).collect();
    for handle in &closing {
        handle.close();
    }
}

/// Clears the installed flag when the handler task ends or is dropped with
/// its runtime.
struct InstalledHandler;

impl Drop for InstalledHandler {
    fn drop(&mut self) {
        SIGNAL_HANDLER.store(false, Ordering::SeqCst);
    }
}

/// Close every registered server when the process receives Ctrl+C or
/// SIGTERM.
///
/// At most one handler runs at a time. It lives on the current tokio
/// runtime; once that runtime shuts down, a later call installs a new one.
/// Outside a runtime nothing is installed.
pub fn set_signal_handler() {
    if SIGNAL_HANDLER.swap(true, Ordering::SeqCst) {
        return;
    }
    let installed = InstalledHandler;
    match tokio::runtime::Handle::try_current() {
        Ok(runtime) => {
            runtime.spawn(async move {
                let _installed = installed;
                wait_for_signal().await;
                close_servers();
            });
        }
        Err(e) => {
            drop(installed);
            warn!(error = %e, "No runtime, signal handler not installed");
        }
    }
}

/// Whether a signal handler is currently installed.
#[must_use]
pub fn has_signal_handler() -> bool {
    SIGNAL_HANDLER.load(Ordering::SeqCst)
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
///
/// Never returns if no signal listener could be installed.
pub async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        () = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}
