//! Error logging stage.

use crate::error::HttpError;
use crate::extractors::RequestHead;
use crate::handlers::{ErrorHandler, ErrorOutcome};
use boilerplate_logging::{format_error_chain, ChainOptions};

/// Target of error log events.
pub const ERROR_LOG_TARGET: &str = "boilerplate::error";

/// Error logger options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorLogOptions {
    /// Collapse dependency frames in logged backtraces
    pub collapse_dependency_frames: bool,
}

impl Default for ErrorLogOptions {
    fn default() -> Self {
        Self {
            collapse_dependency_frames: true,
        }
    }
}

/// Text logged for `err`: the request line, the cause chain and, for 422
/// errors, the field summary.
#[must_use]
pub fn format_error_entry(err: &HttpError, head: &RequestHead) -> String {
    let chain = format_error_chain(err, Some(err.backtrace()), &ChainOptions::from_runtime());
    let mut entry = format!("{} {}\n{chain}", head.method, head.uri);
    if let Some(summary) = err.unprocessable_summary() {
        entry.push('\n');
        entry.push_str(&summary);
    }
    entry
}

/// Error handler logging every error and passing it on.
#[must_use]
pub fn error_logger() -> ErrorHandler {
    ErrorHandler::new(|err, head| {
        tracing::error!(target: ERROR_LOG_TARGET, "{}", format_error_entry(err, head));
        ErrorOutcome::Forward
    })
}
