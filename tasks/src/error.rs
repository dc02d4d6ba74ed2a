//! Error types for build configuration.

use thiserror::Error;

/// Errors raised while building a task configuration.
#[derive(Error, Debug)]
pub enum TaskError {
    /// A task with the same full name already exists
    #[error("Task {0} already defined")]
    DuplicateTask(String),

    /// The entry for a task type exists but is not an object
    #[error("Task type {0} is not an object")]
    InvalidTaskType(String),

    /// No dynamic task with that name
    #[error("Unknown dynamic task: {0}")]
    UnknownDynamicTask(String),

    /// A dynamic task function failed
    #[error("Dynamic task {name} failed: {source}")]
    DynamicTaskFailed {
        /// Name of the dynamic task
        name: String,
        /// Failure reported by the task function
        #[source]
        source: anyhow::Error,
    },

    /// A task definition could not be converted to JSON
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
