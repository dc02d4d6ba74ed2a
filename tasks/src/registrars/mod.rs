//! Task registrars.
//!
//! Each registrar adds the tasks for one kind of web resource to a
//! [`BuildConfig`](crate::BuildConfig) and reports what it did in a
//! [`HandlerResult`]: the tasks to run for a build, the source patterns it
//! took care of and the files to watch during development.

pub mod copy;
pub mod image;
pub mod pug;
pub mod sass;
pub mod webpack;

use serde::Serialize;
use serde_json::{Map, Value};

/// Directory holding the sources of every target.
pub const SOURCE_ROOT: &str = "webres";

/// Directory receiving the build output of every target.
pub const OUTPUT_ROOT: &str = "dist";

/// Files to watch and the task to run when they change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchTaskDef {
    /// Glob patterns; patterns starting with `!` exclude files
    pub files_to_watch: Vec<String>,
    /// Full name of the task to run
    pub task_to_run: Option<String>,
    /// Patterns are relative to the project root instead of the source root
    pub from_root: bool,
}

/// Outcome of a registrar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerResult {
    /// Tasks to run, in order
    pub required_tasks: Vec<String>,
    /// Source patterns handled by the added tasks
    pub handled_files: Vec<String>,
    /// Development watches
    pub watch_tasks: Vec<WatchTaskDef>,
}

impl HandlerResult {
    /// Append the content of `other`.
    pub fn extend(&mut self, other: Self) {
        self.required_tasks.extend(other.required_tasks);
        self.handled_files.extend(other.handled_files);
        self.watch_tasks.extend(other.watch_tasks);
    }
}

/// File set of a task, in the expanded form file-processing tasks expect.
#[derive(Debug, Serialize)]
pub(crate) struct FileSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dot: Option<bool>,
    pub expand: bool,
    pub cwd: String,
    pub src: Vec<String>,
    pub dest: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ext: Option<String>,
}

/// Definition of a task working on a single file set.
#[derive(Debug, Serialize)]
pub(crate) struct FileTask {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Map<String, Value>>,
    pub files: Vec<FileSet>,
}

/// Default source directory of `target`.
pub(crate) fn source_dir(target: &str) -> String {
    format!("{SOURCE_ROOT}/{target}")
}

/// Default output directory of `target`.
pub(crate) fn output_dir(target: &str) -> String {
    format!("{OUTPUT_ROOT}/{target}")
}

/// `**/*<ext>` for each extension.
pub(crate) fn extension_patterns(extensions: &[&str]) -> Vec<String> {
    extensions.iter().map(|ext| format!("**/*{ext}")).collect()
}
