//! Image minification.

use super::{extension_patterns, output_dir, source_dir, FileSet, FileTask, HandlerResult, WatchTaskDef};
use crate::config::BuildConfig;
use crate::error::TaskError;
use serde_json::{Map, Value};

const HANDLED_EXTENSIONS: [&str; 3] = [".jpg", ".png", ".svg"];

/// Options of the `imagemin` task.
#[derive(Debug, Clone, Default)]
pub struct ImageOptions {
    /// Skip the registrar
    pub disabled: bool,
    /// Task options, passed as-is
    pub options: Option<Map<String, Value>>,
    /// Source directory; `webres/<target>` by default
    pub source_path: Option<String>,
    /// Output directory; `dist/<target>` by default
    pub output_path: Option<String>,
}

/// Add `imagemin:<target>`.
///
/// # Errors
///
/// Returns [`TaskError::DuplicateTask`] if the task already exists.
pub fn register(
    config: &mut BuildConfig,
    target: &str,
    options: &ImageOptions,
) -> Result<HandlerResult, TaskError> {
    let handled_files = extension_patterns(&HANDLED_EXTENSIONS);
    let task = FileTask {
        options: options.options.clone(),
        files: vec![FileSet {
            dot: None,
            expand: true,
            cwd: options.source_path.clone().unwrap_or_else(|| source_dir(target)),
            src: handled_files.clone(),
            dest: options.output_path.clone().unwrap_or_else(|| output_dir(target)),
            ext: None,
        }],
    };
    let name = config.insert_task("imagemin", target, serde_json::to_value(task)?)?;
    Ok(HandlerResult {
        required_tasks: vec![name.clone()],
        watch_tasks: vec![WatchTaskDef {
            files_to_watch: handled_files.clone(),
            task_to_run: Some(name),
            from_root: false,
        }],
        handled_files,
    })
}
