//! Pug templates.
//!
//! Templates can receive data computed when the build runs: a dynamic task
//! loads it and merges it into the task's `options.data` before the
//! templates are rendered.

use super::{extension_patterns, output_dir, source_dir, FileSet, FileTask, HandlerResult, WatchTaskDef};
use crate::config::{BuildConfig, ConfigPatch, DynamicTask};
use crate::error::TaskError;
use futures::future::{BoxFuture, FutureExt};
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

const HANDLED_EXTENSIONS: [&str; 1] = [".pug"];

type DataFn = dyn Fn() -> BoxFuture<'static, anyhow::Result<Map<String, Value>>> + Send + Sync;

/// Async source of template data.
#[derive(Clone)]
pub struct DynamicData(Arc<DataFn>);

impl DynamicData {
    /// Wrap an async function.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Map<String, Value>>> + Send + 'static,
    {
        Self(Arc::new(move || f().boxed()))
    }

    async fn load(&self) -> anyhow::Result<Map<String, Value>> {
        (self.0)().await
    }
}

impl fmt::Debug for DynamicData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicData").finish_non_exhaustive()
    }
}

/// Options of the `pug` task.
#[derive(Debug, Clone, Default)]
pub struct PugOptions {
    /// Skip the registrar
    pub disabled: bool,
    /// Task options, passed as-is
    pub options: Option<Map<String, Value>>,
    /// Source directory; `webres/<target>` by default
    pub source_path: Option<String>,
    /// Output directory; `dist/<target>` by default
    pub output_path: Option<String>,
    /// Extension of rendered files; `.html` by default
    pub file_suffix: Option<String>,
    /// Data merged into `options.data` before rendering
    pub dynamic_data: Option<DynamicData>,
}

/// Add `pug:<target>`, preceded by `pugDynamicData_<target>` when the
/// options carry dynamic data.
///
/// # Errors
///
/// Returns [`TaskError::DuplicateTask`] if one of the tasks already exists.
pub fn register(
    config: &mut BuildConfig,
    target: &str,
    options: &PugOptions,
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
            ext: Some(options.file_suffix.clone().unwrap_or_else(|| ".html".to_string())),
        }],
    };
    let name = config.insert_task("pug", target, serde_json::to_value(task)?)?;
    let mut required_tasks = vec![name.clone()];

    if let Some(data) = &options.dynamic_data {
        let dynamic = data_task(target, data.clone());
        let dynamic_name = config.insert_dynamic_task("pugDynamicData", target, dynamic)?;
        required_tasks.insert(0, dynamic_name);
    }

    Ok(HandlerResult {
        required_tasks,
        watch_tasks: vec![WatchTaskDef {
            files_to_watch: handled_files.clone(),
            task_to_run: Some(name),
            from_root: false,
        }],
        handled_files,
    })
}

fn data_task(target: &str, data: DynamicData) -> DynamicTask {
    let target = target.to_string();
    DynamicTask::new(move || {
        let target = target.clone();
        let data = data.clone();
        async move {
            let extra = data.load().await?;
            Ok(ConfigPatch::new().merge(["pug", target.as_str(), "options", "data"], extra))
        }
    })
}
