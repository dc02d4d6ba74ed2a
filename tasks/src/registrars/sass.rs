//! Sass stylesheets.

use super::{extension_patterns, output_dir, source_dir, FileSet, FileTask, HandlerResult, WatchTaskDef};
use crate::config::BuildConfig;
use crate::error::TaskError;
use serde_json::{Map, Value};

const HANDLED_EXTENSIONS: [&str; 2] = [".scss", ".sass"];

/// Compiler used when the options name none.
pub const DEFAULT_IMPLEMENTATION: &str = "node-sass";

/// Options of the `sass` task.
#[derive(Debug, Clone, Default)]
pub struct SassOptions {
    /// Skip the registrar
    pub disabled: bool,
    /// Task options; `implementation` defaults to [`DEFAULT_IMPLEMENTATION`]
    pub options: Option<Map<String, Value>>,
    /// Source directory; `webres/<target>` by default
    pub source_path: Option<String>,
    /// Output directory; `dist/<target>` by default
    pub output_path: Option<String>,
    /// Extension of compiled files; `.css` by default
    pub file_suffix: Option<String>,
}

/// Add `sass:<target>`.
///
/// Files named `*.inc.scss` or `*.inc.sass` are partials: they are not
/// compiled on their own but changes to them still trigger a rebuild.
///
/// # Errors
///
/// Returns [`TaskError::DuplicateTask`] if the task already exists.
pub fn register(
    config: &mut BuildConfig,
    target: &str,
    options: &SassOptions,
) -> Result<HandlerResult, TaskError> {
    let sources = extension_patterns(&HANDLED_EXTENSIONS);
    let mut handled_files = sources.clone();
    handled_files.extend(HANDLED_EXTENSIONS.iter().map(|ext| format!("!**/*.inc{ext}")));

    let mut task_options = options.options.clone().unwrap_or_default();
    task_options
        .entry("implementation")
        .or_insert_with(|| Value::from(DEFAULT_IMPLEMENTATION));

    let task = FileTask {
        options: Some(task_options),
        files: vec![FileSet {
            dot: None,
            expand: true,
            cwd: options.source_path.clone().unwrap_or_else(|| source_dir(target)),
            src: handled_files.clone(),
            dest: options.output_path.clone().unwrap_or_else(|| output_dir(target)),
            ext: Some(options.file_suffix.clone().unwrap_or_else(|| ".css".to_string())),
        }],
    };
    let name = config.insert_task("sass", target, serde_json::to_value(task)?)?;
    Ok(HandlerResult {
        required_tasks: vec![name.clone()],
        handled_files,
        watch_tasks: vec![WatchTaskDef {
            files_to_watch: sources,
            task_to_run: Some(name),
            from_root: false,
        }],
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_register_defaults() {
        let mut config = BuildConfig::new();
        let result = register(&mut config, "app", &SassOptions::default()).unwrap();
        assert_eq!(
            result.handled_files,
            vec!["**/*.scss", "**/*.sass", "!**/*.inc.scss", "!**/*.inc.sass"]
        );
        assert_eq!(result.watch_tasks[0].files_to_watch, vec!["**/*.scss", "**/*.sass"]);
        assert_eq!(
            config.task("sass", "app").unwrap(),
            &json!({
                "options": {"implementation": "node-sass"},
                "files": [{
                    "expand": true,
                    "cwd": "webres/app",
                    "src": ["**/*.scss", "**/*.sass", "!**/*.inc.scss", "!**/*.inc.sass"],
                    "dest": "dist/app",
                    "ext": ".css",
                }],
            })
        );
    }

    #[test]
    fn test_custom_implementation_and_paths() {
        let mut config = BuildConfig::new();
        let options = SassOptions {
            options: json!({"implementation": "sass", "outputStyle": "compressed"})
                .as_object()
                .cloned(),
            source_path: Some("styles".to_string()),
            file_suffix: Some(".min.css".to_string()),
            ..SassOptions::default()
        };
        register(&mut config, "app", &options).unwrap();
        let task = config.task("sass", "app").unwrap();
        assert_eq!(task["options"]["implementation"], "sass");
        assert_eq!(task["files"][0]["cwd"], "styles");
        assert_eq!(task["files"][0]["ext"], ".min.css");
    }
}
