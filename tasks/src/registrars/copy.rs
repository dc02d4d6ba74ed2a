//! Plain file copy.

use super::{output_dir, source_dir, FileSet, FileTask, HandlerResult, WatchTaskDef};
use crate::config::BuildConfig;
use crate::error::TaskError;
use serde_json::{Map, Value};

/// Options of the `copy` task.
#[derive(Debug, Clone, Default)]
pub struct CopyOptions {
    /// Skip the registrar
    pub disabled: bool,
    /// Task options, passed as-is
    pub options: Option<Map<String, Value>>,
    /// Extensions of files not to copy, with their leading dot
    pub excluded_extensions: Vec<String>,
    /// Extra patterns appended to the source list
    pub extra_files: Vec<String>,
    /// Patterns of files not to copy; a `!` is added when missing
    pub skip_files: Vec<String>,
    /// Source directory; `webres/<target>` by default
    pub source_path: Option<String>,
    /// Output directory; `dist/<target>` by default
    pub output_path: Option<String>,
    /// Include dot files
    pub dot: Option<bool>,
}

/// Add `copy:<target>`, copying everything no other task handles.
///
/// # Errors
///
/// Returns [`TaskError::DuplicateTask`] if the task already exists.
pub fn register(
    config: &mut BuildConfig,
    target: &str,
    options: &CopyOptions,
) -> Result<HandlerResult, TaskError> {
    let src = source_list(options);
    let task = FileTask {
        options: options.options.clone(),
        files: vec![FileSet {
            dot: options.dot,
            expand: true,
            cwd: options.source_path.clone().unwrap_or_else(|| source_dir(target)),
            src: src.clone(),
            dest: options.output_path.clone().unwrap_or_else(|| output_dir(target)),
            ext: None,
        }],
    };
    let name = config.insert_task("copy", target, serde_json::to_value(task)?)?;
    Ok(HandlerResult {
        required_tasks: vec![name.clone()],
        handled_files: src.clone(),
        watch_tasks: vec![WatchTaskDef {
            files_to_watch: src,
            task_to_run: Some(name),
            from_root: false,
        }],
    })
}

fn source_list(options: &CopyOptions) -> Vec<String> {
    let excluded = options
        .excluded_extensions
        .iter()
        .map(|ext| format!("!**/*{ext}"));
    let skipped = options.skip_files.iter().map(|file| {
        if file.starts_with('!') {
            file.clone()
        } else {
            format!("!{file}")
        }
    });
    std::iter::once("**/*".to_string())
        .chain(excluded)
        .chain(options.extra_files.iter().cloned())
        .chain(skipped)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_source_list() {
        let options = CopyOptions {
            excluded_extensions: vec![".md".to_string()],
            extra_files: vec!["../shared/**".to_string()],
            skip_files: vec!["**/*.pug".to_string(), "!**/*.inc.scss".to_string()],
            ..CopyOptions::default()
        };
        assert_eq!(
            source_list(&options),
            vec!["**/*", "!**/*.md", "../shared/**", "!**/*.pug", "!**/*.inc.scss"]
        );
    }

    #[test]
    fn test_register_with_dot() {
        let mut config = BuildConfig::new();
        let options = CopyOptions {
            dot: Some(true),
            output_path: Some("public".to_string()),
            ..CopyOptions::default()
        };
        let result = register(&mut config, "app", &options).unwrap();
        assert_eq!(result.required_tasks, vec!["copy:app"]);
        assert_eq!(
            config.task("copy", "app").unwrap(),
            &json!({"files": [{
                "dot": true,
                "expand": true,
                "cwd": "webres/app",
                "src": ["**/*"],
                "dest": "public",
            }]})
        );
    }
}
