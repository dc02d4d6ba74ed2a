//! Recipe building a React web application.
//!
//! The recipe chains the registrars: templates, images, scripts and
//! stylesheets first, then a copy of every remaining source file, then the
//! development watches for all of them.

use crate::config::{deep_set, BuildConfig, DynamicTask};
use crate::error::TaskError;
use crate::registrars::copy::{self, CopyOptions};
use crate::registrars::image::{self, ImageOptions};
use crate::registrars::pug::{self, PugOptions};
use crate::registrars::sass::{self, SassOptions};
use crate::registrars::webpack::{self, WebpackMode, WebpackOptions};
use crate::registrars::{HandlerResult, WatchTaskDef, SOURCE_ROOT};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::debug;

/// Target name used when none is given.
pub const DEFAULT_TARGET: &str = "reactApp";

/// Options of every registrar used by [`react_app`].
#[derive(Debug, Clone)]
pub struct ReactAppOptions {
    /// Pug templates
    pub pug: PugOptions,
    /// Images
    pub image: ImageOptions,
    /// Scripts
    pub webpack: WebpackOptions,
    /// Stylesheets
    pub sass: SassOptions,
    /// Remaining files
    pub copy: CopyOptions,
    /// Add the development watch tasks
    pub watch: bool,
}

impl Default for ReactAppOptions {
    fn default() -> Self {
        Self {
            pug: PugOptions::default(),
            image: ImageOptions::default(),
            webpack: WebpackOptions::default(),
            sass: SassOptions::default(),
            copy: CopyOptions::default(),
            watch: true,
        }
    }
}

#[derive(Serialize)]
struct WatchTask {
    options: Value,
    files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tasks: Option<Vec<String>>,
}

/// Register every task of a React application under `target`.
///
/// Returns the tasks to run for a full build, in order.
///
/// # Errors
///
/// Returns [`TaskError::DuplicateTask`] if the target was already
/// registered.
///
/// ```
/// use boilerplate_tasks::{react_app, BuildConfig, ReactAppOptions, DEFAULT_TARGET};
///
/// let mut config = BuildConfig::new();
/// let tasks = react_app(&mut config, DEFAULT_TARGET, &ReactAppOptions::default()).unwrap();
/// assert_eq!(tasks.last().map(String::as_str), Some("copy:reactApp"));
/// ```
pub fn react_app(
    config: &mut BuildConfig,
    target: &str,
    options: &ReactAppOptions,
) -> Result<Vec<String>, TaskError> {
    let mut merged = HandlerResult::default();
    if !options.pug.disabled {
        merged.extend(pug::register(config, target, &options.pug)?);
    }
    if !options.image.disabled {
        merged.extend(image::register(config, target, &options.image)?);
    }
    if !options.webpack.disabled {
        merged.extend(webpack::register(config, target, &options.webpack)?);
    }
    if !options.sass.disabled {
        merged.extend(sass::register(config, target, &options.sass)?);
    }

    if !options.copy.disabled {
        let copy_options = CopyOptions {
            skip_files: merged.handled_files.clone(),
            ..options.copy.clone()
        };
        let copied = copy::register(config, target, &copy_options)?;
        merged.required_tasks.extend(copied.required_tasks);
        merged.watch_tasks.extend(copied.watch_tasks);
    }

    if options.watch {
        register_watch_tasks(config, &merged.watch_tasks)?;
    }
    debug!(target_name = target, tasks = ?merged.required_tasks, "React application tasks added");
    Ok(merged.required_tasks)
}

fn register_watch_tasks(config: &mut BuildConfig, watches: &[WatchTaskDef]) -> Result<(), TaskError> {
    if watches.is_empty() {
        return Ok(());
    }
    // Shared by every target of the configuration
    if config.task("watch", "options").is_none() {
        config.insert_task("watch", "options", json!({"livereload": true}))?;
    }
    let mut unnamed = 0;
    for watch in watches {
        let name = match &watch.task_to_run {
            Some(task) => task.replace(':', "_"),
            None => {
                let name = format!("unnamed{unnamed}");
                unnamed += 1;
                name
            }
        };
        let task = WatchTask {
            options: json!({"livereload": true}),
            files: watch_patterns(watch),
            tasks: watch.task_to_run.clone().map(|task| vec![task]),
        };
        config.insert_task("watch", &name, serde_json::to_value(task)?)?;
    }
    Ok(())
}

fn watch_patterns(watch: &WatchTaskDef) -> Vec<String> {
    let prefix = if watch.from_root {
        String::new()
    } else {
        format!("{SOURCE_ROOT}/")
    };
    watch
        .files_to_watch
        .iter()
        .map(|pattern| match pattern.strip_prefix('!') {
            Some(negated) => format!("!{prefix}{negated}"),
            None => format!("{prefix}{pattern}"),
        })
        .collect()
}

/// Settings applied by [`react_app_options_helper`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HelperOptions {
    /// Build for production
    pub production: bool,
}

/// Fill in the options that depend on the build type.
///
/// - sass: `outputStyle` (`compressed` or `nested`) and `sourceMap`
/// - pug: `pretty` and `data.productionBuild`
/// - webpack: `mode`
#[must_use]
pub fn react_app_options_helper(helper: HelperOptions, mut options: ReactAppOptions) -> ReactAppOptions {
    let production = helper.production;
    let style = if production { "compressed" } else { "nested" };

    options.sass.options = with_option(options.sass.options, "outputStyle", json!(style));
    options.sass.options = with_option(options.sass.options, "sourceMap", json!(!production));
    options.pug.options = with_option(options.pug.options, "pretty", json!(!production));
    options.pug.options = with_option(
        options.pug.options,
        "data.productionBuild",
        json!(production),
    );
    options.webpack.mode = Some(if production {
        WebpackMode::Production
    } else {
        WebpackMode::Development
    });
    options
}

fn with_option(
    options: Option<Map<String, Value>>,
    path: &str,
    value: Value,
) -> Option<Map<String, Value>> {
    match deep_set(&Value::Object(options.unwrap_or_default()), path, value) {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Task runner accepting dynamic tasks.
pub trait TaskHost {
    /// Register `task` under `name`.
    fn register_task(&mut self, name: &str, task: DynamicTask);
}

/// Register every dynamic task of `config` on `host`.
///
/// Returns the number of tasks registered.
pub fn react_app_dynamic_tasks<H: TaskHost + ?Sized>(host: &mut H, config: &BuildConfig) -> usize {
    for (name, task) in config.dynamic_tasks() {
        host.register_task(name, task.clone());
    }
    config.dynamic_tasks().len()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_patterns() {
        let watch = WatchTaskDef {
            files_to_watch: vec!["**/*.scss".to_string(), "!**/*.inc.scss".to_string()],
            task_to_run: None,
            from_root: false,
        };
        assert_eq!(watch_patterns(&watch), vec!["webres/**/*.scss", "!webres/**/*.inc.scss"]);

        let from_root = WatchTaskDef {
            from_root: true,
            ..watch
        };
        assert_eq!(watch_patterns(&from_root), vec!["**/*.scss", "!**/*.inc.scss"]);
    }

    #[test]
    fn test_options_helper() {
        let options = ReactAppOptions {
            pug: PugOptions {
                options: json!({"data": {"title": "x"}}).as_object().cloned(),
                ..PugOptions::default()
            },
            ..ReactAppOptions::default()
        };

        let dev = react_app_options_helper(HelperOptions::default(), options.clone());
        assert_eq!(
            Value::Object(dev.sass.options.unwrap()),
            json!({"outputStyle": "nested", "sourceMap": true})
        );
        assert_eq!(
            Value::Object(dev.pug.options.unwrap()),
            json!({"pretty": true, "data": {"title": "x", "productionBuild": false}})
        );
        assert_eq!(dev.webpack.mode, Some(WebpackMode::Development));

        let prod = react_app_options_helper(HelperOptions { production: true }, options);
        assert_eq!(prod.sass.options.unwrap()["outputStyle"], "compressed");
        assert_eq!(prod.pug.options.unwrap()["pretty"], false);
        assert_eq!(prod.webpack.mode, Some(WebpackMode::Production));
    }
}
