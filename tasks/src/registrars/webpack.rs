//! Webpack bundles.
//!
//! Two tasks are added per target: a one-shot build and a `_watch` variant
//! with webpack's own watch mode enabled.

use super::{output_dir, HandlerResult, WatchTaskDef, SOURCE_ROOT};
use crate::config::BuildConfig;
use crate::error::TaskError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Browsers targeted by the default babel configuration.
pub const DEFAULT_BROWSER_TARGETS: &str = "last 1 version, > 2%, not dead";

/// core-js version used by the default babel configuration.
pub const DEFAULT_COREJS: u32 = 3;

/// Webpack build mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebpackMode {
    /// Development build with source maps
    Development,
    /// Optimized build
    Production,
    /// No mode-specific defaults
    None,
}

/// Babel settings of the default loaders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BabelOptions {
    /// core-js version
    pub corejs: u32,
    /// Browserslist query; [`DEFAULT_BROWSER_TARGETS`] when unset
    pub targets: Option<String>,
}

impl Default for BabelOptions {
    fn default() -> Self {
        Self {
            corejs: DEFAULT_COREJS,
            targets: None,
        }
    }
}

/// Settings of [`webpack_loaders_default`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadersOptions {
    /// Development-friendly output
    pub development: bool,
    /// Babel settings
    pub babel: BabelOptions,
}

/// Default `module.rules`: babel with the React preset, then eslint.
#[must_use]
pub fn webpack_loaders_default(options: &LoadersOptions) -> Vec<Value> {
    let targets = options
        .babel
        .targets
        .as_deref()
        .unwrap_or(DEFAULT_BROWSER_TARGETS);
    let build_type = if options.development {
        "development"
    } else {
        "production"
    };
    vec![
        json!({
            "test": ".js$",
            "exclude": "node_modules",
            "use": {
                "loader": "babel-loader",
                "options": {
                    "cacheDirectory": true,
                    "presets": [
                        ["@babel/preset-env", {
                            "targets": targets,
                            "useBuiltIns": "usage",
                            "corejs": options.babel.corejs,
                            "modules": false,
                        }],
                        ["@babel/preset-react", {"development": options.development}],
                    ],
                    "plugins": [
                        ["transform-define", {"process.env.BUILD_TYPE": build_type}],
                    ],
                },
            },
        }),
        json!({
            "test": "\\.js$",
            "exclude": "node_modules|(\\/|\\\\)build(\\/|\\\\)",
            "use": {
                "loader": "eslint-loader",
                "options": {"cache": true},
            },
        }),
    ]
}

/// Options of the `webpack` tasks.
#[derive(Debug, Clone, Default)]
pub struct WebpackOptions {
    /// Skip the registrar
    pub disabled: bool,
    /// Build mode; left to webpack when unset
    pub mode: Option<WebpackMode>,
    /// Options shared by every webpack task, stored as `webpack:options`
    pub options: Option<Map<String, Value>>,
    /// Entry points; `{<target>: "webres/<target>/js/loader.js"}` by default
    pub entry: Option<BTreeMap<String, String>>,
    /// External libraries
    pub externals: Option<Map<String, Value>>,
    /// Output configuration, passed as-is; `{path: <absolute
    /// dist/<target>/js>, filename: "[name].js"}` by default
    pub output: Option<Value>,
    /// `module.rules`; [`webpack_loaders_default`] when unset
    pub loaders: Option<Vec<Value>>,
    /// Plugins
    pub plugins: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Serialize)]
struct ModuleConfig {
    rules: Vec<Value>,
}

#[derive(Debug, Clone, Serialize)]
struct WebpackConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    mode: Option<WebpackMode>,
    devtool: Value,
    entry: BTreeMap<String, String>,
    output: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    externals: Option<Map<String, Value>>,
    module: ModuleConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    plugins: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    watch: bool,
}

/// Add `webpack:<target>` and `webpack:<target>_watch`, plus
/// `webpack:options` when shared options are given.
///
/// Entry points are made absolute; the ones under `webres/` are reported as
/// handled files.
///
/// # Errors
///
/// Returns [`TaskError::DuplicateTask`] if one of the tasks already exists.
pub fn register(
    config: &mut BuildConfig,
    target: &str,
    options: &WebpackOptions,
) -> Result<HandlerResult, TaskError> {
    let entry = options
        .entry
        .clone()
        .unwrap_or_else(|| BTreeMap::from([(target.to_string(), default_entry(target))]));
    let prefix = format!("{SOURCE_ROOT}/");
    let handled_files = entry
        .values()
        .filter_map(|path| path.strip_prefix(&prefix).map(str::to_string))
        .collect();
    let entry = entry
        .into_iter()
        .map(|(name, path)| (name, absolute(&path)))
        .collect();

    let output = options.output.clone().unwrap_or_else(|| {
        json!({
            "path": absolute(&format!("{}/js", output_dir(target))),
            "filename": "[name].js",
        })
    });
    let loaders = options.loaders.clone().unwrap_or_else(|| {
        webpack_loaders_default(&LoadersOptions {
            development: options.mode == Some(WebpackMode::Development),
            ..LoadersOptions::default()
        })
    });
    let devtool = if options.mode == Some(WebpackMode::Development) {
        Value::from("eval-source-map")
    } else {
        Value::Bool(false)
    };
    let webpack_config = WebpackConfig {
        mode: options.mode,
        devtool,
        entry,
        output,
        externals: options.externals.clone(),
        module: ModuleConfig { rules: loaders },
        plugins: options.plugins.clone(),
        watch: false,
    };

    if let Some(shared) = &options.options {
        config.insert_task("webpack", "options", Value::Object(shared.clone()))?;
    }
    let watch_config = WebpackConfig {
        watch: true,
        ..webpack_config.clone()
    };
    config.insert_task(
        "webpack",
        &format!("{target}_watch"),
        serde_json::to_value(watch_config)?,
    )?;
    let name = config.insert_task("webpack", target, serde_json::to_value(webpack_config)?)?;

    let watch_tasks = if options.output.is_none() {
        vec![WatchTaskDef {
            files_to_watch: vec![format!("{}/js/{target}.js", output_dir(target))],
            task_to_run: None,
            from_root: true,
        }]
    } else {
        Vec::new()
    };
    Ok(HandlerResult {
        required_tasks: vec![name],
        handled_files,
        watch_tasks,
    })
}

fn default_entry(target: &str) -> String {
    format!("{SOURCE_ROOT}/{target}/js/loader.js")
}

/// `path` resolved against the working directory.
fn absolute(path: &str) -> String {
    std::path::absolute(Path::new(path))
        .map_or_else(|_| path.to_string(), |p| p.to_string_lossy().into_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_register_defaults() {
        let mut config = BuildConfig::new();
        let result = register(&mut config, "app", &WebpackOptions::default()).unwrap();
        assert_eq!(result.required_tasks, vec!["webpack:app"]);
        assert_eq!(result.handled_files, vec!["app/js/loader.js"]);
        assert_eq!(
            result.watch_tasks,
            vec![WatchTaskDef {
                files_to_watch: vec!["dist/app/js/app.js".to_string()],
                task_to_run: None,
                from_root: true,
            }]
        );

        let task = config.task("webpack", "app").unwrap();
        assert_eq!(task["devtool"], json!(false));
        assert!(task.get("mode").is_none());
        assert!(task.get("watch").is_none());
        assert_eq!(task["entry"]["app"], absolute("webres/app/js/loader.js"));
        assert!(Path::new(task["entry"]["app"].as_str().unwrap()).is_absolute());
        assert_eq!(task["output"]["filename"], "[name].js");
        assert_eq!(task["module"]["rules"][0]["use"]["loader"], "babel-loader");

        let watch = config.task("webpack", "app_watch").unwrap();
        assert_eq!(watch["watch"], json!(true));
        assert_eq!(watch["entry"], task["entry"]);
        assert!(config.task("webpack", "options").is_none());
    }

    #[test]
    fn test_custom_output_and_entries() {
        let mut config = BuildConfig::new();
        let options = WebpackOptions {
            mode: Some(WebpackMode::Development),
            options: json!({"stats": "minimal"}).as_object().cloned(),
            entry: Some(BTreeMap::from([
                ("main".to_string(), "webres/app/js/main.js".to_string()),
                ("vendor".to_string(), "lib/vendor.js".to_string()),
            ])),
            output: Some(json!({"path": "/tmp/out"})),
            ..WebpackOptions::default()
        };
        let result = register(&mut config, "app", &options).unwrap();
        assert_eq!(result.handled_files, vec!["app/js/main.js"]);
        assert!(result.watch_tasks.is_empty());

        let task = config.task("webpack", "app").unwrap();
        assert_eq!(task["mode"], "development");
        assert_eq!(task["devtool"], "eval-source-map");
        assert_eq!(task["output"], json!({"path": "/tmp/out"}));
        assert_eq!(
            task["module"]["rules"][0]["use"]["options"]["plugins"][0][1]["process.env.BUILD_TYPE"],
            "development"
        );
        assert_eq!(config.task("webpack", "options").unwrap(), &json!({"stats": "minimal"}));
    }

    #[test]
    fn test_loaders_default() {
        let loaders = webpack_loaders_default(&LoadersOptions {
            development: false,
            babel: BabelOptions {
                corejs: 2,
                targets: Some("defaults".to_string()),
            },
        });
        let env = &loaders[0]["use"]["options"]["presets"][0][1];
        assert_eq!(env["targets"], "defaults");
        assert_eq!(env["corejs"], 2);
        assert_eq!(loaders[1]["use"]["loader"], "eslint-loader");
    }
}
