//! Recipe tests over a whole build configuration.

#![allow(clippy::unwrap_used)]

use boilerplate_tasks::registrars::copy::CopyOptions;
use boilerplate_tasks::registrars::pug::{DynamicData, PugOptions};
use boilerplate_tasks::registrars::sass::SassOptions;
use boilerplate_tasks::registrars::webpack::WebpackOptions;
use boilerplate_tasks::{
    react_app, react_app_dynamic_tasks, BuildConfig, DynamicTask, ReactAppOptions, TaskError,
    TaskHost, DEFAULT_TARGET,
};
use serde_json::json;
use std::collections::BTreeMap;

#[derive(Default)]
struct RecordingHost {
    tasks: BTreeMap<String, DynamicTask>,
}

impl TaskHost for RecordingHost {
    fn register_task(&mut self, name: &str, task: DynamicTask) {
        self.tasks.insert(name.to_string(), task);
    }
}

#[test]
fn test_default_recipe() {
    let mut config = BuildConfig::new();
    let tasks = react_app(&mut config, DEFAULT_TARGET, &ReactAppOptions::default()).unwrap();
    assert_eq!(
        tasks,
        [
            "pug:reactApp",
            "imagemin:reactApp",
            "webpack:reactApp",
            "sass:reactApp",
            "copy:reactApp",
        ]
    );

    // Everything handled elsewhere is excluded from the copy
    assert_eq!(
        config.task("copy", "reactApp").unwrap()["files"][0]["src"],
        json!([
            "**/*",
            "!**/*.pug",
            "!**/*.jpg",
            "!**/*.png",
            "!**/*.svg",
            "!reactApp/js/loader.js",
            "!**/*.scss",
            "!**/*.sass",
            "!**/*.inc.scss",
            "!**/*.inc.sass",
        ])
    );

    let watch = &config.tasks()["watch"];
    assert_eq!(watch["options"], json!({"livereload": true}));
    assert_eq!(
        watch["pug_reactApp"],
        json!({
            "options": {"livereload": true},
            "files": ["webres/**/*.pug"],
            "tasks": ["pug:reactApp"],
        })
    );
    assert_eq!(
        watch["unnamed0"],
        json!({
            "options": {"livereload": true},
            "files": ["dist/reactApp/js/reactApp.js"],
        })
    );
    assert_eq!(
        watch["copy_reactApp"]["files"][1],
        json!("!webres/**/*.pug")
    );
    assert!(watch.get("imagemin_reactApp").is_some());
    assert!(watch.get("sass_reactApp").is_some());
    assert!(config.task("webpack", "reactApp_watch").is_some());
}

#[test]
fn test_disabled_handlers() {
    let mut config = BuildConfig::new();
    let options = ReactAppOptions {
        webpack: WebpackOptions {
            disabled: true,
            ..WebpackOptions::default()
        },
        sass: SassOptions {
            disabled: true,
            ..SassOptions::default()
        },
        copy: CopyOptions {
            disabled: true,
            ..CopyOptions::default()
        },
        watch: false,
        ..ReactAppOptions::default()
    };
    let tasks = react_app(&mut config, "docs", &options).unwrap();
    assert_eq!(tasks, ["pug:docs", "imagemin:docs"]);
    assert!(config.tasks().get("webpack").is_none());
    assert!(config.tasks().get("copy").is_none());
    assert!(config.tasks().get("watch").is_none());
}

#[test]
fn test_same_target_twice_is_rejected() {
    let mut config = BuildConfig::new();
    react_app(&mut config, "app", &ReactAppOptions::default()).unwrap();
    let err = react_app(&mut config, "app", &ReactAppOptions::default()).unwrap_err();
    assert!(matches!(err, TaskError::DuplicateTask(name) if name == "pug:app"));

    react_app(&mut config, "admin", &ReactAppOptions::default()).unwrap();
    assert!(config.task("watch", "pug_admin").is_some());
}

#[tokio::test]
async fn test_dynamic_tasks_reach_the_host() {
    let mut config = BuildConfig::new();
    let options = ReactAppOptions {
        pug: PugOptions {
            dynamic_data: Some(DynamicData::new(|| async {
                Ok(json!({"build": 42}).as_object().cloned().unwrap())
            })),
            ..PugOptions::default()
        },
        ..ReactAppOptions::default()
    };
    let tasks = react_app(&mut config, "app", &options).unwrap();
    assert_eq!(tasks[0], "pugDynamicData_app");

    let mut host = RecordingHost::default();
    assert_eq!(react_app_dynamic_tasks(&mut host, &config), 1);

    let patch = host.tasks["pugDynamicData_app"].run().await.unwrap();
    config.apply(patch);
    assert_eq!(
        config.task("pug", "app").unwrap()["options"]["data"],
        json!({"build": 42})
    );
}
