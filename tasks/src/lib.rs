//! Build-task configuration helpers.
//!
//! Produces the task configuration of a JavaScript task runner for web
//! applications: a [`BuildConfig`] filled by registrars (pug, images,
//! webpack, sass, copy) and assembled by the [`react_app`] recipe. Also
//! provides a typed command line option parser in [`args`].
//!
//! # Example
//!
//! ```
//! use boilerplate_tasks::{
//!     react_app, react_app_options_helper, BuildConfig, HelperOptions, ReactAppOptions,
//! };
//!
//! let options = react_app_options_helper(
//!     HelperOptions { production: true },
//!     ReactAppOptions::default(),
//! );
//! let mut config = BuildConfig::new();
//! let tasks = react_app(&mut config, "site", &options).unwrap();
//!
//! assert_eq!(
//!     tasks,
//!     ["pug:site", "imagemin:site", "webpack:site", "sass:site", "copy:site"]
//! );
//! let json = serde_json::to_string_pretty(&config).unwrap();
//! # drop(json);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod args;
pub mod config;
pub mod error;
pub mod naming;
pub mod recipe;
pub mod registrars;

// Re-export key types for convenience
pub use args::{get_options, ArgsError, ArgvProvider, ConfigDefinition, OptionDefinition, ParsedOptions};
pub use config::{deep_set, BuildConfig, ConfigPatch, DynamicTask};
pub use error::TaskError;
pub use naming::camel_to_kebab;
pub use recipe::{
    react_app, react_app_dynamic_tasks, react_app_options_helper, HelperOptions, ReactAppOptions,
    TaskHost, DEFAULT_TARGET,
};
pub use registrars::{HandlerResult, WatchTaskDef};
