//! Build configuration.
//!
//! The configuration is a JSON object of `task type → task name → definition`,
//! the shape a JavaScript task runner reads. Tasks whose content is only known
//! at build time are registered as dynamic tasks: async functions producing a
//! [`ConfigPatch`] that is applied when they run.

use crate::error::TaskError;
use futures::future::{BoxFuture, FutureExt};
use serde::ser::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

type PatchFn = dyn Fn() -> BoxFuture<'static, anyhow::Result<ConfigPatch>> + Send + Sync;

/// Object merges to apply to a [`BuildConfig`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigPatch {
    merges: Vec<(Vec<String>, Map<String, Value>)>,
}

impl ConfigPatch {
    /// Empty patch
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the properties of `value` into the object at `path`, creating
    /// missing objects on the way.
    #[must_use]
    pub fn merge<P, S>(mut self, path: P, value: Map<String, Value>) -> Self
    where
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.merges
            .push((path.into_iter().map(Into::into).collect(), value));
        self
    }

    /// Whether the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.merges.is_empty()
    }

    fn apply_to(self, root: &mut Map<String, Value>) {
        for (path, value) in self.merges {
            merge_at(root, &path, value);
        }
    }
}

fn merge_at(target: &mut Map<String, Value>, path: &[String], value: Map<String, Value>) {
    let Some((first, rest)) = path.split_first() else {
        target.extend(value);
        return;
    };
    let slot = target
        .entry(first.clone())
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    if let Value::Object(inner) = slot {
        merge_at(inner, rest, value);
    }
}

/// A task computed when the build runs.
#[derive(Clone)]
pub struct DynamicTask(Arc<PatchFn>);

impl DynamicTask {
    /// Wrap an async function.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<ConfigPatch>> + Send + 'static,
    {
        Self(Arc::new(move || f().boxed()))
    }

    /// Compute the patch.
    ///
    /// # Errors
    ///
    /// Returns whatever the task function failed with.
    pub async fn run(&self) -> anyhow::Result<ConfigPatch> {
        (self.0)().await
    }
}

impl fmt::Debug for DynamicTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicTask").finish_non_exhaustive()
    }
}

/// Task definitions and dynamic tasks of a build.
///
/// Serializes as the task object only; dynamic tasks are registered with the
/// task runner separately.
///
/// ```
/// use boilerplate_tasks::BuildConfig;
/// use serde_json::json;
///
/// let mut config = BuildConfig::new();
/// let name = config.insert_task("copy", "assets", json!({"src": ["**/*"]})).unwrap();
/// assert_eq!(name, "copy:assets");
/// assert!(config.insert_task("copy", "assets", json!({})).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct BuildConfig {
    tasks: Map<String, Value>,
    dynamic: BTreeMap<String, DynamicTask>,
}

impl BuildConfig {
    /// Empty configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing task object.
    #[must_use]
    pub fn from_tasks(tasks: Map<String, Value>) -> Self {
        Self {
            tasks,
            dynamic: BTreeMap::new(),
        }
    }

    /// Task object
    #[must_use]
    pub fn tasks(&self) -> &Map<String, Value> {
        &self.tasks
    }

    /// Definition of `task_type:task_name`.
    #[must_use]
    pub fn task(&self, task_type: &str, task_name: &str) -> Option<&Value> {
        self.tasks.get(task_type)?.get(task_name)
    }

    /// Add a task definition.
    ///
    /// Returns the full task name, `type:name`.
    ///
    /// # Errors
    ///
    /// - [`TaskError::DuplicateTask`] if the task is already defined
    /// - [`TaskError::InvalidTaskType`] if the type entry is not an object
    pub fn insert_task(
        &mut self,
        task_type: &str,
        task_name: &str,
        definition: Value,
    ) -> Result<String, TaskError> {
        let full_name = format!("{task_type}:{task_name}");
        let entry = self
            .tasks
            .entry(task_type)
            .or_insert_with(|| Value::Object(Map::new()));
        let Value::Object(tasks) = entry else {
            return Err(TaskError::InvalidTaskType(task_type.to_string()));
        };
        if tasks.contains_key(task_name) {
            return Err(TaskError::DuplicateTask(full_name));
        }
        tasks.insert(task_name.to_string(), definition);
        debug!(task = %full_name, "Task added");
        Ok(full_name)
    }

    /// Add a dynamic task.
    ///
    /// Returns its name, `type_name`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::DuplicateTask`] if the name is taken.
    pub fn insert_dynamic_task(
        &mut self,
        task_type: &str,
        task_name: &str,
        task: DynamicTask,
    ) -> Result<String, TaskError> {
        let full_name = format!("{task_type}_{task_name}");
        if self.dynamic.contains_key(&full_name) {
            return Err(TaskError::DuplicateTask(full_name));
        }
        self.dynamic.insert(full_name.clone(), task);
        debug!(task = %full_name, "Dynamic task added");
        Ok(full_name)
    }

    /// Dynamic tasks by name
    #[must_use]
    pub fn dynamic_tasks(&self) -> &BTreeMap<String, DynamicTask> {
        &self.dynamic
    }

    /// Apply a patch.
    pub fn apply(&mut self, patch: ConfigPatch) {
        patch.apply_to(&mut self.tasks);
    }

    /// Run a dynamic task and apply its patch.
    ///
    /// # Errors
    ///
    /// - [`TaskError::UnknownDynamicTask`] if no such task exists
    /// - [`TaskError::DynamicTaskFailed`] if the task function failed
    pub async fn run_dynamic_task(&mut self, name: &str) -> Result<(), TaskError> {
        let task = self
            .dynamic
            .get(name)
            .cloned()
            .ok_or_else(|| TaskError::UnknownDynamicTask(name.to_string()))?;
        let patch = task
            .run()
            .await
            .map_err(|source| TaskError::DynamicTaskFailed {
                name: name.to_string(),
                source,
            })?;
        self.apply(patch);
        debug!(task = name, "Dynamic task applied");
        Ok(())
    }

    /// The task object as a JSON value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.tasks.clone())
    }
}

impl Serialize for BuildConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.tasks.serialize(serializer)
    }
}

/// Copy of `source` with the property at the dotted `path` set to `value`.
///
/// Every object on the path is copied; missing or non-object intermediate
/// values are replaced by new objects. A non-object `source` is treated as an
/// empty object.
///
/// ```
/// use boilerplate_tasks::deep_set;
/// use serde_json::json;
///
/// let source = json!({"a": {"keep": 1}});
/// let result = deep_set(&source, "a.b.c", json!(true));
/// assert_eq!(result, json!({"a": {"keep": 1, "b": {"c": true}}}));
/// assert_eq!(source, json!({"a": {"keep": 1}}));
/// ```
#[must_use]
pub fn deep_set(source: &Value, path: &str, value: Value) -> Value {
    fn set(source: Option<&Value>, keys: &[&str], value: Value) -> Value {
        let Some((first, rest)) = keys.split_first() else {
            return value;
        };
        let mut object = match source {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        };
        let inner = set(object.get(*first), rest, value);
        object.insert((*first).to_string(), inner);
        Value::Object(object)
    }
    let keys: Vec<&str> = path.split('.').collect();
    set(Some(source), &keys, value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use boilerplate_testing::properties::dotted_path;
    use proptest::prelude::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_insert_task() {
        let mut config = BuildConfig::new();
        assert_eq!(config.insert_task("pug", "app", json!({"a": 1})).unwrap(), "pug:app");
        assert_eq!(config.insert_task("pug", "other", json!(null)).unwrap(), "pug:other");
        assert_eq!(config.task("pug", "app"), Some(&json!({"a": 1})));

        let err = config.insert_task("pug", "other", json!({})).unwrap_err();
        assert_eq!(err.to_string(), "Task pug:other already defined");
        assert_eq!(config.task("pug", "other"), Some(&json!(null)));
    }

    #[test]
    fn test_insert_task_under_non_object() {
        let mut config = BuildConfig::from_tasks(object(json!({"pug": "oops"})));
        let err = config.insert_task("pug", "app", json!({})).unwrap_err();
        assert!(matches!(err, TaskError::InvalidTaskType(t) if t == "pug"));
    }

    #[test]
    fn test_serializes_tasks_only() {
        let mut config = BuildConfig::new();
        config.insert_task("copy", "a", json!({"x": 1})).unwrap();
        config
            .insert_dynamic_task("data", "a", DynamicTask::new(|| async { Ok(ConfigPatch::new()) }))
            .unwrap();
        assert_eq!(serde_json::to_value(&config).unwrap(), json!({"copy": {"a": {"x": 1}}}));
    }

    #[tokio::test]
    async fn test_dynamic_task() {
        let mut config = BuildConfig::new();
        config
            .insert_task("pug", "app", json!({"options": {"data": {"title": "x"}}}))
            .unwrap();
        let task = DynamicTask::new(|| async {
            Ok(ConfigPatch::new().merge(
                ["pug", "app", "options", "data"],
                object(json!({"user": "bob"})),
            ))
        });
        let name = config.insert_dynamic_task("pugDynamicData", "app", task.clone()).unwrap();
        assert_eq!(name, "pugDynamicData_app");
        assert!(config.insert_dynamic_task("pugDynamicData", "app", task).is_err());

        config.run_dynamic_task(&name).await.unwrap();
        assert_eq!(
            config.task("pug", "app").unwrap(),
            &json!({"options": {"data": {"title": "x", "user": "bob"}}})
        );
    }

    #[tokio::test]
    async fn test_dynamic_task_errors() {
        let mut config = BuildConfig::new();
        let err = config.run_dynamic_task("nope").await.unwrap_err();
        assert!(matches!(err, TaskError::UnknownDynamicTask(_)));

        config
            .insert_dynamic_task(
                "fail",
                "x",
                DynamicTask::new(|| async { Err(anyhow::anyhow!("no data")) }),
            )
            .unwrap();
        let err = config.run_dynamic_task("fail_x").await.unwrap_err();
        assert_eq!(err.to_string(), "Dynamic task fail_x failed: no data");
    }

    #[test]
    fn test_patch_replaces_scalars_on_path() {
        let mut config = BuildConfig::from_tasks(object(json!({"a": {"b": 3}})));
        config.apply(ConfigPatch::new().merge(["a", "b"], object(json!({"c": 1}))));
        assert_eq!(config.to_value(), json!({"a": {"b": {"c": 1}}}));
    }

    #[test]
    fn test_deep_set() {
        assert_eq!(deep_set(&json!({}), "a", json!(1)), json!({"a": 1}));
        assert_eq!(deep_set(&json!(null), "a.b", json!(1)), json!({"a": {"b": 1}}));
        assert_eq!(
            deep_set(&json!({"a": "text", "z": 0}), "a.b", json!(1)),
            json!({"a": {"b": 1}, "z": 0})
        );
    }

    proptest! {
        #[test]
        fn prop_deep_set_reads_back(path in dotted_path(), n in any::<i64>()) {
            let result = deep_set(&json!({"untouched": true}), &path, json!(n));
            let pointer = format!("/{}", path.replace('.', "/"));
            prop_assert_eq!(result.pointer(&pointer), Some(&json!(n)));
            prop_assert_eq!(result.get("untouched"), Some(&json!(true)));
        }
    }
}
