//! Project file loading and the hierarchical config tree.
//!
//! A project is described by `quarry_project.yml` at its root: identity,
//! search paths per resource kind, `vars:`, run hooks, and per-kind config
//! trees (`models:`, `seeds:`, ...). Config trees are hierarchical by
//! subdirectory: `+`-prefixed keys are config applied at that scope, bare
//! keys descend into a sub-scope matching the next path component.

use crate::config_resolver::merge_key;
use crate::error::{CoreError, CoreResult};
use crate::serde_helpers::yaml_to_json;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::path::Path;

/// Conventional project file name
pub const PROJECT_FILE: &str = "quarry_project.yml";

fn default_model_paths() -> Vec<String> {
    vec!["models".to_string()]
}

fn default_seed_paths() -> Vec<String> {
    vec!["seeds".to_string()]
}

fn default_snapshot_paths() -> Vec<String> {
    vec!["snapshots".to_string()]
}

fn default_analysis_paths() -> Vec<String> {
    vec!["analyses".to_string()]
}

fn default_macro_paths() -> Vec<String> {
    vec!["macros".to_string()]
}

fn default_test_paths() -> Vec<String> {
    vec!["tests".to_string()]
}

/// A hook entry: either one SQL string or a list of them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Hooks {
    One(String),
    Many(Vec<String>),
}

impl Default for Hooks {
    fn default() -> Self {
        Hooks::Many(Vec::new())
    }
}

impl Hooks {
    /// Normalize to a list
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Hooks::One(s) => vec![s.clone()],
            Hooks::Many(v) => v.clone(),
        }
    }
}

/// Parsed `quarry_project.yml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project (package) name; used as the package segment of unique ids
    pub name: String,

    /// Project version string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Profile name used to pick connection settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    /// Directories searched for models (and schema YAML, doc blocks)
    #[serde(default = "default_model_paths", rename = "model-paths")]
    pub model_paths: Vec<String>,

    /// Directories searched for seeds
    #[serde(default = "default_seed_paths", rename = "seed-paths")]
    pub seed_paths: Vec<String>,

    /// Directories searched for snapshot blocks
    #[serde(default = "default_snapshot_paths", rename = "snapshot-paths")]
    pub snapshot_paths: Vec<String>,

    /// Directories searched for analyses
    #[serde(default = "default_analysis_paths", rename = "analysis-paths")]
    pub analysis_paths: Vec<String>,

    /// Directories searched for macros
    #[serde(default = "default_macro_paths", rename = "macro-paths")]
    pub macro_paths: Vec<String>,

    /// Directories searched for singular tests
    #[serde(default = "default_test_paths", rename = "test-paths")]
    pub test_paths: Vec<String>,

    /// Project variables, readable from templates via `var()`.
    ///
    /// A nested mapping keyed by a package name scopes those vars to that
    /// package; top-level scalars apply everywhere.
    #[serde(default, skip_serializing_if = "JsonMap::is_empty")]
    pub vars: JsonMap<String, JsonValue>,

    /// SQL run before the build; each entry becomes an operation node
    #[serde(default, rename = "on-run-start", skip_serializing_if = "hooks_empty")]
    pub on_run_start: Hooks,

    /// SQL run after the build
    #[serde(default, rename = "on-run-end", skip_serializing_if = "hooks_empty")]
    pub on_run_end: Hooks,

    /// Hierarchical model config tree
    #[serde(default, skip_serializing_if = "JsonMap::is_empty")]
    pub models: JsonMap<String, JsonValue>,

    /// Hierarchical seed config tree
    #[serde(default, skip_serializing_if = "JsonMap::is_empty")]
    pub seeds: JsonMap<String, JsonValue>,

    /// Hierarchical snapshot config tree
    #[serde(default, skip_serializing_if = "JsonMap::is_empty")]
    pub snapshots: JsonMap<String, JsonValue>,

    /// Hierarchical test config tree
    #[serde(default, skip_serializing_if = "JsonMap::is_empty")]
    pub tests: JsonMap<String, JsonValue>,

    /// Hierarchical source config tree
    #[serde(default, skip_serializing_if = "JsonMap::is_empty")]
    pub sources: JsonMap<String, JsonValue>,
}

fn hooks_empty(h: &Hooks) -> bool {
    matches!(h, Hooks::Many(v) if v.is_empty())
}

impl ProjectConfig {
    /// Load and validate a project file from a project root directory.
    pub fn load(project_root: &Path) -> CoreResult<Self> {
        let path = project_root.join(PROJECT_FILE);
        if !path.exists() {
            return Err(CoreError::ProjectNotFound {
                path: project_root.display().to_string(),
            });
        }
        let contents = std::fs::read_to_string(&path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml_str(&contents, &path.display().to_string())
    }

    /// Parse project YAML, reporting problems as project errors.
    pub fn from_yaml_str(contents: &str, path: &str) -> CoreResult<Self> {
        let yaml: serde_yaml::Value =
            serde_yaml::from_str(contents).map_err(|e| CoreError::ProjectInvalid {
                message: format!("{}: {}", path, e),
            })?;
        let json = yaml_to_json(&yaml);
        let config: ProjectConfig =
            serde_json::from_value(json).map_err(|e| CoreError::ProjectInvalid {
                message: format!("{}: {}", path, e),
            })?;
        if config.name.is_empty() {
            return Err(CoreError::ProjectInvalid {
                message: format!("{}: project name must not be empty", path),
            });
        }
        Ok(config)
    }

    /// The config tree for a resource kind, by project-file key.
    pub fn tree_for(&self, key: &str) -> &JsonMap<String, JsonValue> {
        match key {
            "models" => &self.models,
            "seeds" => &self.seeds,
            "snapshots" => &self.snapshots,
            "tests" => &self.tests,
            "sources" => &self.sources,
            _ => {
                static EMPTY: std::sync::OnceLock<JsonMap<String, JsonValue>> =
                    std::sync::OnceLock::new();
                EMPTY.get_or_init(JsonMap::new)
            }
        }
    }

    /// Resolve a `var()` lookup: package-scoped entry first, then top-level.
    pub fn var(&self, name: &str, package: &str) -> Option<&JsonValue> {
        if let Some(JsonValue::Object(scoped)) = self.vars.get(package) {
            if let Some(v) = scoped.get(name) {
                return Some(v);
            }
        }
        self.vars.get(name)
    }
}

/// Walk a config tree along fqn components, merging `+key` config from the
/// root scope down to the deepest matching scope. Deeper scopes win;
/// additive fields accumulate along the descent.
pub fn tree_config(
    tree: &JsonMap<String, JsonValue>,
    components: &[String],
) -> JsonMap<String, JsonValue> {
    descend(tree, components, JsonMap::new())
}

fn descend(
    scope: &JsonMap<String, JsonValue>,
    components: &[String],
    mut merged: JsonMap<String, JsonValue>,
) -> JsonMap<String, JsonValue> {
    for (key, value) in scope {
        if let Some(stripped) = key.strip_prefix('+') {
            merge_key(&mut merged, stripped, value);
        }
    }
    if let Some((first, rest)) = components.split_first() {
        if let Some(JsonValue::Object(sub)) = scope.get(first) {
            return descend(sub, rest, merged);
        }
    }
    merged
}

#[cfg(test)]
#[path = "project_test.rs"]
mod tests;
