//! Exposures: downstream consumers declared in schema YAML.

use crate::node::DependsOn;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

/// What kind of consumer an exposure describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExposureType {
    Dashboard,
    Notebook,
    #[default]
    Analysis,
    Ml,
    Application,
}

/// Maturity of the exposure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Maturity {
    Low,
    Medium,
    High,
}

/// Who owns an exposure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ExposureOwner {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A downstream consumer of project resources. Exposures are leaves of the
/// graph; their `depends_on` edges come from `ref()`/`source()` calls in
/// their YAML declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exposure {
    /// Unique id: `exposure.{package}.{name}`
    pub unique_id: String,

    pub name: String,

    pub package_name: String,

    /// Path of the declaring YAML file, relative to the package root
    pub path: String,

    /// Path relative to the project root
    pub original_file_path: String,

    /// Fully qualified name
    pub fqn: Vec<String>,

    #[serde(rename = "type", default)]
    pub exposure_type: ExposureType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maturity: Option<Maturity>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub owner: ExposureOwner,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "JsonMap::is_empty")]
    pub meta: JsonMap<String, JsonValue>,

    #[serde(default)]
    pub depends_on: DependsOn,

    pub created_at: DateTime<Utc>,
}
