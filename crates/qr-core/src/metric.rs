//! Metrics, semantic models, and saved queries.
//!
//! These are YAML-declared semantic-layer resources. They participate in
//! the graph (their `ref()`-shaped model references become edges) but the
//! engine does not interpret their calculation semantics.

use crate::node::DependsOn;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

/// A metric definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Unique id: `metric.{package}.{name}`
    pub unique_id: String,

    pub name: String,

    pub package_name: String,

    pub path: String,

    pub original_file_path: String,

    pub fqn: Vec<String>,

    /// Metric calculation type (sum, count, ratio, derived, ...)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub metric_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Raw declaration body, preserved for downstream consumers
    #[serde(default, skip_serializing_if = "JsonMap::is_empty")]
    pub type_params: JsonMap<String, JsonValue>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "JsonMap::is_empty")]
    pub meta: JsonMap<String, JsonValue>,

    #[serde(default)]
    pub depends_on: DependsOn,

    pub created_at: DateTime<Utc>,
}

/// A semantic model bound to one underlying model via `model: ref('...')`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticModel {
    /// Unique id: `semantic_model.{package}.{name}`
    pub unique_id: String,

    pub name: String,

    pub package_name: String,

    pub path: String,

    pub original_file_path: String,

    pub fqn: Vec<String>,

    /// The `model:` expression as written, e.g. `ref('orders')`
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Entities, dimensions, and measures, preserved as declared
    #[serde(default, skip_serializing_if = "JsonMap::is_empty")]
    pub body: JsonMap<String, JsonValue>,

    #[serde(default)]
    pub depends_on: DependsOn,

    pub created_at: DateTime<Utc>,
}

/// A saved query over the semantic layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedQuery {
    /// Unique id: `saved_query.{package}.{name}`
    pub unique_id: String,

    pub name: String,

    pub package_name: String,

    pub path: String,

    pub original_file_path: String,

    pub fqn: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Query parameters (metrics, group_by, where), preserved as declared
    #[serde(default, skip_serializing_if = "JsonMap::is_empty")]
    pub query_params: JsonMap<String, JsonValue>,

    #[serde(default)]
    pub depends_on: DependsOn,

    pub created_at: DateTime<Utc>,
}
