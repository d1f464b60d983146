//! Source definitions: external tables declared in schema YAML.
//!
//! A `sources:` entry names a source (a schema-level grouping) plus its
//! tables; each (source, table) pair becomes one [`SourceDefinition`] with
//! unique id `source.{package}.{source_name}.{table_name}`. Table-level
//! settings override source-level ones.

use crate::config::NodeConfig;
use crate::error::{CoreError, CoreResult};
use crate::node::{ColumnInfo, DependsOn};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::collections::BTreeMap;

/// A freshness threshold: error or warn after a period without new data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreshnessThreshold {
    /// Number of periods
    pub count: u64,
    /// Period unit: minute, hour, or day
    pub period: String,
}

/// Source freshness configuration.
///
/// `loaded_at_field` and `loaded_at_query` are mutually exclusive ways to
/// obtain the last-load timestamp; declaring both is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FreshnessConfig {
    /// Warn when data is older than this
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warn_after: Option<FreshnessThreshold>,

    /// Error when data is older than this
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_after: Option<FreshnessThreshold>,

    /// Filter applied when sampling freshness
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl FreshnessConfig {
    /// True when no thresholds are set
    pub fn is_empty(&self) -> bool {
        self.warn_after.is_none() && self.error_after.is_none()
    }

    /// Table-level freshness overrides source-level wholesale when present.
    pub fn merged(source_level: Option<&Self>, table_level: Option<&Self>) -> Option<Self> {
        table_level.or(source_level).cloned()
    }
}

/// A fully resolved source table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDefinition {
    /// Unique id: `source.{package}.{source_name}.{table_name}`
    pub unique_id: String,

    /// Table name within the source
    pub name: String,

    /// The source grouping this table belongs to
    pub source_name: String,

    /// Owning package name
    pub package_name: String,

    /// Path of the declaring YAML file, relative to the package root
    pub path: String,

    /// Path relative to the project root
    pub original_file_path: String,

    /// Fully qualified name: `[package, "sources", source_name, table_name]`
    pub fqn: Vec<String>,

    /// Database the source lives in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    /// Schema the source lives in (defaults to the source name)
    pub schema: String,

    /// Physical table/identifier override (defaults to the table name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,

    /// Source description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Loader system that populates this source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loader: Option<String>,

    /// Column holding the last-load timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loaded_at_field: Option<String>,

    /// Query producing the last-load timestamp (exclusive with the field)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loaded_at_query: Option<String>,

    /// Effective freshness settings (table overrides source)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freshness: Option<FreshnessConfig>,

    /// Selection tags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Arbitrary metadata
    #[serde(default, skip_serializing_if = "JsonMap::is_empty")]
    pub meta: JsonMap<String, JsonValue>,

    /// Documented columns, keyed by column name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub columns: BTreeMap<String, ColumnInfo>,

    /// Effective config (sources support `enabled` and metadata only)
    #[serde(default)]
    pub config: NodeConfig,

    /// When this definition was parsed
    pub created_at: DateTime<Utc>,
}

impl SourceDefinition {
    /// The relation identifier used when rendering `source()` calls
    pub fn effective_identifier(&self) -> &str {
        self.identifier.as_deref().unwrap_or(&self.name)
    }

    /// Validate the mutual exclusivity of the two loaded-at mechanisms.
    pub fn validate_freshness(&self) -> CoreResult<()> {
        if self.loaded_at_field.is_some() && self.loaded_at_query.is_some() {
            return Err(CoreError::FreshnessConflict {
                source_name: self.source_name.clone(),
                table_name: self.name.clone(),
                path: self.original_file_path.clone(),
            });
        }
        Ok(())
    }

    pub fn same_contents(&self, other: &SourceDefinition) -> bool {
        self.unique_id == other.unique_id
            && self.name == other.name
            && self.source_name == other.source_name
            && self.database == other.database
            && self.schema == other.schema
            && self.identifier == other.identifier
            && self.loaded_at_field == other.loaded_at_field
            && self.loaded_at_query == other.loaded_at_query
            && self.freshness == other.freshness
            && self.config == other.config
    }

    /// Sources carry no upstream edges of their own
    pub fn depends_on(&self) -> DependsOn {
        DependsOn::default()
    }
}

#[cfg(test)]
#[path = "source_test.rs"]
mod tests;
