//! Common node identity, provenance, and dependency types.
//!
//! Every resource in a project — model, seed, snapshot, source table, test,
//! macro — is identified by a globally unique id of the form
//! `{type}.{package}.{name}` (plus a `.v{n}` suffix for versioned models and
//! a content-hash suffix for generic tests). The [`ResourceType`] enum is
//! the canonical discriminator; [`NodeInfo`] carries the fields shared by
//! every executable node variant.

use crate::config::NodeConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

/// Canonical resource kind for every entry in a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// SQL transformation model
    Model,
    /// CSV seed data
    Seed,
    /// Point-in-time snapshot of a table
    Snapshot,
    /// Analysis SQL, compiled but never executed as a relation
    Analysis,
    /// Parameterized test expanded from a YAML declaration
    GenericTest,
    /// Standalone SQL test file
    SingularTest,
    /// Hook SQL run around the build
    Operation,
    /// External table declared in YAML
    Source,
    /// Jinja macro
    Macro,
    /// Documentation block
    Doc,
    /// Downstream consumer (dashboard, application, ...)
    Exposure,
    /// Metric definition
    Metric,
    /// Semantic model definition
    SemanticModel,
    /// Saved query definition
    SavedQuery,
}

impl ResourceType {
    /// Prefix used when constructing unique ids.
    ///
    /// Both test kinds share the `test` prefix; their ids stay distinct
    /// through the name and content-hash parts.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            ResourceType::Model => "model",
            ResourceType::Seed => "seed",
            ResourceType::Snapshot => "snapshot",
            ResourceType::Analysis => "analysis",
            ResourceType::GenericTest | ResourceType::SingularTest => "test",
            ResourceType::Operation => "operation",
            ResourceType::Source => "source",
            ResourceType::Macro => "macro",
            ResourceType::Doc => "doc",
            ResourceType::Exposure => "exposure",
            ResourceType::Metric => "metric",
            ResourceType::SemanticModel => "semantic_model",
            ResourceType::SavedQuery => "saved_query",
        }
    }

    /// Human-readable label for error messages and display.
    pub fn label(&self) -> &'static str {
        match self {
            ResourceType::Model => "model",
            ResourceType::Seed => "seed",
            ResourceType::Snapshot => "snapshot",
            ResourceType::Analysis => "analysis",
            ResourceType::GenericTest => "generic test",
            ResourceType::SingularTest => "singular test",
            ResourceType::Operation => "operation",
            ResourceType::Source => "source",
            ResourceType::Macro => "macro",
            ResourceType::Doc => "doc block",
            ResourceType::Exposure => "exposure",
            ResourceType::Metric => "metric",
            ResourceType::SemanticModel => "semantic model",
            ResourceType::SavedQuery => "saved query",
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Build a unique id from its parts: `{prefix}.{package}.{name}`.
pub fn unique_id(resource_type: ResourceType, package: &str, name: &str) -> String {
    format!("{}.{}.{}", resource_type.id_prefix(), package, name)
}

/// Ordered, deduplicated dependency edges recorded during parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DependsOn {
    /// Unique ids of upstream nodes (models, seeds, sources, snapshots)
    #[serde(default)]
    pub nodes: Vec<String>,

    /// Unique ids of macros this node's template calls
    #[serde(default)]
    pub macros: Vec<String>,
}

impl DependsOn {
    /// Record a node edge, keeping first-call order and dropping repeats.
    pub fn add_node(&mut self, unique_id: impl Into<String>) {
        let id = unique_id.into();
        if !self.nodes.contains(&id) {
            self.nodes.push(id);
        }
    }

    /// Record a macro edge, keeping first-call order and dropping repeats.
    pub fn add_macro(&mut self, unique_id: impl Into<String>) {
        let id = unique_id.into();
        if !self.macros.contains(&id) {
            self.macros.push(id);
        }
    }

    /// True when nothing upstream was recorded
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.macros.is_empty()
    }
}

/// A documented column on a model, seed, snapshot, or source table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column name
    pub name: String,

    /// Column description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Declared SQL data type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,

    /// Column-level tags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Arbitrary column metadata
    #[serde(default, skip_serializing_if = "JsonMap::is_empty")]
    pub meta: JsonMap<String, JsonValue>,
}

impl ColumnInfo {
    /// Create a column with just a name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            data_type: None,
            tags: Vec::new(),
            meta: JsonMap::new(),
        }
    }
}

/// Identity, provenance, and dependency data shared by every executable
/// node variant. Embedded (serde-flattened) into each kind-specific struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Globally unique id, e.g. `model.my_project.stg_orders`
    pub unique_id: String,

    /// Logical resource name
    pub name: String,

    /// Owning package name
    pub package_name: String,

    /// Path relative to the package's resource root
    pub path: String,

    /// Path relative to the project root, as discovered
    pub original_file_path: String,

    /// Fully qualified name path used by selectors
    pub fqn: Vec<String>,

    /// Selection tags (effective config tags plus patch tags)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// SHA-256 of the raw file content
    pub checksum: String,

    /// When this node was parsed; excluded from change comparison
    pub created_at: DateTime<Utc>,

    /// Upstream edges recorded during template expansion
    #[serde(default)]
    pub depends_on: DependsOn,

    /// Fully merged, typed effective config
    #[serde(default)]
    pub config: NodeConfig,

    /// Merged raw config mapping before template rendering.
    ///
    /// Stable when only non-semantic template text changes; this stability
    /// backs partial parsing and `state:modified` comparisons.
    #[serde(default, skip_serializing_if = "JsonMap::is_empty")]
    pub unrendered_config: JsonMap<String, JsonValue>,

    /// Raw file/block text before rendering
    #[serde(default)]
    pub raw_code: String,

    /// Resource description (usually attached via a YAML patch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NodeInfo {
    /// Semantic comparison backing `same_contents`: provenance timestamps
    /// and file locations are ignored; identity, raw-content checksum,
    /// dependency edges, and config are compared.
    pub fn same_contents(&self, other: &NodeInfo, adapter_type: &str) -> bool {
        self.unique_id == other.unique_id
            && self.name == other.name
            && self.package_name == other.package_name
            && self.checksum == other.checksum
            && self.depends_on == other.depends_on
            && self.config.same_config(&other.config, adapter_type)
    }
}

#[cfg(test)]
#[path = "node_test.rs"]
mod tests;
