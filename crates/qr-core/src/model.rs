//! Model, analysis, and operation nodes.

use crate::config::Access;
use crate::node::{ColumnInfo, NodeInfo};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A SQL transformation model.
///
/// Models may be versioned: each declared version becomes its own node with
/// a `.v{n}` unique-id suffix, and the version chosen as latest also answers
/// unversioned `ref()` calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelNode {
    #[serde(flatten)]
    pub info: NodeInfo,

    /// Cross-package reference access level
    #[serde(default)]
    pub access: Access,

    /// Version number when this model is versioned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,

    /// The latest version of this model's family, set on every version node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_version: Option<i64>,

    /// Relation name override for versioned models (`defined_in`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defined_in: Option<String>,

    /// When this model is scheduled for removal, from the YAML patch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecation_date: Option<DateTime<Utc>>,

    /// Documented columns, keyed by column name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub columns: BTreeMap<String, ColumnInfo>,
}

impl ModelNode {
    /// The name a `ref()` call uses to address this node. Versioned models
    /// are addressed by family name, not by the suffixed unique-id name.
    pub fn search_name(&self) -> &str {
        &self.info.name
    }

    /// True when this node is the latest version of its family (or is
    /// unversioned).
    pub fn is_latest(&self) -> bool {
        match (self.version, self.latest_version) {
            (Some(v), Some(latest)) => v == latest,
            _ => true,
        }
    }

    pub fn same_contents(&self, other: &ModelNode, adapter_type: &str) -> bool {
        self.info.same_contents(&other.info, adapter_type)
            && self.access == other.access
            && self.version == other.version
            && self.latest_version == other.latest_version
    }
}

/// An analysis: compiled like a model but never materialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisNode {
    #[serde(flatten)]
    pub info: NodeInfo,
}

impl AnalysisNode {
    pub fn same_contents(&self, other: &AnalysisNode, adapter_type: &str) -> bool {
        self.info.same_contents(&other.info, adapter_type)
    }
}

/// A project-level hook run before or after the build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationNode {
    #[serde(flatten)]
    pub info: NodeInfo,

    /// Position within the hook list, preserved for ordering
    #[serde(default)]
    pub index: usize,
}

impl OperationNode {
    pub fn same_contents(&self, other: &OperationNode, adapter_type: &str) -> bool {
        self.info.same_contents(&other.info, adapter_type) && self.index == other.index
    }
}
