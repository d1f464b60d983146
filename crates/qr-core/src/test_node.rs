//! Test nodes: generic (expanded from YAML) and singular (SQL files).

use crate::node::NodeInfo;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

/// Provenance of a generic test: which macro, with which arguments,
/// attached to which resource and column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestMetadata {
    /// Short test name, e.g. `unique` or `accepted_values`
    pub name: String,

    /// Resolved keyword arguments passed to the test macro
    #[serde(default, skip_serializing_if = "JsonMap::is_empty")]
    pub kwargs: JsonMap<String, JsonValue>,

    /// Package the test macro was resolved from, when not the default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// A generic test materialized from a YAML `tests:` declaration.
///
/// Its unique id carries a 10-character content-hash suffix derived from
/// the resolved kwargs, so the same test on different columns (or with
/// different arguments) yields distinct nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericTestNode {
    #[serde(flatten)]
    pub info: NodeInfo,

    /// Macro and argument provenance
    pub test_metadata: TestMetadata,

    /// Column the test is attached to, when column-level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_name: Option<String>,

    /// Unique id of the resource the test is attached to
    pub attached_node: String,

    /// Path of the declaring YAML file, relative to the project root
    pub file_key_name: String,
}

impl GenericTestNode {
    pub fn same_contents(&self, other: &GenericTestNode, adapter_type: &str) -> bool {
        self.info.same_contents(&other.info, adapter_type)
            && self.test_metadata == other.test_metadata
            && self.column_name == other.column_name
            && self.attached_node == other.attached_node
    }
}

/// A singular test: a standalone SQL file under the test paths whose
/// result rows are failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingularTestNode {
    #[serde(flatten)]
    pub info: NodeInfo,
}

impl SingularTestNode {
    pub fn same_contents(&self, other: &SingularTestNode, adapter_type: &str) -> bool {
        self.info.same_contents(&other.info, adapter_type)
    }
}
