//! The [`ResourceNode`] union over every executable node kind.
//!
//! Sources, macros, docs, exposures, metrics, semantic models, and saved
//! queries live in their own manifest maps; this enum covers the entries
//! of the `nodes` map proper.

use crate::config::NodeConfig;
use crate::error::{CoreError, CoreResult};
use crate::model::{AnalysisNode, ModelNode, OperationNode};
use crate::node::{DependsOn, NodeInfo, ResourceType};
use crate::seed::SeedNode;
use crate::snapshot::SnapshotNode;
use crate::test_node::{GenericTestNode, SingularTestNode};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

/// One executable node in the manifest, discriminated by `resource_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "resource_type", rename_all = "snake_case")]
pub enum ResourceNode {
    Model(ModelNode),
    Seed(SeedNode),
    Snapshot(SnapshotNode),
    Analysis(AnalysisNode),
    GenericTest(GenericTestNode),
    SingularTest(SingularTestNode),
    Operation(OperationNode),
}

impl ResourceNode {
    /// The resource kind of this node
    pub fn resource_type(&self) -> ResourceType {
        match self {
            ResourceNode::Model(_) => ResourceType::Model,
            ResourceNode::Seed(_) => ResourceType::Seed,
            ResourceNode::Snapshot(_) => ResourceType::Snapshot,
            ResourceNode::Analysis(_) => ResourceType::Analysis,
            ResourceNode::GenericTest(_) => ResourceType::GenericTest,
            ResourceNode::SingularTest(_) => ResourceType::SingularTest,
            ResourceNode::Operation(_) => ResourceType::Operation,
        }
    }

    /// Shared identity and provenance fields
    pub fn info(&self) -> &NodeInfo {
        match self {
            ResourceNode::Model(n) => &n.info,
            ResourceNode::Seed(n) => &n.info,
            ResourceNode::Snapshot(n) => &n.info,
            ResourceNode::Analysis(n) => &n.info,
            ResourceNode::GenericTest(n) => &n.info,
            ResourceNode::SingularTest(n) => &n.info,
            ResourceNode::Operation(n) => &n.info,
        }
    }

    /// Mutable access to the shared fields
    pub fn info_mut(&mut self) -> &mut NodeInfo {
        match self {
            ResourceNode::Model(n) => &mut n.info,
            ResourceNode::Seed(n) => &mut n.info,
            ResourceNode::Snapshot(n) => &mut n.info,
            ResourceNode::Analysis(n) => &mut n.info,
            ResourceNode::GenericTest(n) => &mut n.info,
            ResourceNode::SingularTest(n) => &mut n.info,
            ResourceNode::Operation(n) => &mut n.info,
        }
    }

    pub fn unique_id(&self) -> &str {
        &self.info().unique_id
    }

    pub fn name(&self) -> &str {
        &self.info().name
    }

    pub fn package_name(&self) -> &str {
        &self.info().package_name
    }

    pub fn fqn(&self) -> &[String] {
        &self.info().fqn
    }

    pub fn tags(&self) -> &[String] {
        &self.info().tags
    }

    pub fn config(&self) -> &NodeConfig {
        &self.info().config
    }

    pub fn depends_on(&self) -> &DependsOn {
        &self.info().depends_on
    }

    pub fn is_enabled(&self) -> bool {
        self.info().config.enabled
    }

    /// The inner model, when this node is one
    pub fn as_model(&self) -> Option<&ModelNode> {
        match self {
            ResourceNode::Model(n) => Some(n),
            _ => None,
        }
    }

    /// Semantic comparison ignoring provenance timestamps and file
    /// locations. Nodes of different kinds never compare equal.
    pub fn same_contents(&self, other: &ResourceNode, adapter_type: &str) -> bool {
        match (self, other) {
            (ResourceNode::Model(a), ResourceNode::Model(b)) => a.same_contents(b, adapter_type),
            (ResourceNode::Seed(a), ResourceNode::Seed(b)) => a.same_contents(b, adapter_type),
            (ResourceNode::Snapshot(a), ResourceNode::Snapshot(b)) => {
                a.same_contents(b, adapter_type)
            }
            (ResourceNode::Analysis(a), ResourceNode::Analysis(b)) => {
                a.same_contents(b, adapter_type)
            }
            (ResourceNode::GenericTest(a), ResourceNode::GenericTest(b)) => {
                a.same_contents(b, adapter_type)
            }
            (ResourceNode::SingularTest(a), ResourceNode::SingularTest(b)) => {
                a.same_contents(b, adapter_type)
            }
            (ResourceNode::Operation(a), ResourceNode::Operation(b)) => {
                a.same_contents(b, adapter_type)
            }
            _ => false,
        }
    }

    /// Serialize to a JSON mapping keyed by field name, with the
    /// `resource_type` discriminator included.
    pub fn to_map(&self) -> CoreResult<JsonMap<String, JsonValue>> {
        match serde_json::to_value(self)? {
            JsonValue::Object(map) => Ok(map),
            other => Err(CoreError::ParseError {
                path: self.unique_id().to_string(),
                message: format!("node serialized to non-object: {}", other),
            }),
        }
    }

    /// Rebuild a node from the mapping produced by [`to_map`].
    ///
    /// [`to_map`]: ResourceNode::to_map
    pub fn from_map(map: JsonMap<String, JsonValue>) -> CoreResult<Self> {
        Ok(serde_json::from_value(JsonValue::Object(map))?)
    }
}

#[cfg(test)]
#[path = "resource_test.rs"]
mod tests;
