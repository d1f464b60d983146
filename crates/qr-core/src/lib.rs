//! qr-core - Core library for Quarry
//!
//! This crate provides the resource model, config resolution, manifest and
//! dependency graph types, selection algebra, and the error taxonomy used
//! across all Quarry components.

pub mod checksum;
pub mod config;
pub mod config_resolver;
pub mod dag;
pub mod docs;
pub mod error;
pub mod exposure;
pub mod macro_node;
pub mod manifest;
pub mod metric;
pub mod model;
pub mod node;
pub mod project;
pub mod resource;
pub mod seed;
pub mod selector;
pub mod serde_helpers;
pub mod snapshot;
pub mod source;
pub mod test_node;

pub use checksum::{compute_checksum, short_hash};
pub use config::{Access, CheckCols, ContractConfig, NodeConfig, PersistDocs, Severity};
pub use config_resolver::{resolve_config, ConfigLayer, LayerSource, ResolvedConfig};
pub use dag::NodeDag;
pub use docs::DocBlock;
pub use error::{AggregatedError, CoreError, CoreResult, ErrorClass};
pub use exposure::{Exposure, ExposureOwner, ExposureType};
pub use macro_node::MacroNode;
pub use manifest::{Manifest, ManifestMetadata};
pub use metric::{Metric, SavedQuery, SemanticModel};
pub use model::{AnalysisNode, ModelNode, OperationNode};
pub use node::{unique_id, ColumnInfo, DependsOn, NodeInfo, ResourceType};
pub use project::{tree_config, ProjectConfig, PROJECT_FILE};
pub use resource::ResourceNode;
pub use seed::SeedNode;
pub use selector::{select, Selection, SelectorAtom};
pub use serde_helpers::yaml_to_json;
pub use snapshot::{SnapshotNode, SnapshotStrategy};
pub use source::{FreshnessConfig, FreshnessThreshold, SourceDefinition};
pub use test_node::{GenericTestNode, SingularTestNode, TestMetadata};
