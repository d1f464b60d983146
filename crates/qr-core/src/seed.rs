//! Seed nodes: CSV files loaded as tables.

use crate::node::{ColumnInfo, NodeInfo};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A CSV seed. Seeds have no template to expand, so their dependency list
/// is always empty and their checksum covers the raw CSV bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedNode {
    #[serde(flatten)]
    pub info: NodeInfo,

    /// Documented columns, keyed by column name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub columns: BTreeMap<String, ColumnInfo>,

    /// Root path of the package the seed file lives under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_path: Option<String>,
}

impl SeedNode {
    pub fn same_contents(&self, other: &SeedNode, adapter_type: &str) -> bool {
        self.info.same_contents(&other.info, adapter_type)
    }
}
