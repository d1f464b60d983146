//! Snapshot nodes: point-in-time captures of mutable tables.

use crate::config::CheckCols;
use crate::error::{CoreError, CoreResult};
use crate::node::NodeInfo;
use serde::{Deserialize, Serialize};

/// Validated snapshot strategy, derived from the effective config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "lowercase")]
pub enum SnapshotStrategy {
    /// Rows change when the `updated_at` column advances
    Timestamp { updated_at: String },
    /// Rows change when any of the checked columns differ
    Check { check_cols: CheckCols },
}

impl SnapshotStrategy {
    /// Derive the strategy from config fields, enforcing the per-strategy
    /// required fields.
    pub fn from_config(
        name: &str,
        strategy: Option<&str>,
        updated_at: Option<&str>,
        check_cols: Option<&CheckCols>,
    ) -> CoreResult<Self> {
        match strategy {
            Some("timestamp") => {
                let updated_at = updated_at.ok_or_else(|| CoreError::SnapshotConfig {
                    snapshot: name.to_string(),
                    strategy: "timestamp".to_string(),
                    field: "updated_at".to_string(),
                })?;
                Ok(SnapshotStrategy::Timestamp {
                    updated_at: updated_at.to_string(),
                })
            }
            Some("check") => {
                let check_cols = check_cols.ok_or_else(|| CoreError::SnapshotConfig {
                    snapshot: name.to_string(),
                    strategy: "check".to_string(),
                    field: "check_cols".to_string(),
                })?;
                if let CheckCols::Keyword(k) = check_cols {
                    if k != "all" {
                        return Err(CoreError::InvalidEnumValue {
                            field: "check_cols".to_string(),
                            value: k.clone(),
                            path: name.to_string(),
                            allowed: "\"all\" or a list of columns".to_string(),
                        });
                    }
                }
                Ok(SnapshotStrategy::Check {
                    check_cols: check_cols.clone(),
                })
            }
            Some(other) => Err(CoreError::InvalidEnumValue {
                field: "strategy".to_string(),
                value: other.to_string(),
                path: name.to_string(),
                allowed: "timestamp, check".to_string(),
            }),
            None => Err(CoreError::SnapshotConfig {
                snapshot: name.to_string(),
                strategy: "<missing>".to_string(),
                field: "strategy".to_string(),
            }),
        }
    }
}

/// A snapshot, parsed from a `{% snapshot name %}...{% endsnapshot %}`
/// block. One file may hold several blocks, each becoming its own node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotNode {
    #[serde(flatten)]
    pub info: NodeInfo,

    /// Validated strategy derived from the effective config
    pub strategy: SnapshotStrategy,
}

impl SnapshotNode {
    pub fn same_contents(&self, other: &SnapshotNode, adapter_type: &str) -> bool {
        self.info.same_contents(&other.info, adapter_type) && self.strategy == other.strategy
    }
}
