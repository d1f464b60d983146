//! Effective node configuration types.
//!
//! Every resource carries a fully merged [`NodeConfig`] (the "effective
//! config") plus the raw pre-render mapping it was merged from (the
//! "unrendered config", kept on the node itself). Kind-specific knobs are
//! optional fields validated per resource kind by
//! [`NodeConfig::validate_for`]; unknown keys are preserved in the `extra`
//! catch-all so they round-trip through serialization.

use crate::error::{CoreError, CoreResult};
use crate::node::ResourceType;
use crate::serde_helpers::{default_true, is_true};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Test severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Test failure fails the run (default)
    #[default]
    Error,
    /// Test failure is reported but does not fail the run
    Warn,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warn => write!(f, "warn"),
        }
    }
}

/// Access level for models, controlling cross-package referencing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    /// Referencable only within the owning group
    Private,
    /// Referencable only within the owning package (default)
    #[default]
    Protected,
    /// Referencable from any package
    Public,
}

impl std::fmt::Display for Access {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Access::Private => write!(f, "private"),
            Access::Protected => write!(f, "protected"),
            Access::Public => write!(f, "public"),
        }
    }
}

/// Documentation persistence toggles.
///
/// `None` means "not configured" and is distinct from an explicit `false`;
/// the distinction is semantic for change detection and must survive
/// serialization round-trips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PersistDocs {
    /// Persist relation-level descriptions to the warehouse
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<bool>,

    /// Persist column-level descriptions to the warehouse
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<bool>,
}

/// Contract enforcement configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ContractConfig {
    /// Whether the model's declared columns are enforced at build time
    #[serde(default)]
    pub enforced: bool,
}

/// Snapshot `check_cols`: either the literal `"all"` or an explicit list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CheckCols {
    /// A keyword value; only `"all"` is accepted (validated separately)
    Keyword(String),
    /// Explicit list of columns to compare
    Columns(Vec<String>),
}

impl CheckCols {
    /// True when this is the `"all"` keyword form
    pub fn is_all(&self) -> bool {
        matches!(self, CheckCols::Keyword(k) if k == "all")
    }
}

/// Fully merged, typed configuration for one resource node.
///
/// One struct covers every resource kind; kind-specific fields stay `None`
/// for kinds that do not use them and [`NodeConfig::validate_for`] enforces
/// the per-kind requirements (snapshot strategy fields, test severity).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Whether this node participates in the graph
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub enabled: bool,

    /// Materialization name (view, table, incremental, ephemeral, custom)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub materialized: Option<String>,

    /// Target schema override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Target database override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    /// Relation name override (defaults to the node name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Owning group name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    /// Selection tags; additive across config layers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Arbitrary metadata; merged key-by-key across layers
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, JsonValue>,

    /// Documentation persistence; merged key-by-key across layers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persist_docs: Option<PersistDocs>,

    /// Grants (privilege -> grantees); merged key-by-key across layers
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub grants: BTreeMap<String, Vec<String>>,

    /// SQL to run before the node; additive across layers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pre_hook: Vec<String>,

    /// SQL to run after the node; additive across layers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post_hook: Vec<String>,

    /// Force a full rebuild of incremental models
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_refresh: Option<bool>,

    /// Contract enforcement
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract: Option<ContractConfig>,

    // Test-specific
    /// Test severity (tests only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,

    /// Filter applied to the test query (tests only)
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<String>,

    /// Max failing rows to report (tests only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,

    /// Persist failing rows to a table (tests only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_failures: Option<bool>,

    // Seed-specific
    /// Quote column names when loading (seeds only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_columns: Option<bool>,

    // Snapshot-specific
    /// Snapshot strategy name: `timestamp` or `check` (snapshots only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,

    /// Key identifying a snapshotted row (snapshots, incremental models)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_key: Option<String>,

    /// Timestamp column for the `timestamp` strategy (snapshots only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,

    /// Columns to compare for the `check` strategy (snapshots only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_cols: Option<CheckCols>,

    /// Unknown top-level keys, preserved verbatim for round-tripping
    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            materialized: None,
            schema: None,
            database: None,
            alias: None,
            group: None,
            tags: Vec::new(),
            meta: BTreeMap::new(),
            persist_docs: None,
            grants: BTreeMap::new(),
            pre_hook: Vec::new(),
            post_hook: Vec::new(),
            full_refresh: None,
            contract: None,
            severity: None,
            where_clause: None,
            limit: None,
            store_failures: None,
            quote_columns: None,
            strategy: None,
            unique_key: None,
            updated_at: None,
            check_cols: None,
            extra: BTreeMap::new(),
        }
    }
}

impl NodeConfig {
    /// Build a typed config from a merged JSON mapping.
    ///
    /// Unknown keys land in `extra` via the flatten sink; a key with a
    /// fundamentally wrong type (e.g. `tags: 3`) is a validation error
    /// naming the field.
    pub fn from_merged(merged: &serde_json::Map<String, JsonValue>, path: &str) -> CoreResult<Self> {
        serde_json::from_value(JsonValue::Object(merged.clone())).map_err(|e| {
            CoreError::InvalidField {
                field: guess_offending_field(&e.to_string()),
                path: path.to_string(),
                message: e.to_string(),
            }
        })
    }

    /// Enforce per-kind requirements on an otherwise well-typed config.
    pub fn validate_for(&self, resource_type: ResourceType, name: &str) -> CoreResult<()> {
        if resource_type == ResourceType::Snapshot {
            let strategy = self.strategy.as_deref().ok_or_else(|| CoreError::SnapshotConfig {
                snapshot: name.to_string(),
                strategy: "<missing>".to_string(),
                field: "strategy".to_string(),
            })?;
            match strategy {
                "timestamp" => {
                    if self.updated_at.is_none() {
                        return Err(CoreError::SnapshotConfig {
                            snapshot: name.to_string(),
                            strategy: strategy.to_string(),
                            field: "updated_at".to_string(),
                        });
                    }
                }
                "check" => match &self.check_cols {
                    None => {
                        return Err(CoreError::SnapshotConfig {
                            snapshot: name.to_string(),
                            strategy: strategy.to_string(),
                            field: "check_cols".to_string(),
                        });
                    }
                    Some(CheckCols::Keyword(k)) if k != "all" => {
                        return Err(CoreError::InvalidEnumValue {
                            field: "check_cols".to_string(),
                            value: k.clone(),
                            path: name.to_string(),
                            allowed: "\"all\" or a list of columns".to_string(),
                        });
                    }
                    Some(_) => {}
                },
                other => {
                    return Err(CoreError::InvalidEnumValue {
                        field: "strategy".to_string(),
                        value: other.to_string(),
                        path: name.to_string(),
                        allowed: "timestamp, check".to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Compare configs for semantic equality, used by `same_contents`.
    ///
    /// Plain field equality except `grants`, whose keys are compared
    /// case-insensitively on adapters that fold identifier case (snowflake).
    pub fn same_config(&self, other: &NodeConfig, adapter_type: &str) -> bool {
        if self.grants.len() != other.grants.len() {
            return false;
        }
        let fold = adapter_type.eq_ignore_ascii_case("snowflake");
        let grants_equal = self.grants.iter().all(|(k, v)| {
            let found = if fold {
                other
                    .grants
                    .iter()
                    .find(|(ok, _)| ok.eq_ignore_ascii_case(k))
                    .map(|(_, ov)| ov)
            } else {
                other.grants.get(k)
            };
            found == Some(v)
        });
        if !grants_equal {
            return false;
        }

        let mut a = self.clone();
        let mut b = other.clone();
        a.grants.clear();
        b.grants.clear();
        a == b
    }
}

/// Best-effort extraction of the offending field name from a serde message.
fn guess_offending_field(message: &str) -> String {
    // serde_json reports "invalid type ... for key `tags`"-style messages
    // only sometimes; fall back to the whole config when it doesn't.
    message
        .split('`')
        .nth(1)
        .unwrap_or("config")
        .to_string()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
