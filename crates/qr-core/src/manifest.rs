//! The resolved manifest: every node, source, macro, and doc block of a
//! project invocation, plus lookup helpers used during reference
//! resolution.
//!
//! Maps are `BTreeMap` keyed by unique id so iteration order and
//! serialized output are deterministic for identical input.

use crate::docs::DocBlock;
use crate::error::{CoreError, CoreResult};
use crate::exposure::Exposure;
use crate::macro_node::MacroNode;
use crate::metric::{Metric, SavedQuery, SemanticModel};
use crate::resource::ResourceNode;
use crate::source::SourceDefinition;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Invocation-level manifest metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Root project name
    pub project_name: String,

    /// Adapter the project targets (affects identifier-case comparisons)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapter_type: Option<String>,

    /// When the manifest was generated
    pub generated_at: DateTime<Utc>,
}

/// The complete, resolved collection of resources for one invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Manifest {
    pub metadata: Option<ManifestMetadata>,

    /// Executable nodes (models, seeds, snapshots, analyses, tests,
    /// operations) keyed by unique id
    #[serde(default)]
    pub nodes: BTreeMap<String, ResourceNode>,

    /// Source tables keyed by unique id
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sources: BTreeMap<String, SourceDefinition>,

    /// Macros keyed by unique id
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub macros: BTreeMap<String, MacroNode>,

    /// Doc blocks keyed by unique id
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub docs: BTreeMap<String, DocBlock>,

    /// Exposures keyed by unique id
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub exposures: BTreeMap<String, Exposure>,

    /// Metrics keyed by unique id
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metrics: BTreeMap<String, Metric>,

    /// Semantic models keyed by unique id
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub semantic_models: BTreeMap<String, SemanticModel>,

    /// Saved queries keyed by unique id
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub saved_queries: BTreeMap<String, SavedQuery>,

    /// Disabled nodes, retained for diagnostics. A unique id may collect
    /// several disabled candidates, so the value is a list.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub disabled: BTreeMap<String, Vec<ResourceNode>>,
}

impl Manifest {
    /// Create an empty manifest for a project
    pub fn new(project_name: &str, adapter_type: Option<&str>) -> Self {
        Self {
            metadata: Some(ManifestMetadata {
                project_name: project_name.to_string(),
                adapter_type: adapter_type.map(String::from),
                generated_at: Utc::now(),
            }),
            ..Default::default()
        }
    }

    /// Adapter type, defaulting to empty for comparisons
    pub fn adapter_type(&self) -> &str {
        self.metadata
            .as_ref()
            .and_then(|m| m.adapter_type.as_deref())
            .unwrap_or("")
    }

    /// Resolve a `ref(name)` / `ref(package, name)` call to a unique id.
    ///
    /// Search order: the named package when given, else the caller's own
    /// package, else a unique match across all packages (two matches in
    /// different packages is an ambiguity error). Versioned families
    /// resolve to the requested version, or to the latest version when the
    /// call names none. `from_node` identifies the caller for error
    /// messages.
    pub fn resolve_ref(
        &self,
        name: &str,
        package: Option<&str>,
        version: Option<i64>,
        current_package: &str,
        from_node: &str,
    ) -> CoreResult<String> {
        let candidates: Vec<&ResourceNode> = self
            .nodes
            .values()
            .filter(|n| ref_target_name(n) == Some(name))
            .collect();

        let in_package = |pkg: &str| -> Vec<&ResourceNode> {
            candidates
                .iter()
                .copied()
                .filter(|n| n.package_name() == pkg)
                .collect()
        };

        let scoped: Vec<&ResourceNode> = if let Some(pkg) = package {
            in_package(pkg)
        } else {
            let own = in_package(current_package);
            if !own.is_empty() {
                own
            } else {
                let mut packages: Vec<&str> = candidates.iter().map(|n| n.package_name()).collect();
                packages.sort_unstable();
                packages.dedup();
                if packages.len() > 1 {
                    return Err(CoreError::AmbiguousRef {
                        node: from_node.to_string(),
                        target: name.to_string(),
                        candidates: packages.join(", "),
                    });
                }
                candidates.clone()
            }
        };

        if scoped.is_empty() {
            return Err(CoreError::RefNotFound {
                node: from_node.to_string(),
                target: name.to_string(),
            });
        }

        if let Some(v) = version {
            return scoped
                .iter()
                .find_map(|n| match n.as_model() {
                    Some(m) if m.version == Some(v) => Some(n.unique_id().to_string()),
                    _ => None,
                })
                .ok_or_else(|| CoreError::RefVersionNotFound {
                    node: from_node.to_string(),
                    target: name.to_string(),
                    version: v.to_string(),
                });
        }

        // Unversioned call: prefer the latest version of a versioned
        // family, otherwise the single plain node.
        let chosen = scoped
            .iter()
            .find(|n| n.as_model().map(|m| m.is_latest()).unwrap_or(true))
            .or_else(|| scoped.first())
            .copied();
        match chosen {
            Some(n) => Ok(n.unique_id().to_string()),
            None => Err(CoreError::RefNotFound {
                node: from_node.to_string(),
                target: name.to_string(),
            }),
        }
    }

    /// Resolve a `source(source_name, table_name)` call to a unique id.
    /// The caller's package is searched first, then all packages.
    pub fn resolve_source(
        &self,
        source_name: &str,
        table_name: &str,
        current_package: &str,
        from_node: &str,
    ) -> CoreResult<String> {
        let matches: Vec<&SourceDefinition> = self
            .sources
            .values()
            .filter(|s| s.source_name == source_name && s.name == table_name)
            .collect();

        let chosen = matches
            .iter()
            .find(|s| s.package_name == current_package)
            .or_else(|| matches.first());

        match chosen {
            Some(s) => Ok(s.unique_id.clone()),
            None => Err(CoreError::SourceNotFound {
                node: from_node.to_string(),
                source_name: source_name.to_string(),
                table_name: table_name.to_string(),
            }),
        }
    }

    /// Resolve a `doc('name')` or `doc('package', 'name')` reference.
    pub fn resolve_doc(&self, name: &str, package: Option<&str>, current_package: &str) -> Option<&DocBlock> {
        let matches: Vec<&DocBlock> = self
            .docs
            .values()
            .filter(|d| d.name == name)
            .filter(|d| package.map(|p| d.package_name == p).unwrap_or(true))
            .collect();
        matches
            .iter()
            .find(|d| d.package_name == current_package)
            .or_else(|| matches.first())
            .copied()
    }

    /// Look up a macro by name with package search order: the caller's
    /// package first, then the root project, then any package.
    pub fn resolve_macro(
        &self,
        name: &str,
        current_package: &str,
        root_package: &str,
    ) -> Option<&MacroNode> {
        let matches: Vec<&MacroNode> = self.macros.values().filter(|m| m.name == name).collect();
        matches
            .iter()
            .find(|m| m.package_name == current_package)
            .or_else(|| matches.iter().find(|m| m.package_name == root_package))
            .or_else(|| matches.first())
            .copied()
    }

    /// Dependency map for DAG construction: every node, source, exposure,
    /// metric, semantic model, and saved query contributes its unique id
    /// and outgoing node edges.
    pub fn dependency_map(&self) -> HashMap<String, Vec<String>> {
        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        for (id, node) in &self.nodes {
            map.insert(id.clone(), node.depends_on().nodes.clone());
        }
        for id in self.sources.keys() {
            map.insert(id.clone(), Vec::new());
        }
        for (id, exposure) in &self.exposures {
            map.insert(id.clone(), exposure.depends_on.nodes.clone());
        }
        for (id, metric) in &self.metrics {
            map.insert(id.clone(), metric.depends_on.nodes.clone());
        }
        for (id, sm) in &self.semantic_models {
            map.insert(id.clone(), sm.depends_on.nodes.clone());
        }
        for (id, sq) in &self.saved_queries {
            map.insert(id.clone(), sq.depends_on.nodes.clone());
        }
        map
    }

    /// Serialize the whole manifest to a JSON mapping.
    pub fn to_map(&self) -> CoreResult<JsonMap<String, JsonValue>> {
        match serde_json::to_value(self)? {
            JsonValue::Object(map) => Ok(map),
            other => Err(CoreError::ParseError {
                path: "manifest".to_string(),
                message: format!("manifest serialized to non-object: {}", other),
            }),
        }
    }

    /// Save the manifest to a file atomically.
    ///
    /// Write-to-temp-then-rename; the temp name includes the process id to
    /// avoid races between concurrent invocations.
    pub fn save(&self, path: &Path) -> CoreResult<()> {
        let json = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CoreError::IoWithPath {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let temp_path = path.with_extension(format!("json.{}.tmp", std::process::id()));
        std::fs::write(&temp_path, &json).map_err(|e| CoreError::IoWithPath {
            path: temp_path.display().to_string(),
            source: e,
        })?;
        std::fs::rename(&temp_path, path).map_err(|e| {
            let _ = std::fs::remove_file(&temp_path);
            CoreError::IoWithPath {
                path: path.display().to_string(),
                source: e,
            }
        })?;
        Ok(())
    }

    /// Load a previously saved manifest (used for `state:` selectors).
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|e| CoreError::ParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Number of executable nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// The name a `ref()` call would use to address a node, when the node is
/// referencable at all. Versioned models are addressed by family name.
fn ref_target_name(node: &ResourceNode) -> Option<&str> {
    match node {
        ResourceNode::Model(m) => Some(m.search_name()),
        ResourceNode::Seed(n) => Some(&n.info.name),
        ResourceNode::Snapshot(n) => Some(&n.info.name),
        _ => None,
    }
}

#[cfg(test)]
#[path = "manifest_test.rs"]
mod tests;
