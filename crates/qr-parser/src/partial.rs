//! Partial-reparse planning.
//!
//! A build records per-file provenance (path, content checksum, produced
//! ids) in a [`ParseCache`]. The next invocation compares the cache against
//! the files currently on disk and splits them into files that must be
//! re-parsed and nodes that can be reused as-is. A changed macro widens the
//! reparse set: every node whose `depends_on.macros` transitively reaches
//! it gets its file re-parsed, decided before any parsing starts. The merge
//! and resolution passes always run over the full node set afterwards.

use crate::files::DiscoveredFile;
use qr_core::error::{CoreError, CoreResult};
use qr_core::manifest::Manifest;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

/// Provenance of one parsed file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FileRecord {
    /// Path relative to the project root
    pub path: String,

    /// SHA-256 of the content that was parsed
    pub checksum: String,

    /// Unique ids of nodes this file produced
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub node_ids: Vec<String>,

    /// Unique ids of macros this file produced
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub macro_ids: Vec<String>,
}

/// File provenance for one completed build, keyed by project-relative path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ParseCache {
    pub files: BTreeMap<String, FileRecord>,
}

impl ParseCache {
    /// Record what one file produced.
    pub fn record(&mut self, file: &DiscoveredFile, node_ids: Vec<String>, macro_ids: Vec<String>) {
        self.files.insert(
            file.original_file_path.clone(),
            FileRecord {
                path: file.original_file_path.clone(),
                checksum: file.checksum.clone(),
                node_ids,
                macro_ids,
            },
        );
    }

    /// Attach a late-materialized node id (generic tests) to a file already
    /// recorded.
    pub fn add_node_id(&mut self, path: &str, node_id: impl Into<String>) {
        let record = self
            .files
            .entry(path.to_string())
            .or_insert_with(|| FileRecord {
                path: path.to_string(),
                ..FileRecord::default()
            });
        let id = node_id.into();
        if !record.node_ids.contains(&id) {
            record.node_ids.push(id);
        }
    }

    /// Save the cache next to other build artifacts.
    pub fn save(&self, path: &Path) -> CoreResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Load a cache written by a previous build.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        serde_json::from_str(&contents).map_err(|e| CoreError::ParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

/// The outcome of comparing a cache against the files on disk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReparsePlan {
    /// Paths that must be parsed again: new, content-changed, or holding a
    /// node invalidated by a changed macro
    pub reparse: Vec<String>,

    /// Cached paths no longer on disk; their ids leave the manifest
    pub deleted: Vec<String>,

    /// Node ids from untouched files, safe to carry into the next manifest
    pub reusable: Vec<String>,
}

/// Decide which files need a fresh parse.
///
/// `manifest` is the manifest the cache was recorded against; its macro
/// dependency edges drive the transitive invalidation.
pub fn plan_reparse(
    cache: &ParseCache,
    current: &[DiscoveredFile],
    manifest: &Manifest,
) -> ReparsePlan {
    let on_disk: BTreeMap<&str, &DiscoveredFile> = current
        .iter()
        .map(|f| (f.original_file_path.as_str(), f))
        .collect();

    let mut reparse: BTreeSet<String> = BTreeSet::new();
    for file in current {
        match cache.files.get(&file.original_file_path) {
            Some(record) if record.checksum == file.checksum => {}
            _ => {
                reparse.insert(file.original_file_path.clone());
            }
        }
    }

    let deleted: Vec<String> = cache
        .files
        .keys()
        .filter(|path| !on_disk.contains_key(path.as_str()))
        .cloned()
        .collect();

    // Macros defined in changed or deleted files, closed transitively over
    // the macros that call them
    let mut dirty_macros: BTreeSet<String> = BTreeSet::new();
    for path in reparse.iter().chain(deleted.iter()) {
        if let Some(record) = cache.files.get(path) {
            dirty_macros.extend(record.macro_ids.iter().cloned());
        }
    }
    close_over_callers(&mut dirty_macros, manifest);

    // A node reaching a dirty macro drags its whole file back into the
    // reparse set
    if !dirty_macros.is_empty() {
        let node_file: HashMap<&str, &str> = cache
            .files
            .values()
            .flat_map(|r| r.node_ids.iter().map(move |id| (id.as_str(), r.path.as_str())))
            .collect();
        for node in manifest.nodes.values() {
            if node
                .depends_on()
                .macros
                .iter()
                .any(|m| dirty_macros.contains(m))
            {
                if let Some(path) = node_file.get(node.unique_id()) {
                    if on_disk.contains_key(path) {
                        reparse.insert((*path).to_string());
                    }
                }
            }
        }
    }

    let reusable: Vec<String> = cache
        .files
        .values()
        .filter(|r| on_disk.contains_key(r.path.as_str()) && !reparse.contains(&r.path))
        .flat_map(|r| r.node_ids.iter().cloned())
        .collect();

    ReparsePlan {
        reparse: reparse.into_iter().collect(),
        deleted,
        reusable,
    }
}

/// Extend a dirty-macro set with every macro that (transitively) calls a
/// member of the set.
fn close_over_callers(dirty: &mut BTreeSet<String>, manifest: &Manifest) {
    let mut callers: HashMap<&str, Vec<&str>> = HashMap::new();
    for mac in manifest.macros.values() {
        for dep in &mac.depends_on_macros {
            callers
                .entry(dep.as_str())
                .or_default()
                .push(mac.unique_id.as_str());
        }
    }

    let mut worklist: Vec<String> = dirty.iter().cloned().collect();
    while let Some(id) = worklist.pop() {
        if let Some(dependents) = callers.get(id.as_str()) {
            for dependent in dependents {
                if dirty.insert((*dependent).to_string()) {
                    worklist.push((*dependent).to_string());
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "partial_test.rs"]
mod tests;
