//! File discovery across a project's search paths.
//!
//! Each resource kind is discovered from its configured directories
//! (`model-paths`, `seed-paths`, ...). Discovery is recursive, skips
//! hidden entries, warns and continues on unreadable files, and returns
//! results sorted by path so every downstream id set is deterministic.

use qr_core::checksum::compute_checksum;
use qr_core::error::{CoreError, CoreResult};
use std::path::{Path, PathBuf};

/// A discovered project file with its content loaded and checksummed.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Absolute path on disk
    pub absolute_path: PathBuf,

    /// Path relative to the search-path root it was found under
    pub relative_path: String,

    /// Path relative to the project root
    pub original_file_path: String,

    /// Raw file content
    pub contents: String,

    /// SHA-256 of the raw content
    pub checksum: String,
}

impl DiscoveredFile {
    /// The file stem, used as the default resource name
    pub fn stem(&self) -> &str {
        Path::new(&self.relative_path)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.relative_path)
    }

    /// Subdirectory components between the search root and the file,
    /// followed by the file stem. These become the tail of a node's fqn.
    pub fn fqn_components(&self) -> Vec<String> {
        let path = Path::new(&self.relative_path);
        let mut components: Vec<String> = path
            .parent()
            .map(|p| {
                p.components()
                    .filter_map(|c| c.as_os_str().to_str())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        components.push(self.stem().to_string());
        components
    }
}

/// Discover files with any of `extensions` under the given search paths.
///
/// Search paths that do not exist are skipped silently (a fresh project has
/// no `snapshots/` directory). Unreadable files are logged and skipped.
pub fn discover_files(
    project_root: &Path,
    search_paths: &[String],
    extensions: &[&str],
) -> CoreResult<Vec<DiscoveredFile>> {
    let mut files = Vec::new();

    for search_path in search_paths {
        let root = project_root.join(search_path);
        if !root.exists() {
            continue;
        }
        walk(project_root, &root, &root, extensions, &mut files)?;
    }

    files.sort_by(|a, b| a.original_file_path.cmp(&b.original_file_path));
    Ok(files)
}

fn walk(
    project_root: &Path,
    search_root: &Path,
    dir: &Path,
    extensions: &[&str],
    files: &mut Vec<DiscoveredFile>,
) -> CoreResult<()> {
    for entry in std::fs::read_dir(dir).map_err(|e| CoreError::IoWithPath {
        path: dir.display().to_string(),
        source: e,
    })? {
        let entry = entry.map_err(|e| CoreError::IoWithPath {
            path: dir.display().to_string(),
            source: e,
        })?;
        let path = entry.path();

        if entry
            .file_name()
            .to_str()
            .is_some_and(|n| n.starts_with('.'))
        {
            continue;
        }

        if path.is_dir() {
            walk(project_root, search_root, &path, extensions, files)?;
            continue;
        }

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !extensions.contains(&ext) {
            continue;
        }

        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("Cannot read {}: {}", path.display(), e);
                continue;
            }
        };

        let relative_path = relative_to(&path, search_root);
        let original_file_path = relative_to(&path, project_root);
        let checksum = compute_checksum(&contents);

        files.push(DiscoveredFile {
            absolute_path: path,
            relative_path,
            original_file_path,
            contents,
            checksum,
        });
    }
    Ok(())
}

fn relative_to(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

#[cfg(test)]
#[path = "files_test.rs"]
mod tests;
