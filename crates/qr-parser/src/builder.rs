//! Manifest construction: the single-threaded merge over everything the
//! per-file parsers produced.
//!
//! Build order matters: macros and doc blocks first (every later template
//! render may need the macro prelude), then the per-file resource parsers,
//! then versioned-model synthesis, indexing with collision detection,
//! source override handling, patch application, generic-test
//! materialization, hook operations, and finally reference resolution and
//! the cycle check over the assembled graph. Structural problems (duplicate
//! ids, cycles) abort immediately; everything else is collected per file or
//! node and surfaced together.

use crate::docs_parser::parse_docs;
use crate::error::{BuildError, BuildResult};
use crate::files::{discover_files, DiscoveredFile};
use crate::macro_parser::{called_names, parse_macros};
use crate::model_parser::{parse_analysis, parse_model, parse_singular_test};
use crate::parsed::{template_error, ParsedNode};
use crate::partial::ParseCache;
use crate::schema_parser::{
    parse_schema_file, AttachedTo, ColumnFilter, NodePatch, SchemaContents, TestDeclaration,
    VersionedModelDecl,
};
use crate::seed_parser::parse_seed;
use crate::snapshot_parser::parse_snapshots;
use qr_core::checksum::{compute_checksum, short_hash};
use qr_core::config_resolver::{resolve_config, ConfigLayer, LayerSource};
use qr_core::dag::NodeDag;
use qr_core::docs::DocBlock;
use qr_core::error::{AggregatedError, CoreError, CoreResult};
use qr_core::macro_node::MacroNode;
use qr_core::manifest::Manifest;
use qr_core::model::OperationNode;
use qr_core::node::{unique_id, DependsOn, NodeInfo, ResourceType};
use qr_core::project::{tree_config, ProjectConfig, PROJECT_FILE};
use qr_core::resource::ResourceNode;
use qr_core::source::SourceDefinition;
use qr_core::test_node::{GenericTestNode, TestMetadata};
use qr_jinja::{Expander, RefCall, SourceCall, TemplateEngine};
use serde_json::{json, Map as JsonMap, Value as JsonValue};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// One project on disk: the root project or an installed dependency.
#[derive(Debug, Clone)]
pub struct Package {
    /// Directory holding the project file
    pub root: PathBuf,
    /// Parsed project configuration
    pub config: ProjectConfig,
}

impl Package {
    /// Load a package from its root directory.
    pub fn load(root: &Path) -> CoreResult<Self> {
        Ok(Self {
            root: root.to_path_buf(),
            config: ProjectConfig::load(root)?,
        })
    }

    /// The package name, used as the package segment of unique ids
    pub fn name(&self) -> &str {
        &self.config.name
    }
}

/// Per-node state carried between parsing and resolution.
#[derive(Debug, Default)]
struct Pending {
    refs: Vec<RefCall>,
    sources: Vec<SourceCall>,
    /// Merged config below the patch layer, from the parser
    base_config: JsonMap<String, JsonValue>,
    /// Inline `config()` keys, highest precedence
    inline_config: JsonMap<String, JsonValue>,
    /// YAML patch layers, lowest first (family patch below version config)
    patch_layers: Vec<JsonMap<String, JsonValue>>,
}

/// Build the manifest for a root project and its dependency packages.
pub fn build_manifest(root: &Package, packages: &[Package]) -> BuildResult<Manifest> {
    build_project(root, packages).map(|(manifest, _)| manifest)
}

/// Build the manifest plus the file provenance cache that backs partial
/// reparsing.
pub fn build_project(
    root: &Package,
    packages: &[Package],
) -> BuildResult<(Manifest, ParseCache)> {
    let mut errors: Vec<CoreError> = Vec::new();
    let mut cache = ParseCache::default();
    let all: Vec<&Package> = std::iter::once(root).chain(packages.iter()).collect();

    // 1. Macros and doc blocks across every package
    let mut macros: BTreeMap<String, MacroNode> = BTreeMap::new();
    let mut docs: BTreeMap<String, DocBlock> = BTreeMap::new();
    for pkg in &all {
        for file in discover(&mut errors, &pkg.root, &pkg.config.macro_paths, &["sql"]) {
            match parse_macros(pkg.name(), &file) {
                Ok(parsed) => {
                    let ids = parsed.iter().map(|m| m.unique_id.clone()).collect();
                    cache.record(&file, Vec::new(), ids);
                    for mac in parsed {
                        if let Some(existing) = macros.get(&mac.unique_id) {
                            return Err(BuildError::Fatal(CoreError::DuplicateResource {
                                unique_id: mac.unique_id.clone(),
                                path1: existing.original_file_path.clone(),
                                path2: mac.original_file_path.clone(),
                            }));
                        }
                        macros.insert(mac.unique_id.clone(), mac);
                    }
                }
                Err(e) => errors.push(e),
            }
        }
        for file in discover(&mut errors, &pkg.root, &pkg.config.model_paths, &["md"]) {
            match parse_docs(pkg.name(), &file) {
                Ok(parsed) => {
                    for doc in parsed {
                        if let Some(existing) = docs.get(&doc.unique_id) {
                            return Err(BuildError::Fatal(CoreError::DuplicateResource {
                                unique_id: doc.unique_id.clone(),
                                path1: existing.original_file_path.clone(),
                                path2: doc.original_file_path.clone(),
                            }));
                        }
                        docs.insert(doc.unique_id.clone(), doc);
                    }
                }
                Err(e) => errors.push(e),
            }
        }
    }

    // 2. One template engine for the whole pass, primed with the prelude
    let mut engine = TemplateEngine::new(&root.config.vars);
    engine.register_macros(
        macros
            .values()
            .map(|m| (m.name.as_str(), m.macro_sql.as_str())),
    );
    for name in engine.shadowed_builtins() {
        errors.push(CoreError::BannedMacroOverride {
            name: name.clone(),
            builtin: name.clone(),
        });
    }
    let mut expander = Expander::new(&engine);

    // 3. Per-package resource and schema parsing
    let mut parsed_nodes: Vec<ParsedNode> = Vec::new();
    let mut schemas: Vec<(String, SchemaContents)> = Vec::new();
    let root_project = &root.config;
    for pkg in &all {
        let project = &pkg.config;
        let name = pkg.name();

        for file in discover(&mut errors, &pkg.root, &project.model_paths, &["sql"]) {
            match parse_model(name, project, root_project, &file, &mut expander) {
                Ok(node) => push_parsed(&mut parsed_nodes, &mut cache, &file, vec![node]),
                Err(e) => errors.push(e),
            }
        }
        for file in discover(&mut errors, &pkg.root, &project.seed_paths, &["csv"]) {
            match parse_seed(name, project, root_project, &pkg.root, &file) {
                Ok(node) => push_parsed(&mut parsed_nodes, &mut cache, &file, vec![node]),
                Err(e) => errors.push(e),
            }
        }
        for file in discover(&mut errors, &pkg.root, &project.snapshot_paths, &["sql"]) {
            match parse_snapshots(name, project, root_project, &file, &mut expander) {
                Ok(nodes) => push_parsed(&mut parsed_nodes, &mut cache, &file, nodes),
                Err(e) => errors.push(e),
            }
        }
        for file in discover(&mut errors, &pkg.root, &project.analysis_paths, &["sql"]) {
            match parse_analysis(name, project, root_project, &file, &mut expander) {
                Ok(node) => push_parsed(&mut parsed_nodes, &mut cache, &file, vec![node]),
                Err(e) => errors.push(e),
            }
        }
        for file in discover(&mut errors, &pkg.root, &project.test_paths, &["sql"]) {
            match parse_singular_test(name, project, root_project, &file, &mut expander) {
                Ok(node) => push_parsed(&mut parsed_nodes, &mut cache, &file, vec![node]),
                Err(e) => errors.push(e),
            }
        }

        for file in discover(&mut errors, &pkg.root, &yaml_paths(project), &["yml", "yaml"]) {
            match parse_schema_file(name, project, &file) {
                Ok(contents) => {
                    cache.record(&file, Vec::new(), Vec::new());
                    schemas.push((name.to_string(), contents));
                }
                Err(e) => errors.push(e),
            }
        }
    }

    // 4. Versioned-model synthesis: the family's parsed files become one
    // node per declared version
    let mut version_filters: HashMap<String, (ColumnFilter, Vec<String>)> = HashMap::new();
    let mut version_configs: HashMap<String, JsonMap<String, JsonValue>> = HashMap::new();
    for (pkg_name, contents) in &schemas {
        for decl in &contents.versioned_models {
            synthesize_versions(
                pkg_name,
                decl,
                &mut parsed_nodes,
                &mut version_filters,
                &mut version_configs,
                &mut errors,
            );
        }
    }

    // 5. Index nodes; any unique-id collision aborts the build
    let mut nodes: BTreeMap<String, ResourceNode> = BTreeMap::new();
    let mut pending: HashMap<String, Pending> = HashMap::new();
    for parsed in parsed_nodes {
        let uid = parsed.node.unique_id().to_string();
        if let Some(existing) = nodes.get(&uid) {
            return Err(BuildError::Fatal(CoreError::DuplicateResource {
                unique_id: uid,
                path1: existing.info().original_file_path.clone(),
                path2: parsed.node.info().original_file_path.clone(),
            }));
        }
        pending.insert(
            uid.clone(),
            Pending {
                refs: parsed.refs,
                sources: parsed.sources,
                base_config: parsed.base_config,
                inline_config: parsed.inline_config,
                patch_layers: version_configs
                    .remove(&uid)
                    .map(|c| vec![c])
                    .unwrap_or_default(),
            },
        );
        nodes.insert(uid, parsed.node);
    }

    // 6. Sources, honoring `overrides:` between packages
    let sources = match index_sources(&schemas) {
        Ok(sources) => sources,
        Err(fatal) => return Err(BuildError::Fatal(fatal)),
    };

    // 7. Macro description patches
    for (pkg_name, contents) in &schemas {
        for patch in &contents.macro_patches {
            let uid = unique_id(ResourceType::Macro, pkg_name, &patch.name);
            match macros.get_mut(&uid) {
                Some(mac) => mac.description = patch.description.clone(),
                None => errors.push(CoreError::PatchTargetNotFound {
                    path: patch.path.clone(),
                    target: patch.name.clone(),
                    resource_type: "macro".to_string(),
                }),
            }
        }
    }

    // 8. Node patches: direct field writes plus a config layer above the
    // project tree but below the inline call
    for (pkg_name, contents) in &schemas {
        for patch in &contents.patches {
            apply_patch(pkg_name, patch, &mut nodes, &mut pending, &mut errors);
        }
    }

    // 9. Re-resolve config for every node that gained patch layers
    for (uid, p) in &pending {
        if p.patch_layers.is_empty() {
            continue;
        }
        let Some(node) = nodes.get_mut(uid) else {
            continue;
        };
        let mut layers = vec![ConfigLayer::new(
            LayerSource::GlobalDefaults,
            p.base_config.clone(),
        )];
        for patch in &p.patch_layers {
            layers.push(ConfigLayer::new(LayerSource::YamlPatch, patch.clone()));
        }
        layers.push(ConfigLayer::new(
            LayerSource::InlineCall,
            p.inline_config.clone(),
        ));
        match resolve_config(&layers, &node.info().original_file_path) {
            Ok(resolved) => {
                let info = node.info_mut();
                info.tags = resolved.config.tags.clone();
                info.config = resolved.config;
                info.unrendered_config = resolved.merged;
            }
            Err(e) => errors.push(e),
        }
    }

    // 10. Per-version column filtering, after patches filled the columns in
    for (uid, (include, exclude)) in &version_filters {
        if let Some(ResourceNode::Model(model)) = nodes.get_mut(uid) {
            if let ColumnFilter::Only(keep) = include {
                model.columns.retain(|name, _| keep.contains(name));
            }
            for name in exclude {
                model.columns.remove(name);
            }
        }
    }

    // 11. Generic tests, attached to the nodes and sources indexed above
    let projects: HashMap<&str, &ProjectConfig> =
        all.iter().map(|p| (p.name(), &p.config)).collect();
    for (pkg_name, contents) in &schemas {
        let Some(project) = projects.get(pkg_name.as_str()) else {
            continue;
        };
        for decl in &contents.tests {
            match materialize_test(pkg_name, *project, root_project, decl, &nodes, &sources) {
                Ok(parsed) => {
                    let uid = parsed.node.unique_id().to_string();
                    if let Some(existing) = nodes.get(&uid) {
                        return Err(BuildError::Fatal(CoreError::DuplicateResource {
                            unique_id: uid,
                            path1: existing.info().original_file_path.clone(),
                            path2: parsed.node.info().original_file_path.clone(),
                        }));
                    }
                    cache.add_node_id(&decl.original_file_path, uid.clone());
                    pending.insert(
                        uid.clone(),
                        Pending {
                            refs: parsed.refs,
                            sources: parsed.sources,
                            ..Pending::default()
                        },
                    );
                    nodes.insert(uid, parsed.node);
                }
                Err(e) => errors.push(e),
            }
        }
    }

    // 12. on-run-start / on-run-end hooks from the root project
    for (key, hooks) in [
        ("on-run-start", root.config.on_run_start.to_vec()),
        ("on-run-end", root.config.on_run_end.to_vec()),
    ] {
        for (index, sql) in hooks.iter().enumerate() {
            match hook_node(root.name(), key, index, sql, &mut expander) {
                Ok(parsed) => {
                    let uid = parsed.node.unique_id().to_string();
                    pending.insert(
                        uid.clone(),
                        Pending {
                            refs: parsed.refs,
                            sources: parsed.sources,
                            ..Pending::default()
                        },
                    );
                    nodes.insert(uid, parsed.node);
                }
                Err(e) => errors.push(e),
            }
        }
    }

    // 13. Assemble the manifest; disabled nodes go to the side map
    let mut manifest = Manifest::new(root.name(), None);
    manifest.sources = sources;
    manifest.macros = macros;
    manifest.docs = docs;
    for (uid, node) in nodes {
        if node.is_enabled() {
            manifest.nodes.insert(uid, node);
        } else {
            manifest.disabled.entry(uid).or_default().push(node);
        }
    }

    // 14. Macro-to-macro edges, now that every package's macros are known
    let mut macro_deps: HashMap<String, Vec<String>> = HashMap::new();
    for mac in manifest.macros.values() {
        let mut deps = Vec::new();
        for callee in called_names(&mac.macro_sql) {
            if callee == mac.name {
                continue;
            }
            if let Some(target) = manifest.resolve_macro(&callee, &mac.package_name, root.name()) {
                if target.unique_id != mac.unique_id && !deps.contains(&target.unique_id) {
                    deps.push(target.unique_id.clone());
                }
            }
        }
        macro_deps.insert(mac.unique_id.clone(), deps);
    }
    for (uid, deps) in macro_deps {
        if let Some(mac) = manifest.macros.get_mut(&uid) {
            mac.depends_on_macros = deps;
        }
    }

    // 15. Reference resolution over the complete node index
    let mut resolved_deps: HashMap<String, DependsOn> = HashMap::new();
    for (uid, node) in &manifest.nodes {
        let Some(p) = pending.get(uid) else {
            continue;
        };
        let pkg = node.package_name();
        let mut depends_on = node.depends_on().clone();
        for call in &p.refs {
            match manifest.resolve_ref(&call.name, call.package.as_deref(), call.version, pkg, uid)
            {
                Ok(target) => depends_on.add_node(target),
                Err(e) => errors.push(e),
            }
        }
        for call in &p.sources {
            match manifest.resolve_source(&call.source_name, &call.table_name, pkg, uid) {
                Ok(target) => depends_on.add_node(target),
                Err(e) => errors.push(e),
            }
        }
        for callee in called_names(&node.info().raw_code) {
            if let Some(mac) = manifest.resolve_macro(&callee, pkg, root.name()) {
                depends_on.add_macro(mac.unique_id.clone());
            }
        }
        resolved_deps.insert(uid.clone(), depends_on);
    }
    for (uid, deps) in resolved_deps {
        if let Some(node) = manifest.nodes.get_mut(&uid) {
            node.info_mut().depends_on = deps;
        }
    }

    // 16. Exposures, metrics, semantic models; saved queries after metrics
    for (pkg_name, contents) in &schemas {
        for parsed in &contents.exposures {
            let mut exposure = parsed.exposure.clone();
            resolve_calls(
                &manifest,
                pkg_name,
                &exposure.unique_id.clone(),
                &parsed.refs,
                &parsed.sources,
                &mut exposure.depends_on,
                &mut errors,
            );
            manifest
                .exposures
                .insert(exposure.unique_id.clone(), exposure);
        }
        for parsed in &contents.metrics {
            let mut metric = parsed.metric.clone();
            resolve_calls(
                &manifest,
                pkg_name,
                &metric.unique_id.clone(),
                &parsed.refs,
                &[],
                &mut metric.depends_on,
                &mut errors,
            );
            manifest.metrics.insert(metric.unique_id.clone(), metric);
        }
        for parsed in &contents.semantic_models {
            let mut sm = parsed.semantic_model.clone();
            resolve_calls(
                &manifest,
                pkg_name,
                &sm.unique_id.clone(),
                &parsed.refs,
                &[],
                &mut sm.depends_on,
                &mut errors,
            );
            manifest.semantic_models.insert(sm.unique_id.clone(), sm);
        }
    }
    for (pkg_name, contents) in &schemas {
        for parsed in &contents.saved_queries {
            let mut sq = parsed.saved_query.clone();
            for metric_name in &parsed.metric_names {
                let metric_uid = unique_id(ResourceType::Metric, pkg_name, metric_name);
                if manifest.metrics.contains_key(&metric_uid) {
                    sq.depends_on.add_node(metric_uid);
                } else {
                    errors.push(CoreError::RefNotFound {
                        node: sq.unique_id.clone(),
                        target: metric_name.clone(),
                    });
                }
            }
            manifest.saved_queries.insert(sq.unique_id.clone(), sq);
        }
    }

    // 17. Cycle check over the assembled graph
    if let Err(e) = NodeDag::build(&manifest.dependency_map()) {
        return Err(BuildError::Fatal(e));
    }

    if errors.is_empty() {
        Ok((manifest, cache))
    } else {
        Err(AggregatedError::new(errors).into())
    }
}

fn discover(
    errors: &mut Vec<CoreError>,
    root: &Path,
    paths: &[String],
    extensions: &[&str],
) -> Vec<DiscoveredFile> {
    match discover_files(root, paths, extensions) {
        Ok(files) => files,
        Err(e) => {
            errors.push(e);
            Vec::new()
        }
    }
}

/// Every search path that may hold schema YAML
fn yaml_paths(project: &ProjectConfig) -> Vec<String> {
    let mut paths: Vec<String> = Vec::new();
    for set in [
        &project.model_paths,
        &project.seed_paths,
        &project.snapshot_paths,
        &project.analysis_paths,
        &project.macro_paths,
        &project.test_paths,
    ] {
        for path in set {
            if !paths.contains(path) {
                paths.push(path.clone());
            }
        }
    }
    paths
}

fn push_parsed(
    parsed_nodes: &mut Vec<ParsedNode>,
    cache: &mut ParseCache,
    file: &DiscoveredFile,
    nodes: Vec<ParsedNode>,
) {
    let ids = nodes
        .iter()
        .map(|n| n.node.unique_id().to_string())
        .collect();
    cache.record(file, ids, Vec::new());
    parsed_nodes.extend(nodes);
}

/// Replace a versioned family's parsed files with one node per declared
/// version. A version's SQL comes from `defined_in`, else `{name}_v{n}`,
/// else the family file itself.
fn synthesize_versions(
    package: &str,
    decl: &VersionedModelDecl,
    parsed: &mut Vec<ParsedNode>,
    filters: &mut HashMap<String, (ColumnFilter, Vec<String>)>,
    version_configs: &mut HashMap<String, JsonMap<String, JsonValue>>,
    errors: &mut Vec<CoreError>,
) {
    let latest = decl
        .latest_version
        .or_else(|| decl.versions.iter().map(|v| v.v).max());

    let find = |parsed: &[ParsedNode], name: &str| -> Option<usize> {
        parsed.iter().position(|p| {
            matches!(&p.node, ResourceNode::Model(m)
                if m.info.package_name == package && m.info.name == name && m.version.is_none())
        })
    };

    let base_idx = find(parsed, &decl.name);
    let mut consumed: Vec<usize> = Vec::new();
    let mut new_nodes: Vec<ParsedNode> = Vec::new();

    for version in &decl.versions {
        let source_idx = match &version.defined_in {
            Some(stem) => find(parsed, stem),
            None => find(parsed, &format!("{}_v{}", decl.name, version.v)).or(base_idx),
        };
        let Some(idx) = source_idx else {
            errors.push(CoreError::PatchTargetNotFound {
                path: decl.path.clone(),
                target: version
                    .defined_in
                    .clone()
                    .unwrap_or_else(|| decl.name.clone()),
                resource_type: "model".to_string(),
            });
            continue;
        };
        if !consumed.contains(&idx) {
            consumed.push(idx);
        }

        let mut node = parsed[idx].clone();
        if let ResourceNode::Model(model) = &mut node.node {
            model.info.name = decl.name.clone();
            model.info.unique_id = format!(
                "{}.v{}",
                unique_id(ResourceType::Model, package, &decl.name),
                version.v
            );
            model.version = Some(version.v);
            model.latest_version = latest;
            model.defined_in = version.defined_in.clone();
            if let Some(last) = model.info.fqn.last_mut() {
                *last = decl.name.clone();
            }
            model.info.fqn.push(format!("v{}", version.v));
        }

        let uid = node.node.unique_id().to_string();
        if !version.config.is_empty() {
            version_configs.insert(uid.clone(), version.config.clone());
        }
        filters.insert(uid, (version.include.clone(), version.exclude.clone()));
        new_nodes.push(node);
    }

    // The family file never survives as a plain node, even when a
    // defined_in file backed every version
    if let Some(idx) = base_idx {
        if !consumed.contains(&idx) {
            consumed.push(idx);
        }
    }
    consumed.sort_unstable_by(|a, b| b.cmp(a));
    for idx in consumed {
        parsed.remove(idx);
    }
    parsed.extend(new_nodes);
}

/// Index source definitions, dropping tables replaced via `overrides:` and
/// tables disabled by config.
fn index_sources(
    schemas: &[(String, SchemaContents)],
) -> Result<BTreeMap<String, SourceDefinition>, CoreError> {
    // (overridden package, source name, table name)
    let mut replaced: Vec<(String, String, String)> = Vec::new();
    for (_, contents) in schemas {
        for src in &contents.sources {
            if let Some(overridden_pkg) = &src.overrides {
                replaced.push((
                    overridden_pkg.clone(),
                    src.definition.source_name.clone(),
                    src.definition.name.clone(),
                ));
            }
        }
    }

    let mut sources: BTreeMap<String, SourceDefinition> = BTreeMap::new();
    for (_, contents) in schemas {
        for src in &contents.sources {
            let def = &src.definition;
            if !def.config.enabled {
                continue;
            }
            let is_replaced = src.overrides.is_none()
                && replaced.iter().any(|(pkg, source_name, table)| {
                    pkg == &def.package_name
                        && source_name == &def.source_name
                        && table == &def.name
                });
            if is_replaced {
                continue;
            }
            if let Some(existing) = sources.get(&def.unique_id) {
                return Err(CoreError::DuplicateResource {
                    unique_id: def.unique_id.clone(),
                    path1: existing.original_file_path.clone(),
                    path2: def.original_file_path.clone(),
                });
            }
            sources.insert(def.unique_id.clone(), def.clone());
        }
    }
    Ok(sources)
}

fn apply_patch(
    package: &str,
    patch: &NodePatch,
    nodes: &mut BTreeMap<String, ResourceNode>,
    pending: &mut HashMap<String, Pending>,
    errors: &mut Vec<CoreError>,
) {
    let base_uid = unique_id(patch.resource_type, package, &patch.name);
    let targets: Vec<String> = if nodes.contains_key(&base_uid) {
        vec![base_uid]
    } else if patch.resource_type == ResourceType::Model {
        // A family patch applies to every version node
        nodes
            .values()
            .filter(|n| {
                matches!(n, ResourceNode::Model(m)
                    if m.version.is_some()
                        && m.info.package_name == package
                        && m.info.name == patch.name)
            })
            .map(|n| n.unique_id().to_string())
            .collect()
    } else {
        Vec::new()
    };

    if targets.is_empty() {
        errors.push(CoreError::PatchTargetNotFound {
            path: patch.path.clone(),
            target: patch.name.clone(),
            resource_type: patch.resource_type.label().to_string(),
        });
        return;
    }

    for uid in targets {
        if let Some(node) = nodes.get_mut(&uid) {
            if let Some(description) = &patch.description {
                node.info_mut().description = Some(description.clone());
            }
            match node {
                ResourceNode::Model(model) => {
                    if let Some(access) = patch.access {
                        model.access = access;
                    }
                    if let Some(date) = patch.deprecation_date {
                        model.deprecation_date = Some(date);
                    }
                    for (name, column) in &patch.columns {
                        model.columns.insert(name.clone(), column.clone());
                    }
                }
                ResourceNode::Seed(seed) => {
                    for (name, column) in &patch.columns {
                        seed.columns.insert(name.clone(), column.clone());
                    }
                }
                _ => {}
            }
        }
        if !patch.config.is_empty() {
            if let Some(p) = pending.get_mut(&uid) {
                // Below any version-level config already queued
                p.patch_layers.insert(0, patch.config.clone());
            }
        }
    }
}

/// Turn one YAML test declaration into a generic test node.
fn materialize_test(
    package: &str,
    project: &ProjectConfig,
    root: &ProjectConfig,
    decl: &TestDeclaration,
    nodes: &BTreeMap<String, ResourceNode>,
    sources: &BTreeMap<String, SourceDefinition>,
) -> CoreResult<ParsedNode> {
    let mut kwargs = decl.metadata.kwargs.clone();
    if let Some(column) = &decl.column_name {
        kwargs.insert("column_name".to_string(), json!(column));
    }

    let mut refs = Vec::new();
    let mut source_calls = Vec::new();
    let (attached_uid, attached_name) = match &decl.attached {
        AttachedTo::Node {
            resource_type,
            name,
        } => {
            let uid = attach_target(package, *resource_type, name, nodes).ok_or_else(|| {
                CoreError::PatchTargetNotFound {
                    path: decl.original_file_path.clone(),
                    target: name.clone(),
                    resource_type: resource_type.label().to_string(),
                }
            })?;
            kwargs.insert("model".to_string(), json!(format!("ref('{}')", name)));
            refs.push(RefCall {
                name: name.clone(),
                package: None,
                version: None,
            });
            (uid, name.clone())
        }
        AttachedTo::SourceTable {
            source_name,
            table_name,
        } => {
            let uid = sources
                .values()
                .find(|s| s.source_name == *source_name && s.name == *table_name)
                .map(|s| s.unique_id.clone())
                .ok_or_else(|| CoreError::SourceNotFound {
                    node: decl.original_file_path.clone(),
                    source_name: source_name.clone(),
                    table_name: table_name.clone(),
                })?;
            kwargs.insert(
                "model".to_string(),
                json!(format!("source('{}', '{}')", source_name, table_name)),
            );
            source_calls.push(SourceCall {
                source_name: source_name.clone(),
                table_name: table_name.clone(),
            });
            (uid, format!("{}_{}", source_name, table_name))
        }
    };
    refs.extend(decl.refs.iter().cloned());
    source_calls.extend(decl.sources.iter().cloned());

    let mut parts: Vec<&str> = Vec::new();
    if let Some(namespace) = &decl.metadata.namespace {
        parts.push(namespace);
    }
    parts.push(&decl.metadata.name);
    parts.push(&attached_name);
    if let Some(column) = &decl.column_name {
        parts.push(column);
    }
    let long_name = parts.join("_");

    // The kwargs hash keeps the same test on different columns (or with
    // different arguments) distinct
    let kwargs_text = serde_json::to_string(&kwargs)?;
    let uid = format!(
        "{}.{}",
        unique_id(ResourceType::GenericTest, package, &long_name),
        short_hash(&kwargs_text)
    );

    let fqn = vec![package.to_string(), "tests".to_string(), long_name.clone()];
    let mut global = JsonMap::new();
    global.insert("materialized".to_string(), json!("test"));
    let mut layers = vec![ConfigLayer::new(LayerSource::GlobalDefaults, global)];
    if project.name != root.name {
        layers.push(ConfigLayer::new(
            LayerSource::PackageDefaults,
            tree_config(project.tree_for("tests"), &fqn),
        ));
    }
    layers.push(ConfigLayer::new(
        LayerSource::ProjectDefaults,
        tree_config(root.tree_for("tests"), &fqn),
    ));
    layers.push(ConfigLayer::new(LayerSource::YamlPatch, decl.config.clone()));
    let resolved = resolve_config(&layers, &decl.original_file_path)?;

    let mut depends_on = DependsOn::default();
    depends_on.add_node(attached_uid.clone());

    let info = NodeInfo {
        unique_id: uid,
        name: long_name,
        package_name: package.to_string(),
        path: decl.path.clone(),
        original_file_path: decl.original_file_path.clone(),
        fqn,
        tags: resolved.config.tags.clone(),
        checksum: compute_checksum(&kwargs_text),
        created_at: chrono::Utc::now(),
        depends_on,
        config: resolved.config,
        unrendered_config: resolved.merged,
        raw_code: String::new(),
        description: None,
    };

    Ok(ParsedNode {
        node: ResourceNode::GenericTest(GenericTestNode {
            info,
            test_metadata: TestMetadata {
                name: decl.metadata.name.clone(),
                kwargs,
                namespace: decl.metadata.namespace.clone(),
            },
            column_name: decl.column_name.clone(),
            attached_node: attached_uid,
            file_key_name: decl.original_file_path.clone(),
        }),
        refs,
        sources: source_calls,
        base_config: JsonMap::new(),
        inline_config: JsonMap::new(),
    })
}

/// The node a test attaches to. Versioned families attach to their latest
/// version.
fn attach_target(
    package: &str,
    resource_type: ResourceType,
    name: &str,
    nodes: &BTreeMap<String, ResourceNode>,
) -> Option<String> {
    let uid = unique_id(resource_type, package, name);
    if nodes.contains_key(&uid) {
        return Some(uid);
    }
    if resource_type == ResourceType::Model {
        return nodes.values().find_map(|n| match n {
            ResourceNode::Model(m)
                if m.info.package_name == package
                    && m.info.name == name
                    && m.version.is_some()
                    && m.is_latest() =>
            {
                Some(m.info.unique_id.clone())
            }
            _ => None,
        });
    }
    None
}

/// Build one operation node from a project hook entry.
fn hook_node(
    package: &str,
    key: &str,
    index: usize,
    sql: &str,
    expander: &mut Expander,
) -> CoreResult<ParsedNode> {
    let name = format!("{}-{}-{}", package, key, index);
    let expansion = expander
        .expand(sql, PROJECT_FILE)
        .map_err(|e| template_error(PROJECT_FILE, e))?;

    let info = NodeInfo {
        unique_id: unique_id(ResourceType::Operation, package, &name),
        name: name.clone(),
        package_name: package.to_string(),
        path: PROJECT_FILE.to_string(),
        original_file_path: PROJECT_FILE.to_string(),
        fqn: vec![package.to_string(), "hooks".to_string(), name],
        tags: Vec::new(),
        checksum: compute_checksum(sql),
        created_at: chrono::Utc::now(),
        depends_on: DependsOn::default(),
        config: Default::default(),
        unrendered_config: JsonMap::new(),
        raw_code: sql.to_string(),
        description: None,
    };

    Ok(ParsedNode {
        node: ResourceNode::Operation(OperationNode { info, index }),
        refs: expansion.refs,
        sources: expansion.sources,
        base_config: JsonMap::new(),
        inline_config: JsonMap::new(),
    })
}

/// Resolve captured ref/source calls into a `depends_on`, collecting
/// failures instead of stopping.
fn resolve_calls(
    manifest: &Manifest,
    package: &str,
    from: &str,
    refs: &[RefCall],
    sources: &[SourceCall],
    depends_on: &mut DependsOn,
    errors: &mut Vec<CoreError>,
) {
    for call in refs {
        match manifest.resolve_ref(&call.name, call.package.as_deref(), call.version, package, from)
        {
            Ok(target) => depends_on.add_node(target),
            Err(e) => errors.push(e),
        }
    }
    for call in sources {
        match manifest.resolve_source(&call.source_name, &call.table_name, package, from) {
            Ok(target) => depends_on.add_node(target),
            Err(e) => errors.push(e),
        }
    }
}

#[cfg(test)]
#[path = "builder_test.rs"]
mod tests;
