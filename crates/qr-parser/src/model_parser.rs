//! Parsers for single-SQL-file resources: models, analyses, and singular
//! tests. Each file yields exactly one node named after the file stem.

use crate::files::DiscoveredFile;
use crate::parsed::{base_of, standard_layers, template_error, ParsedNode};
use qr_core::config_resolver::resolve_config;
use qr_core::error::CoreResult;
use qr_core::model::{AnalysisNode, ModelNode};
use qr_core::node::{unique_id, DependsOn, NodeInfo, ResourceType};
use qr_core::project::ProjectConfig;
use qr_core::resource::ResourceNode;
use qr_core::test_node::SingularTestNode;
use qr_jinja::Expander;
use serde_json::{json, Map as JsonMap};
use std::collections::BTreeMap;

/// Parse a model SQL file.
pub fn parse_model(
    package: &str,
    project: &ProjectConfig,
    root: &ProjectConfig,
    file: &DiscoveredFile,
    expander: &mut Expander,
) -> CoreResult<ParsedNode> {
    let expansion = expander
        .expand(&file.contents, &file.original_file_path)
        .map_err(|e| template_error(&file.original_file_path, e))?;

    let mut fqn = vec![package.to_string()];
    fqn.extend(file.fqn_components());

    let mut global = JsonMap::new();
    global.insert("materialized".to_string(), json!("view"));
    let layers = standard_layers(project, root, "models", &fqn, global, expansion.config.clone());
    let resolved = resolve_config(&layers, &file.original_file_path)?;

    let info = node_info(
        ResourceType::Model,
        package,
        file.stem(),
        fqn,
        file,
        resolved.config,
        resolved.merged,
    );

    Ok(ParsedNode {
        node: ResourceNode::Model(ModelNode {
            info,
            access: Default::default(),
            version: None,
            latest_version: None,
            defined_in: None,
            deprecation_date: None,
            columns: BTreeMap::new(),
        }),
        refs: expansion.refs,
        sources: expansion.sources,
        base_config: base_of(&layers),
        inline_config: expansion.config,
    })
}

/// Parse an analysis SQL file. Analyses get an `analysis` fqn segment so
/// they never collide with model scopes in selectors.
pub fn parse_analysis(
    package: &str,
    project: &ProjectConfig,
    root: &ProjectConfig,
    file: &DiscoveredFile,
    expander: &mut Expander,
) -> CoreResult<ParsedNode> {
    let expansion = expander
        .expand(&file.contents, &file.original_file_path)
        .map_err(|e| template_error(&file.original_file_path, e))?;

    let mut fqn = vec![package.to_string(), "analysis".to_string()];
    fqn.extend(file.fqn_components());

    let layers = standard_layers(
        project,
        root,
        "models",
        &fqn,
        JsonMap::new(),
        expansion.config.clone(),
    );
    let resolved = resolve_config(&layers, &file.original_file_path)?;

    let info = node_info(
        ResourceType::Analysis,
        package,
        file.stem(),
        fqn,
        file,
        resolved.config,
        resolved.merged,
    );

    Ok(ParsedNode {
        node: ResourceNode::Analysis(AnalysisNode { info }),
        refs: expansion.refs,
        sources: expansion.sources,
        base_config: base_of(&layers),
        inline_config: expansion.config,
    })
}

/// Parse a singular test SQL file from the test search paths.
pub fn parse_singular_test(
    package: &str,
    project: &ProjectConfig,
    root: &ProjectConfig,
    file: &DiscoveredFile,
    expander: &mut Expander,
) -> CoreResult<ParsedNode> {
    let expansion = expander
        .expand(&file.contents, &file.original_file_path)
        .map_err(|e| template_error(&file.original_file_path, e))?;

    let mut fqn = vec![package.to_string()];
    fqn.extend(file.fqn_components());

    let layers = standard_layers(
        project,
        root,
        "tests",
        &fqn,
        JsonMap::new(),
        expansion.config.clone(),
    );
    let resolved = resolve_config(&layers, &file.original_file_path)?;

    let info = node_info(
        ResourceType::SingularTest,
        package,
        file.stem(),
        fqn,
        file,
        resolved.config,
        resolved.merged,
    );

    Ok(ParsedNode {
        node: ResourceNode::SingularTest(SingularTestNode { info }),
        refs: expansion.refs,
        sources: expansion.sources,
        base_config: base_of(&layers),
        inline_config: expansion.config,
    })
}

pub(crate) fn node_info(
    resource_type: ResourceType,
    package: &str,
    name: &str,
    fqn: Vec<String>,
    file: &DiscoveredFile,
    config: qr_core::config::NodeConfig,
    unrendered_config: JsonMap<String, serde_json::Value>,
) -> NodeInfo {
    let tags = config.tags.clone();
    NodeInfo {
        unique_id: unique_id(resource_type, package, name),
        name: name.to_string(),
        package_name: package.to_string(),
        path: file.relative_path.clone(),
        original_file_path: file.original_file_path.clone(),
        fqn,
        tags,
        checksum: file.checksum.clone(),
        created_at: chrono::Utc::now(),
        depends_on: DependsOn::default(),
        config,
        unrendered_config,
        raw_code: file.contents.clone(),
        description: None,
    }
}

#[cfg(test)]
#[path = "model_parser_test.rs"]
mod tests;
