//! Snapshot parsing: `{% snapshot name %}...{% endsnapshot %}` block
//! extraction. One file may define several blocks; each becomes an
//! independent node with its own config and strategy validation.

use crate::files::DiscoveredFile;
use crate::model_parser::node_info;
use crate::parsed::{base_of, standard_layers, template_error, ParsedNode};
use qr_core::checksum::compute_checksum;
use qr_core::config_resolver::resolve_config;
use qr_core::error::{CoreError, CoreResult};
use qr_core::node::ResourceType;
use qr_core::project::ProjectConfig;
use qr_core::resource::ResourceNode;
use qr_core::snapshot::{SnapshotNode, SnapshotStrategy};
use qr_jinja::Expander;
use serde_json::{json, Map as JsonMap};
use std::sync::OnceLock;

fn snapshot_block_re() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(
            r"(?s)\{%-?\s*snapshot\s+([a-zA-Z_][a-zA-Z0-9_]*)\s*-?%\}(.*?)\{%-?\s*endsnapshot\s*-?%\}",
        )
        .unwrap()
    })
}

/// Parse every snapshot block in a file.
pub fn parse_snapshots(
    package: &str,
    project: &ProjectConfig,
    root: &ProjectConfig,
    file: &DiscoveredFile,
    expander: &mut Expander,
) -> CoreResult<Vec<ParsedNode>> {
    let blocks: Vec<(String, String)> = snapshot_block_re()
        .captures_iter(&file.contents)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .collect();

    if blocks.is_empty() {
        return Err(CoreError::ParseError {
            path: file.original_file_path.clone(),
            message: "no {% snapshot %} block found".to_string(),
        });
    }

    let mut nodes = Vec::with_capacity(blocks.len());
    for (name, body) in blocks {
        nodes.push(parse_block(package, project, root, file, expander, &name, &body)?);
    }
    Ok(nodes)
}

fn parse_block(
    package: &str,
    project: &ProjectConfig,
    root: &ProjectConfig,
    file: &DiscoveredFile,
    expander: &mut Expander,
    name: &str,
    body: &str,
) -> CoreResult<ParsedNode> {
    let expansion = expander
        .expand(body, &file.original_file_path)
        .map_err(|e| template_error(&file.original_file_path, e))?;

    let mut fqn = vec![package.to_string()];
    let mut components = file.fqn_components();
    // The block name, not the file stem, is the node name
    components.pop();
    fqn.extend(components);
    fqn.push(name.to_string());

    let mut global = JsonMap::new();
    global.insert("materialized".to_string(), json!("snapshot"));
    let layers = standard_layers(
        project,
        root,
        "snapshots",
        &fqn,
        global,
        expansion.config.clone(),
    );
    let resolved = resolve_config(&layers, &file.original_file_path)?;

    let strategy = SnapshotStrategy::from_config(
        name,
        resolved.config.strategy.as_deref(),
        resolved.config.updated_at.as_deref(),
        resolved.config.check_cols.as_ref(),
    )?;

    let mut info = node_info(
        ResourceType::Snapshot,
        package,
        name,
        fqn,
        file,
        resolved.config,
        resolved.merged,
    );
    // Per-block provenance: the checksum and raw code cover this block
    // only, so sibling blocks change independently
    info.checksum = compute_checksum(body);
    info.raw_code = body.to_string();

    Ok(ParsedNode {
        node: ResourceNode::Snapshot(SnapshotNode { info, strategy }),
        refs: expansion.refs,
        sources: expansion.sources,
        base_config: base_of(&layers),
        inline_config: expansion.config,
    })
}

#[cfg(test)]
#[path = "snapshot_parser_test.rs"]
mod tests;
