//! Intermediate parse output handed to the manifest builder.
//!
//! Parsers record what a file *said* (raw ref/source calls); turning those
//! calls into `depends_on` edges needs the full node index and happens in
//! the builder, after every package has been parsed.

use qr_core::config_resolver::{ConfigLayer, LayerSource};
use qr_core::error::CoreError;
use qr_core::project::{tree_config, ProjectConfig};
use qr_core::resource::ResourceNode;
use qr_jinja::error::JinjaError;
use qr_jinja::{RefCall, SourceCall};
use serde_json::{Map as JsonMap, Value as JsonValue};

/// One parsed node plus the unresolved calls its template made.
///
/// The two config maps let the builder re-resolve config once YAML patches
/// arrive: a patch layer sits above the project tree but below the inline
/// `config()` call.
#[derive(Debug, Clone)]
pub struct ParsedNode {
    pub node: ResourceNode,

    /// `ref()` calls in first-call order
    pub refs: Vec<RefCall>,

    /// `source()` calls in first-call order
    pub sources: Vec<SourceCall>,

    /// Merged defaults below the patch layer (global + project tree)
    pub base_config: JsonMap<String, JsonValue>,

    /// Exactly what the inline `config()` call set
    pub inline_config: JsonMap<String, JsonValue>,
}

impl ParsedNode {
    /// A node with no template calls (seeds, operations)
    pub fn plain(node: ResourceNode, base_config: JsonMap<String, JsonValue>) -> Self {
        Self {
            node,
            refs: Vec::new(),
            sources: Vec::new(),
            base_config,
            inline_config: JsonMap::new(),
        }
    }
}

/// Build the standard config layer stack for a resource file: built-in
/// defaults, the owning package's tree, the root project's tree scoped by
/// fqn, and the inline `config()` call. YAML patch layers are applied later
/// by the builder.
///
/// For the root project's own files the package and root trees are the same
/// map, so the package layer is skipped rather than applied twice (additive
/// keys like tags and hooks would otherwise double up).
pub fn standard_layers(
    package: &ProjectConfig,
    root: &ProjectConfig,
    tree_key: &str,
    fqn: &[String],
    global: JsonMap<String, JsonValue>,
    inline: JsonMap<String, JsonValue>,
) -> Vec<ConfigLayer> {
    let mut layers = vec![ConfigLayer::new(LayerSource::GlobalDefaults, global)];
    if package.name != root.name {
        layers.push(ConfigLayer::new(
            LayerSource::PackageDefaults,
            tree_config(package.tree_for(tree_key), fqn),
        ));
    }
    layers.push(ConfigLayer::new(
        LayerSource::ProjectDefaults,
        tree_config(root.tree_for(tree_key), fqn),
    ));
    layers.push(ConfigLayer::new(LayerSource::InlineCall, inline));
    layers
}

/// The merged config below the inline layer, kept for later patch
/// re-resolution.
pub fn base_of(layers: &[ConfigLayer]) -> JsonMap<String, JsonValue> {
    let below_inline: Vec<ConfigLayer> = layers
        .iter()
        .filter(|l| l.source != LayerSource::InlineCall)
        .cloned()
        .collect();
    qr_core::config_resolver::merge_layers(&below_inline)
}

/// Map a template failure to a compilation error carrying the file path.
pub fn template_error(path: &str, err: JinjaError) -> CoreError {
    match err {
        JinjaError::RenderError { path, message } => CoreError::TemplateRender { path, message },
        other => CoreError::TemplateRender {
            path: path.to_string(),
            message: other.to_string(),
        },
    }
}
