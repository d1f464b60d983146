//! Layered config merging with defined precedence.
//!
//! Layers are merged lowest-to-highest: global defaults, project/package
//! defaults scoped by resource type and path prefix, YAML schema patches,
//! and finally the inline `config()` call. Per-field behavior:
//!
//! - **mergeable** dict fields (`meta`, `persist_docs`, `grants`,
//!   `column_types`) merge key-by-key, higher layer winning per key;
//! - **additive** list fields (`tags`, `pre_hook`, `post_hook`) concatenate
//!   in layer order (`tags` deduped); an explicit `null` at a higher layer
//!   clears what lower layers accumulated, and the `{replace: [...]}`
//!   sentinel hard-replaces instead of appending;
//! - every other field is whole-value replaced by the higher layer.

use crate::config::NodeConfig;
use crate::error::CoreResult;
use serde_json::{Map as JsonMap, Value as JsonValue};

/// Where a config layer came from, lowest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LayerSource {
    /// Built-in defaults for the resource kind
    GlobalDefaults,
    /// Dependency-package `models:`/`seeds:`/... tree defaults
    PackageDefaults,
    /// Root-project tree config scoped by resource type and path
    ProjectDefaults,
    /// `config:` block in a YAML patch for this specific resource
    YamlPatch,
    /// Inline `config(...)` call in the resource file
    InlineCall,
}

/// One precedence layer of raw config values.
#[derive(Debug, Clone)]
pub struct ConfigLayer {
    /// Precedence class of this layer
    pub source: LayerSource,
    /// Raw key/value mapping contributed by this layer
    pub values: JsonMap<String, JsonValue>,
}

impl ConfigLayer {
    /// Create a layer from a raw mapping
    pub fn new(source: LayerSource, values: JsonMap<String, JsonValue>) -> Self {
        Self { source, values }
    }

    /// Create an empty layer
    pub fn empty(source: LayerSource) -> Self {
        Self {
            source,
            values: JsonMap::new(),
        }
    }
}

/// Dict-valued fields merged key-by-key across layers
const MERGEABLE_KEYS: &[&str] = &["meta", "persist_docs", "grants", "column_types"];

/// List-valued fields that append across layers instead of replacing
const ADDITIVE_KEYS: &[&str] = &["tags", "pre_hook", "post_hook"];

/// Result of resolving all config layers for one resource.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The typed effective config
    pub config: NodeConfig,
    /// The merged raw mapping the typed config was built from
    pub merged: JsonMap<String, JsonValue>,
    /// Exactly the keys the user set via the inline `config()` call
    pub config_call_dict: JsonMap<String, JsonValue>,
    /// The inline call keys as written before template rendering
    pub unrendered_config_call_dict: JsonMap<String, JsonValue>,
}

/// Merge config layers (lowest to highest precedence) and build the typed
/// effective config. `path` is used for error context only.
pub fn resolve_config(layers: &[ConfigLayer], path: &str) -> CoreResult<ResolvedConfig> {
    let merged = merge_layers(layers);
    let config = NodeConfig::from_merged(&merged, path)?;

    let inline = layers
        .iter()
        .filter(|l| l.source == LayerSource::InlineCall)
        .fold(JsonMap::new(), |mut acc, l| {
            acc.extend(l.values.clone());
            acc
        });

    Ok(ResolvedConfig {
        config,
        merged,
        config_call_dict: inline.clone(),
        unrendered_config_call_dict: inline,
    })
}

/// Merge raw layers into one mapping according to the per-field rules.
pub fn merge_layers(layers: &[ConfigLayer]) -> JsonMap<String, JsonValue> {
    let mut merged = JsonMap::new();
    for layer in layers {
        for (key, value) in &layer.values {
            merge_key(&mut merged, key, value);
        }
    }
    merged
}

pub(crate) fn merge_key(merged: &mut JsonMap<String, JsonValue>, key: &str, value: &JsonValue) {
    if ADDITIVE_KEYS.contains(&key) {
        merge_additive(merged, key, value);
    } else if MERGEABLE_KEYS.contains(&key) {
        merge_mergeable(merged, key, value);
    } else {
        merged.insert(key.to_string(), value.clone());
    }
}

/// Additive list fields: append across layers; `null` clears; the
/// `{replace: [...]}` sentinel hard-replaces.
fn merge_additive(merged: &mut JsonMap<String, JsonValue>, key: &str, value: &JsonValue) {
    if value.is_null() {
        merged.remove(key);
        return;
    }

    if let Some(replacement) = clobber_sentinel(value) {
        merged.insert(key.to_string(), replacement.clone());
        return;
    }

    let mut combined: Vec<JsonValue> = match merged.get(key) {
        Some(JsonValue::Array(existing)) => existing.clone(),
        Some(other) => vec![other.clone()],
        None => Vec::new(),
    };
    match value {
        JsonValue::Array(items) => combined.extend(items.iter().cloned()),
        scalar => combined.push(scalar.clone()),
    }
    if key == "tags" {
        let mut seen = std::collections::HashSet::new();
        combined.retain(|v| seen.insert(v.to_string()));
    }
    merged.insert(key.to_string(), JsonValue::Array(combined));
}

/// Dict fields: merge key-by-key, higher layer winning per key.
fn merge_mergeable(merged: &mut JsonMap<String, JsonValue>, key: &str, value: &JsonValue) {
    let JsonValue::Object(incoming) = value else {
        merged.insert(key.to_string(), value.clone());
        return;
    };
    let mut combined = match merged.get(key) {
        Some(JsonValue::Object(existing)) => existing.clone(),
        _ => JsonMap::new(),
    };
    for (k, v) in incoming {
        combined.insert(k.clone(), v.clone());
    }
    merged.insert(key.to_string(), JsonValue::Object(combined));
}

/// Detect the `{replace: [...]}` clobber form on an additive field.
fn clobber_sentinel(value: &JsonValue) -> Option<&JsonValue> {
    let JsonValue::Object(map) = value else {
        return None;
    };
    if map.len() == 1 {
        map.get("replace")
    } else {
        None
    }
}

#[cfg(test)]
#[path = "config_resolver_test.rs"]
mod tests;
