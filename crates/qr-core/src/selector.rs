//! Selection expressions and node-set algebra over the manifest graph.
//!
//! Supports dbt-style selection:
//! - `model_name` - fuzzy name match (exact name, else fqn suffix)
//! - `+node` / `node+` / `+node+` - ancestors / descendants / both
//! - `2+node+1` - depth-bounded ancestors/descendants
//! - `tag:daily`, `path:models/staging/*`, `package:pkg`,
//!   `config.materialized:table`, `source:raw`, `resource_type:model`,
//!   `state:modified` / `state:new` (against a prior manifest)
//!
//! Within one `--select` string, space-separated atoms union and
//! comma-joined atoms intersect. Multiple select strings intersect with
//! each other; exclusion strings are resolved the same way and subtracted
//! after selection. Evaluation is pure: the same manifest and expressions
//! always produce the same set.

use crate::dag::NodeDag;
use crate::error::{CoreError, CoreResult};
use crate::manifest::Manifest;
use crate::node::ResourceType;
use crate::resource::ResourceNode;
use serde_json::Value as JsonValue;
use std::collections::HashSet;

/// State comparison kind for `state:` selectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateType {
    /// Nodes whose semantic contents differ from the prior manifest
    Modified,
    /// Nodes absent from the prior manifest
    New,
}

/// Selection method of one atom
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// Bare name: exact node name, else fqn-suffix match
    FuzzyName,
    Tag,
    Path,
    Package,
    /// `config.<key>:value`
    Config(String),
    Source,
    ResourceType,
    State(StateType),
}

/// Depth bound for a graph operator side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    /// Operator absent
    None,
    /// Bare `+`: unbounded
    Unbounded,
    /// `N+` / `+N`: at most N hops
    Bounded(usize),
}

/// One parsed selection atom: optional ancestor/descendant operators
/// around a method:value pair.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorAtom {
    pub method: Method,
    pub value: String,
    pub ancestors: Depth,
    pub descendants: Depth,
}

impl SelectorAtom {
    /// Parse a single atom, e.g. `2+tag:daily+`.
    pub fn parse(raw: &str) -> CoreResult<Self> {
        let original = raw;
        let (ancestors, rest) = parse_leading_depth(raw, original)?;
        let (descendants, body) = parse_trailing_depth(rest, original)?;

        if body.is_empty() {
            return Err(CoreError::InvalidSelector {
                selector: original.to_string(),
                reason: "selector value cannot be empty".to_string(),
            });
        }

        let (method, value) = match body.split_once(':') {
            None => (Method::FuzzyName, body.to_string()),
            Some((method_name, value)) => {
                if value.is_empty() {
                    return Err(CoreError::InvalidSelector {
                        selector: original.to_string(),
                        reason: format!("{}: selector requires a value", method_name),
                    });
                }
                let method = match method_name {
                    "tag" => Method::Tag,
                    "path" => Method::Path,
                    "package" => Method::Package,
                    "source" => Method::Source,
                    "resource_type" => Method::ResourceType,
                    "state" => match value {
                        "modified" => Method::State(StateType::Modified),
                        "new" => Method::State(StateType::New),
                        other => {
                            return Err(CoreError::InvalidSelector {
                                selector: original.to_string(),
                                reason: format!(
                                    "unknown state type '{}', expected 'modified' or 'new'",
                                    other
                                ),
                            });
                        }
                    },
                    other if other.starts_with("config.") => {
                        let key = other.trim_start_matches("config.");
                        if key.is_empty() {
                            return Err(CoreError::InvalidSelector {
                                selector: original.to_string(),
                                reason: "config. selector requires a key".to_string(),
                            });
                        }
                        Method::Config(key.to_string())
                    }
                    other => {
                        return Err(CoreError::InvalidSelector {
                            selector: original.to_string(),
                            reason: format!("unknown selection method '{}'", other),
                        });
                    }
                };
                (method, value.to_string())
            }
        };

        Ok(Self {
            method,
            value,
            ancestors,
            descendants,
        })
    }

    /// True when evaluation needs a prior manifest
    pub fn requires_state(&self) -> bool {
        matches!(self.method, Method::State(_))
    }
}

/// `N+rest` or `+rest` at the front of an atom
fn parse_leading_depth<'a>(raw: &'a str, original: &str) -> CoreResult<(Depth, &'a str)> {
    let digits: usize = raw.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        if let Some(rest) = raw[digits..].strip_prefix('+') {
            let n = raw[..digits]
                .parse()
                .map_err(|_| CoreError::InvalidSelector {
                    selector: original.to_string(),
                    reason: "invalid depth bound".to_string(),
                })?;
            return Ok((Depth::Bounded(n), rest));
        }
        // Digits without a following '+' are part of the name
        return Ok((Depth::None, raw));
    }
    if let Some(rest) = raw.strip_prefix('+') {
        return Ok((Depth::Unbounded, rest));
    }
    Ok((Depth::None, raw))
}

/// `rest+N` or `rest+` at the end of an atom
fn parse_trailing_depth<'a>(raw: &'a str, original: &str) -> CoreResult<(Depth, &'a str)> {
    let digits: usize = raw
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .count();
    if digits > 0 {
        let split = raw.len() - digits;
        if let Some(rest) = raw[..split].strip_suffix('+') {
            let n = raw[split..]
                .parse()
                .map_err(|_| CoreError::InvalidSelector {
                    selector: original.to_string(),
                    reason: "invalid depth bound".to_string(),
                })?;
            return Ok((Depth::Bounded(n), rest));
        }
        return Ok((Depth::None, raw));
    }
    if let Some(rest) = raw.strip_suffix('+') {
        return Ok((Depth::Unbounded, rest));
    }
    Ok((Depth::None, raw))
}

/// A full selection: select groups intersect, exclude groups subtract.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Each entry is one `--select` string
    pub select: Vec<String>,
    /// Each entry is one `--exclude` string
    pub exclude: Vec<String>,
}

impl Selection {
    pub fn new(select: Vec<String>, exclude: Vec<String>) -> Self {
        Self { select, exclude }
    }

    /// Resolve the selection against a manifest and its graph.
    ///
    /// Returns selected unique ids in topological order. An empty
    /// `select` means everything. Pure: no side effects, deterministic.
    pub fn resolve(
        &self,
        manifest: &Manifest,
        dag: &NodeDag,
        prior: Option<&Manifest>,
    ) -> CoreResult<Vec<String>> {
        let mut selected: Option<HashSet<String>> = None;

        if self.select.is_empty() {
            selected = Some(all_selectable(manifest));
        }

        for expr in &self.select {
            let group = eval_expression(expr, manifest, dag, prior, true)?;
            selected = Some(match selected {
                None => group,
                Some(acc) => acc.intersection(&group).cloned().collect(),
            });
        }

        let mut result = selected.unwrap_or_default();

        // A name that matches nothing is an error when selecting, but in
        // the exclude position it just subtracts the empty set
        for expr in &self.exclude {
            let excluded = eval_expression(expr, manifest, dag, prior, false)?;
            result.retain(|id| !excluded.contains(id));
        }

        if result.is_empty() && !self.select.is_empty() {
            log::warn!(
                "selection '{}' matched no nodes",
                self.select.join(" ")
            );
        }

        // Topological order, like every downstream consumer expects
        let order = dag.topological_order()?;
        let mut ordered: Vec<String> = order.into_iter().filter(|id| result.contains(id)).collect();
        // Ids outside the DAG (no edges registered) keep a sorted tail
        let mut tail: Vec<String> = result
            .iter()
            .filter(|id| !dag.contains(id))
            .cloned()
            .collect();
        tail.sort_unstable();
        ordered.extend(tail);
        Ok(ordered)
    }
}

/// Evaluate one select/exclude string: union over space-separated tokens,
/// intersection within comma-joined atoms of a token.
fn eval_expression(
    expr: &str,
    manifest: &Manifest,
    dag: &NodeDag,
    prior: Option<&Manifest>,
    strict: bool,
) -> CoreResult<HashSet<String>> {
    let mut union: HashSet<String> = HashSet::new();
    let mut saw_token = false;

    for token in expr.split_whitespace() {
        saw_token = true;
        let mut intersection: Option<HashSet<String>> = None;
        for part in token.split(',') {
            let atom = SelectorAtom::parse(part)?;
            let set = eval_atom(&atom, manifest, dag, prior, strict)?;
            intersection = Some(match intersection {
                None => set,
                Some(acc) => acc.intersection(&set).cloned().collect(),
            });
        }
        union.extend(intersection.unwrap_or_default());
    }

    if !saw_token {
        return Err(CoreError::InvalidSelector {
            selector: expr.to_string(),
            reason: "empty selection expression".to_string(),
        });
    }

    Ok(union)
}

/// Evaluate one atom: match the base set, then expand graph operators.
fn eval_atom(
    atom: &SelectorAtom,
    manifest: &Manifest,
    dag: &NodeDag,
    prior: Option<&Manifest>,
    strict: bool,
) -> CoreResult<HashSet<String>> {
    let base = match_atom(atom, manifest, prior, strict)?;

    let mut result = base.clone();
    for id in &base {
        match atom.ancestors {
            Depth::None => {}
            Depth::Unbounded => result.extend(dag.ancestors(id)),
            Depth::Bounded(n) => result.extend(dag.ancestors_bounded(id, n)),
        }
        match atom.descendants {
            Depth::None => {}
            Depth::Unbounded => result.extend(dag.descendants(id)),
            Depth::Bounded(n) => result.extend(dag.descendants_bounded(id, n)),
        }
    }

    Ok(result)
}

/// Every id a bare selection covers: nodes, sources, exposures, metrics.
fn all_selectable(manifest: &Manifest) -> HashSet<String> {
    let mut set: HashSet<String> = manifest.nodes.keys().cloned().collect();
    set.extend(manifest.sources.keys().cloned());
    set.extend(manifest.exposures.keys().cloned());
    set.extend(manifest.metrics.keys().cloned());
    set
}

fn match_atom(
    atom: &SelectorAtom,
    manifest: &Manifest,
    prior: Option<&Manifest>,
    strict: bool,
) -> CoreResult<HashSet<String>> {
    let mut matched = HashSet::new();

    match &atom.method {
        Method::FuzzyName => {
            for (id, node) in &manifest.nodes {
                if node.name() == atom.value {
                    matched.insert(id.clone());
                }
            }
            if matched.is_empty() {
                // Fall back to fqn-suffix matching (`staging.stg_orders`)
                let segments: Vec<&str> = atom.value.split('.').collect();
                for (id, node) in &manifest.nodes {
                    if node.fqn().len() >= segments.len()
                        && node.fqn()[node.fqn().len() - segments.len()..]
                            .iter()
                            .map(String::as_str)
                            .eq(segments.iter().copied())
                    {
                        matched.insert(id.clone());
                    }
                }
            }
            if matched.is_empty() {
                if strict {
                    return Err(CoreError::SelectorNoMatch {
                        selector: atom.value.clone(),
                    });
                }
                log::warn!("exclude selector '{}' matched no nodes", atom.value);
            }
        }
        Method::Tag => {
            for (id, node) in &manifest.nodes {
                if node.tags().contains(&atom.value) {
                    matched.insert(id.clone());
                }
            }
            for (id, source) in &manifest.sources {
                if source.tags.contains(&atom.value) {
                    matched.insert(id.clone());
                }
            }
        }
        Method::Path => {
            for (id, node) in &manifest.nodes {
                if matches_path_pattern(&node.info().original_file_path, &atom.value) {
                    matched.insert(id.clone());
                }
            }
            for (id, source) in &manifest.sources {
                if matches_path_pattern(&source.original_file_path, &atom.value) {
                    matched.insert(id.clone());
                }
            }
        }
        Method::Package => {
            for (id, node) in &manifest.nodes {
                if node.package_name() == atom.value {
                    matched.insert(id.clone());
                }
            }
            for (id, source) in &manifest.sources {
                if source.package_name == atom.value {
                    matched.insert(id.clone());
                }
            }
        }
        Method::Config(key) => {
            for (id, node) in &manifest.nodes {
                if config_value_matches(node, key, &atom.value) {
                    matched.insert(id.clone());
                }
            }
        }
        Method::Source => {
            // `source:raw`, `source:raw.orders`, or `source:*`
            for (id, source) in &manifest.sources {
                let full = format!("{}.{}", source.source_name, source.name);
                if atom.value == "*" || source.source_name == atom.value || full == atom.value {
                    matched.insert(id.clone());
                }
            }
        }
        Method::ResourceType => {
            for (id, node) in &manifest.nodes {
                if matches_resource_type(node.resource_type(), &atom.value) {
                    matched.insert(id.clone());
                }
            }
            if atom.value == "source" {
                matched.extend(manifest.sources.keys().cloned());
            }
        }
        Method::State(state_type) => {
            let prior = prior.ok_or_else(|| CoreError::InvalidSelector {
                selector: format!("state:{}", atom.value),
                reason: "state: selector requires a prior manifest".to_string(),
            })?;
            let adapter = manifest.adapter_type();
            for (id, node) in &manifest.nodes {
                let hit = match state_type {
                    StateType::New => !prior.nodes.contains_key(id),
                    StateType::Modified => match prior.nodes.get(id) {
                        Some(prev) => !node.same_contents(prev, adapter),
                        None => true,
                    },
                };
                if hit {
                    matched.insert(id.clone());
                }
            }
        }
    }

    Ok(matched)
}

/// Compare a config value against the selector's string rendering.
fn config_value_matches(node: &ResourceNode, key: &str, expected: &str) -> bool {
    let Ok(JsonValue::Object(map)) = serde_json::to_value(node.config()) else {
        return false;
    };
    match map.get(key) {
        Some(JsonValue::String(s)) => s == expected,
        Some(JsonValue::Array(items)) => items
            .iter()
            .any(|v| matches!(v, JsonValue::String(s) if s == expected)),
        Some(other) => other.to_string() == expected,
        None => false,
    }
}

fn matches_resource_type(rt: ResourceType, value: &str) -> bool {
    match value {
        "model" => rt == ResourceType::Model,
        "seed" => rt == ResourceType::Seed,
        "snapshot" => rt == ResourceType::Snapshot,
        "analysis" => rt == ResourceType::Analysis,
        "test" => rt == ResourceType::GenericTest || rt == ResourceType::SingularTest,
        "operation" => rt == ResourceType::Operation,
        _ => false,
    }
}

/// Glob-like path matching: `*` matches within a segment run, `**` spans
/// directories.
fn matches_path_pattern(path: &str, pattern: &str) -> bool {
    if pattern.contains("**") {
        let parts: Vec<&str> = pattern.split("**").collect();
        if parts.len() == 2 {
            let prefix = parts[0].trim_end_matches('/');
            let suffix = parts[1].trim_start_matches('/');

            let matches_prefix = prefix.is_empty() || path.contains(prefix);
            let matches_suffix = suffix.is_empty()
                || suffix == "*"
                || path.ends_with(suffix)
                || (suffix.starts_with("*.") && {
                    let ext = suffix.trim_start_matches("*.");
                    path.ends_with(&format!(".{}", ext))
                });

            return matches_prefix && matches_suffix;
        }
    }

    if pattern.contains('*') {
        let parts: Vec<&str> = pattern.split('*').collect();
        if parts.len() == 2 {
            let prefix = parts[0];
            let suffix = parts[1];

            let matches_prefix = prefix.is_empty() || path.contains(prefix);
            let matches_suffix = suffix.is_empty() || path.ends_with(suffix);

            return matches_prefix && matches_suffix;
        }
    }

    path.contains(pattern)
}

/// Convenience entry point: resolve select/exclude strings in one call.
pub fn select(
    manifest: &Manifest,
    dag: &NodeDag,
    select: &[String],
    exclude: &[String],
    prior: Option<&Manifest>,
) -> CoreResult<Vec<String>> {
    Selection::new(select.to_vec(), exclude.to_vec()).resolve(manifest, dag, prior)
}

#[cfg(test)]
#[path = "selector_test.rs"]
mod tests;
