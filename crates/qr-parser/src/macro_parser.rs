//! Macro parsing: `{% macro name(...) %}` block extraction.
//!
//! One file may define several macros; each becomes its own node. Macros
//! declared with a `test_` name prefix are generic test definitions,
//! invoked from YAML `tests:` entries by their short name.

use crate::files::DiscoveredFile;
use qr_core::error::CoreResult;
use qr_core::macro_node::MacroNode;
use qr_core::node::{unique_id, ResourceType};
use std::sync::OnceLock;

fn macro_block_re() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(
            r"(?s)\{%-?\s*macro\s+([a-zA-Z_][a-zA-Z0-9_]*)\s*\(.*?\{%-?\s*endmacro\s*-?%\}",
        )
        .unwrap()
    })
}

fn call_re() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"([a-zA-Z_][a-zA-Z0-9_]*)\s*\(").unwrap())
}

/// Parse every macro block in a file. `depends_on_macros` is left empty
/// here; the builder fills it once all packages' macro names are known.
pub fn parse_macros(package: &str, file: &DiscoveredFile) -> CoreResult<Vec<MacroNode>> {
    let macros = macro_block_re()
        .captures_iter(&file.contents)
        .map(|caps| {
            let name = caps[1].to_string();
            MacroNode {
                unique_id: unique_id(ResourceType::Macro, package, &name),
                name,
                package_name: package.to_string(),
                path: file.relative_path.clone(),
                original_file_path: file.original_file_path.clone(),
                macro_sql: caps[0].to_string(),
                description: None,
                depends_on_macros: Vec::new(),
                created_at: chrono::Utc::now(),
            }
        })
        .collect();
    Ok(macros)
}

/// Candidate callee names appearing as `name(` in a template body.
///
/// Over-approximates: the caller intersects the result with the set of
/// known macro names.
pub fn called_names(body: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in call_re().captures_iter(body) {
        let name = caps[1].to_string();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}
