//! Static dependency extraction with render fallback.
//!
//! Most model files only contain literal `{{ ref('...') }}` and
//! `{{ source('...', '...') }}` calls, which a regex scan can extract
//! without spinning up the template engine. The [`Expander`] uses the scan
//! when a file qualifies and verifies the first few scans of each pass
//! against a full render; any disagreement turns the fast path off for the
//! rest of the pass.

use crate::calls::{RefCall, SourceCall};
use crate::environment::TemplateEngine;
use crate::error::JinjaResult;
use regex::Regex;
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::sync::OnceLock;

/// Scans verified against a full render before the fast path runs unchecked
const VERIFY_SAMPLE: usize = 5;

fn ref_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"\{\{\s*ref\(\s*['"]([^'"]+)['"]\s*(?:,\s*['"]([^'"]+)['"]\s*)?\)\s*\}\}"#,
        )
        .unwrap()
    })
}

fn source_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"\{\{\s*source\(\s*['"]([^'"]+)['"]\s*,\s*['"]([^'"]+)['"]\s*\)\s*\}\}"#,
        )
        .unwrap()
    })
}

/// The dependency-relevant outcome of expanding one template
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expansion {
    pub refs: Vec<RefCall>,
    pub sources: Vec<SourceCall>,
    /// Inline config() kwargs, merged in call order. Always empty on the
    /// fast path since config() disqualifies a file from scanning.
    pub config: JsonMap<String, JsonValue>,
    pub used_fast_path: bool,
}

/// True when a regex scan is guaranteed to see everything a render would.
///
/// Any statement block, comment block, or expression other than a literal
/// ref/source call disqualifies the template.
pub fn is_statically_extractable(template: &str) -> bool {
    if template.contains("{%") || template.contains("{#") {
        return false;
    }

    // Every `{{` must open a literal ref() or source() call
    let mut spans: Vec<(usize, usize)> = ref_re()
        .find_iter(template)
        .chain(source_re().find_iter(template))
        .map(|m| (m.start(), m.end()))
        .collect();
    spans.sort_unstable();

    let mut search_from = 0;
    while let Some(offset) = template[search_from..].find("{{") {
        let start = search_from + offset;
        match spans.iter().find(|(s, _)| *s == start) {
            Some((_, end)) => search_from = *end,
            None => return false,
        }
    }
    true
}

fn scan(template: &str) -> (Vec<RefCall>, Vec<SourceCall>) {
    let refs = ref_re()
        .captures_iter(template)
        .map(|caps| match caps.get(2) {
            // Two string args means ref('package', 'name')
            Some(name) => RefCall {
                name: name.as_str().to_string(),
                package: Some(caps[1].to_string()),
                version: None,
            },
            None => RefCall {
                name: caps[1].to_string(),
                package: None,
                version: None,
            },
        })
        .collect();

    let sources = source_re()
        .captures_iter(template)
        .map(|caps| SourceCall {
            source_name: caps[1].to_string(),
            table_name: caps[2].to_string(),
        })
        .collect();

    (refs, sources)
}

/// Expands templates for one parse pass, preferring the static scan.
pub struct Expander<'e, 'a> {
    engine: &'e TemplateEngine<'a>,
    fast_path_enabled: bool,
    verified: usize,
}

impl<'e, 'a> Expander<'e, 'a> {
    pub fn new(engine: &'e TemplateEngine<'a>) -> Self {
        // User macros shadowing builtins mean the scan's assumptions about
        // what ref/source do no longer hold
        let fast_path_enabled = engine.shadowed_builtins().is_empty();
        Self {
            engine,
            fast_path_enabled,
            verified: 0,
        }
    }

    /// Extract refs, sources, and inline config from one template body.
    pub fn expand(&mut self, template: &str, path: &str) -> JinjaResult<Expansion> {
        if !self.fast_path_enabled || !is_statically_extractable(template) {
            return self.full_render(template, path);
        }

        let (refs, sources) = scan(template);

        if self.verified < VERIFY_SAMPLE {
            let rendered = self.full_render(template, path)?;
            if rendered.refs != refs || rendered.sources != sources {
                log::warn!(
                    "static scan of {} disagrees with render, disabling fast path for this pass",
                    path
                );
                self.fast_path_enabled = false;
                return Ok(rendered);
            }
            self.verified += 1;
        }

        Ok(Expansion {
            refs,
            sources,
            config: JsonMap::new(),
            used_fast_path: true,
        })
    }

    fn full_render(&self, template: &str, path: &str) -> JinjaResult<Expansion> {
        let (_, log) = self.engine.render(template, path)?;
        Ok(Expansion {
            refs: log.refs().into_iter().cloned().collect(),
            sources: log.sources().into_iter().cloned().collect(),
            config: log.config_dict(),
            used_fast_path: false,
        })
    }
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
