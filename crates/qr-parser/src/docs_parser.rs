//! Doc-block parsing: `{% docs name %}...{% enddocs %}` markdown files.

use crate::files::DiscoveredFile;
use qr_core::docs::DocBlock;
use qr_core::error::CoreResult;
use qr_core::node::{unique_id, ResourceType};
use std::sync::OnceLock;

fn docs_block_re() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(
            r"(?s)\{%-?\s*docs\s+([a-zA-Z_][a-zA-Z0-9_]*)\s*-?%\}(.*?)\{%-?\s*enddocs\s*-?%\}",
        )
        .unwrap()
    })
}

/// Parse every doc block in a markdown file.
pub fn parse_docs(package: &str, file: &DiscoveredFile) -> CoreResult<Vec<DocBlock>> {
    let docs = docs_block_re()
        .captures_iter(&file.contents)
        .map(|caps| {
            let name = caps[1].to_string();
            DocBlock {
                unique_id: unique_id(ResourceType::Doc, package, &name),
                name,
                package_name: package.to_string(),
                path: file.relative_path.clone(),
                original_file_path: file.original_file_path.clone(),
                block_contents: caps[2].trim().to_string(),
                created_at: chrono::Utc::now(),
            }
        })
        .collect();
    Ok(docs)
}
