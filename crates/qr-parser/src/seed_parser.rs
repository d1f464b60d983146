//! Seed parsing. Seeds are CSV files with no template to expand; their
//! node carries the raw-content checksum and an always-empty dependency
//! list.

use crate::files::DiscoveredFile;
use crate::model_parser::node_info;
use crate::parsed::{base_of, standard_layers, ParsedNode};
use qr_core::config_resolver::resolve_config;
use qr_core::error::CoreResult;
use qr_core::node::ResourceType;
use qr_core::project::ProjectConfig;
use qr_core::resource::ResourceNode;
use qr_core::seed::SeedNode;
use serde_json::{json, Map as JsonMap};
use std::collections::BTreeMap;
use std::path::Path;

pub fn parse_seed(
    package: &str,
    project: &ProjectConfig,
    root: &ProjectConfig,
    project_root: &Path,
    file: &DiscoveredFile,
) -> CoreResult<ParsedNode> {
    let mut fqn = vec![package.to_string()];
    fqn.extend(file.fqn_components());

    let mut global = JsonMap::new();
    global.insert("materialized".to_string(), json!("seed"));
    let layers = standard_layers(project, root, "seeds", &fqn, global, JsonMap::new());
    let resolved = resolve_config(&layers, &file.original_file_path)?;

    let mut info = node_info(
        ResourceType::Seed,
        package,
        file.stem(),
        fqn,
        file,
        resolved.config,
        resolved.merged,
    );
    // CSV content is data, not code
    info.raw_code = String::new();

    Ok(ParsedNode::plain(
        ResourceNode::Seed(SeedNode {
            info,
            columns: BTreeMap::new(),
            root_path: Some(project_root.display().to_string()),
        }),
        base_of(&layers),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use qr_core::checksum::compute_checksum;
    use std::path::PathBuf;

    fn csv_file(rel: &str, contents: &str) -> DiscoveredFile {
        DiscoveredFile {
            absolute_path: PathBuf::from(format!("/proj/seeds/{rel}")),
            relative_path: rel.to_string(),
            original_file_path: format!("seeds/{rel}"),
            contents: contents.to_string(),
            checksum: compute_checksum(contents),
        }
    }

    #[test]
    fn test_parse_seed() {
        let project = ProjectConfig::from_yaml_str(
            "name: shop\nseeds:\n  shop:\n    +quote_columns: true",
            "quarry_project.yml",
        )
        .unwrap();
        let file = csv_file("country_codes.csv", "code,name\nus,United States\n");

        let parsed = parse_seed("shop", &project, &project, Path::new("/proj"), &file).unwrap();
        assert_eq!(parsed.node.unique_id(), "seed.shop.country_codes");
        assert_eq!(parsed.node.config().quote_columns, Some(true));
        assert_eq!(parsed.node.config().materialized.as_deref(), Some("seed"));
        assert!(parsed.refs.is_empty());
        assert!(parsed.node.info().raw_code.is_empty());
        assert_eq!(parsed.node.info().checksum, file.checksum);
    }
}
