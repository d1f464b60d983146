use super::*;
use crate::files::DiscoveredFile;
use qr_core::checksum::compute_checksum;
use qr_jinja::TemplateEngine;
use serde_json::json;
use std::path::PathBuf;

fn file(rel: &str, contents: &str) -> DiscoveredFile {
    DiscoveredFile {
        absolute_path: PathBuf::from(format!("/proj/models/{rel}")),
        relative_path: rel.to_string(),
        original_file_path: format!("models/{rel}"),
        contents: contents.to_string(),
        checksum: compute_checksum(contents),
    }
}

fn project(yaml: &str) -> ProjectConfig {
    ProjectConfig::from_yaml_str(yaml, "quarry_project.yml").unwrap()
}

const PROJECT: &str = r#"
name: shop
models:
  shop:
    staging:
      +materialized: view
      +tags: ["staging"]
    marts:
      +materialized: table
"#;

#[test]
fn test_parse_model_basics() {
    let project = project(PROJECT);
    let engine = TemplateEngine::default();
    let mut expander = Expander::new(&engine);

    let f = file("staging/stg_orders.sql", "select * from {{ ref('raw_orders') }}");
    let parsed = parse_model("shop", &project, &project, &f, &mut expander).unwrap();

    assert_eq!(parsed.node.unique_id(), "model.shop.stg_orders");
    assert_eq!(parsed.node.fqn(), ["shop", "staging", "stg_orders"]);
    assert_eq!(parsed.refs.len(), 1);
    assert_eq!(parsed.refs[0].name, "raw_orders");
    // Dependency edges are not resolved at parse time
    assert!(parsed.node.depends_on().nodes.is_empty());
}

#[test]
fn test_project_tree_config_applies_by_path() {
    let project = project(PROJECT);
    let engine = TemplateEngine::default();
    let mut expander = Expander::new(&engine);

    let staging = parse_model(
        "shop",
        &project,
        &project,
        &file("staging/stg_orders.sql", "select 1"),
        &mut expander,
    )
    .unwrap();
    assert_eq!(staging.node.config().materialized.as_deref(), Some("view"));
    assert_eq!(staging.node.tags(), ["staging"]);

    let mart = parse_model(
        "shop",
        &project,
        &project,
        &file("marts/fct_orders.sql", "select 1"),
        &mut expander,
    )
    .unwrap();
    assert_eq!(mart.node.config().materialized.as_deref(), Some("table"));
}

#[test]
fn test_inline_config_beats_project_tree() {
    let project = project(PROJECT);
    let engine = TemplateEngine::default();
    let mut expander = Expander::new(&engine);

    let f = file(
        "staging/stg_special.sql",
        "{{ config(materialized='incremental', unique_key='id') }}select 1",
    );
    let parsed = parse_model("shop", &project, &project, &f, &mut expander).unwrap();
    let config = parsed.node.config();
    assert_eq!(config.materialized.as_deref(), Some("incremental"));
    assert_eq!(config.unique_key.as_deref(), Some("id"));
    assert_eq!(
        parsed.node.info().unrendered_config.get("materialized"),
        Some(&json!("incremental"))
    );
}

#[test]
fn test_materialized_defaults_to_view() {
    let project = project("name: shop");
    let engine = TemplateEngine::default();
    let mut expander = Expander::new(&engine);

    let parsed = parse_model(
        "shop",
        &project,
        &project,
        &file("orders.sql", "select 1"),
        &mut expander,
    )
    .unwrap();
    assert_eq!(parsed.node.config().materialized.as_deref(), Some("view"));
}

#[test]
fn test_template_error_carries_path() {
    let project = project("name: shop");
    let engine = TemplateEngine::default();
    let mut expander = Expander::new(&engine);

    let err = parse_model(
        "shop",
        &project,
        &project,
        &file("broken.sql", "{% if %}"),
        &mut expander,
    )
    .unwrap_err();
    assert!(err.to_string().contains("models/broken.sql"));
}

#[test]
fn test_analysis_fqn_has_analysis_segment() {
    let project = project("name: shop");
    let engine = TemplateEngine::default();
    let mut expander = Expander::new(&engine);

    let f = DiscoveredFile {
        absolute_path: PathBuf::from("/proj/analyses/revenue.sql"),
        relative_path: "revenue.sql".to_string(),
        original_file_path: "analyses/revenue.sql".to_string(),
        contents: "select * from {{ ref('fct_orders') }}".to_string(),
        checksum: compute_checksum("select * from {{ ref('fct_orders') }}"),
    };
    let parsed = parse_analysis("shop", &project, &project, &f, &mut expander).unwrap();
    assert_eq!(parsed.node.unique_id(), "analysis.shop.revenue");
    assert_eq!(parsed.node.fqn(), ["shop", "analysis", "revenue"]);
}

#[test]
fn test_singular_test_parse() {
    let project = project("name: shop");
    let engine = TemplateEngine::default();
    let mut expander = Expander::new(&engine);

    let f = DiscoveredFile {
        absolute_path: PathBuf::from("/proj/tests/no_negative_amounts.sql"),
        relative_path: "no_negative_amounts.sql".to_string(),
        original_file_path: "tests/no_negative_amounts.sql".to_string(),
        contents: "select * from {{ ref('fct_orders') }} where amount < 0".to_string(),
        checksum: compute_checksum("x"),
    };
    let parsed = parse_singular_test("shop", &project, &project, &f, &mut expander).unwrap();
    assert_eq!(parsed.node.unique_id(), "test.shop.no_negative_amounts");
    assert_eq!(parsed.refs[0].name, "fct_orders");
}
