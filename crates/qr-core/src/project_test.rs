use super::*;
use serde_json::json;

const BASIC_PROJECT: &str = r#"
name: jaffle_shop
version: "1.0.0"
profile: jaffle_shop
model-paths: ["models"]
seed-paths: ["data"]
vars:
  start_date: "2020-01-01"
  events:
    schema_override: events_raw
on-run-start: "create schema if not exists audit"
models:
  +materialized: view
  jaffle_shop:
    staging:
      +materialized: view
      +tags: ["staging"]
    marts:
      +materialized: table
"#;

#[test]
fn test_parse_project_file() {
    let project = ProjectConfig::from_yaml_str(BASIC_PROJECT, "quarry_project.yml").unwrap();
    assert_eq!(project.name, "jaffle_shop");
    assert_eq!(project.version.as_deref(), Some("1.0.0"));
    assert_eq!(project.seed_paths, vec!["data"]);
    // Unset paths fall back to defaults
    assert_eq!(project.snapshot_paths, vec!["snapshots"]);
    assert_eq!(
        project.on_run_start.to_vec(),
        vec!["create schema if not exists audit"]
    );
}

#[test]
fn test_project_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = ProjectConfig::load(dir.path()).unwrap_err();
    assert!(matches!(err, CoreError::ProjectNotFound { .. }));
}

#[test]
fn test_project_load_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(PROJECT_FILE), BASIC_PROJECT).unwrap();
    let project = ProjectConfig::load(dir.path()).unwrap();
    assert_eq!(project.name, "jaffle_shop");
}

#[test]
fn test_invalid_yaml_is_a_project_error() {
    let err = ProjectConfig::from_yaml_str("name: [unclosed", "quarry_project.yml").unwrap_err();
    assert!(matches!(err, CoreError::ProjectInvalid { .. }));
}

#[test]
fn test_missing_name_is_a_project_error() {
    let err = ProjectConfig::from_yaml_str("version: \"1\"", "quarry_project.yml").unwrap_err();
    assert!(matches!(err, CoreError::ProjectInvalid { .. }));
}

#[test]
fn test_var_lookup_package_scope_first() {
    let project = ProjectConfig::from_yaml_str(BASIC_PROJECT, "quarry_project.yml").unwrap();
    assert_eq!(
        project.var("start_date", "jaffle_shop"),
        Some(&json!("2020-01-01"))
    );
    // `events` is a package scope, not a flat var
    assert_eq!(
        project.var("schema_override", "events"),
        Some(&json!("events_raw"))
    );
    assert_eq!(project.var("schema_override", "jaffle_shop"), None);
}

#[test]
fn test_tree_config_descends_scopes() {
    let project = ProjectConfig::from_yaml_str(BASIC_PROJECT, "quarry_project.yml").unwrap();
    let components = vec![
        "jaffle_shop".to_string(),
        "staging".to_string(),
        "stg_orders".to_string(),
    ];
    let config = tree_config(&project.models, &components);
    assert_eq!(config.get("materialized"), Some(&json!("view")));
    assert_eq!(config.get("tags"), Some(&json!(["staging"])));
}

#[test]
fn test_tree_config_deeper_scope_wins() {
    let project = ProjectConfig::from_yaml_str(BASIC_PROJECT, "quarry_project.yml").unwrap();
    let components = vec![
        "jaffle_shop".to_string(),
        "marts".to_string(),
        "fct_orders".to_string(),
    ];
    let config = tree_config(&project.models, &components);
    assert_eq!(config.get("materialized"), Some(&json!("table")));
}

#[test]
fn test_tree_config_root_only_for_unmatched_path() {
    let project = ProjectConfig::from_yaml_str(BASIC_PROJECT, "quarry_project.yml").unwrap();
    let components = vec!["other_pkg".to_string(), "anything".to_string()];
    let config = tree_config(&project.models, &components);
    assert_eq!(config.get("materialized"), Some(&json!("view")));
    assert!(config.get("tags").is_none());
}
