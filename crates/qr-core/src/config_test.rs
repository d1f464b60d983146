use super::*;
use serde_json::json;

fn merged_from(value: serde_json::Value) -> NodeConfig {
    let serde_json::Value::Object(map) = value else {
        panic!("expected object");
    };
    NodeConfig::from_merged(&map, "models/test.sql").unwrap()
}

#[test]
fn test_default_config_is_enabled() {
    let config = NodeConfig::default();
    assert!(config.enabled);
    assert!(config.materialized.is_none());
    assert!(config.tags.is_empty());
}

#[test]
fn test_from_merged_basic_fields() {
    let config = merged_from(json!({
        "materialized": "table",
        "schema": "analytics",
        "tags": ["daily", "core"],
        "enabled": true
    }));
    assert_eq!(config.materialized.as_deref(), Some("table"));
    assert_eq!(config.schema.as_deref(), Some("analytics"));
    assert_eq!(config.tags, vec!["daily", "core"]);
}

#[test]
fn test_unknown_keys_land_in_extra() {
    let config = merged_from(json!({
        "materialized": "view",
        "partition_by": "created_date",
        "cluster_by": ["id"]
    }));
    assert_eq!(
        config.extra.get("partition_by"),
        Some(&json!("created_date"))
    );
    assert_eq!(config.extra.get("cluster_by"), Some(&json!(["id"])));
}

#[test]
fn test_extra_keys_round_trip() {
    let config = merged_from(json!({
        "materialized": "view",
        "partition_by": "created_date"
    }));
    let value = serde_json::to_value(&config).unwrap();
    assert_eq!(value["partition_by"], json!("created_date"));
    let back: NodeConfig = serde_json::from_value(value).unwrap();
    assert_eq!(back, config);
}

#[test]
fn test_persist_docs_unset_vs_false_round_trip() {
    let unset = merged_from(json!({ "persist_docs": {} }));
    let explicit = merged_from(json!({ "persist_docs": { "relation": false } }));

    let pd_unset = unset.persist_docs.as_ref().unwrap();
    let pd_explicit = explicit.persist_docs.as_ref().unwrap();
    assert_eq!(pd_unset.relation, None);
    assert_eq!(pd_explicit.relation, Some(false));
    assert_ne!(pd_unset, pd_explicit);

    // Distinction survives serialization
    let back: NodeConfig =
        serde_json::from_value(serde_json::to_value(&explicit).unwrap()).unwrap();
    assert_eq!(back.persist_docs.as_ref().unwrap().relation, Some(false));
    let back_unset: NodeConfig =
        serde_json::from_value(serde_json::to_value(&unset).unwrap()).unwrap();
    assert_eq!(back_unset.persist_docs.as_ref().unwrap().relation, None);
}

#[test]
fn test_severity_values() {
    let config = merged_from(json!({ "severity": "warn" }));
    assert_eq!(config.severity, Some(Severity::Warn));

    let serde_json::Value::Object(map) = json!({ "severity": "fatal" }) else {
        unreachable!();
    };
    assert!(NodeConfig::from_merged(&map, "x.yml").is_err());
}

#[test]
fn test_where_clause_rename() {
    let config = merged_from(json!({ "where": "status != 'void'" }));
    assert_eq!(config.where_clause.as_deref(), Some("status != 'void'"));
}

#[test]
fn test_snapshot_timestamp_requires_updated_at() {
    let config = merged_from(json!({ "strategy": "timestamp", "unique_key": "id" }));
    let err = config
        .validate_for(ResourceType::Snapshot, "orders_snapshot")
        .unwrap_err();
    assert!(matches!(err, CoreError::SnapshotConfig { ref field, .. } if field == "updated_at"));
}

#[test]
fn test_snapshot_check_requires_check_cols() {
    let config = merged_from(json!({ "strategy": "check", "unique_key": "id" }));
    let err = config
        .validate_for(ResourceType::Snapshot, "orders_snapshot")
        .unwrap_err();
    assert!(matches!(err, CoreError::SnapshotConfig { ref field, .. } if field == "check_cols"));
}

#[test]
fn test_snapshot_check_cols_all_keyword() {
    let all = merged_from(json!({
        "strategy": "check",
        "unique_key": "id",
        "check_cols": "all"
    }));
    assert!(all
        .validate_for(ResourceType::Snapshot, "orders_snapshot")
        .is_ok());
    assert!(all.check_cols.as_ref().unwrap().is_all());

    let bad = merged_from(json!({
        "strategy": "check",
        "unique_key": "id",
        "check_cols": "some"
    }));
    assert!(matches!(
        bad.validate_for(ResourceType::Snapshot, "orders_snapshot"),
        Err(CoreError::InvalidEnumValue { .. })
    ));
}

#[test]
fn test_snapshot_unknown_strategy() {
    let config = merged_from(json!({ "strategy": "diff" }));
    assert!(matches!(
        config.validate_for(ResourceType::Snapshot, "s"),
        Err(CoreError::InvalidEnumValue { .. })
    ));
}

#[test]
fn test_validate_for_ignores_snapshot_fields_on_models() {
    // Models don't carry snapshot requirements
    let config = merged_from(json!({ "materialized": "table" }));
    assert!(config.validate_for(ResourceType::Model, "my_model").is_ok());
}

#[test]
fn test_same_config_grants_case_sensitivity() {
    let a = merged_from(json!({ "grants": { "SELECT": ["reporter"] } }));
    let b = merged_from(json!({ "grants": { "select": ["reporter"] } }));

    assert!(a.same_config(&b, "snowflake"));
    assert!(!a.same_config(&b, "postgres"));
}

#[test]
fn test_same_config_detects_changed_field() {
    let a = merged_from(json!({ "materialized": "view" }));
    let b = merged_from(json!({ "materialized": "table" }));
    assert!(!a.same_config(&b, "postgres"));
    assert!(a.same_config(&a.clone(), "postgres"));
}
