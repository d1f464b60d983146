use super::*;
use chrono::Utc;

fn make_source(table: &str) -> SourceDefinition {
    SourceDefinition {
        unique_id: format!("source.pkg.raw.{}", table),
        name: table.to_string(),
        source_name: "raw".to_string(),
        package_name: "pkg".to_string(),
        path: "schema.yml".to_string(),
        original_file_path: "models/schema.yml".to_string(),
        fqn: vec![
            "pkg".to_string(),
            "sources".to_string(),
            "raw".to_string(),
            table.to_string(),
        ],
        database: None,
        schema: "raw".to_string(),
        identifier: None,
        description: None,
        loader: None,
        loaded_at_field: None,
        loaded_at_query: None,
        freshness: None,
        tags: Vec::new(),
        meta: JsonMap::new(),
        columns: BTreeMap::new(),
        config: NodeConfig::default(),
        created_at: Utc::now(),
    }
}

#[test]
fn test_effective_identifier_defaults_to_name() {
    let mut source = make_source("orders");
    assert_eq!(source.effective_identifier(), "orders");

    source.identifier = Some("raw_orders_v1".to_string());
    assert_eq!(source.effective_identifier(), "raw_orders_v1");
}

#[test]
fn test_freshness_field_and_query_conflict() {
    let mut source = make_source("orders");
    source.loaded_at_field = Some("_loaded_at".to_string());
    assert!(source.validate_freshness().is_ok());

    source.loaded_at_query = Some("select max(_loaded_at) from raw.orders".to_string());
    let err = source.validate_freshness().unwrap_err();
    assert!(matches!(err, CoreError::FreshnessConflict { .. }));
}

#[test]
fn test_freshness_table_level_overrides_source_level() {
    let source_level = FreshnessConfig {
        warn_after: Some(FreshnessThreshold {
            count: 12,
            period: "hour".to_string(),
        }),
        error_after: None,
        filter: None,
    };
    let table_level = FreshnessConfig {
        warn_after: Some(FreshnessThreshold {
            count: 1,
            period: "hour".to_string(),
        }),
        error_after: Some(FreshnessThreshold {
            count: 1,
            period: "day".to_string(),
        }),
        filter: None,
    };

    let merged = FreshnessConfig::merged(Some(&source_level), Some(&table_level)).unwrap();
    assert_eq!(merged.warn_after.as_ref().unwrap().count, 1);
    assert!(merged.error_after.is_some());

    let inherited = FreshnessConfig::merged(Some(&source_level), None).unwrap();
    assert_eq!(inherited.warn_after.as_ref().unwrap().count, 12);
}

#[test]
fn test_same_contents_ignores_created_at() {
    let a = make_source("orders");
    let mut b = a.clone();
    b.created_at = Utc::now();
    assert!(a.same_contents(&b));

    b.schema = "landing".to_string();
    assert!(!a.same_contents(&b));
}

#[test]
fn test_source_serde_round_trip() {
    let mut source = make_source("orders");
    source.freshness = Some(FreshnessConfig {
        warn_after: Some(FreshnessThreshold {
            count: 24,
            period: "hour".to_string(),
        }),
        error_after: None,
        filter: Some("status is not null".to_string()),
    });
    let value = serde_json::to_value(&source).unwrap();
    let back: SourceDefinition = serde_json::from_value(value).unwrap();
    assert_eq!(back, source);
}
