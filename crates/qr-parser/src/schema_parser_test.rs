use super::*;
use qr_core::checksum::compute_checksum;
use std::path::PathBuf;

fn yaml_file(contents: &str) -> DiscoveredFile {
    DiscoveredFile {
        absolute_path: PathBuf::from("/proj/models/schema.yml"),
        relative_path: "schema.yml".to_string(),
        original_file_path: "models/schema.yml".to_string(),
        contents: contents.to_string(),
        checksum: compute_checksum(contents),
    }
}

fn project() -> ProjectConfig {
    ProjectConfig::from_yaml_str("name: shop", "quarry_project.yml").unwrap()
}

#[test]
fn test_model_patch_and_column_tests() {
    let contents = r#"
version: 2
models:
  - name: stg_orders
    description: Staged orders
    config:
      tags: ["staging"]
    columns:
      - name: order_id
        description: Primary key
        data_type: integer
        tests:
          - unique
          - not_null
      - name: status
        tests:
          - accepted_values:
              values: ["placed", "shipped"]
              severity: warn
"#;
    let contents = parse_schema_file("shop", &project(), &yaml_file(contents)).unwrap();

    assert_eq!(contents.patches.len(), 1);
    let patch = &contents.patches[0];
    assert_eq!(patch.name, "stg_orders");
    assert_eq!(patch.resource_type, ResourceType::Model);
    assert_eq!(patch.description.as_deref(), Some("Staged orders"));
    assert_eq!(patch.columns["order_id"].data_type.as_deref(), Some("integer"));

    assert_eq!(contents.tests.len(), 3);
    assert_eq!(contents.tests[0].metadata.name, "unique");
    assert_eq!(contents.tests[0].column_name.as_deref(), Some("order_id"));

    let accepted = &contents.tests[2];
    assert_eq!(accepted.metadata.name, "accepted_values");
    assert_eq!(
        accepted.metadata.kwargs.get("values"),
        Some(&serde_json::json!(["placed", "shipped"]))
    );
    // severity routes to config, not kwargs
    assert!(accepted.metadata.kwargs.get("severity").is_none());
    assert_eq!(accepted.config.get("severity"), Some(&serde_json::json!("warn")));
}

#[test]
fn test_data_tests_alias() {
    let contents = r#"
models:
  - name: stg_orders
    columns:
      - name: order_id
        data_tests:
          - unique
"#;
    let contents = parse_schema_file("shop", &project(), &yaml_file(contents)).unwrap();
    assert_eq!(contents.tests.len(), 1);
    assert_eq!(contents.tests[0].metadata.name, "unique");
}

#[test]
fn test_namespaced_test_name() {
    let contents = r#"
models:
  - name: stg_orders
    tests:
      - dbt_utils.recency:
          datepart: day
          field: created_at
          interval: 1
"#;
    let contents = parse_schema_file("shop", &project(), &yaml_file(contents)).unwrap();
    let test = &contents.tests[0];
    assert_eq!(test.metadata.name, "recency");
    assert_eq!(test.metadata.namespace.as_deref(), Some("dbt_utils"));
    assert!(test.column_name.is_none());
}

#[test]
fn test_relationships_kwargs_carry_a_ref() {
    let contents = r#"
models:
  - name: stg_orders
    columns:
      - name: customer_id
        tests:
          - relationships:
              to: ref('stg_customers')
              field: id
"#;
    let contents = parse_schema_file("shop", &project(), &yaml_file(contents)).unwrap();
    assert_eq!(contents.tests[0].refs.len(), 1);
    assert_eq!(contents.tests[0].refs[0].name, "stg_customers");
}

#[test]
fn test_sources_expand_per_table() {
    let contents = r#"
sources:
  - name: raw
    database: landing
    loader: fivetran
    loaded_at_field: _loaded_at
    freshness:
      warn_after: {count: 12, period: hour}
    tables:
      - name: orders
        identifier: raw_orders_v2
        loaded_at_field: _synced_at
      - name: payments
        freshness:
          error_after: {count: 1, period: day}
"#;
    let contents = parse_schema_file("shop", &project(), &yaml_file(contents)).unwrap();
    assert_eq!(contents.sources.len(), 2);

    let orders = &contents.sources[0].definition;
    assert_eq!(orders.unique_id, "source.shop.raw.orders");
    assert_eq!(orders.fqn, ["shop", "sources", "raw", "orders"]);
    assert_eq!(orders.schema, "raw");
    assert_eq!(orders.database.as_deref(), Some("landing"));
    assert_eq!(orders.effective_identifier(), "raw_orders_v2");
    // Table-level loaded_at overrides the source level
    assert_eq!(orders.loaded_at_field.as_deref(), Some("_synced_at"));

    let payments = &contents.sources[1].definition;
    assert_eq!(payments.loaded_at_field.as_deref(), Some("_loaded_at"));
    // Table freshness overrides source freshness wholesale
    let freshness = payments.freshness.as_ref().unwrap();
    assert!(freshness.warn_after.is_none());
    assert_eq!(freshness.error_after.as_ref().unwrap().count, 1);
}

#[test]
fn test_same_level_freshness_conflict() {
    let contents = r#"
sources:
  - name: raw
    tables:
      - name: orders
        loaded_at_field: _loaded_at
        loaded_at_query: select max(ts) from raw.orders
"#;
    let err = parse_schema_file("shop", &project(), &yaml_file(contents)).unwrap_err();
    assert!(matches!(err, CoreError::FreshnessConflict { .. }));
}

#[test]
fn test_versioned_model_declaration() {
    let contents = r#"
models:
  - name: dim_customers
    latest_version: 2
    columns:
      - name: id
      - name: country
    versions:
      - v: 1
      - v: 2
        defined_in: dim_customers_next
        columns:
          - include: all
            exclude: [country]
"#;
    let contents = parse_schema_file("shop", &project(), &yaml_file(contents)).unwrap();
    assert_eq!(contents.versioned_models.len(), 1);

    let family = &contents.versioned_models[0];
    assert_eq!(family.name, "dim_customers");
    assert_eq!(family.latest_version, Some(2));
    assert_eq!(family.versions[0].v, 1);
    assert_eq!(family.versions[0].include, ColumnFilter::All);
    assert_eq!(
        family.versions[1].defined_in.as_deref(),
        Some("dim_customers_next")
    );
    assert_eq!(family.versions[1].exclude, vec!["country"]);
}

#[test]
fn test_versions_on_a_seed_are_rejected() {
    let contents = r#"
seeds:
  - name: country_codes
    versions:
      - v: 1
"#;
    let err = parse_schema_file("shop", &project(), &yaml_file(contents)).unwrap_err();
    assert!(matches!(err, CoreError::InvalidField { .. }));
}

#[test]
fn test_exposures_metrics_and_semantic_models() {
    let contents = r#"
exposures:
  - name: weekly_kpis
    type: dashboard
    maturity: high
    url: https://bi.example.com/kpis
    owner:
      name: Data Team
      email: data@example.com
    depends_on:
      - ref('fct_orders')
      - source('raw', 'orders')

metrics:
  - name: order_count
    type: count
    type_params:
      expr: ref('fct_orders')

semantic_models:
  - name: orders
    model: ref('fct_orders')
    entities:
      - name: order_id
        type: primary

saved_queries:
  - name: weekly_revenue
    query_params:
      metrics: [order_count]
"#;
    let contents = parse_schema_file("shop", &project(), &yaml_file(contents)).unwrap();

    let exposure = &contents.exposures[0];
    assert_eq!(exposure.exposure.unique_id, "exposure.shop.weekly_kpis");
    assert_eq!(exposure.refs[0].name, "fct_orders");
    assert_eq!(exposure.sources[0].source_name, "raw");

    assert_eq!(contents.metrics[0].refs[0].name, "fct_orders");

    let sm = &contents.semantic_models[0];
    assert_eq!(sm.semantic_model.model, "ref('fct_orders')");
    assert_eq!(sm.refs[0].name, "fct_orders");
    assert!(sm.semantic_model.body.contains_key("entities"));

    assert_eq!(contents.saved_queries[0].metric_names, vec!["order_count"]);
}

#[test]
fn test_invalid_yaml_is_a_parse_error() {
    let err = parse_schema_file("shop", &project(), &yaml_file("models: [unclosed")).unwrap_err();
    assert!(matches!(err, CoreError::YamlError { .. }));
}

#[test]
fn test_macro_patch() {
    let contents = r#"
macros:
  - name: cents_to_dollars
    description: Convert integer cents to dollars
"#;
    let contents = parse_schema_file("shop", &project(), &yaml_file(contents)).unwrap();
    assert_eq!(contents.macro_patches.len(), 1);
    assert_eq!(contents.macro_patches[0].name, "cents_to_dollars");
}

#[test]
fn test_model_deprecation_date() {
    let contents = r#"
models:
  - name: stg_orders
    deprecation_date: 2026-06-30
"#;
    let contents = parse_schema_file("shop", &project(), &yaml_file(contents)).unwrap();
    let date = contents.patches[0].deprecation_date.unwrap();
    assert_eq!(date.to_rfc3339(), "2026-06-30T00:00:00+00:00");
}

#[test]
fn test_deprecation_date_accepts_full_timestamp() {
    let contents = r#"
models:
  - name: stg_orders
    deprecation_date: "2026-06-30T12:00:00+02:00"
"#;
    let contents = parse_schema_file("shop", &project(), &yaml_file(contents)).unwrap();
    let date = contents.patches[0].deprecation_date.unwrap();
    assert_eq!(date.to_rfc3339(), "2026-06-30T10:00:00+00:00");
}

#[test]
fn test_non_date_deprecation_date_is_rejected() {
    let contents = r#"
models:
  - name: stg_orders
    deprecation_date: someday
"#;
    let err = parse_schema_file("shop", &project(), &yaml_file(contents)).unwrap_err();
    assert!(matches!(
        err,
        CoreError::InvalidField { ref field, .. } if field == "deprecation_date"
    ));
}

#[test]
fn test_deprecation_date_on_a_seed_is_rejected() {
    let contents = r#"
seeds:
  - name: country_codes
    deprecation_date: 2026-06-30
"#;
    let err = parse_schema_file("shop", &project(), &yaml_file(contents)).unwrap_err();
    assert!(matches!(err, CoreError::InvalidField { .. }));
}
