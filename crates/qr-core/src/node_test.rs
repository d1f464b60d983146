use super::*;
use crate::checksum::compute_checksum;
use chrono::Utc;

fn make_info(name: &str) -> NodeInfo {
    NodeInfo {
        unique_id: unique_id(ResourceType::Model, "pkg", name),
        name: name.to_string(),
        package_name: "pkg".to_string(),
        path: format!("{}.sql", name),
        original_file_path: format!("models/{}.sql", name),
        fqn: vec!["pkg".to_string(), name.to_string()],
        tags: Vec::new(),
        checksum: compute_checksum("select 1"),
        created_at: Utc::now(),
        depends_on: DependsOn::default(),
        config: NodeConfig::default(),
        unrendered_config: JsonMap::new(),
        raw_code: "select 1".to_string(),
        description: None,
    }
}

#[test]
fn test_unique_id_format() {
    assert_eq!(
        unique_id(ResourceType::Model, "my_project", "stg_orders"),
        "model.my_project.stg_orders"
    );
    assert_eq!(
        unique_id(ResourceType::Seed, "my_project", "countries"),
        "seed.my_project.countries"
    );
    // Both test kinds share the `test` prefix
    assert_eq!(
        unique_id(ResourceType::GenericTest, "p", "not_null_orders_id"),
        "test.p.not_null_orders_id"
    );
    assert_eq!(
        unique_id(ResourceType::SingularTest, "p", "assert_positive"),
        "test.p.assert_positive"
    );
}

#[test]
fn test_resource_type_serde_names() {
    assert_eq!(
        serde_json::to_value(ResourceType::SemanticModel).unwrap(),
        serde_json::json!("semantic_model")
    );
    let rt: ResourceType = serde_json::from_value(serde_json::json!("snapshot")).unwrap();
    assert_eq!(rt, ResourceType::Snapshot);
}

#[test]
fn test_depends_on_ordered_dedup() {
    let mut deps = DependsOn::default();
    deps.add_node("model.pkg.a");
    deps.add_node("model.pkg.b");
    deps.add_node("model.pkg.a");
    deps.add_node("source.pkg.raw.orders");

    assert_eq!(
        deps.nodes,
        vec!["model.pkg.a", "model.pkg.b", "source.pkg.raw.orders"]
    );

    deps.add_macro("macro.pkg.cents_to_dollars");
    deps.add_macro("macro.pkg.cents_to_dollars");
    assert_eq!(deps.macros, vec!["macro.pkg.cents_to_dollars"]);
    assert!(!deps.is_empty());
}

#[test]
fn test_same_contents_ignores_created_at_and_paths() {
    let a = make_info("orders");
    let mut b = a.clone();
    b.created_at = Utc::now();
    b.path = "elsewhere/orders.sql".to_string();
    b.original_file_path = "models/elsewhere/orders.sql".to_string();

    assert!(a.same_contents(&b, "postgres"));
}

#[test]
fn test_same_contents_detects_checksum_change() {
    let a = make_info("orders");
    let mut b = a.clone();
    b.checksum = compute_checksum("select 2");

    assert!(!a.same_contents(&b, "postgres"));
}

#[test]
fn test_same_contents_detects_dependency_change() {
    let a = make_info("orders");
    let mut b = a.clone();
    b.depends_on.add_node("model.pkg.customers");

    assert!(!a.same_contents(&b, "postgres"));
}

#[test]
fn test_node_info_serde_round_trip() {
    let mut info = make_info("orders");
    info.tags.push("daily".to_string());
    info.depends_on.add_node("model.pkg.stg_orders");

    let value = serde_json::to_value(&info).unwrap();
    let back: NodeInfo = serde_json::from_value(value).unwrap();
    assert_eq!(back, info);
}
