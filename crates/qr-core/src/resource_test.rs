use super::*;
use crate::checksum::compute_checksum;
use crate::config::{CheckCols, PersistDocs};
use crate::model::ModelNode;
use crate::node::{unique_id, ColumnInfo, NodeInfo};
use crate::snapshot::{SnapshotNode, SnapshotStrategy};
use crate::test_node::TestMetadata;
use chrono::Utc;
use std::collections::BTreeMap;

fn make_info(resource_type: ResourceType, name: &str, raw: &str) -> NodeInfo {
    NodeInfo {
        unique_id: unique_id(resource_type, "pkg", name),
        name: name.to_string(),
        package_name: "pkg".to_string(),
        path: format!("{}.sql", name),
        original_file_path: format!("models/{}.sql", name),
        fqn: vec!["pkg".to_string(), name.to_string()],
        tags: vec!["daily".to_string()],
        checksum: compute_checksum(raw),
        created_at: Utc::now(),
        depends_on: DependsOn::default(),
        config: NodeConfig::default(),
        unrendered_config: serde_json::Map::new(),
        raw_code: raw.to_string(),
        description: None,
    }
}

fn make_model(name: &str) -> ResourceNode {
    let mut columns = BTreeMap::new();
    columns.insert("id".to_string(), ColumnInfo::named("id"));
    ResourceNode::Model(ModelNode {
        info: make_info(ResourceType::Model, name, "select 1 as id"),
        access: Default::default(),
        version: None,
        latest_version: None,
        defined_in: None,
        deprecation_date: None,
        columns,
    })
}

#[test]
fn test_model_round_trip() {
    let node = make_model("orders");
    let map = node.to_map().unwrap();
    assert_eq!(map.get("resource_type"), Some(&serde_json::json!("model")));
    let back = ResourceNode::from_map(map).unwrap();
    assert_eq!(back, node);
}

#[test]
fn test_versioned_model_round_trip() {
    let mut node = make_model("orders");
    if let ResourceNode::Model(ref mut m) = node {
        m.info.unique_id = "model.pkg.orders.v2".to_string();
        m.version = Some(2);
        m.latest_version = Some(2);
        m.defined_in = Some("orders_v2".to_string());
    }
    let back = ResourceNode::from_map(node.to_map().unwrap()).unwrap();
    assert_eq!(back, node);
    assert!(back.as_model().unwrap().is_latest());
}

#[test]
fn test_snapshot_round_trip() {
    let node = ResourceNode::Snapshot(SnapshotNode {
        info: make_info(ResourceType::Snapshot, "orders_snapshot", "select * from orders"),
        strategy: SnapshotStrategy::Check {
            check_cols: CheckCols::Columns(vec!["status".to_string()]),
        },
    });
    let back = ResourceNode::from_map(node.to_map().unwrap()).unwrap();
    assert_eq!(back, node);
}

#[test]
fn test_generic_test_round_trip() {
    let mut kwargs = serde_json::Map::new();
    kwargs.insert(
        "column_name".to_string(),
        serde_json::Value::String("id".to_string()),
    );
    let node = ResourceNode::GenericTest(crate::test_node::GenericTestNode {
        info: make_info(ResourceType::GenericTest, "not_null_orders_id", ""),
        test_metadata: TestMetadata {
            name: "not_null".to_string(),
            kwargs,
            namespace: None,
        },
        column_name: Some("id".to_string()),
        attached_node: "model.pkg.orders".to_string(),
        file_key_name: "models/schema.yml".to_string(),
    });
    let back = ResourceNode::from_map(node.to_map().unwrap()).unwrap();
    assert_eq!(back, node);
}

#[test]
fn test_round_trip_preserves_persist_docs_distinction() {
    let mut unset = make_model("a");
    unset.info_mut().config.persist_docs = Some(PersistDocs {
        relation: None,
        columns: None,
    });
    let mut explicit = make_model("a");
    explicit.info_mut().config.persist_docs = Some(PersistDocs {
        relation: Some(false),
        columns: None,
    });

    let unset_back = ResourceNode::from_map(unset.to_map().unwrap()).unwrap();
    let explicit_back = ResourceNode::from_map(explicit.to_map().unwrap()).unwrap();

    assert_eq!(unset_back, unset);
    assert_eq!(explicit_back, explicit);
    assert_ne!(unset_back, explicit_back);
}

#[test]
fn test_from_map_rejects_unknown_resource_type() {
    let mut map = make_model("orders").to_map().unwrap();
    map.insert(
        "resource_type".to_string(),
        serde_json::json!("spaceship"),
    );
    assert!(ResourceNode::from_map(map).is_err());
}

#[test]
fn test_same_contents_across_kinds_is_false() {
    let model = make_model("orders");
    let analysis = ResourceNode::Analysis(crate::model::AnalysisNode {
        info: make_info(ResourceType::Analysis, "orders", "select 1 as id"),
    });
    assert!(!model.same_contents(&analysis, "postgres"));
}

#[test]
fn test_accessors() {
    let node = make_model("orders");
    assert_eq!(node.unique_id(), "model.pkg.orders");
    assert_eq!(node.name(), "orders");
    assert_eq!(node.package_name(), "pkg");
    assert_eq!(node.resource_type(), ResourceType::Model);
    assert!(node.is_enabled());
    assert_eq!(node.tags(), ["daily"]);
}
