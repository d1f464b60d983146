use super::*;
use crate::checksum::compute_checksum;
use crate::config::NodeConfig;
use crate::model::ModelNode;
use crate::node::{unique_id, DependsOn, NodeInfo};
use chrono::Utc;
use std::collections::BTreeMap;

fn make_model(name: &str, subdir: Option<&str>, tags: &[&str], deps: &[&str]) -> ResourceNode {
    let uid = unique_id(ResourceType::Model, "pkg", name);
    let mut fqn = vec!["pkg".to_string()];
    if let Some(dir) = subdir {
        fqn.push(dir.to_string());
    }
    fqn.push(name.to_string());
    let mut depends_on = DependsOn::default();
    for dep in deps {
        depends_on.add_node(unique_id(ResourceType::Model, "pkg", dep));
    }
    let mut config = NodeConfig::default();
    config.tags = tags.iter().map(|t| t.to_string()).collect();
    ResourceNode::Model(ModelNode {
        info: NodeInfo {
            unique_id: uid,
            name: name.to_string(),
            package_name: "pkg".to_string(),
            path: format!("{}.sql", name),
            original_file_path: match subdir {
                Some(dir) => format!("models/{}/{}.sql", dir, name),
                None => format!("models/{}.sql", name),
            },
            fqn,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            checksum: compute_checksum(name),
            created_at: Utc::now(),
            depends_on,
            config,
            unrendered_config: serde_json::Map::new(),
            raw_code: String::new(),
            description: None,
        },
        access: Default::default(),
        version: None,
        latest_version: None,
        defined_in: None,
        deprecation_date: None,
        columns: BTreeMap::new(),
    })
}

/// raw -> stg -> fct, plus a tagged standalone model
fn fixture() -> (Manifest, NodeDag) {
    let mut manifest = Manifest::new("pkg", None);
    for node in [
        make_model("raw_orders", Some("staging"), &[], &[]),
        make_model("stg_orders", Some("staging"), &["daily"], &["raw_orders"]),
        make_model("fct_orders", Some("marts"), &["daily"], &["stg_orders"]),
        make_model("unrelated", None, &["weekly"], &[]),
    ] {
        manifest.nodes.insert(node.unique_id().to_string(), node);
    }
    let dag = NodeDag::build(&manifest.dependency_map()).unwrap();
    (manifest, dag)
}

fn ids(names: &[&str]) -> Vec<String> {
    names
        .iter()
        .map(|n| unique_id(ResourceType::Model, "pkg", n))
        .collect()
}

fn run(manifest: &Manifest, dag: &NodeDag, select_expr: &str) -> Vec<String> {
    select(manifest, dag, &[select_expr.to_string()], &[], None).unwrap()
}

#[test]
fn test_parse_bare_name() {
    let atom = SelectorAtom::parse("my_model").unwrap();
    assert_eq!(atom.method, Method::FuzzyName);
    assert_eq!(atom.value, "my_model");
    assert_eq!(atom.ancestors, Depth::None);
    assert_eq!(atom.descendants, Depth::None);
}

#[test]
fn test_parse_graph_operators() {
    let atom = SelectorAtom::parse("+my_model+").unwrap();
    assert_eq!(atom.ancestors, Depth::Unbounded);
    assert_eq!(atom.descendants, Depth::Unbounded);

    let atom = SelectorAtom::parse("2+my_model+1").unwrap();
    assert_eq!(atom.ancestors, Depth::Bounded(2));
    assert_eq!(atom.descendants, Depth::Bounded(1));
    assert_eq!(atom.value, "my_model");
}

#[test]
fn test_parse_methods() {
    assert_eq!(SelectorAtom::parse("tag:daily").unwrap().method, Method::Tag);
    assert_eq!(
        SelectorAtom::parse("config.materialized:table")
            .unwrap()
            .method,
        Method::Config("materialized".to_string())
    );
    assert_eq!(
        SelectorAtom::parse("state:modified").unwrap().method,
        Method::State(StateType::Modified)
    );
}

#[test]
fn test_parse_errors() {
    assert!(matches!(
        SelectorAtom::parse("owner:someone"),
        Err(CoreError::InvalidSelector { .. })
    ));
    assert!(matches!(
        SelectorAtom::parse("tag:"),
        Err(CoreError::InvalidSelector { .. })
    ));
    assert!(matches!(
        SelectorAtom::parse("state:stale"),
        Err(CoreError::InvalidSelector { .. })
    ));
    assert!(matches!(
        SelectorAtom::parse("+"),
        Err(CoreError::InvalidSelector { .. })
    ));
}

#[test]
fn test_name_with_digits_is_not_a_depth_bound() {
    let atom = SelectorAtom::parse("2fa_events").unwrap();
    assert_eq!(atom.method, Method::FuzzyName);
    assert_eq!(atom.value, "2fa_events");
    assert_eq!(atom.ancestors, Depth::None);
}

#[test]
fn test_select_ancestors() {
    let (manifest, dag) = fixture();
    let mut result = run(&manifest, &dag, "+fct_orders");
    result.sort();
    let mut expected = ids(&["fct_orders", "raw_orders", "stg_orders"]);
    expected.sort();
    assert_eq!(result, expected);
}

#[test]
fn test_select_descendants() {
    let (manifest, dag) = fixture();
    let mut result = run(&manifest, &dag, "raw_orders+");
    result.sort();
    let mut expected = ids(&["fct_orders", "raw_orders", "stg_orders"]);
    expected.sort();
    assert_eq!(result, expected);
}

#[test]
fn test_select_bounded_depth() {
    let (manifest, dag) = fixture();
    let mut result = run(&manifest, &dag, "1+fct_orders");
    result.sort();
    let mut expected = ids(&["fct_orders", "stg_orders"]);
    expected.sort();
    assert_eq!(result, expected);
}

#[test]
fn test_select_by_tag() {
    let (manifest, dag) = fixture();
    let mut result = run(&manifest, &dag, "tag:daily");
    result.sort();
    let mut expected = ids(&["fct_orders", "stg_orders"]);
    expected.sort();
    assert_eq!(result, expected);
}

#[test]
fn test_select_by_path() {
    let (manifest, dag) = fixture();
    let mut result = run(&manifest, &dag, "path:models/staging/*");
    result.sort();
    let mut expected = ids(&["raw_orders", "stg_orders"]);
    expected.sort();
    assert_eq!(result, expected);
}

#[test]
fn test_space_is_union() {
    let (manifest, dag) = fixture();
    let mut result = run(&manifest, &dag, "raw_orders unrelated");
    result.sort();
    let mut expected = ids(&["raw_orders", "unrelated"]);
    expected.sort();
    assert_eq!(result, expected);
}

#[test]
fn test_comma_is_intersection() {
    let (manifest, dag) = fixture();
    // daily-tagged AND in staging
    let result = run(&manifest, &dag, "tag:daily,path:models/staging/*");
    assert_eq!(result, ids(&["stg_orders"]));
}

#[test]
fn test_multiple_select_groups_intersect() {
    let (manifest, dag) = fixture();
    let result = select(
        &manifest,
        &dag,
        &["tag:daily".to_string(), "path:models/marts/*".to_string()],
        &[],
        None,
    )
    .unwrap();
    assert_eq!(result, ids(&["fct_orders"]));
}

#[test]
fn test_exclude_subtracts_after_selection() {
    let (manifest, dag) = fixture();
    let result = select(
        &manifest,
        &dag,
        &["+fct_orders".to_string()],
        &["tag:daily".to_string()],
        None,
    )
    .unwrap();
    assert_eq!(result, ids(&["raw_orders"]));
}

#[test]
fn test_empty_select_means_everything() {
    let (manifest, dag) = fixture();
    let result = select(&manifest, &dag, &[], &[], None).unwrap();
    assert_eq!(result.len(), 4);
}

#[test]
fn test_fqn_suffix_fallback() {
    let (manifest, dag) = fixture();
    let result = run(&manifest, &dag, "staging.stg_orders");
    assert_eq!(result, ids(&["stg_orders"]));
}

#[test]
fn test_unknown_name_is_an_error() {
    let (manifest, dag) = fixture();
    let err = select(
        &manifest,
        &dag,
        &["ghost_model".to_string()],
        &[],
        None,
    )
    .unwrap_err();
    assert!(matches!(err, CoreError::SelectorNoMatch { .. }));
}

#[test]
fn test_unmatched_exclude_name_is_a_no_op() {
    let (manifest, dag) = fixture();
    let result = select(
        &manifest,
        &dag,
        &["unrelated".to_string()],
        &["ghost_model".to_string()],
        None,
    )
    .unwrap();
    assert_eq!(result, ids(&["unrelated"]));
}

#[test]
fn test_state_modified_against_prior() {
    let (mut manifest, dag) = fixture();
    let prior = manifest.clone();

    // Change one model's checksum
    if let Some(node) = manifest.nodes.get_mut("model.pkg.stg_orders") {
        node.info_mut().checksum = compute_checksum("select 2");
    }

    let result = select(
        &manifest,
        &dag,
        &["state:modified".to_string()],
        &[],
        Some(&prior),
    )
    .unwrap();
    assert_eq!(result, ids(&["stg_orders"]));
}

#[test]
fn test_state_new_against_prior() {
    let (mut manifest, _) = fixture();
    let prior = manifest.clone();

    let fresh = make_model("brand_new", None, &[], &[]);
    manifest
        .nodes
        .insert(fresh.unique_id().to_string(), fresh);
    let dag = NodeDag::build(&manifest.dependency_map()).unwrap();

    let result = select(
        &manifest,
        &dag,
        &["state:new".to_string()],
        &[],
        Some(&prior),
    )
    .unwrap();
    assert_eq!(result, ids(&["brand_new"]));
}

#[test]
fn test_state_requires_prior_manifest() {
    let (manifest, dag) = fixture();
    let err = select(
        &manifest,
        &dag,
        &["state:modified".to_string()],
        &[],
        None,
    )
    .unwrap_err();
    assert!(matches!(err, CoreError::InvalidSelector { .. }));
}

#[test]
fn test_selection_is_topologically_ordered() {
    let (manifest, dag) = fixture();
    let result = run(&manifest, &dag, "+fct_orders");
    let raw_pos = result
        .iter()
        .position(|id| id == "model.pkg.raw_orders")
        .unwrap();
    let fct_pos = result
        .iter()
        .position(|id| id == "model.pkg.fct_orders")
        .unwrap();
    assert!(raw_pos < fct_pos);
}
