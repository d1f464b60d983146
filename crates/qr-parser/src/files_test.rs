use super::*;
use std::fs;

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

#[test]
fn test_discovery_is_recursive_and_sorted() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "models/staging/stg_orders.sql", "select 1");
    write(dir.path(), "models/fct_orders.sql", "select 2");
    write(dir.path(), "models/README.md", "not sql");

    let files = discover_files(dir.path(), &["models".to_string()], &["sql"]).unwrap();
    let paths: Vec<&str> = files.iter().map(|f| f.original_file_path.as_str()).collect();
    assert_eq!(
        paths,
        vec!["models/fct_orders.sql", "models/staging/stg_orders.sql"]
    );
}

#[test]
fn test_missing_search_path_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let files = discover_files(dir.path(), &["snapshots".to_string()], &["sql"]).unwrap();
    assert!(files.is_empty());
}

#[test]
fn test_hidden_entries_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "models/.hidden.sql", "select 1");
    write(dir.path(), "models/.cache/cached.sql", "select 1");
    write(dir.path(), "models/visible.sql", "select 1");

    let files = discover_files(dir.path(), &["models".to_string()], &["sql"]).unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].stem(), "visible");
}

#[test]
fn test_fqn_components_include_subdirs() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "models/staging/shop/stg_orders.sql", "select 1");

    let files = discover_files(dir.path(), &["models".to_string()], &["sql"]).unwrap();
    assert_eq!(
        files[0].fqn_components(),
        vec!["staging", "shop", "stg_orders"]
    );
    assert_eq!(files[0].relative_path, "staging/shop/stg_orders.sql");
}

#[test]
fn test_checksum_tracks_content() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "models/a.sql", "select 1");
    write(dir.path(), "models/b.sql", "select 1");
    write(dir.path(), "models/c.sql", "select 2");

    let files = discover_files(dir.path(), &["models".to_string()], &["sql"]).unwrap();
    assert_eq!(files[0].checksum, files[1].checksum);
    assert_ne!(files[0].checksum, files[2].checksum);
}
