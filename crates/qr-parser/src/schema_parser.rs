//! Schema YAML parsing.
//!
//! A schema file (`models:`, `sources:`, `seeds:`, ...) never creates
//! model/seed/snapshot nodes itself: it produces *patches* for nodes parsed
//! from their own files, first-class source definitions (one per
//! source×table), generic-test declarations, and versioned-model
//! declarations. The builder applies all of these after every file has been
//! parsed.

use crate::files::DiscoveredFile;
use qr_core::config::{Access, NodeConfig};
use qr_core::error::{CoreError, CoreResult};
use qr_core::exposure::{Exposure, ExposureOwner, ExposureType, Maturity};
use qr_core::metric::{Metric, SavedQuery, SemanticModel};
use qr_core::node::{unique_id, ColumnInfo, DependsOn, ResourceType};
use qr_core::project::{tree_config, ProjectConfig};
use qr_core::serde_helpers::yaml_to_json;
use qr_core::source::{FreshnessConfig, SourceDefinition};
use chrono::{DateTime, Utc};
use qr_core::test_node::TestMetadata;
use qr_jinja::{RefCall, SourceCall};
use serde::Deserialize;
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Test-item keys routed to config instead of macro kwargs
const TEST_CONFIG_KEYS: &[&str] = &[
    "severity",
    "where",
    "limit",
    "store_failures",
    "tags",
    "enabled",
    "error_if",
    "warn_if",
    "config",
];

fn bare_ref_re() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(r#"ref\(\s*['"]([^'"]+)['"]\s*(?:,\s*['"]([^'"]+)['"]\s*)?\)"#).unwrap()
    })
}

fn bare_source_re() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(r#"source\(\s*['"]([^'"]+)['"]\s*,\s*['"]([^'"]+)['"]\s*\)"#).unwrap()
    })
}

/// Scan literal `ref()`/`source()` expressions out of YAML string values
/// (exposure `depends_on:` entries, semantic-model `model:` bindings).
pub fn scan_ref_exprs(text: &str) -> (Vec<RefCall>, Vec<SourceCall>) {
    let refs = bare_ref_re()
        .captures_iter(text)
        .map(|caps| match caps.get(2) {
            Some(name) => RefCall {
                name: name.as_str().to_string(),
                package: Some(caps[1].to_string()),
                version: None,
            },
            None => RefCall {
                name: caps[1].to_string(),
                package: None,
                version: None,
            },
        })
        .collect();
    let sources = bare_source_re()
        .captures_iter(text)
        .map(|caps| SourceCall {
            source_name: caps[1].to_string(),
            table_name: caps[2].to_string(),
        })
        .collect();
    (refs, sources)
}

/// What a YAML entry patches onto an already-parsed node
#[derive(Debug, Clone)]
pub struct NodePatch {
    /// Kind of node the patch targets
    pub resource_type: ResourceType,
    pub name: String,
    pub description: Option<String>,
    pub access: Option<Access>,
    /// Validated removal date, models only
    pub deprecation_date: Option<DateTime<Utc>>,
    /// Documented columns, keyed by column name
    pub columns: BTreeMap<String, ColumnInfo>,
    /// `config:` block, applied as a layer above the project tree
    pub config: JsonMap<String, JsonValue>,
    /// Declaring YAML file, relative to the project root
    pub path: String,
}

/// Description patch for a parsed macro
#[derive(Debug, Clone)]
pub struct MacroPatch {
    pub name: String,
    pub description: Option<String>,
    pub path: String,
}

/// A source table definition plus its `overrides:` marker
#[derive(Debug, Clone)]
pub struct ParsedSource {
    pub definition: SourceDefinition,
    /// Package whose same-named source this definition overrides
    pub overrides: Option<String>,
}

/// What a generic test is attached to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachedTo {
    Node {
        resource_type: ResourceType,
        name: String,
    },
    SourceTable {
        source_name: String,
        table_name: String,
    },
}

/// One generic test declared under `columns:`/`tests:` in a schema file.
/// Materialized into a node by the builder.
#[derive(Debug, Clone)]
pub struct TestDeclaration {
    pub metadata: TestMetadata,
    pub column_name: Option<String>,
    pub attached: AttachedTo,
    /// Config keys written on the test item itself
    pub config: JsonMap<String, JsonValue>,
    pub path: String,
    pub original_file_path: String,
    /// Refs appearing in kwargs (e.g. relationships `to:`)
    pub refs: Vec<RefCall>,
    pub sources: Vec<SourceCall>,
}

/// Column selection for one declared model version
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ColumnFilter {
    /// Inherit every column from the family declaration
    #[default]
    All,
    /// Only the named columns
    Only(Vec<String>),
}

/// One declared version of a versioned model
#[derive(Debug, Clone)]
pub struct ModelVersionDecl {
    pub v: i64,
    /// File stem the version's SQL lives in, when not `{name}_v{v}`
    pub defined_in: Option<String>,
    pub config: JsonMap<String, JsonValue>,
    pub include: ColumnFilter,
    pub exclude: Vec<String>,
}

/// A versioned-model declaration: the family expands to one node per
/// version in the builder.
#[derive(Debug, Clone)]
pub struct VersionedModelDecl {
    pub name: String,
    /// Defaults to the highest declared version
    pub latest_version: Option<i64>,
    pub versions: Vec<ModelVersionDecl>,
    pub path: String,
}

/// An exposure with its unresolved ref/source expressions
#[derive(Debug, Clone)]
pub struct ParsedExposure {
    pub exposure: Exposure,
    pub refs: Vec<RefCall>,
    pub sources: Vec<SourceCall>,
}

/// A metric with any ref expressions found in its declaration
#[derive(Debug, Clone)]
pub struct ParsedMetric {
    pub metric: Metric,
    pub refs: Vec<RefCall>,
}

/// A semantic model with the ref from its `model:` binding
#[derive(Debug, Clone)]
pub struct ParsedSemanticModel {
    pub semantic_model: SemanticModel,
    pub refs: Vec<RefCall>,
}

/// A saved query with the metric names it selects
#[derive(Debug, Clone)]
pub struct ParsedSavedQuery {
    pub saved_query: SavedQuery,
    pub metric_names: Vec<String>,
}

/// Everything one schema file contributes to the build
#[derive(Debug, Clone, Default)]
pub struct SchemaContents {
    pub patches: Vec<NodePatch>,
    pub macro_patches: Vec<MacroPatch>,
    pub sources: Vec<ParsedSource>,
    pub tests: Vec<TestDeclaration>,
    pub versioned_models: Vec<VersionedModelDecl>,
    pub exposures: Vec<ParsedExposure>,
    pub metrics: Vec<ParsedMetric>,
    pub semantic_models: Vec<ParsedSemanticModel>,
    pub saved_queries: Vec<ParsedSavedQuery>,
}

// Raw serde shapes, converted through yaml_to_json so YAML scalars behave
// like their JSON counterparts.

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SchemaFile {
    #[allow(dead_code)]
    version: Option<i64>,
    models: Vec<EntryDecl>,
    seeds: Vec<EntryDecl>,
    snapshots: Vec<EntryDecl>,
    analyses: Vec<EntryDecl>,
    macros: Vec<MacroDecl>,
    sources: Vec<SourceDecl>,
    exposures: Vec<ExposureDecl>,
    metrics: Vec<MetricDecl>,
    semantic_models: Vec<SemanticModelDecl>,
    saved_queries: Vec<SavedQueryDecl>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EntryDecl {
    name: String,
    description: Option<String>,
    access: Option<Access>,
    deprecation_date: Option<String>,
    config: JsonMap<String, JsonValue>,
    columns: Vec<ColumnDecl>,
    #[serde(alias = "data_tests")]
    tests: Vec<JsonValue>,
    versions: Vec<VersionEntryDecl>,
    latest_version: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ColumnDecl {
    name: String,
    description: Option<String>,
    data_type: Option<String>,
    tags: Vec<String>,
    meta: JsonMap<String, JsonValue>,
    #[serde(alias = "data_tests")]
    tests: Vec<JsonValue>,
}

impl ColumnDecl {
    fn to_column_info(&self) -> ColumnInfo {
        ColumnInfo {
            name: self.name.clone(),
            description: self.description.clone(),
            data_type: self.data_type.clone(),
            tags: self.tags.clone(),
            meta: self.meta.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VersionEntryDecl {
    v: i64,
    defined_in: Option<String>,
    config: JsonMap<String, JsonValue>,
    columns: Vec<JsonValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MacroDecl {
    name: String,
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SourceDecl {
    name: String,
    database: Option<String>,
    schema: Option<String>,
    description: Option<String>,
    loader: Option<String>,
    loaded_at_field: Option<String>,
    loaded_at_query: Option<String>,
    freshness: Option<FreshnessConfig>,
    tags: Vec<String>,
    meta: JsonMap<String, JsonValue>,
    config: JsonMap<String, JsonValue>,
    overrides: Option<String>,
    tables: Vec<TableDecl>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TableDecl {
    name: String,
    identifier: Option<String>,
    description: Option<String>,
    loaded_at_field: Option<String>,
    loaded_at_query: Option<String>,
    freshness: Option<FreshnessConfig>,
    tags: Vec<String>,
    meta: JsonMap<String, JsonValue>,
    config: JsonMap<String, JsonValue>,
    columns: Vec<ColumnDecl>,
    #[serde(alias = "data_tests")]
    tests: Vec<JsonValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExposureDecl {
    name: String,
    #[serde(rename = "type")]
    exposure_type: Option<ExposureType>,
    maturity: Option<Maturity>,
    url: Option<String>,
    description: Option<String>,
    owner: ExposureOwner,
    tags: Vec<String>,
    meta: JsonMap<String, JsonValue>,
    depends_on: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MetricDecl {
    name: String,
    label: Option<String>,
    #[serde(rename = "type")]
    metric_type: Option<String>,
    description: Option<String>,
    type_params: JsonMap<String, JsonValue>,
    tags: Vec<String>,
    meta: JsonMap<String, JsonValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SemanticModelDecl {
    name: String,
    model: String,
    description: Option<String>,
    #[serde(flatten)]
    body: JsonMap<String, JsonValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SavedQueryDecl {
    name: String,
    description: Option<String>,
    query_params: JsonMap<String, JsonValue>,
}

/// Parse one schema YAML file into its contributions.
pub fn parse_schema_file(
    package: &str,
    project: &ProjectConfig,
    file: &DiscoveredFile,
) -> CoreResult<SchemaContents> {
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(&file.contents).map_err(|e| CoreError::YamlError {
            path: file.original_file_path.clone(),
            message: e.to_string(),
        })?;
    let schema: SchemaFile =
        serde_json::from_value(yaml_to_json(&yaml)).map_err(|e| CoreError::YamlError {
            path: file.original_file_path.clone(),
            message: e.to_string(),
        })?;

    let mut contents = SchemaContents::default();

    for (entries, resource_type) in [
        (&schema.models, ResourceType::Model),
        (&schema.seeds, ResourceType::Seed),
        (&schema.snapshots, ResourceType::Snapshot),
        (&schema.analyses, ResourceType::Analysis),
    ] {
        for entry in entries {
            collect_entry(package, resource_type, entry, file, &mut contents)?;
        }
    }

    for decl in &schema.macros {
        contents.macro_patches.push(MacroPatch {
            name: decl.name.clone(),
            description: decl.description.clone(),
            path: file.original_file_path.clone(),
        });
    }

    for decl in &schema.sources {
        collect_source(package, project, decl, file, &mut contents)?;
    }

    for decl in &schema.exposures {
        contents.exposures.push(build_exposure(package, decl, file));
    }
    for decl in &schema.metrics {
        contents.metrics.push(build_metric(package, decl, file));
    }
    for decl in &schema.semantic_models {
        contents
            .semantic_models
            .push(build_semantic_model(package, decl, file));
    }
    for decl in &schema.saved_queries {
        contents
            .saved_queries
            .push(build_saved_query(package, decl, file));
    }

    Ok(contents)
}

fn collect_entry(
    package: &str,
    resource_type: ResourceType,
    entry: &EntryDecl,
    file: &DiscoveredFile,
    contents: &mut SchemaContents,
) -> CoreResult<()> {
    let columns: BTreeMap<String, ColumnInfo> = entry
        .columns
        .iter()
        .map(|c| (c.name.clone(), c.to_column_info()))
        .collect();

    let deprecation_date = match &entry.deprecation_date {
        Some(raw) => {
            if resource_type != ResourceType::Model {
                return Err(CoreError::InvalidField {
                    field: "deprecation_date".to_string(),
                    path: file.original_file_path.clone(),
                    message: format!("'{}' is not a model; only models deprecate", entry.name),
                });
            }
            Some(parse_deprecation_date(raw, &file.original_file_path)?)
        }
        None => None,
    };

    contents.patches.push(NodePatch {
        resource_type,
        name: entry.name.clone(),
        description: entry.description.clone(),
        access: entry.access,
        deprecation_date,
        columns,
        config: entry.config.clone(),
        path: file.original_file_path.clone(),
    });

    let attached = AttachedTo::Node {
        resource_type,
        name: entry.name.clone(),
    };
    for item in &entry.tests {
        contents
            .tests
            .push(interpret_test_item(item, None, &attached, file)?);
    }
    for column in &entry.columns {
        for item in &column.tests {
            contents.tests.push(interpret_test_item(
                item,
                Some(&column.name),
                &attached,
                file,
            )?);
        }
    }

    if !entry.versions.is_empty() {
        if resource_type != ResourceType::Model {
            return Err(CoreError::InvalidField {
                field: "versions".to_string(),
                path: file.original_file_path.clone(),
                message: format!("'{}' is not a model; only models are versioned", entry.name),
            });
        }
        contents.versioned_models.push(VersionedModelDecl {
            name: entry.name.clone(),
            latest_version: entry.latest_version,
            versions: entry
                .versions
                .iter()
                .map(|v| interpret_version(v, file))
                .collect::<CoreResult<Vec<_>>>()?,
            path: file.original_file_path.clone(),
        });
    }

    Ok(())
}

/// Split one `tests:` item into macro metadata and config. A bare string is
/// a no-argument test; a single-key mapping carries kwargs and config keys.
fn interpret_test_item(
    item: &JsonValue,
    column_name: Option<&str>,
    attached: &AttachedTo,
    file: &DiscoveredFile,
) -> CoreResult<TestDeclaration> {
    let (raw_name, args) = match item {
        JsonValue::String(name) => (name.clone(), JsonMap::new()),
        JsonValue::Object(map) => {
            let mut entries = map.iter();
            match (entries.next(), entries.next()) {
                (Some((name, JsonValue::Object(args))), None) => (name.clone(), args.clone()),
                (Some((name, other)), None) => {
                    return Err(CoreError::InvalidField {
                        field: name.clone(),
                        path: file.original_file_path.clone(),
                        message: format!("test arguments must be a mapping, got {}", other),
                    });
                }
                _ => {
                    return Err(CoreError::InvalidField {
                        field: "tests".to_string(),
                        path: file.original_file_path.clone(),
                        message: "a test mapping must have exactly one key".to_string(),
                    });
                }
            }
        }
        other => {
            return Err(CoreError::InvalidField {
                field: "tests".to_string(),
                path: file.original_file_path.clone(),
                message: format!("expected a test name or single-key mapping, got {}", other),
            });
        }
    };

    // `pkg.test_name` invokes a test macro from another package
    let (namespace, name) = match raw_name.split_once('.') {
        Some((ns, short)) => (Some(ns.to_string()), short.to_string()),
        None => (None, raw_name),
    };

    let mut kwargs = JsonMap::new();
    let mut config = JsonMap::new();
    for (key, value) in &args {
        if key == "config" {
            if let JsonValue::Object(inner) = value {
                config.extend(inner.clone());
            }
        } else if TEST_CONFIG_KEYS.contains(&key.as_str()) {
            config.insert(key.clone(), value.clone());
        } else {
            kwargs.insert(key.clone(), value.clone());
        }
    }

    let kwargs_text = serde_json::to_string(&kwargs).unwrap_or_default();
    let (refs, sources) = scan_ref_exprs(&kwargs_text);

    Ok(TestDeclaration {
        metadata: TestMetadata {
            name,
            kwargs,
            namespace,
        },
        column_name: column_name.map(String::from),
        attached: attached.clone(),
        config,
        path: file.relative_path.clone(),
        original_file_path: file.original_file_path.clone(),
        refs,
        sources,
    })
}

fn interpret_version(decl: &VersionEntryDecl, file: &DiscoveredFile) -> CoreResult<ModelVersionDecl> {
    let mut include = ColumnFilter::All;
    let mut exclude = Vec::new();

    for item in &decl.columns {
        let JsonValue::Object(map) = item else {
            return Err(CoreError::InvalidField {
                field: "versions.columns".to_string(),
                path: file.original_file_path.clone(),
                message: format!("expected a mapping, got {}", item),
            });
        };
        if map.contains_key("include") || map.contains_key("exclude") {
            match map.get("include") {
                Some(JsonValue::String(s)) if s == "all" || s == "*" => {}
                Some(JsonValue::Array(names)) => {
                    include = ColumnFilter::Only(string_list(names));
                }
                None => {}
                Some(other) => {
                    return Err(CoreError::InvalidField {
                        field: "include".to_string(),
                        path: file.original_file_path.clone(),
                        message: format!("expected \"all\" or a list, got {}", other),
                    });
                }
            }
            if let Some(JsonValue::Array(names)) = map.get("exclude") {
                exclude = string_list(names);
            }
        }
        // Plain column entries under a version add or override columns via
        // the family patch; only include/exclude need version handling
    }

    Ok(ModelVersionDecl {
        v: decl.v,
        defined_in: decl.defined_in.clone(),
        config: decl.config.clone(),
        include,
        exclude,
    })
}

/// Accepts a `YYYY-MM-DD` date (taken as midnight UTC) or a full RFC 3339
/// timestamp.
fn parse_deprecation_date(raw: &str, path: &str) -> CoreResult<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(date) = chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(DateTime::from_naive_utc_and_offset(dt, Utc));
        }
    }
    Err(CoreError::InvalidField {
        field: "deprecation_date".to_string(),
        path: path.to_string(),
        message: format!("'{}' is not a date (expected YYYY-MM-DD or RFC 3339)", raw),
    })
}

fn string_list(values: &[JsonValue]) -> Vec<String> {
    values
        .iter()
        .filter_map(|v| v.as_str().map(String::from))
        .collect()
}

fn collect_source(
    package: &str,
    project: &ProjectConfig,
    decl: &SourceDecl,
    file: &DiscoveredFile,
    contents: &mut SchemaContents,
) -> CoreResult<()> {
    if decl.loaded_at_field.is_some() && decl.loaded_at_query.is_some() {
        return Err(CoreError::FreshnessConflict {
            source_name: decl.name.clone(),
            table_name: "*".to_string(),
            path: file.original_file_path.clone(),
        });
    }

    for table in &decl.tables {
        if table.loaded_at_field.is_some() && table.loaded_at_query.is_some() {
            return Err(CoreError::FreshnessConflict {
                source_name: decl.name.clone(),
                table_name: table.name.clone(),
                path: file.original_file_path.clone(),
            });
        }

        // A table-level loaded-at declaration overrides the source level
        // wholesale, so a field on one level and a query on the other
        // never combine
        let (loaded_at_field, loaded_at_query) =
            if table.loaded_at_field.is_some() || table.loaded_at_query.is_some() {
                (table.loaded_at_field.clone(), table.loaded_at_query.clone())
            } else {
                (decl.loaded_at_field.clone(), decl.loaded_at_query.clone())
            };

        let freshness = FreshnessConfig::merged(decl.freshness.as_ref(), table.freshness.as_ref());

        let fqn = vec![
            package.to_string(),
            "sources".to_string(),
            decl.name.clone(),
            table.name.clone(),
        ];

        let tree_components = vec![
            package.to_string(),
            decl.name.clone(),
            table.name.clone(),
        ];
        let mut merged_config = tree_config(project.tree_for("sources"), &tree_components);
        for (k, v) in &decl.config {
            merged_config.insert(k.clone(), v.clone());
        }
        for (k, v) in &table.config {
            merged_config.insert(k.clone(), v.clone());
        }
        let config = NodeConfig::from_merged(&merged_config, &file.original_file_path)?;

        let mut tags = decl.tags.clone();
        for tag in &table.tags {
            if !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }

        let mut meta = decl.meta.clone();
        meta.extend(table.meta.clone());

        let definition = SourceDefinition {
            unique_id: format!("source.{}.{}.{}", package, decl.name, table.name),
            name: table.name.clone(),
            source_name: decl.name.clone(),
            package_name: package.to_string(),
            path: file.relative_path.clone(),
            original_file_path: file.original_file_path.clone(),
            fqn,
            database: decl.database.clone(),
            schema: decl.schema.clone().unwrap_or_else(|| decl.name.clone()),
            identifier: table.identifier.clone(),
            description: table.description.clone().or_else(|| decl.description.clone()),
            loader: decl.loader.clone(),
            loaded_at_field,
            loaded_at_query,
            freshness,
            tags,
            meta,
            columns: table
                .columns
                .iter()
                .map(|c| (c.name.clone(), c.to_column_info()))
                .collect(),
            config,
            created_at: chrono::Utc::now(),
        };
        definition.validate_freshness()?;

        let attached = AttachedTo::SourceTable {
            source_name: decl.name.clone(),
            table_name: table.name.clone(),
        };
        for item in &table.tests {
            contents
                .tests
                .push(interpret_test_item(item, None, &attached, file)?);
        }
        for column in &table.columns {
            for item in &column.tests {
                contents.tests.push(interpret_test_item(
                    item,
                    Some(&column.name),
                    &attached,
                    file,
                )?);
            }
        }

        contents.sources.push(ParsedSource {
            definition,
            overrides: decl.overrides.clone(),
        });
    }

    Ok(())
}

fn build_exposure(package: &str, decl: &ExposureDecl, file: &DiscoveredFile) -> ParsedExposure {
    let mut refs = Vec::new();
    let mut sources = Vec::new();
    for expr in &decl.depends_on {
        let (mut r, mut s) = scan_ref_exprs(expr);
        refs.append(&mut r);
        sources.append(&mut s);
    }

    ParsedExposure {
        exposure: Exposure {
            unique_id: unique_id(ResourceType::Exposure, package, &decl.name),
            name: decl.name.clone(),
            package_name: package.to_string(),
            path: file.relative_path.clone(),
            original_file_path: file.original_file_path.clone(),
            fqn: vec![package.to_string(), decl.name.clone()],
            exposure_type: decl.exposure_type.unwrap_or_default(),
            maturity: decl.maturity,
            url: decl.url.clone(),
            description: decl.description.clone(),
            owner: decl.owner.clone(),
            tags: decl.tags.clone(),
            meta: decl.meta.clone(),
            depends_on: DependsOn::default(),
            created_at: chrono::Utc::now(),
        },
        refs,
        sources,
    }
}

fn build_metric(package: &str, decl: &MetricDecl, file: &DiscoveredFile) -> ParsedMetric {
    let params_text = serde_json::to_string(&decl.type_params).unwrap_or_default();
    let (refs, _) = scan_ref_exprs(&params_text);

    ParsedMetric {
        metric: Metric {
            unique_id: unique_id(ResourceType::Metric, package, &decl.name),
            name: decl.name.clone(),
            package_name: package.to_string(),
            path: file.relative_path.clone(),
            original_file_path: file.original_file_path.clone(),
            fqn: vec![package.to_string(), decl.name.clone()],
            metric_type: decl.metric_type.clone(),
            label: decl.label.clone(),
            description: decl.description.clone(),
            type_params: decl.type_params.clone(),
            tags: decl.tags.clone(),
            meta: decl.meta.clone(),
            depends_on: DependsOn::default(),
            created_at: chrono::Utc::now(),
        },
        refs,
    }
}

fn build_semantic_model(
    package: &str,
    decl: &SemanticModelDecl,
    file: &DiscoveredFile,
) -> ParsedSemanticModel {
    let (refs, _) = scan_ref_exprs(&decl.model);

    ParsedSemanticModel {
        semantic_model: SemanticModel {
            unique_id: unique_id(ResourceType::SemanticModel, package, &decl.name),
            name: decl.name.clone(),
            package_name: package.to_string(),
            path: file.relative_path.clone(),
            original_file_path: file.original_file_path.clone(),
            fqn: vec![package.to_string(), decl.name.clone()],
            model: decl.model.clone(),
            description: decl.description.clone(),
            body: decl.body.clone(),
            depends_on: DependsOn::default(),
            created_at: chrono::Utc::now(),
        },
        refs,
    }
}

fn build_saved_query(
    package: &str,
    decl: &SavedQueryDecl,
    file: &DiscoveredFile,
) -> ParsedSavedQuery {
    let metric_names = match decl.query_params.get("metrics") {
        Some(JsonValue::Array(items)) => string_list(items),
        _ => Vec::new(),
    };

    ParsedSavedQuery {
        saved_query: SavedQuery {
            unique_id: unique_id(ResourceType::SavedQuery, package, &decl.name),
            name: decl.name.clone(),
            package_name: package.to_string(),
            path: file.relative_path.clone(),
            original_file_path: file.original_file_path.clone(),
            fqn: vec![package.to_string(), decl.name.clone()],
            description: decl.description.clone(),
            query_params: decl.query_params.clone(),
            depends_on: DependsOn::default(),
            created_at: chrono::Utc::now(),
        },
        metric_names,
    }
}

#[cfg(test)]
#[path = "schema_parser_test.rs"]
mod tests;
