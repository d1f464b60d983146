//! Error types for qr-core
//!
//! Errors fall into four classes that callers route on ([`ErrorClass`]):
//! parsing (malformed source), validation (a resource's config or shape
//! fails its contract), compilation (reference resolution and graph
//! structure), and project (configuration loading outside any single
//! resource). Per-file and per-node errors are aggregated via
//! [`AggregatedError`]; structural errors (cycles, unique-id collisions)
//! abort a build outright.

use thiserror::Error;

/// Coarse classification of a [`CoreError`], used by callers to pick exit
/// codes and decide whether an error is aggregable or aborts the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed source text or YAML; file-scoped, aggregated
    Parsing,
    /// Config/shape contract failure; file-and-field-scoped, aggregated
    Validation,
    /// Reference resolution or graph structure failure
    Compilation,
    /// Project-level configuration problem
    Project,
}

/// Core error type for Quarry
#[derive(Error, Debug)]
pub enum CoreError {
    // Parsing errors (P0xx)
    /// P001: Template or SQL file failed to parse
    #[error("[P001] Parse error in {path}: {message}")]
    ParseError { path: String, message: String },

    /// P002: Malformed YAML document
    #[error("[P002] Invalid YAML in {path}: {message}")]
    YamlError { path: String, message: String },

    /// P003: IO error with file path context
    #[error("[P003] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// P004: Conflicting freshness declarations on a source or table
    #[error("[P004] Source '{source_name}' table '{table_name}' declares both loaded_at_field and loaded_at_query at the same level in {path}")]
    FreshnessConflict {
        source_name: String,
        table_name: String,
        path: String,
    },

    // Validation errors (V0xx)
    /// V001: A required field is missing or has the wrong type
    #[error("[V001] Invalid value for '{field}' in {path}: {message}")]
    InvalidField {
        field: String,
        path: String,
        message: String,
    },

    /// V002: Unknown key under a strict schema context
    #[error("[V002] Unknown key '{key}' in {path} (under '{context}')")]
    UnknownKey {
        key: String,
        path: String,
        context: String,
    },

    /// V003: Snapshot config is missing a strategy-required field
    #[error("[V003] Snapshot '{snapshot}' with strategy '{strategy}' requires '{field}'")]
    SnapshotConfig {
        snapshot: String,
        strategy: String,
        field: String,
    },

    /// V004: Enum value outside the allowed set
    #[error("[V004] Invalid {field} '{value}' in {path}: expected one of {allowed}")]
    InvalidEnumValue {
        field: String,
        value: String,
        path: String,
        allowed: String,
    },

    // Compilation errors (C0xx)
    /// C001: ref() to a node that does not exist
    #[error("[C001] Model '{node}' depends on a node named '{target}' which was not found")]
    RefNotFound { node: String, target: String },

    /// C002: ref() resolves to multiple packages without disambiguation
    #[error("[C002] Ambiguous ref '{target}' from '{node}': found in packages {candidates}. Qualify the ref with a package name")]
    AmbiguousRef {
        node: String,
        target: String,
        candidates: String,
    },

    /// C003: ref() with a version that is not declared
    #[error("[C003] Version {version} of '{target}' referenced from '{node}' is not declared")]
    RefVersionNotFound {
        node: String,
        target: String,
        version: String,
    },

    /// C004: source() to an undeclared source table
    #[error("[C004] Model '{node}' references source '{source_name}.{table_name}' which is not defined")]
    SourceNotFound {
        node: String,
        source_name: String,
        table_name: String,
    },

    /// C005: Circular dependency detected (structural, aborts the build)
    #[error("[C005] Found a cycle: {cycle}")]
    CircularDependency { cycle: String },

    /// C006: Two resources produced the same unique_id (structural, aborts)
    #[error("[C006] Duplicate resource id '{unique_id}' found in {path1} and {path2}")]
    DuplicateResource {
        unique_id: String,
        path1: String,
        path2: String,
    },

    /// C007: A YAML patch targets a node that was never parsed
    #[error("[C007] Patch in {path} targets '{target}' which was not found among parsed {resource_type} nodes")]
    PatchTargetNotFound {
        path: String,
        target: String,
        resource_type: String,
    },

    /// C008: Template render failure inside a resource file
    #[error("[C008] Compilation error in {path}: {message}")]
    TemplateRender { path: String, message: String },

    /// C009: A banned override of a built-in context function
    #[error("[C009] Macro '{name}' overrides the built-in '{builtin}' and cannot be used in this context")]
    BannedMacroOverride { name: String, builtin: String },

    // Selector errors (S0xx)
    /// S001: Malformed selection expression
    #[error("[S001] Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// S002: Selection matched nothing it was required to match
    #[error("[S002] Selector '{selector}' does not match any node")]
    SelectorNoMatch { selector: String },

    // Project errors (PRJ0xx)
    /// PRJ001: Project configuration file not found
    #[error("[PRJ001] Project file not found: {path}")]
    ProjectNotFound { path: String },

    /// PRJ002: Project configuration failed to parse or is invalid
    #[error("[PRJ002] Invalid project configuration: {message}")]
    ProjectInvalid { message: String },

    /// IO error without path context
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML error without file context (prefer [`CoreError::YamlError`])
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Classify this error for exit-code routing and aggregation policy.
    pub fn class(&self) -> ErrorClass {
        match self {
            CoreError::ParseError { .. }
            | CoreError::YamlError { .. }
            | CoreError::IoWithPath { .. }
            | CoreError::FreshnessConflict { .. }
            | CoreError::Io(_)
            | CoreError::Yaml(_)
            | CoreError::Json(_) => ErrorClass::Parsing,
            CoreError::InvalidField { .. }
            | CoreError::UnknownKey { .. }
            | CoreError::SnapshotConfig { .. }
            | CoreError::InvalidEnumValue { .. } => ErrorClass::Validation,
            CoreError::RefNotFound { .. }
            | CoreError::AmbiguousRef { .. }
            | CoreError::RefVersionNotFound { .. }
            | CoreError::SourceNotFound { .. }
            | CoreError::CircularDependency { .. }
            | CoreError::DuplicateResource { .. }
            | CoreError::PatchTargetNotFound { .. }
            | CoreError::TemplateRender { .. }
            | CoreError::BannedMacroOverride { .. }
            | CoreError::InvalidSelector { .. }
            | CoreError::SelectorNoMatch { .. } => ErrorClass::Compilation,
            CoreError::ProjectNotFound { .. } | CoreError::ProjectInvalid { .. } => {
                ErrorClass::Project
            }
        }
    }

    /// Structural errors invalidate the whole build; everything else is
    /// collected per file/node and surfaced together.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            CoreError::CircularDependency { .. } | CoreError::DuplicateResource { .. }
        )
    }
}

/// A batch of per-file/per-node errors collected during one parse pass.
///
/// A build with only aggregable errors still reports which nodes parsed
/// successfully; callers display every entry in one run.
#[derive(Error, Debug)]
#[error("{}", self.render())]
pub struct AggregatedError {
    /// Individual errors in the order they were encountered
    pub errors: Vec<CoreError>,
}

impl AggregatedError {
    /// Wrap a list of errors. Callers should check `is_empty` first.
    pub fn new(errors: Vec<CoreError>) -> Self {
        Self { errors }
    }

    /// Number of collected errors
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// True when no errors were collected
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    fn render(&self) -> String {
        let mut out = format!("{} error(s) during parsing:", self.errors.len());
        for err in &self.errors {
            out.push_str("\n  ");
            out.push_str(&err.to_string());
        }
        out
    }
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
