//! Project parsing for Quarry.
//!
//! Walks a project's search paths, parses every resource file, applies
//! schema YAML, and assembles the manifest: [`discover_files`] finds the
//! inputs, the per-kind parsers turn them into nodes, and
//! [`build_manifest`] merges, patches, and resolves the whole set.
//! [`plan_reparse`] compares a previous build's file cache against the
//! current tree to keep incremental invocations cheap.

pub mod builder;
pub mod docs_parser;
pub mod error;
pub mod files;
pub mod macro_parser;
pub mod model_parser;
pub mod parsed;
pub mod partial;
pub mod schema_parser;
pub mod seed_parser;
pub mod snapshot_parser;

pub use builder::{build_manifest, build_project, Package};
pub use docs_parser::parse_docs;
pub use error::{BuildError, BuildResult};
pub use files::{discover_files, DiscoveredFile};
pub use macro_parser::parse_macros;
pub use model_parser::{parse_analysis, parse_model, parse_singular_test};
pub use parsed::ParsedNode;
pub use partial::{plan_reparse, FileRecord, ParseCache, ReparsePlan};
pub use schema_parser::{parse_schema_file, SchemaContents};
pub use seed_parser::parse_seed;
pub use snapshot_parser::parse_snapshots;
