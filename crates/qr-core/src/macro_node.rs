//! Macro nodes parsed from `{% macro %}` blocks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A Jinja macro definition. One file may define several macros; each gets
/// its own node with unique id `macro.{package}.{name}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroNode {
    /// Unique id: `macro.{package}.{name}`
    pub unique_id: String,

    /// Macro name as written in the block
    pub name: String,

    /// Owning package name
    pub package_name: String,

    /// Path relative to the package's macro root
    pub path: String,

    /// Path relative to the project root
    pub original_file_path: String,

    /// Full text of the macro block, delimiters included
    pub macro_sql: String,

    /// Macro description from a patch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Unique ids of macros this macro calls
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on_macros: Vec<String>,

    /// When this macro was parsed
    pub created_at: DateTime<Utc>,
}

impl MacroNode {
    /// Generic test macros are declared with a `test_` prefix but invoked
    /// without it in YAML `tests:` entries.
    pub fn is_generic_test(&self) -> bool {
        self.name.starts_with("test_")
    }

    /// The short name a YAML `tests:` entry uses to invoke this macro
    pub fn test_short_name(&self) -> Option<&str> {
        self.name.strip_prefix("test_")
    }

    pub fn same_contents(&self, other: &MacroNode) -> bool {
        self.unique_id == other.unique_id && self.macro_sql == other.macro_sql
    }
}
