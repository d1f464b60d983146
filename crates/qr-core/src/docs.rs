//! Documentation blocks parsed from `{% docs %}` markdown files.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A `{% docs name %}...{% enddocs %}` block. Referenced from descriptions
/// via `doc('name')`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocBlock {
    /// Unique id: `doc.{package}.{name}`
    pub unique_id: String,

    pub name: String,

    pub package_name: String,

    /// Path relative to the package's docs root
    pub path: String,

    /// Path relative to the project root
    pub original_file_path: String,

    /// Markdown body between the delimiters, trimmed
    pub block_contents: String,

    pub created_at: DateTime<Utc>,
}

impl DocBlock {
    pub fn same_contents(&self, other: &DocBlock) -> bool {
        self.unique_id == other.unique_id && self.block_contents == other.block_contents
    }
}
