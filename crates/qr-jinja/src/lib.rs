//! Template expansion layer for Quarry.
//!
//! Wraps minijinja with the project context functions (ref, source, config,
//! var, env_var), macro registration, and the static extraction fast path
//! used during manifest construction.

pub mod calls;
pub mod environment;
pub mod error;
pub mod extract;

pub use calls::{CallLog, CapturedCall, RefCall, SourceCall};
pub use environment::{TemplateEngine, PROTECTED_NAMES};
pub use error::{JinjaError, JinjaResult};
pub use extract::{is_statically_extractable, Expander, Expansion};
