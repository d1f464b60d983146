//! Build outcome errors for qr-parser.
//!
//! Individual parse, validation, and resolution failures are
//! [`CoreError`]s; a build run either aborts on the first structural error
//! (duplicate ids, cycles) or collects everything else into one
//! [`AggregatedError`] so the user sees every broken file at once.

use qr_core::error::{AggregatedError, CoreError};
use thiserror::Error;

/// Why a manifest build failed
#[derive(Error, Debug)]
pub enum BuildError {
    /// A structural or project-level error that invalidates the whole build
    #[error(transparent)]
    Fatal(#[from] CoreError),

    /// One or more per-file/per-node errors, reported together
    #[error(transparent)]
    Aggregated(#[from] AggregatedError),
}

/// Result type alias for manifest construction
pub type BuildResult<T> = Result<T, BuildError>;
