//! Error types for qr-jinja

use std::error::Error as StdError;
use thiserror::Error;

/// Template expansion errors
#[derive(Error, Debug)]
pub enum JinjaError {
    /// Template syntax or render error (J001)
    #[error("[J001] Template error in {path}: {message}")]
    RenderError { path: String, message: String },

    /// Unknown variable (J002)
    #[error("[J002] Undefined variable '{name}'. Define it in the vars: section of the project file")]
    UnknownVariable { name: String },

    /// A ref/source call with the wrong argument shape (J003)
    #[error("[J003] Invalid {function}() call in {path}: {message}")]
    InvalidCall {
        function: String,
        path: String,
        message: String,
    },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for JinjaError
pub type JinjaResult<T> = Result<T, JinjaError>;

impl JinjaError {
    /// Wrap a minijinja error with the offending file path.
    ///
    /// minijinja nests the interesting detail (undefined function, syntax
    /// position) in the error chain, so the chain is flattened into one
    /// message.
    pub fn render(path: &str, err: &minijinja::Error) -> Self {
        let mut message = err.to_string();
        let mut next = err.source();
        while let Some(cause) = next {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            next = cause.source();
        }
        JinjaError::RenderError {
            path: path.to_string(),
            message,
        }
    }
}
