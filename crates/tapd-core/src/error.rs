//! Typed failures returned to the command layer.
//!
//! Parsing and resolution errors are returned, never retried internally;
//! retry (e.g. re-snapshot after staleness) is a caller concern.

use thiserror::Error;

/// Errors produced by the tapd core.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The selector token doesn't match any known grammar form.
    /// Detectable at parse time, never silently coerced.
    #[error("invalid selector syntax: {0}")]
    SelectorSyntax(String),

    /// Valid selector, but nothing in the snapshot matches it. Carries
    /// the selector's rendered form for diagnostics.
    #[error("no matching element for selector: {0}")]
    NoMatch(String),

    /// A persisted snapshot failed the structural shape check.
    #[error("invalid snapshot, re-snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;
