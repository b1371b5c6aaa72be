//! Error types for cairn-jsonl operations.

use std::io;
use thiserror::Error;

/// The error type for cairn-jsonl operations.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error while reading or writing a file.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON parsing or serialization error.
    ///
    /// Only surfaced by the strict APIs; the resilient readers convert
    /// per-line parse failures into [`crate::Warning`]s instead.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The input is not valid JSONL (for example, an unterminated final line
    /// where one was required).
    #[error("Invalid JSONL format: {0}")]
    InvalidFormat(String),
}

/// A specialized Result type for cairn-jsonl operations.
pub type Result<T> = std::result::Result<T, Error>;
