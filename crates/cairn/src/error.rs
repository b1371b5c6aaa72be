//! Error types for cairn scheduling operations.

use crate::domain::{ContractId, MilestoneId, MilestoneStatus};
use std::io;
use thiserror::Error;

/// The error type for cairn scheduling operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Referenced milestone does not exist.
    #[error("Milestone not found: {0}")]
    MilestoneNotFound(MilestoneId),

    /// Milestone creation referenced a contract the directory does not know.
    #[error("Contract not found: {0}")]
    ContractNotFound(ContractId),

    /// A dependency edge tried to span two different contracts.
    #[error("Milestones {successor} and {predecessor} belong to different contracts")]
    CrossContract {
        /// The milestone that would gain the dependency.
        successor: MilestoneId,
        /// The milestone it would depend on.
        predecessor: MilestoneId,
    },

    /// The requested edge would close a dependency cycle.
    #[error(
        "Circular dependency: {successor} -> {predecessor} would close a dependency cycle"
    )]
    CircularDependency {
        /// The milestone that would gain the dependency.
        successor: MilestoneId,
        /// The milestone it would depend on.
        predecessor: MilestoneId,
    },

    /// The status state machine does not define this transition.
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: MilestoneStatus,
        /// Requested status.
        to: MilestoneStatus,
    },

    /// Internal consistency failure. Indicates a prior bug, not a user
    /// error; callers must not retry.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Input failed validation before any state was touched.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization or parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Storage backend error.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<cairn_jsonl::Error> for Error {
    fn from(err: cairn_jsonl::Error) -> Self {
        match err {
            cairn_jsonl::Error::Io(e) => Error::Io(e),
            cairn_jsonl::Error::Json(e) => Error::Json(e),
            cairn_jsonl::Error::InvalidFormat(msg) => Error::Storage(msg),
        }
    }
}

/// A specialized Result type for cairn scheduling operations.
pub type Result<T> = std::result::Result<T, Error>;
