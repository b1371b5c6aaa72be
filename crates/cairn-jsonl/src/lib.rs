//! Line-oriented JSON (JSONL) persistence primitives.
//!
//! This crate backs the cairn scheduler's file persistence with three
//! building blocks:
//!
//! - [`JsonlReader`] / [`read_jsonl_resilient`]: buffered line-by-line
//!   reading, either strict (a malformed line is an error) or resilient
//!   (malformed lines are skipped and reported as [`Warning`]s).
//! - [`JsonlWriter`]: buffered serialization of one JSON value per line.
//! - [`write_jsonl_atomic`]: crash-safe whole-file replacement via the
//!   temp-file-then-rename pattern.
//!
//! Resilience matters because a milestone ledger is append-heavy and long
//! lived: one corrupt line must never make the rest of the file unreadable.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod reader;
pub mod warning;
pub mod writer;

pub use error::{Error, Result};
pub use reader::{JsonlReader, read_jsonl_resilient};
pub use warning::{Warning, WarningCollector};
pub use writer::{JsonlWriter, write_jsonl_atomic, write_jsonl_atomic_iter};
