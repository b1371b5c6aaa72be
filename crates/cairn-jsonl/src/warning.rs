//! Non-fatal problems encountered while reading JSONL data.
//!
//! Resilient reads never abort on a bad line; they record what was skipped
//! and keep going. A [`Warning`] describes one skipped line, and a
//! [`WarningCollector`] gathers warnings from a stream whose consumer only
//! sees the successfully parsed records.

use std::sync::{Arc, Mutex};

/// A non-fatal problem found on one line of JSONL input.
///
/// Warnings carry the 1-based line number of the offending line so callers
/// can report the exact location in the source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// The line was not valid JSON, or did not deserialize into the
    /// requested type.
    MalformedJson {
        /// 1-based line number of the offending line.
        line_number: usize,
        /// The underlying parse error, stringified.
        error: String,
    },

    /// The line was skipped for a reason other than a parse failure,
    /// such as an aborted read.
    SkippedLine {
        /// 1-based line number of the offending line.
        line_number: usize,
        /// Why the line was skipped.
        reason: String,
    },
}

impl Warning {
    /// Returns the 1-based line number this warning refers to.
    #[must_use]
    pub fn line_number(&self) -> usize {
        match self {
            Warning::MalformedJson { line_number, .. }
            | Warning::SkippedLine { line_number, .. } => *line_number,
        }
    }

    /// Returns a stable, machine-friendly name for the warning variant.
    ///
    /// Useful for filtering or counting warnings by category.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Warning::MalformedJson { .. } => "malformed_json",
            Warning::SkippedLine { .. } => "skipped_line",
        }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::MalformedJson { line_number, error } => {
                write!(f, "line {line_number}: malformed JSON ({error})")
            }
            Warning::SkippedLine {
                line_number,
                reason,
            } => {
                write!(f, "line {line_number}: skipped ({reason})")
            }
        }
    }
}

impl std::error::Error for Warning {}

/// Thread-safe accumulator for [`Warning`]s.
///
/// Clones share the same underlying storage, which is what lets
/// [`JsonlReader::stream_resilient`](crate::JsonlReader::stream_resilient)
/// hand one handle to the stream and another to the caller:
///
/// ```
/// use cairn_jsonl::warning::{Warning, WarningCollector};
///
/// let collector = WarningCollector::new();
/// let handle = collector.clone();
///
/// handle.add(Warning::MalformedJson {
///     line_number: 3,
///     error: "expected value".to_string(),
/// });
///
/// assert_eq!(collector.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct WarningCollector {
    warnings: Arc<Mutex<Vec<Warning>>>,
}

impl WarningCollector {
    /// Creates a new empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self {
            warnings: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Records a warning.
    pub fn add(&self, warning: Warning) {
        self.warnings
            .lock()
            .expect("warning collector mutex should not be poisoned")
            .push(warning);
    }

    /// Returns the number of warnings collected so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.warnings
            .lock()
            .expect("warning collector mutex should not be poisoned")
            .len()
    }

    /// Returns `true` if no warnings have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a copy of all warnings collected so far, in insertion order.
    #[must_use]
    pub fn warnings(&self) -> Vec<Warning> {
        self.warnings
            .lock()
            .expect("warning collector mutex should not be poisoned")
            .clone()
    }

    /// Consumes the collector, returning the collected warnings.
    ///
    /// If other clones still hold the storage, the warnings are copied out.
    #[must_use]
    pub fn into_warnings(self) -> Vec<Warning> {
        Arc::try_unwrap(self.warnings)
            .map(|mutex| {
                mutex
                    .into_inner()
                    .expect("warning collector mutex should not be poisoned")
            })
            .unwrap_or_else(|arc| {
                arc.lock()
                    .expect("warning collector mutex should not be poisoned")
                    .clone()
            })
    }
}
