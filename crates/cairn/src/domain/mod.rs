//! Domain types for milestone scheduling.
//!
//! A [`Milestone`] is one deliverable inside a contract. Milestones in the
//! same contract form a directed acyclic graph through their `dependencies`
//! (each entry names a predecessor that must complete first). The status
//! state machine lives here too, so "completed" semantics are defined once
//! and the storage layer only wires them up.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum accepted length for a milestone name.
pub const MAX_NAME_LEN: usize = 500;

/// Maximum accepted length for a milestone description.
pub const MAX_DESCRIPTION_LEN: usize = 10_000;

/// Unique identifier for a milestone.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MilestoneId(pub String);

impl MilestoneId {
    /// Create a new milestone ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MilestoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for MilestoneId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MilestoneId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of the contract a milestone belongs to.
///
/// Contracts are the partition boundary: dependency edges and queries never
/// cross them. The scheduler treats the id as opaque.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContractId(pub String);

impl ContractId {
    /// Create a new contract ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ContractId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ContractId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A deliverable milestone inside a contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milestone {
    /// Unique identifier.
    pub id: MilestoneId,

    /// Owning contract.
    pub contract_id: ContractId,

    /// Milestone name.
    pub name: String,

    /// Free-text description (optional).
    pub description: Option<String>,

    /// Calendar date the milestone is due (no time-of-day).
    pub due_date: NaiveDate,

    /// Current status.
    pub status: MilestoneStatus,

    /// Owner, stored opaquely for attribution; never validated here.
    pub owner_id: Option<String>,

    /// Operator-set critical-path tag. Stored, never derived.
    pub is_on_critical_path: bool,

    /// Date the milestone entered [`MilestoneStatus::Completed`];
    /// `None` exactly while the status is not `Completed`.
    pub completed_date: Option<NaiveDate>,

    /// Free-text notes attached at completion (opaque to scheduling).
    pub completion_notes: Option<String>,

    /// Predecessor milestone ids: every listed milestone must complete
    /// before this one is considered unblocked.
    pub dependencies: Vec<MilestoneId>,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Last-mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Text-field checks shared by creation, update, and load paths.
fn validate_text_fields(name: &str, description: Option<&str>) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("milestone name must not be empty".to_string());
    }
    if name.len() > MAX_NAME_LEN {
        return Err(format!("milestone name exceeds {MAX_NAME_LEN} characters"));
    }
    if let Some(description) = description
        && description.len() > MAX_DESCRIPTION_LEN
    {
        return Err(format!(
            "milestone description exceeds {MAX_DESCRIPTION_LEN} characters"
        ));
    }
    Ok(())
}

fn validate_dependency_list(dependencies: &[MilestoneId]) -> Result<(), String> {
    let mut seen = std::collections::HashSet::new();
    for dep in dependencies {
        if !seen.insert(dep) {
            return Err(format!("duplicate dependency on {dep}"));
        }
    }
    Ok(())
}

impl Milestone {
    /// Validates the stored fields, mirroring the checks run at creation.
    ///
    /// Used when applying partial updates and when vetting records loaded
    /// from disk.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message if the name is empty or oversized,
    /// the description is oversized, or `dependencies` contains duplicates.
    pub fn validate(&self) -> Result<(), String> {
        validate_text_fields(&self.name, self.description.as_deref())?;
        validate_dependency_list(&self.dependencies)
    }

    /// Runs the status state machine, mutating `status` and, on entry into
    /// `Completed`, setting `completed_date` to `on` if it is still unset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`](crate::Error::InvalidTransition)
    /// for any pair the machine does not define; see
    /// [`MilestoneStatus::can_transition`].
    pub fn apply_status(&mut self, to: MilestoneStatus, on: NaiveDate) -> crate::error::Result<()> {
        if !self.status.can_transition(to) {
            return Err(crate::error::Error::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        if to == MilestoneStatus::Completed && self.completed_date.is_none() {
            self.completed_date = Some(on);
        }
        Ok(())
    }
}

/// Status of a milestone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneStatus {
    /// Work has not begun.
    NotStarted,

    /// Work is underway.
    InProgress,

    /// The deliverable is done. Terminal; reopening is not modeled.
    Completed,
}

impl MilestoneStatus {
    /// Whether the state machine defines a transition from `self` to `to`.
    ///
    /// Defined transitions are `NotStarted -> InProgress -> Completed` and
    /// the direct `NotStarted -> Completed` shortcut. Writing the current
    /// status again is accepted so callers can retry cheaply. Nothing leaves
    /// `Completed`.
    #[must_use]
    pub fn can_transition(self, to: MilestoneStatus) -> bool {
        use MilestoneStatus::{Completed, InProgress, NotStarted};
        matches!(
            (self, to),
            (NotStarted, InProgress | Completed) | (InProgress, Completed)
        ) || self == to
    }
}

impl fmt::Display for MilestoneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MilestoneStatus::NotStarted => "not_started",
            MilestoneStatus::InProgress => "in_progress",
            MilestoneStatus::Completed => "completed",
        };
        write!(f, "{name}")
    }
}

/// Data for creating a new milestone.
///
/// Status is not part of the request: every milestone starts
/// [`MilestoneStatus::NotStarted`].
#[derive(Debug, Clone)]
pub struct NewMilestone {
    /// Owning contract; must exist according to the contract directory.
    pub contract_id: ContractId,

    /// Milestone name.
    pub name: String,

    /// Free-text description (optional).
    pub description: Option<String>,

    /// Due date.
    pub due_date: NaiveDate,

    /// Owner attribution (optional).
    pub owner_id: Option<String>,

    /// Initial critical-path tag.
    pub is_on_critical_path: bool,

    /// Initial predecessors; each must already exist in the same contract.
    pub dependencies: Vec<MilestoneId>,
}

impl NewMilestone {
    /// Validates the request before any state is touched.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message if the name is empty or oversized,
    /// the description is oversized, or `dependencies` contains duplicates.
    pub fn validate(&self) -> Result<(), String> {
        validate_text_fields(&self.name, self.description.as_deref())?;
        validate_dependency_list(&self.dependencies)
    }
}

/// Partial update for an existing milestone.
///
/// Absent fields are left untouched. Status is deliberately not updatable
/// here: completion has side effects, so it only happens through
/// `update_status`/`complete` on the store.
#[derive(Debug, Clone, Default)]
pub struct MilestoneUpdate {
    /// New name.
    pub name: Option<String>,

    /// New description.
    pub description: Option<String>,

    /// New due date.
    pub due_date: Option<NaiveDate>,

    /// New owner; `Some(None)` clears the owner.
    pub owner_id: Option<Option<String>>,

    /// New critical-path tag.
    pub is_on_critical_path: Option<bool>,
}
