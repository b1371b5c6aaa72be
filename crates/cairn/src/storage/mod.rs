//! Storage abstraction layer for cairn.
//!
//! This module provides the core storage trait and factory for creating
//! storage backends. It supports multiple implementations:
//!
//! - **In-memory**: Fast, ephemeral storage backed by HashMap and petgraph
//! - **JSONL**: Persistent file-based storage using JSON Lines format
//!
//! # Architecture
//!
//! The storage layer uses an async trait to enable both blocking (in-memory)
//! and truly async (future database-backed) implementations. The trait is
//! object-safe, allowing for dynamic dispatch via `Box<dyn MilestoneStore>`.
//!
//! # Test Utilities
//!
//! This module provides a [`MockStore`] implementation for testing code that
//! depends on the [`MilestoneStore`] trait. To use it in your tests, enable
//! the `test-util` feature:
//!
//! ```toml
//! [dev-dependencies]
//! cairn = { version = "...", features = ["test-util"] }
//! ```
//!
//! # Example
//!
//! ```no_run
//! use cairn::contracts::OpenContracts;
//! use cairn::domain::{ContractId, NewMilestone};
//! use cairn::storage::{create_store, MilestoneStore, StoreBackend};
//! use chrono::NaiveDate;
//! use std::sync::Arc;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     // Create in-memory storage with a prefix for milestone IDs.
//!     // In real applications, the prefix comes from SchedulerConfig.milestone_prefix.
//!     let mut store = create_store(
//!         StoreBackend::InMemory,
//!         "acme".to_string(),
//!         Arc::new(OpenContracts::new()),
//!     )
//!     .await?;
//!
//!     // Create a milestone
//!     let new_milestone = NewMilestone {
//!         contract_id: ContractId::new("contract-7"),
//!         name: "Foundation pour".to_string(),
//!         description: None,
//!         due_date: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
//!         owner_id: Some("alice".to_string()),
//!         is_on_critical_path: true,
//!         dependencies: vec![],
//!     };
//!
//!     let milestone = store.create(new_milestone).await?;
//!     println!("Created milestone: {}", milestone.id);
//!
//!     Ok(())
//! }
//! ```

use crate::contracts::ContractDirectory;
use crate::domain::{
    ContractId, Milestone, MilestoneId, MilestoneStatus, MilestoneUpdate, NewMilestone,
};
use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// Storage backend implementations
pub mod in_memory;

/// Core storage trait for milestone scheduling.
///
/// This trait defines the interface for all storage backends. Implementations
/// must be `Send + Sync` to support concurrent access in async contexts.
///
/// # Method Categories
///
/// - **CRUD**: `create`, `get`, `update`, `delete`, `list_by_contract`
/// - **Status**: `update_status`, `complete`, `dependencies_met`
/// - **Dependencies**: `add_dependency`, `remove_dependency`, `would_cycle`
/// - **Scheduling**: `critical_path`, `upcoming`, `overdue`, `due_this_week`
/// - **Batch Operations**: `import_milestones`, `export_all`
/// - **Persistence**: `save`, `reload`
///
/// # Error Handling
///
/// All methods return `Result<T>` where the error type includes:
/// - `MilestoneNotFound`: Requested milestone doesn't exist
/// - `ContractNotFound`: Creation referenced an unknown contract
/// - `CrossContract`: Dependency edge would span two contracts
/// - `CircularDependency`: Operation would create a cycle
/// - `InvalidTransition`: Status change the state machine does not define
/// - `Storage`: Backend-specific errors
///
/// # Thread Safety
///
/// Implementations should use appropriate synchronization primitives
/// (`tokio::sync::RwLock` for in-memory, transactions for database backends)
/// to ensure thread-safe access.
#[async_trait]
pub trait MilestoneStore: Send + Sync {
    // ========== CRUD Operations ==========

    /// Create a new milestone.
    ///
    /// Generates a unique ID, sets creation timestamps, and records the
    /// milestone as `NotStarted`. Initial `dependencies` must name existing
    /// milestones in the same contract.
    ///
    /// # Implementation Requirements
    ///
    /// Implementations **MUST** validate input by calling
    /// `new_milestone.validate()` and **MUST** consult the contract
    /// directory before creating the milestone.
    ///
    /// # Errors
    ///
    /// - `Error::Validation` if the request fails field validation
    /// - `Error::ContractNotFound` if the contract is unknown
    /// - `Error::MilestoneNotFound` if an initial dependency doesn't exist
    /// - `Error::Validation` if an initial dependency lives in another
    ///   contract
    async fn create(&mut self, new_milestone: NewMilestone) -> Result<Milestone>;

    /// Get a milestone by ID.
    ///
    /// # Errors
    ///
    /// Returns `Error::MilestoneNotFound` if the milestone doesn't exist.
    async fn get(&self, id: &MilestoneId) -> Result<Milestone>;

    /// Update an existing milestone.
    ///
    /// Only fields present in `updates` are modified. Returns the updated
    /// milestone. Status is deliberately absent from [`MilestoneUpdate`];
    /// use [`update_status`](MilestoneStore::update_status) or
    /// [`complete`](MilestoneStore::complete).
    ///
    /// # Errors
    ///
    /// Returns `Error::MilestoneNotFound` if the milestone doesn't exist,
    /// `Error::Validation` if the updated fields fail validation.
    async fn update(&mut self, id: &MilestoneId, updates: MilestoneUpdate) -> Result<Milestone>;

    /// Delete a milestone.
    ///
    /// Removes the milestone and prunes it from the `dependencies` of every
    /// other milestone in the same contract. Successors are never deleted;
    /// they only lose the edge.
    ///
    /// # Errors
    ///
    /// Returns `Error::MilestoneNotFound` if the milestone doesn't exist.
    async fn delete(&mut self, id: &MilestoneId) -> Result<()>;

    /// List all milestones of one contract.
    ///
    /// Results are sorted ascending by `(due_date, id)`. An unknown contract
    /// yields an empty list.
    async fn list_by_contract(&self, contract: &ContractId) -> Result<Vec<Milestone>>;

    // ========== Status Engine ==========

    /// Transition a milestone's status.
    ///
    /// Runs the `NotStarted -> InProgress -> Completed` state machine
    /// (the direct `NotStarted -> Completed` shortcut is allowed, and writing
    /// the current status again is a no-op). On entering `Completed`, sets
    /// `completed_date` to the current UTC date if unset.
    ///
    /// # Errors
    ///
    /// - `Error::MilestoneNotFound` if the milestone doesn't exist
    /// - `Error::InvalidTransition` for any undefined transition, including
    ///   every transition out of `Completed`
    async fn update_status(
        &mut self,
        id: &MilestoneId,
        status: MilestoneStatus,
    ) -> Result<Milestone>;

    /// Complete a milestone, optionally attaching completion notes.
    ///
    /// Equivalent to `update_status(id, Completed)` plus recording `notes`.
    /// The notes are opaque to scheduling.
    ///
    /// # Errors
    ///
    /// Same as [`update_status`](MilestoneStore::update_status).
    async fn complete(&mut self, id: &MilestoneId, notes: Option<String>) -> Result<Milestone>;

    /// Whether every predecessor of a milestone is `Completed`.
    ///
    /// Derived on every call from current statuses, never stored. A
    /// milestone with no predecessors trivially has its dependencies met.
    ///
    /// # Errors
    ///
    /// Returns `Error::MilestoneNotFound` if the milestone doesn't exist.
    async fn dependencies_met(&self, id: &MilestoneId) -> Result<bool>;

    // ========== Dependency Management ==========

    /// Add a dependency edge: `successor` waits on `predecessor`.
    ///
    /// An already-present edge is an idempotent no-op. The edge is checked
    /// against the cycle guard before insertion.
    ///
    /// # Errors
    ///
    /// - `Error::MilestoneNotFound` if either milestone doesn't exist
    /// - `Error::CrossContract` if the milestones live in different contracts
    /// - `Error::CircularDependency` if the edge would close a cycle
    async fn add_dependency(
        &mut self,
        successor: &MilestoneId,
        predecessor: &MilestoneId,
    ) -> Result<()>;

    /// Remove a dependency edge.
    ///
    /// Removing an absent edge is a no-op; removal is idempotent.
    ///
    /// # Errors
    ///
    /// - `Error::MilestoneNotFound` if either milestone doesn't exist
    /// - `Error::CrossContract` if the milestones live in different contracts
    async fn remove_dependency(
        &mut self,
        successor: &MilestoneId,
        predecessor: &MilestoneId,
    ) -> Result<()>;

    /// Check if adding `successor -> predecessor` would create a cycle.
    ///
    /// Returns `true` iff `successor` is reachable from `predecessor` along
    /// existing edges (which covers `successor == predecessor`).
    ///
    /// # Errors
    ///
    /// - `Error::MilestoneNotFound` if either milestone doesn't exist
    /// - `Error::CrossContract` if the milestones live in different contracts
    async fn would_cycle(
        &self,
        successor: &MilestoneId,
        predecessor: &MilestoneId,
    ) -> Result<bool>;

    // ========== Scheduling Queries ==========

    /// Extract the critical path of a contract.
    ///
    /// Returns the milestones flagged `is_on_critical_path`, ordered so that
    /// predecessors come before successors; ties among simultaneously ready
    /// milestones are broken by ascending `(due_date, id)`. An unknown
    /// contract yields an empty path.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvariantViolation` if the flagged subgraph contains
    /// a cycle. The acyclicity guard makes that unreachable in practice, so
    /// it indicates an internal bug rather than bad input.
    async fn critical_path(&self, contract: &ContractId) -> Result<Vec<Milestone>>;

    /// Milestones of a contract due within the next `within_days` days.
    ///
    /// The window is `[today, today + within_days]`, both ends inclusive,
    /// in UTC. Status is not filtered: completed milestones still appear.
    /// Results are sorted ascending by `(due_date, id)`.
    async fn upcoming(&self, contract: &ContractId, within_days: u32) -> Result<Vec<Milestone>>;

    /// Milestones of a contract past their due date and not yet completed.
    ///
    /// Results are sorted ascending by `(due_date, id)`.
    async fn overdue(&self, contract: &ContractId) -> Result<Vec<Milestone>>;

    /// Milestones of a contract due in the current ISO week.
    ///
    /// The week runs Monday through Sunday around today's UTC date. Status
    /// is not filtered. Results are sorted ascending by `(due_date, id)`.
    async fn due_this_week(&self, contract: &ContractId) -> Result<Vec<Milestone>>;

    // ========== Batch Operations ==========

    /// Import multiple milestones.
    ///
    /// Used for bulk loading from JSONL files or migrations. Dependency
    /// edges are resolved after all milestones are imported; edges whose
    /// endpoints are missing or span contracts are skipped.
    async fn import_milestones(&mut self, milestones: Vec<Milestone>) -> Result<()>;

    /// Export all milestones.
    ///
    /// Returns every stored milestone sorted by `(contract_id, id)`,
    /// suitable for JSONL export or backup.
    async fn export_all(&self) -> Result<Vec<Milestone>>;

    // ========== Persistence ==========

    /// Save changes to persistent storage.
    ///
    /// This method takes `&self` (not `&mut self`) to allow saving from
    /// shared references. Implementations use interior mutability to handle
    /// this safely, which enables saving after read-only queries and
    /// periodic auto-save from background tasks.
    ///
    /// For in-memory storage with JSONL backing, this writes to disk.
    /// For plain in-memory storage, this is a no-op.
    async fn save(&self) -> Result<()>;

    /// Reload state from persistent storage, discarding in-memory changes.
    ///
    /// Restores the store to match the on-disk state. Useful in long-running
    /// processes when a `save()` fails and in-memory state must be rolled
    /// back to something consistent.
    ///
    /// - **JSONL backend**: Re-reads the file and rebuilds in-memory state
    /// - **In-memory only**: No-op (there's no persistent state to reload)
    ///
    /// # Errors
    ///
    /// Returns an error if the backing file cannot be read or parsed.
    async fn reload(&mut self) -> Result<()>;
}

/// Storage backend configuration.
///
/// Determines which storage implementation to use.
#[derive(Debug, Clone)]
pub enum StoreBackend {
    /// In-memory storage (ephemeral)
    InMemory,

    /// JSONL file storage (persistent)
    Jsonl(PathBuf),
}

impl StoreBackend {
    /// Returns the data file path for file-based backends.
    ///
    /// Returns `Some(path)` for backends that use a file (e.g., JSONL),
    /// or `None` for backends that don't (e.g., InMemory).
    #[must_use]
    pub fn data_path(&self) -> Option<&Path> {
        match self {
            StoreBackend::Jsonl(path) => Some(path),
            StoreBackend::InMemory => None,
        }
    }
}

/// Wrapper that adds JSONL file persistence to any storage backend.
///
/// This wrapper holds the file path and implements `save()` by writing all
/// milestones to the JSONL file atomically.
struct JsonlBackedStore {
    inner: Box<dyn MilestoneStore>,
    path: PathBuf,
    prefix: String,
    directory: Arc<dyn ContractDirectory>,
}

#[async_trait]
impl MilestoneStore for JsonlBackedStore {
    async fn create(&mut self, new_milestone: NewMilestone) -> Result<Milestone> {
        self.inner.create(new_milestone).await
    }

    async fn get(&self, id: &MilestoneId) -> Result<Milestone> {
        self.inner.get(id).await
    }

    async fn update(&mut self, id: &MilestoneId, updates: MilestoneUpdate) -> Result<Milestone> {
        self.inner.update(id, updates).await
    }

    async fn delete(&mut self, id: &MilestoneId) -> Result<()> {
        self.inner.delete(id).await
    }

    async fn list_by_contract(&self, contract: &ContractId) -> Result<Vec<Milestone>> {
        self.inner.list_by_contract(contract).await
    }

    async fn update_status(
        &mut self,
        id: &MilestoneId,
        status: MilestoneStatus,
    ) -> Result<Milestone> {
        self.inner.update_status(id, status).await
    }

    async fn complete(&mut self, id: &MilestoneId, notes: Option<String>) -> Result<Milestone> {
        self.inner.complete(id, notes).await
    }

    async fn dependencies_met(&self, id: &MilestoneId) -> Result<bool> {
        self.inner.dependencies_met(id).await
    }

    async fn add_dependency(
        &mut self,
        successor: &MilestoneId,
        predecessor: &MilestoneId,
    ) -> Result<()> {
        self.inner.add_dependency(successor, predecessor).await
    }

    async fn remove_dependency(
        &mut self,
        successor: &MilestoneId,
        predecessor: &MilestoneId,
    ) -> Result<()> {
        self.inner.remove_dependency(successor, predecessor).await
    }

    async fn would_cycle(
        &self,
        successor: &MilestoneId,
        predecessor: &MilestoneId,
    ) -> Result<bool> {
        self.inner.would_cycle(successor, predecessor).await
    }

    async fn critical_path(&self, contract: &ContractId) -> Result<Vec<Milestone>> {
        self.inner.critical_path(contract).await
    }

    async fn upcoming(&self, contract: &ContractId, within_days: u32) -> Result<Vec<Milestone>> {
        self.inner.upcoming(contract, within_days).await
    }

    async fn overdue(&self, contract: &ContractId) -> Result<Vec<Milestone>> {
        self.inner.overdue(contract).await
    }

    async fn due_this_week(&self, contract: &ContractId) -> Result<Vec<Milestone>> {
        self.inner.due_this_week(contract).await
    }

    async fn import_milestones(&mut self, milestones: Vec<Milestone>) -> Result<()> {
        self.inner.import_milestones(milestones).await
    }

    async fn export_all(&self) -> Result<Vec<Milestone>> {
        self.inner.export_all().await
    }

    async fn save(&self) -> Result<()> {
        in_memory::save_to_jsonl(self.inner.as_ref(), &self.path).await
    }

    async fn reload(&mut self) -> Result<()> {
        // Reload from the JSONL file, replacing the inner storage
        if self.path.exists() {
            let (new_store, warnings) = in_memory::load_from_jsonl(
                &self.path,
                self.prefix.clone(),
                Arc::clone(&self.directory),
            )
            .await?;
            for warning in &warnings {
                tracing::warn!(warning = ?warning, "JSONL reload warning");
            }
            self.inner = new_store;
        } else {
            // File doesn't exist - reset to empty storage
            self.inner =
                in_memory::new_in_memory_store(self.prefix.clone(), Arc::clone(&self.directory));
        }
        Ok(())
    }
}

/// Create a storage instance for the given backend.
///
/// This factory function returns a trait object that can be used
/// polymorphically regardless of the backend implementation.
///
/// # Arguments
///
/// * `backend` - The storage backend to use
/// * `prefix` - The prefix for generated milestone IDs (e.g., "acme")
/// * `directory` - The contract directory consulted on milestone creation
///
/// # Example
///
/// ```no_run
/// use cairn::contracts::OpenContracts;
/// use cairn::storage::{create_store, StoreBackend};
/// use std::sync::Arc;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> anyhow::Result<()> {
///     let store = create_store(
///         StoreBackend::InMemory,
///         "acme".to_string(),
///         Arc::new(OpenContracts::new()),
///     )
///     .await?;
///     // Use store...
///     Ok(())
/// }
/// ```
///
/// # Errors
///
/// - `Error::Io` if file operations fail (JSONL backend)
/// - `Error::Storage` for backend-specific initialization errors
pub async fn create_store(
    backend: StoreBackend,
    prefix: String,
    directory: Arc<dyn ContractDirectory>,
) -> Result<Box<dyn MilestoneStore>> {
    match backend {
        StoreBackend::InMemory => Ok(in_memory::new_in_memory_store(prefix, directory)),
        StoreBackend::Jsonl(path) => {
            // JSONL backend uses the in-memory store with file persistence
            let inner = if path.exists() {
                let (store, warnings) =
                    in_memory::load_from_jsonl(&path, prefix.clone(), Arc::clone(&directory))
                        .await?;
                // Log warnings but continue - the store is still usable
                for warning in &warnings {
                    tracing::warn!(warning = ?warning, "JSONL load warning");
                }
                store
            } else {
                // File doesn't exist yet (first run) - create empty storage
                in_memory::new_in_memory_store(prefix.clone(), Arc::clone(&directory))
            };
            // Wrap in JsonlBackedStore so save() writes to file
            Ok(Box::new(JsonlBackedStore {
                inner,
                path,
                prefix,
                directory,
            }))
        }
    }
}

// ========== Test Utilities ==========

/// The hardcoded milestone ID returned by [`MockStore`].
#[cfg(any(test, feature = "test-util"))]
pub const MOCK_MILESTONE_ID: &str = "test-1";

/// Mock implementation of [`MilestoneStore`] for testing.
///
/// This is a **stateless** mock that provides a minimal implementation of
/// the storage trait for verifying trait object usage. It always returns
/// hardcoded data for milestone "test-1" but does not persist anything
/// between calls. Timestamps are generated fresh on each call.
///
/// # Behavior
///
/// - `create`: Always returns a new milestone with ID "test-1"
/// - `get`: Returns the test milestone for ID "test-1", `MilestoneNotFound`
///   otherwise
/// - `list_by_contract`, `critical_path`, `upcoming`, `overdue`,
///   `due_this_week`, `export_all`: Return empty vectors
/// - `dependencies_met`: Always `true`; `would_cycle`: always `false`
/// - Mutating methods: Unimplemented (will panic if called)
///
/// For real CRUD behavior in tests, use
/// [`in_memory::new_in_memory_store`] instead.
#[cfg(any(test, feature = "test-util"))]
#[derive(Clone, Copy)]
#[non_exhaustive]
pub struct MockStore;

#[cfg(any(test, feature = "test-util"))]
impl MockStore {
    /// Create a new MockStore instance.
    pub fn new() -> Self {
        Self
    }

    /// Creates a test milestone with the given ID.
    ///
    /// Useful for building expected values in downstream tests that need to
    /// match the format returned by [`MockStore`].
    pub fn create_test_milestone(id: MilestoneId) -> Milestone {
        use chrono::{NaiveDate, Utc};

        Milestone {
            id,
            contract_id: ContractId::new("contract-1"),
            name: "Test Milestone".to_string(),
            description: Some("Test description".to_string()),
            due_date: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            status: MilestoneStatus::NotStarted,
            owner_id: None,
            is_on_critical_path: false,
            completed_date: None,
            completion_notes: None,
            dependencies: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

#[cfg(any(test, feature = "test-util"))]
impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-util"))]
#[async_trait]
impl MilestoneStore for MockStore {
    async fn create(&mut self, _new_milestone: NewMilestone) -> Result<Milestone> {
        Ok(Self::create_test_milestone(MilestoneId::new(
            MOCK_MILESTONE_ID,
        )))
    }

    async fn get(&self, id: &MilestoneId) -> Result<Milestone> {
        if id.as_str() == MOCK_MILESTONE_ID {
            Ok(Self::create_test_milestone(id.clone()))
        } else {
            Err(crate::error::Error::MilestoneNotFound(id.clone()))
        }
    }

    async fn update(&mut self, _id: &MilestoneId, _updates: MilestoneUpdate) -> Result<Milestone> {
        unimplemented!(
            "MockStore::update() is not implemented. Use in_memory::new_in_memory_store() for full CRUD."
        )
    }

    async fn delete(&mut self, _id: &MilestoneId) -> Result<()> {
        unimplemented!(
            "MockStore::delete() is not implemented. Use in_memory::new_in_memory_store() for full CRUD."
        )
    }

    async fn list_by_contract(&self, _contract: &ContractId) -> Result<Vec<Milestone>> {
        Ok(vec![])
    }

    async fn update_status(
        &mut self,
        _id: &MilestoneId,
        _status: MilestoneStatus,
    ) -> Result<Milestone> {
        unimplemented!(
            "MockStore::update_status() is not implemented. Use in_memory::new_in_memory_store() for full CRUD."
        )
    }

    async fn complete(&mut self, _id: &MilestoneId, _notes: Option<String>) -> Result<Milestone> {
        unimplemented!(
            "MockStore::complete() is not implemented. Use in_memory::new_in_memory_store() for full CRUD."
        )
    }

    async fn dependencies_met(&self, _id: &MilestoneId) -> Result<bool> {
        Ok(true)
    }

    async fn add_dependency(
        &mut self,
        _successor: &MilestoneId,
        _predecessor: &MilestoneId,
    ) -> Result<()> {
        unimplemented!(
            "MockStore::add_dependency() is not implemented. Use in_memory::new_in_memory_store() for full CRUD."
        )
    }

    async fn remove_dependency(
        &mut self,
        _successor: &MilestoneId,
        _predecessor: &MilestoneId,
    ) -> Result<()> {
        unimplemented!(
            "MockStore::remove_dependency() is not implemented. Use in_memory::new_in_memory_store() for full CRUD."
        )
    }

    async fn would_cycle(
        &self,
        _successor: &MilestoneId,
        _predecessor: &MilestoneId,
    ) -> Result<bool> {
        Ok(false)
    }

    async fn critical_path(&self, _contract: &ContractId) -> Result<Vec<Milestone>> {
        Ok(vec![])
    }

    async fn upcoming(&self, _contract: &ContractId, _within_days: u32) -> Result<Vec<Milestone>> {
        Ok(vec![])
    }

    async fn overdue(&self, _contract: &ContractId) -> Result<Vec<Milestone>> {
        Ok(vec![])
    }

    async fn due_this_week(&self, _contract: &ContractId) -> Result<Vec<Milestone>> {
        Ok(vec![])
    }

    async fn import_milestones(&mut self, _milestones: Vec<Milestone>) -> Result<()> {
        Ok(())
    }

    async fn export_all(&self) -> Result<Vec<Milestone>> {
        Ok(vec![])
    }

    async fn save(&self) -> Result<()> {
        Ok(())
    }

    async fn reload(&mut self) -> Result<()> {
        // MockStore has no backing store, so reload is a no-op
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::OpenContracts;
    use crate::error::Error;
    use chrono::NaiveDate;

    fn sample_request(name: &str) -> NewMilestone {
        NewMilestone {
            contract_id: ContractId::new("contract-1"),
            name: name.to_string(),
            description: None,
            due_date: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            owner_id: None,
            is_on_critical_path: false,
            dependencies: vec![],
        }
    }

    #[tokio::test]
    async fn trait_object_usage() {
        // Verify that MilestoneStore is object-safe and usable via Box<dyn>
        let mut store: Box<dyn MilestoneStore> = Box::new(MockStore::new());

        let milestone = store.create(sample_request("Test")).await.unwrap();
        assert_eq!(milestone.id.as_str(), MOCK_MILESTONE_ID);
        assert_eq!(milestone.name, "Test Milestone");
    }

    #[tokio::test]
    async fn mock_get_behavior() {
        let store: Box<dyn MilestoneStore> = Box::new(MockStore::new());

        let found = store.get(&MilestoneId::new(MOCK_MILESTONE_ID)).await.unwrap();
        assert_eq!(found.id.as_str(), MOCK_MILESTONE_ID);

        let missing = store.get(&MilestoneId::new("test-99")).await;
        assert!(matches!(missing, Err(Error::MilestoneNotFound(_))));
    }

    #[tokio::test]
    async fn mock_queries_are_empty() {
        let store: Box<dyn MilestoneStore> = Box::new(MockStore::new());
        let contract = ContractId::new("contract-1");

        assert!(store.list_by_contract(&contract).await.unwrap().is_empty());
        assert!(store.critical_path(&contract).await.unwrap().is_empty());
        assert!(store.upcoming(&contract, 30).await.unwrap().is_empty());
        assert!(store.overdue(&contract).await.unwrap().is_empty());
        assert!(store.due_this_week(&contract).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mock_store_copy_semantics() {
        let mock = MockStore::new();
        let _copy1 = mock;
        let _copy2 = mock; // Still usable - Copy semantics work
        let _: Box<dyn MilestoneStore> = Box::new(mock);
    }

    #[tokio::test]
    async fn jsonl_reload_restores_disk_state() {
        use tempfile::TempDir;

        let temp_dir = TempDir::new().unwrap();
        let jsonl_path = temp_dir.path().join("milestones.jsonl");

        let mut store = create_store(
            StoreBackend::Jsonl(jsonl_path.clone()),
            "test".into(),
            Arc::new(OpenContracts::new()),
        )
        .await
        .unwrap();

        let created = store.create(sample_request("Original name")).await.unwrap();
        let id = created.id.clone();
        store.save().await.unwrap();

        // Modify in memory without saving
        let update = MilestoneUpdate {
            name: Some("Modified name".to_string()),
            ..Default::default()
        };
        let modified = store.update(&id, update).await.unwrap();
        assert_eq!(modified.name, "Modified name");

        // Reload from disk restores the saved state
        store.reload().await.unwrap();
        let after_reload = store.get(&id).await.unwrap();
        assert_eq!(after_reload.name, "Original name");
    }

    #[tokio::test]
    async fn jsonl_reload_with_missing_file_resets() {
        use tempfile::TempDir;

        let temp_dir = TempDir::new().unwrap();
        let jsonl_path = temp_dir.path().join("milestones.jsonl");

        let mut store = create_store(
            StoreBackend::Jsonl(jsonl_path.clone()),
            "test".into(),
            Arc::new(OpenContracts::new()),
        )
        .await
        .unwrap();

        let created = store.create(sample_request("Ephemeral")).await.unwrap();
        let id = created.id.clone();
        store.save().await.unwrap();

        std::fs::remove_file(&jsonl_path).unwrap();

        // Reload resets to empty storage
        store.reload().await.unwrap();
        assert!(matches!(
            store.get(&id).await,
            Err(Error::MilestoneNotFound(_))
        ));
    }

    #[tokio::test]
    async fn in_memory_reload_is_noop() {
        let mut store = create_store(
            StoreBackend::InMemory,
            "test".into(),
            Arc::new(OpenContracts::new()),
        )
        .await
        .unwrap();

        let created = store.create(sample_request("Kept")).await.unwrap();
        let id = created.id.clone();

        store.reload().await.unwrap();

        let found = store.get(&id).await.unwrap();
        assert_eq!(found.name, "Kept");
    }

    #[test]
    fn backend_data_path() {
        let jsonl = StoreBackend::Jsonl(PathBuf::from("/tmp/m.jsonl"));
        assert_eq!(jsonl.data_path(), Some(Path::new("/tmp/m.jsonl")));
        assert_eq!(StoreBackend::InMemory.data_path(), None);
    }
}
