//! In-memory storage backend using HashMap and petgraph.
//!
//! This module provides a fast, **ephemeral** storage implementation where
//! all data is held in RAM and **lost when the process exits**. It is
//! suitable for:
//!
//! - Testing and development
//! - Short-lived scheduling sessions
//! - Embedding in services that persist elsewhere
//!
//! # Persistence
//!
//! This backend supports **optional JSONL persistence** via the
//! `load_from_jsonl()` and `save_to_jsonl()` functions. Data can be loaded
//! from and saved to disk while maintaining fast in-memory operations.
//!
//! - **In-memory only**: Use `new_in_memory_store()` for ephemeral storage
//! - **With persistence**: Use [`create_store`](crate::storage::create_store)
//!   with a JSONL backend, whose `save()` writes through to the file
//!
//! The trait's `save()` method is a no-op for the plain in-memory store. Use
//! `save_to_jsonl()` directly for one-off file exports.
//!
//! # Architecture
//!
//! Milestones are partitioned by contract. The implementation uses:
//!
//! - A registry mapping `ContractId` to its contract graph, plus a
//!   membership map routing each `MilestoneId` to its owning contract
//! - Per contract: `HashMap<MilestoneId, Milestone>` for O(1) lookups,
//!   `petgraph::stable_graph::StableDiGraph` for the dependency graph, and a
//!   node map from ids to graph indices (stable across node removals)
//! - Hash-based ID generation with adaptive length (4-6 chars)
//!
//! ## Graph Representation and Edge Direction Convention
//!
//! The dependency graph uses a **successor -> predecessor** edge direction
//! pattern:
//!
//! - **Edge source**: The milestone that waits (the successor)
//! - **Edge target**: The milestone being waited on (the predecessor)
//!
//! So if milestone B depends on milestone A, the edge is `B -> A`: outgoing
//! neighbors are predecessors, incoming neighbors are successors. Edges
//! never cross contract boundaries.
//!
//! ## Locking Model
//!
//! The registry sits behind one `tokio::sync::RwLock`; every contract graph
//! has its own. Operations lock the registry first (read for routing, write
//! for create/delete/import), then the contract. Mutations in different
//! contracts run concurrently; mutations in one contract serialize on its
//! write lock. No lock is held across calls into the contract directory.
//!
//! # Performance Characteristics
//!
//! - Create: O(1) amortized, O(n) when crossing ID length thresholds
//!   (500, 1500 milestones)
//! - Read/update: O(1) plus lock acquisition
//! - Delete: O(d) where d is the number of edges touching the milestone
//! - Cycle check: O(n + e) reachability within one contract
//! - Critical path / temporal queries: O(n + e) over one contract

mod graph;
mod jsonl;
mod queries;
mod registry;
mod trait_impl;

use crate::contracts::ContractDirectory;
use crate::storage::MilestoneStore;
use registry::Registry;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

// Re-export public API
pub use jsonl::{LoadWarning, load_from_jsonl, save_to_jsonl};

/// Thread-safe in-memory store.
///
/// Holds the contract registry behind a read-write lock and the directory
/// consulted on milestone creation. It implements [`MilestoneStore`] via the
/// trait implementation in `trait_impl.rs`.
pub(crate) struct InMemoryStore {
    /// Contract registry; outer lock of the two-level locking model.
    registry: RwLock<Registry>,

    /// Contract existence checks during `create`.
    directory: Arc<dyn ContractDirectory>,
}

impl InMemoryStore {
    pub(super) fn new(prefix: String, directory: Arc<dyn ContractDirectory>) -> Self {
        Self {
            registry: RwLock::new(Registry::new(prefix)),
            directory,
        }
    }
}

/// Create a new in-memory store instance.
///
/// # Arguments
///
/// * `prefix` - The prefix for milestone IDs (e.g., "acme")
/// * `directory` - The contract directory consulted on milestone creation
///
/// # Example
///
/// ```
/// use cairn::contracts::OpenContracts;
/// use cairn::storage::in_memory::new_in_memory_store;
/// use std::sync::Arc;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let store = new_in_memory_store("acme".to_string(), Arc::new(OpenContracts::new()));
///     // Use store...
/// }
/// ```
pub fn new_in_memory_store(
    prefix: String,
    directory: Arc<dyn ContractDirectory>,
) -> Box<dyn MilestoneStore> {
    debug!(prefix = %prefix, "creating in-memory milestone store");
    Box::new(InMemoryStore::new(prefix, directory))
}
