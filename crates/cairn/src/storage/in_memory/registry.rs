//! Core in-memory storage data structures.
//!
//! This module contains the contract registry and the per-contract graph
//! structure. The registry sits behind the store's outer `RwLock`; each
//! [`ContractGraph`] carries its own lock so contracts can be read and
//! mutated independently.

use crate::domain::{ContractId, Milestone, MilestoneId, NewMilestone};
use crate::error::{Error, Result};
use crate::id_generation::{IdGenerator, IdGeneratorConfig};
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// One contract's milestones and dependency graph (not thread-safe).
///
/// # Graph Representation
///
/// The dependency graph uses petgraph's `StableDiGraph` with edges directed
/// from **successor to predecessor** (source -> target means source waits on
/// target). A stable graph keeps the indices in `node_map` valid across node
/// removals.
///
/// See the module-level documentation for the full edge direction
/// convention.
pub(crate) struct ContractGraph {
    /// Milestones indexed by ID for O(1) lookups
    pub(super) milestones: HashMap<MilestoneId, Milestone>,

    /// Dependency graph using petgraph.
    ///
    /// Nodes contain `MilestoneId` values; edges carry no weight.
    /// Edge direction: source (successor) -> target (predecessor).
    pub(super) graph: StableDiGraph<MilestoneId, ()>,

    /// Mapping from MilestoneId to graph NodeIndex.
    ///
    /// All milestones in `self.milestones` must have a corresponding entry
    /// in `self.node_map`.
    pub(super) node_map: HashMap<MilestoneId, NodeIndex>,
}

impl ContractGraph {
    /// Create an empty contract graph.
    pub(super) fn new() -> Self {
        Self {
            milestones: HashMap::new(),
            graph: StableDiGraph::new(),
            node_map: HashMap::new(),
        }
    }
}

/// Registry of contract graphs (not thread-safe).
///
/// The registry owns the routing state: which contracts exist and which
/// contract each milestone belongs to. It's wrapped in the store's
/// `RwLock`; the per-contract locks hang off `contracts`.
pub(crate) struct Registry {
    /// Per-contract graphs, each behind its own lock.
    pub(super) contracts: HashMap<ContractId, Arc<RwLock<ContractGraph>>>,

    /// Owning contract of every stored milestone.
    ///
    /// Routes id-based operations to the right contract graph and backs the
    /// same-contract check for dependency edges.
    pub(super) membership: HashMap<MilestoneId, ContractId>,

    /// ID generator for creating new milestone IDs
    pub(super) id_generator: IdGenerator,

    /// Prefix for milestone IDs (e.g. "acme")
    prefix: String,
}

impl Registry {
    /// Create a new empty registry
    pub(crate) fn new(prefix: String) -> Self {
        let config = IdGeneratorConfig {
            prefix: prefix.clone(),
            database_size: 0,
        };

        Self {
            contracts: HashMap::new(),
            membership: HashMap::new(),
            id_generator: IdGenerator::new(config),
            prefix,
        }
    }

    /// Handle of an existing contract's graph, if any.
    pub(super) fn contract_handle(
        &self,
        contract: &ContractId,
    ) -> Option<Arc<RwLock<ContractGraph>>> {
        self.contracts.get(contract).cloned()
    }

    /// Handle of a contract's graph, creating the contract on first use.
    pub(super) fn get_or_create_contract(
        &mut self,
        contract: &ContractId,
    ) -> Arc<RwLock<ContractGraph>> {
        Arc::clone(
            self.contracts
                .entry(contract.clone())
                .or_insert_with(|| Arc::new(RwLock::new(ContractGraph::new()))),
        )
    }

    /// Route a milestone id to its contract's graph.
    ///
    /// # Errors
    ///
    /// Returns `Error::MilestoneNotFound` if the id is unknown.
    pub(super) fn handle_for(&self, id: &MilestoneId) -> Result<Arc<RwLock<ContractGraph>>> {
        let contract = self
            .membership
            .get(id)
            .ok_or_else(|| Error::MilestoneNotFound(id.clone()))?;
        self.contract_handle(contract)
            .ok_or_else(|| Error::MilestoneNotFound(id.clone()))
    }

    /// Route a dependency edge to the contract graph holding both endpoints.
    ///
    /// # Errors
    ///
    /// - `Error::MilestoneNotFound` if either id is unknown
    /// - `Error::CrossContract` if the ids belong to different contracts
    pub(super) fn route_edge(
        &self,
        successor: &MilestoneId,
        predecessor: &MilestoneId,
    ) -> Result<Arc<RwLock<ContractGraph>>> {
        let successor_contract = self
            .membership
            .get(successor)
            .ok_or_else(|| Error::MilestoneNotFound(successor.clone()))?;
        let predecessor_contract = self
            .membership
            .get(predecessor)
            .ok_or_else(|| Error::MilestoneNotFound(predecessor.clone()))?;

        if successor_contract != predecessor_contract {
            return Err(Error::CrossContract {
                successor: successor.clone(),
                predecessor: predecessor.clone(),
            });
        }

        self.contract_handle(successor_contract)
            .ok_or_else(|| Error::MilestoneNotFound(successor.clone()))
    }

    /// Update the ID generator's database size if we've crossed a threshold.
    ///
    /// ID length changes at 500 and 1500 milestones, so we only need to
    /// update when crossing these boundaries. This avoids O(n)
    /// re-registration on every create.
    pub(super) fn update_id_generator_if_needed(&mut self) {
        let current_size = self.membership.len();
        let old_size = self.id_generator.database_size();

        // Determine if we've crossed a length threshold
        let needs_update = match (old_size, current_size) {
            // Crossing 500 boundary (4 -> 5 chars)
            (0..=500, 501..) => true,
            // Crossing 1500 boundary (5 -> 6 chars)
            (0..=1500, 1501..) => true,
            // Crossing backwards (rare, but possible after deletes)
            (501.., 0..=500) => true,
            (1501.., 0..=1500) => true,
            _ => false,
        };

        if needs_update {
            // Only recreate generator when crossing length thresholds
            self.id_generator = IdGenerator::new(IdGeneratorConfig {
                prefix: self.prefix.clone(),
                database_size: current_size,
            });

            // Re-register all existing IDs (O(n), but only at thresholds)
            for id in self.membership.keys() {
                self.id_generator.register_id(id.as_str().to_string());
            }
        }
    }

    /// Generate a new unique ID for a milestone
    pub(super) fn generate_id(&mut self, new_milestone: &NewMilestone) -> Result<MilestoneId> {
        // Update generator config if we've crossed a length threshold
        self.update_id_generator_if_needed();

        let id_str = self
            .id_generator
            .generate(
                new_milestone.contract_id.as_str(),
                &new_milestone.name,
                new_milestone.description.as_deref(),
                new_milestone.owner_id.as_deref(),
            )
            .map_err(|e| Error::Storage(format!("ID generation failed: {e}")))?;

        Ok(MilestoneId::new(id_str))
    }
}
