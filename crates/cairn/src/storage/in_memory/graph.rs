//! Dependency graph algorithms using petgraph.
//!
//! This module provides the graph operations for the in-memory storage:
//! - Cycle detection for dependency edits
//! - Dependency satisfaction (all predecessors completed)
//! - Critical path extraction (topological order over flagged milestones)
//!
//! All functions operate on a single [`ContractGraph`] and are called with
//! that contract's lock already held.

use super::registry::ContractGraph;
use crate::domain::{Milestone, MilestoneId, MilestoneStatus};
use crate::error::{Error, Result};
use chrono::NaiveDate;
use petgraph::Direction;
use petgraph::algo;
use petgraph::stable_graph::NodeIndex;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use tracing::error;

/// Internal implementation of cycle detection.
///
/// Checks whether adding an edge `successor -> predecessor` would create a
/// cycle, i.e. whether `successor` is already reachable from `predecessor`.
/// `has_path_connecting` treats a node as reachable from itself, so a
/// self-edge is caught by the same check.
pub(super) fn would_create_cycle(
    contract: &ContractGraph,
    successor: NodeIndex,
    predecessor: NodeIndex,
) -> bool {
    algo::has_path_connecting(&contract.graph, predecessor, successor, None)
}

/// Internal implementation of dependency satisfaction.
///
/// A milestone's dependencies are met when every direct predecessor is
/// `Completed`. The answer is recomputed on every call; nothing is cached.
///
/// # Edge Direction Reminder
///
/// Edges point from **successor -> predecessor** (source waits on target),
/// so the outgoing neighbors of a node are its predecessors.
pub(super) fn dependencies_met_impl(contract: &ContractGraph, id: &MilestoneId) -> Result<bool> {
    let node = contract
        .node_map
        .get(id)
        .ok_or_else(|| Error::MilestoneNotFound(id.clone()))?;

    for predecessor in contract
        .graph
        .neighbors_directed(*node, Direction::Outgoing)
    {
        let predecessor_id = &contract.graph[predecessor];
        let Some(milestone) = contract.milestones.get(predecessor_id) else {
            error!(
                milestone_id = %predecessor_id,
                "graph references a milestone with no stored record"
            );
            return Err(Error::InvariantViolation(format!(
                "graph node {predecessor_id} has no milestone record"
            )));
        };
        if milestone.status != MilestoneStatus::Completed {
            return Ok(false);
        }
    }

    Ok(true)
}

/// Internal implementation of critical path extraction.
///
/// Runs Kahn's algorithm over the subgraph induced by flagged milestones
/// (`is_on_critical_path == true`); an edge participates only when both of
/// its endpoints are flagged. Predecessors are emitted before successors,
/// and milestones that become ready together are ordered by `(due_date, id)`
/// through a min-heap.
///
/// # Errors
///
/// Returns `Error::InvariantViolation` if the flagged subgraph contains a
/// cycle. The edge guards keep every contract graph acyclic, so this is
/// reported as an internal bug instead of looping forever.
pub(super) fn critical_path_impl(contract: &ContractGraph) -> Result<Vec<Milestone>> {
    let flagged = |node: NodeIndex| {
        contract
            .milestones
            .get(&contract.graph[node])
            .is_some_and(|milestone| milestone.is_on_critical_path)
    };

    // Count each flagged milestone's flagged predecessors.
    let mut pending: HashMap<&MilestoneId, (usize, NodeIndex, &Milestone)> = HashMap::new();
    for (id, milestone) in &contract.milestones {
        if !milestone.is_on_critical_path {
            continue;
        }
        let Some(&node) = contract.node_map.get(id) else {
            error!(milestone_id = %id, "stored milestone has no graph node");
            return Err(Error::InvariantViolation(format!(
                "milestone {id} has no graph node"
            )));
        };
        let blocking = contract
            .graph
            .neighbors_directed(node, Direction::Outgoing)
            .filter(|&predecessor| flagged(predecessor))
            .count();
        pending.insert(id, (blocking, node, milestone));
    }

    let flagged_total = pending.len();
    let mut ready: BinaryHeap<Reverse<(NaiveDate, &MilestoneId)>> = pending
        .iter()
        .filter(|&(_, &(blocking, _, _))| blocking == 0)
        .map(|(&id, &(_, _, milestone))| Reverse((milestone.due_date, id)))
        .collect();

    let mut path: Vec<Milestone> = Vec::with_capacity(flagged_total);
    while let Some(Reverse((_, id))) = ready.pop() {
        let Some((_, node, milestone)) = pending.remove(id) else {
            continue;
        };
        path.push(milestone.clone());

        // Emitting `id` releases flagged successors that were only waiting
        // on it. Successors sit behind incoming edges.
        for successor in contract
            .graph
            .neighbors_directed(node, Direction::Incoming)
        {
            let successor_id = &contract.graph[successor];
            if let Some((blocking, _, waiting)) = pending.get_mut(successor_id) {
                *blocking -= 1;
                if *blocking == 0 {
                    ready.push(Reverse((waiting.due_date, successor_id)));
                }
            }
        }
    }

    if path.len() < flagged_total {
        error!(
            expected = flagged_total,
            emitted = path.len(),
            "critical path extraction found a cycle among flagged milestones"
        );
        return Err(Error::InvariantViolation(
            "cycle among critical-path milestones".to_string(),
        ));
    }

    Ok(path)
}
