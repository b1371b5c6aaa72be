//! JSONL persistence for in-memory storage.
//!
//! This module provides functions to load and save the in-memory storage
//! to JSONL (JSON Lines) files.

use super::InMemoryStore;
use super::graph;
use crate::contracts::ContractDirectory;
use crate::domain::{Milestone, MilestoneId};
use crate::error::Result;
use crate::storage::MilestoneStore;
use cairn_jsonl::{Warning as JsonlWarning, read_jsonl_resilient, write_jsonl_atomic};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Warnings that can occur during JSONL file loading.
///
/// These are non-fatal issues that don't prevent loading but indicate
/// data quality problems in the JSONL file. When warnings occur, the load
/// operation continues but problematic data is skipped.
///
/// # Handling Warnings
///
/// Applications should log or report these warnings to users, as they
/// indicate data corruption or integrity issues that may need manual
/// resolution.
///
/// **Example:**
/// ```no_run
/// # use cairn::contracts::OpenContracts;
/// # use cairn::storage::in_memory::{load_from_jsonl, LoadWarning};
/// # use std::path::Path;
/// # use std::sync::Arc;
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> anyhow::Result<()> {
/// let (store, warnings) = load_from_jsonl(
///     Path::new("milestones.jsonl"),
///     "acme".to_string(),
///     Arc::new(OpenContracts::new()),
/// )
/// .await?;
///
/// for warning in warnings {
///     match warning {
///         LoadWarning::MalformedJson { line_number, error } => {
///             eprintln!("Skipped malformed JSON at line {line_number}: {error}");
///         }
///         LoadWarning::InvalidMilestoneData { milestone_id, line_number, error } => {
///             eprintln!("Skipped invalid milestone {milestone_id} at record {line_number}: {error}");
///         }
///         LoadWarning::OrphanedDependency { successor, predecessor } => {
///             eprintln!("Skipped orphaned dependency: {successor} -> {predecessor}");
///         }
///         LoadWarning::CrossContractDependency { successor, predecessor } => {
///             eprintln!("Skipped cross-contract dependency: {successor} -> {predecessor}");
///         }
///         LoadWarning::CircularDependency { successor, predecessor } => {
///             eprintln!("Broke circular dependency: {successor} -> {predecessor}");
///         }
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// Malformed JSON line that couldn't be parsed
    ///
    /// **Effect**: Line is skipped entirely; no milestone created from this line.
    /// **Common causes**: File corruption, manual editing errors, incomplete writes.
    MalformedJson {
        /// 1-based line number in the file.
        line_number: usize,
        /// Parser error message.
        error: String,
    },

    /// Milestone data failed validation (empty name, oversized fields, etc.)
    ///
    /// **Effect**: The entire milestone is skipped and not loaded into storage.
    /// **Common causes**: Manual editing, version mismatches, data corruption.
    InvalidMilestoneData {
        /// Identifier claimed by the record.
        milestone_id: MilestoneId,
        /// 1-based record number among successfully parsed lines.
        line_number: usize,
        /// Validation error message.
        error: String,
    },

    /// Dependency references a milestone that doesn't exist in the file
    ///
    /// **Effect**: The dependency edge is skipped; both milestones are still
    /// loaded where present, but the relationship is not created.
    /// **Common causes**: Partial exports, deleted predecessors, file corruption.
    OrphanedDependency {
        /// Milestone carrying the dependency.
        successor: MilestoneId,
        /// The missing predecessor.
        predecessor: MilestoneId,
    },

    /// Dependency connects milestones in two different contracts
    ///
    /// **Effect**: The dependency edge is skipped; both milestones are loaded
    /// into their own contracts.
    /// **Common causes**: Manual editing, records moved between contracts.
    CrossContractDependency {
        /// Milestone carrying the dependency.
        successor: MilestoneId,
        /// The predecessor in another contract.
        predecessor: MilestoneId,
    },

    /// Adding a dependency would create a circular reference
    ///
    /// **Effect**: The dependency edge is skipped to break the cycle; both
    /// milestones are loaded but one edge is omitted.
    /// **Common causes**: Manual JSONL editing, bugs in earlier versions.
    CircularDependency {
        /// Milestone carrying the dependency.
        successor: MilestoneId,
        /// The predecessor whose edge closed the cycle.
        predecessor: MilestoneId,
    },
}

/// Load storage from a JSONL file.
///
/// Reads a JSONL (JSON Lines) file where each line is a serialized
/// [`Milestone`] and reconstructs the per-contract dependency graphs.
///
/// # Error Handling
///
/// - **Malformed JSON**: Skips the line and adds a warning
/// - **Invalid milestone data**: Skips the record and adds a warning
/// - **Orphaned / cross-contract dependencies**: Skips the edge, adds a warning
/// - **Circular dependencies**: Skips the edge and adds a warning
///
/// Only I/O failures abort the load; everything line-level degrades to a
/// [`LoadWarning`].
///
/// # Memory Considerations
///
/// The whole file is held in memory during the three-pass load, so expect a
/// transient allocation of roughly the file size times two.
///
/// # Returns
///
/// Returns a tuple of `(store, warnings)` where warnings contains all
/// non-fatal problems encountered during loading.
pub async fn load_from_jsonl(
    path: &Path,
    prefix: String,
    directory: Arc<dyn ContractDirectory>,
) -> Result<(Box<dyn MilestoneStore>, Vec<LoadWarning>)> {
    // First pass: resilient line-by-line parsing
    let (parsed, jsonl_warnings) = read_jsonl_resilient::<Milestone, _>(path).await?;

    let mut warnings = Vec::new();
    for warning in jsonl_warnings {
        match warning {
            JsonlWarning::MalformedJson { line_number, error } => {
                warnings.push(LoadWarning::MalformedJson { line_number, error });
            }
            JsonlWarning::SkippedLine {
                line_number,
                reason,
            } => {
                // Both variants indicate a line we could not parse.
                warnings.push(LoadWarning::MalformedJson {
                    line_number,
                    error: reason,
                });
            }
        }
    }

    // Validate records and filter out invalid ones.
    // Note: line_number here is the record index (1-based) within
    // successfully parsed records, not the file line number when malformed
    // lines were skipped.
    let mut milestones = Vec::new();
    for (index, milestone) in parsed.into_iter().enumerate() {
        if let Err(error) = milestone.validate() {
            warnings.push(LoadWarning::InvalidMilestoneData {
                milestone_id: milestone.id.clone(),
                line_number: index + 1,
                error,
            });
            continue;
        }
        milestones.push(milestone);
    }

    let store = Box::new(InMemoryStore::new(prefix, directory));
    let mut registry = store.registry.write().await;

    // Second pass: store milestones, create graph nodes, register IDs
    for milestone in &milestones {
        let handle = registry.get_or_create_contract(&milestone.contract_id);
        {
            let mut contract = handle.write().await;
            if !contract.node_map.contains_key(&milestone.id) {
                let node = contract.graph.add_node(milestone.id.clone());
                contract.node_map.insert(milestone.id.clone(), node);
            }
            contract
                .milestones
                .insert(milestone.id.clone(), milestone.clone());
        }

        registry
            .membership
            .insert(milestone.id.clone(), milestone.contract_id.clone());
        registry
            .id_generator
            .register_id(milestone.id.as_str().to_string());
    }

    // Third pass: reconstruct dependency edges with cycle detection
    for milestone in &milestones {
        let Some(handle) = registry.contract_handle(&milestone.contract_id) else {
            continue;
        };
        let mut contract = handle.write().await;

        for dep in &milestone.dependencies {
            match registry.membership.get(dep) {
                None => {
                    warnings.push(LoadWarning::OrphanedDependency {
                        successor: milestone.id.clone(),
                        predecessor: dep.clone(),
                    });
                    continue;
                }
                Some(contract_id) if *contract_id != milestone.contract_id => {
                    warnings.push(LoadWarning::CrossContractDependency {
                        successor: milestone.id.clone(),
                        predecessor: dep.clone(),
                    });
                    continue;
                }
                Some(_) => {}
            }

            let (Some(&successor_node), Some(&predecessor_node)) = (
                contract.node_map.get(&milestone.id),
                contract.node_map.get(dep),
            ) else {
                continue;
            };

            // A record listed twice collapses to one edge.
            if contract
                .graph
                .find_edge(successor_node, predecessor_node)
                .is_some()
            {
                continue;
            }

            if graph::would_create_cycle(&contract, successor_node, predecessor_node) {
                warnings.push(LoadWarning::CircularDependency {
                    successor: milestone.id.clone(),
                    predecessor: dep.clone(),
                });
                continue;
            }

            contract.graph.add_edge(successor_node, predecessor_node, ());
        }
    }

    debug!(
        milestones = registry.membership.len(),
        contracts = registry.contracts.len(),
        warnings = warnings.len(),
        path = %path.display(),
        "loaded milestones from JSONL"
    );

    drop(registry);

    Ok((store, warnings))
}

/// Save storage to a JSONL file with atomic writes.
///
/// Writes every milestone as one JSON line, via a temporary file that is
/// renamed over the target. If the process is interrupted, the original
/// file remains unchanged.
pub async fn save_to_jsonl(store: &dyn MilestoneStore, path: &Path) -> Result<()> {
    let mut milestones = store.export_all().await?;

    // Sort dependencies for deterministic serialization, so repeated saves
    // of the same state produce identical files.
    for milestone in &mut milestones {
        milestone.dependencies.sort();
    }

    write_jsonl_atomic(path, &milestones).await?;

    debug!(
        milestones = milestones.len(),
        path = %path.display(),
        "saved milestones to JSONL"
    );

    Ok(())
}
