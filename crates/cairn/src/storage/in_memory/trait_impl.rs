//! MilestoneStore trait implementation for in-memory storage.

use super::InMemoryStore;
use super::graph;
use super::queries;
use crate::domain::{
    ContractId, Milestone, MilestoneId, MilestoneStatus, MilestoneUpdate, NewMilestone,
};
use crate::error::{Error, Result};
use crate::storage::MilestoneStore;
use async_trait::async_trait;
use chrono::Utc;
use petgraph::Direction;
use petgraph::visit::EdgeRef;

#[async_trait]
impl MilestoneStore for InMemoryStore {
    async fn create(&mut self, new_milestone: NewMilestone) -> Result<Milestone> {
        // === Phase 1: Field validation and contract check (no locks) ===
        new_milestone.validate().map_err(Error::Validation)?;

        if !self
            .directory
            .contract_exists(&new_milestone.contract_id)
            .await?
        {
            return Err(Error::ContractNotFound(new_milestone.contract_id.clone()));
        }

        let mut registry = self.registry.write().await;

        // === Phase 2: Dependency validation (no mutations) ===
        for dep in &new_milestone.dependencies {
            match registry.membership.get(dep) {
                None => return Err(Error::MilestoneNotFound(dep.clone())),
                Some(contract) if *contract != new_milestone.contract_id => {
                    return Err(Error::Validation(format!(
                        "dependency {dep} belongs to contract {contract}, not {}",
                        new_milestone.contract_id
                    )));
                }
                Some(_) => {}
            }
        }

        // === Phase 3: ID generation and registration ===
        let id = registry.generate_id(&new_milestone)?;
        registry
            .membership
            .insert(id.clone(), new_milestone.contract_id.clone());
        let handle = registry.get_or_create_contract(&new_milestone.contract_id);

        // === Phase 4: Insert milestone and edges ===
        let mut contract = handle.write().await;
        let now = Utc::now();
        let milestone = Milestone {
            id: id.clone(),
            contract_id: new_milestone.contract_id,
            name: new_milestone.name,
            description: new_milestone.description,
            due_date: new_milestone.due_date,
            status: MilestoneStatus::NotStarted,
            owner_id: new_milestone.owner_id,
            is_on_critical_path: new_milestone.is_on_critical_path,
            completed_date: None,
            completion_notes: None,
            dependencies: new_milestone.dependencies.clone(),
            created_at: now,
            updated_at: now,
        };

        let node = contract.graph.add_node(id.clone());
        contract.node_map.insert(id.clone(), node);

        // A brand-new node has no incoming edges, so the initial dependency
        // edges cannot close a cycle. The targets were validated against the
        // registry, so their nodes exist.
        for dep in &new_milestone.dependencies {
            let dep_node = contract.node_map[dep];
            contract.graph.add_edge(node, dep_node, ());
        }

        contract.milestones.insert(id, milestone.clone());

        Ok(milestone)
    }

    async fn get(&self, id: &MilestoneId) -> Result<Milestone> {
        let registry = self.registry.read().await;
        let handle = registry.handle_for(id)?;
        let contract = handle.read().await;
        contract
            .milestones
            .get(id)
            .cloned()
            .ok_or_else(|| Error::MilestoneNotFound(id.clone()))
    }

    async fn update(&mut self, id: &MilestoneId, updates: MilestoneUpdate) -> Result<Milestone> {
        let registry = self.registry.read().await;
        let handle = registry.handle_for(id)?;
        let mut contract = handle.write().await;

        let milestone = contract
            .milestones
            .get_mut(id)
            .ok_or_else(|| Error::MilestoneNotFound(id.clone()))?;

        // Apply updates to a candidate first so a failed validation leaves
        // the stored milestone untouched.
        let mut candidate = milestone.clone();
        if let Some(name) = updates.name {
            candidate.name = name;
        }
        if let Some(description) = updates.description {
            candidate.description = Some(description);
        }
        if let Some(due_date) = updates.due_date {
            candidate.due_date = due_date;
        }
        if let Some(owner_id) = updates.owner_id {
            candidate.owner_id = owner_id;
        }
        if let Some(is_on_critical_path) = updates.is_on_critical_path {
            candidate.is_on_critical_path = is_on_critical_path;
        }

        candidate.validate().map_err(Error::Validation)?;
        candidate.updated_at = Utc::now();

        *milestone = candidate;
        Ok(milestone.clone())
    }

    async fn delete(&mut self, id: &MilestoneId) -> Result<()> {
        let mut registry = self.registry.write().await;

        let contract_id = registry
            .membership
            .get(id)
            .cloned()
            .ok_or_else(|| Error::MilestoneNotFound(id.clone()))?;
        let handle = registry
            .contract_handle(&contract_id)
            .ok_or_else(|| Error::MilestoneNotFound(id.clone()))?;

        let mut contract = handle.write().await;
        let Some(&node) = contract.node_map.get(id) else {
            return Err(Error::MilestoneNotFound(id.clone()));
        };

        // Collect successors before the node disappears. They stay in the
        // contract; only the edge goes away.
        let successors: Vec<MilestoneId> = contract
            .graph
            .edges_directed(node, Direction::Incoming)
            .map(|edge| contract.graph[edge.source()].clone())
            .collect();

        contract.graph.remove_node(node);
        contract.node_map.remove(id);
        contract.milestones.remove(id);

        let now = Utc::now();
        for successor_id in successors {
            if let Some(successor) = contract.milestones.get_mut(&successor_id) {
                let before = successor.dependencies.len();
                successor.dependencies.retain(|dep| dep != id);
                if successor.dependencies.len() != before {
                    successor.updated_at = now;
                }
            }
        }

        registry.membership.remove(id);

        Ok(())
    }

    async fn list_by_contract(&self, contract: &ContractId) -> Result<Vec<Milestone>> {
        let registry = self.registry.read().await;
        let Some(handle) = registry.contract_handle(contract) else {
            return Ok(Vec::new());
        };
        let contract_graph = handle.read().await;

        let mut milestones: Vec<Milestone> = contract_graph.milestones.values().cloned().collect();
        queries::sort_schedule(&mut milestones);
        Ok(milestones)
    }

    async fn update_status(
        &mut self,
        id: &MilestoneId,
        status: MilestoneStatus,
    ) -> Result<Milestone> {
        let registry = self.registry.read().await;
        let handle = registry.handle_for(id)?;
        let mut contract = handle.write().await;

        let milestone = contract
            .milestones
            .get_mut(id)
            .ok_or_else(|| Error::MilestoneNotFound(id.clone()))?;

        // Re-writing the current status is accepted but not a mutation.
        let changed = milestone.status != status;
        milestone.apply_status(status, Utc::now().date_naive())?;
        if changed {
            milestone.updated_at = Utc::now();
        }

        Ok(milestone.clone())
    }

    async fn complete(&mut self, id: &MilestoneId, notes: Option<String>) -> Result<Milestone> {
        let registry = self.registry.read().await;
        let handle = registry.handle_for(id)?;
        let mut contract = handle.write().await;

        let milestone = contract
            .milestones
            .get_mut(id)
            .ok_or_else(|| Error::MilestoneNotFound(id.clone()))?;

        let changed = milestone.status != MilestoneStatus::Completed || notes.is_some();
        milestone.apply_status(MilestoneStatus::Completed, Utc::now().date_naive())?;
        if let Some(notes) = notes {
            milestone.completion_notes = Some(notes);
        }
        if changed {
            milestone.updated_at = Utc::now();
        }

        Ok(milestone.clone())
    }

    async fn dependencies_met(&self, id: &MilestoneId) -> Result<bool> {
        let registry = self.registry.read().await;
        let handle = registry.handle_for(id)?;
        let contract = handle.read().await;
        graph::dependencies_met_impl(&contract, id)
    }

    async fn add_dependency(
        &mut self,
        successor: &MilestoneId,
        predecessor: &MilestoneId,
    ) -> Result<()> {
        let registry = self.registry.read().await;
        let handle = registry.route_edge(successor, predecessor)?;
        let mut contract = handle.write().await;

        let successor_node = *contract
            .node_map
            .get(successor)
            .ok_or_else(|| Error::MilestoneNotFound(successor.clone()))?;
        let predecessor_node = *contract
            .node_map
            .get(predecessor)
            .ok_or_else(|| Error::MilestoneNotFound(predecessor.clone()))?;

        // An existing edge makes this an idempotent no-op.
        if contract
            .graph
            .find_edge(successor_node, predecessor_node)
            .is_some()
        {
            return Ok(());
        }

        if graph::would_create_cycle(&contract, successor_node, predecessor_node) {
            return Err(Error::CircularDependency {
                successor: successor.clone(),
                predecessor: predecessor.clone(),
            });
        }

        // Keep the dependencies vector in sync for JSONL serialization.
        if let Some(milestone) = contract.milestones.get_mut(successor) {
            if !milestone.dependencies.contains(predecessor) {
                milestone.dependencies.push(predecessor.clone());
            }
            milestone.updated_at = Utc::now();
        }
        contract.graph.add_edge(successor_node, predecessor_node, ());

        Ok(())
    }

    async fn remove_dependency(
        &mut self,
        successor: &MilestoneId,
        predecessor: &MilestoneId,
    ) -> Result<()> {
        let registry = self.registry.read().await;
        let handle = registry.route_edge(successor, predecessor)?;
        let mut contract = handle.write().await;

        let successor_node = *contract
            .node_map
            .get(successor)
            .ok_or_else(|| Error::MilestoneNotFound(successor.clone()))?;
        let predecessor_node = *contract
            .node_map
            .get(predecessor)
            .ok_or_else(|| Error::MilestoneNotFound(predecessor.clone()))?;

        let mut changed = false;
        if let Some(edge) = contract.graph.find_edge(successor_node, predecessor_node) {
            contract.graph.remove_edge(edge);
            changed = true;
        }

        // Also prune the dependencies vector. Imported milestones can carry
        // entries with no matching edge, and removal is how those get
        // cleaned up.
        if let Some(milestone) = contract.milestones.get_mut(successor) {
            let before = milestone.dependencies.len();
            milestone.dependencies.retain(|dep| dep != predecessor);
            if milestone.dependencies.len() != before {
                changed = true;
            }
            if changed {
                milestone.updated_at = Utc::now();
            }
        }

        Ok(())
    }

    async fn would_cycle(
        &self,
        successor: &MilestoneId,
        predecessor: &MilestoneId,
    ) -> Result<bool> {
        let registry = self.registry.read().await;
        let handle = registry.route_edge(successor, predecessor)?;
        let contract = handle.read().await;

        let successor_node = *contract
            .node_map
            .get(successor)
            .ok_or_else(|| Error::MilestoneNotFound(successor.clone()))?;
        let predecessor_node = *contract
            .node_map
            .get(predecessor)
            .ok_or_else(|| Error::MilestoneNotFound(predecessor.clone()))?;

        Ok(graph::would_create_cycle(
            &contract,
            successor_node,
            predecessor_node,
        ))
    }

    async fn critical_path(&self, contract: &ContractId) -> Result<Vec<Milestone>> {
        let registry = self.registry.read().await;
        let Some(handle) = registry.contract_handle(contract) else {
            return Ok(Vec::new());
        };
        let contract_graph = handle.read().await;
        graph::critical_path_impl(&contract_graph)
    }

    async fn upcoming(&self, contract: &ContractId, within_days: u32) -> Result<Vec<Milestone>> {
        let registry = self.registry.read().await;
        let Some(handle) = registry.contract_handle(contract) else {
            return Ok(Vec::new());
        };
        let contract_graph = handle.read().await;

        let today = Utc::now().date_naive();
        Ok(queries::upcoming_on(
            contract_graph.milestones.values(),
            today,
            within_days,
        ))
    }

    async fn overdue(&self, contract: &ContractId) -> Result<Vec<Milestone>> {
        let registry = self.registry.read().await;
        let Some(handle) = registry.contract_handle(contract) else {
            return Ok(Vec::new());
        };
        let contract_graph = handle.read().await;

        let today = Utc::now().date_naive();
        Ok(queries::overdue_on(
            contract_graph.milestones.values(),
            today,
        ))
    }

    async fn due_this_week(&self, contract: &ContractId) -> Result<Vec<Milestone>> {
        let registry = self.registry.read().await;
        let Some(handle) = registry.contract_handle(contract) else {
            return Ok(Vec::new());
        };
        let contract_graph = handle.read().await;

        let today = Utc::now().date_naive();
        Ok(queries::due_this_week_on(
            contract_graph.milestones.values(),
            today,
        ))
    }

    async fn import_milestones(&mut self, milestones: Vec<Milestone>) -> Result<()> {
        let mut registry = self.registry.write().await;

        // First pass: store milestones and create nodes
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

        // Second pass: reconstruct dependency edges now that all nodes
        // exist. Edges that cannot be honored (missing endpoint, wrong
        // contract, duplicate, cycle) are skipped; the dependencies vector
        // keeps the original record for round-tripping.
        for milestone in &milestones {
            let Some(handle) = registry.contract_handle(&milestone.contract_id) else {
                continue;
            };
            let mut contract = handle.write().await;
            let Some(&successor_node) = contract.node_map.get(&milestone.id) else {
                continue;
            };

            for dep in &milestone.dependencies {
                if registry.membership.get(dep) != Some(&milestone.contract_id) {
                    continue;
                }
                let Some(&predecessor_node) = contract.node_map.get(dep) else {
                    continue;
                };
                if contract
                    .graph
                    .find_edge(successor_node, predecessor_node)
                    .is_some()
                {
                    continue;
                }
                if graph::would_create_cycle(&contract, successor_node, predecessor_node) {
                    continue;
                }
                contract.graph.add_edge(successor_node, predecessor_node, ());
            }
        }

        Ok(())
    }

    async fn export_all(&self) -> Result<Vec<Milestone>> {
        let registry = self.registry.read().await;

        let mut all = Vec::new();
        for handle in registry.contracts.values() {
            let contract = handle.read().await;
            all.extend(contract.milestones.values().cloned());
        }

        // Deterministic output order for JSONL export and backups.
        all.sort_by(|a, b| (&a.contract_id, &a.id).cmp(&(&b.contract_id, &b.id)));
        Ok(all)
    }

    async fn save(&self) -> Result<()> {
        // In-memory storage doesn't persist to disk
        // This is a no-op for this implementation
        Ok(())
    }

    async fn reload(&mut self) -> Result<()> {
        // In-memory storage has no backing store to reload from
        // This is a no-op for this implementation
        Ok(())
    }
}
