//! Integration tests for the in-memory milestone store.
//!
//! Exercises the full `MilestoneStore` surface end to end: milestone CRUD,
//! dependency edges behind the cycle guard, contract isolation, and the
//! cascade that keeps dependency lists consistent across deletes.

use cairn::Error;
use cairn::contracts::{OpenContracts, StaticContracts};
use cairn::domain::{ContractId, MilestoneId, MilestoneStatus, MilestoneUpdate, NewMilestone};
use cairn::storage::MilestoneStore;
use cairn::storage::in_memory::new_in_memory_store;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::Arc;

// ========== Test Helpers ==========

fn open_store() -> Box<dyn MilestoneStore> {
    new_in_memory_store("test".to_string(), Arc::new(OpenContracts::new()))
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn milestone_request(contract: &str, name: &str) -> NewMilestone {
    NewMilestone {
        contract_id: ContractId::new(contract),
        name: name.to_string(),
        description: Some("Test description".to_string()),
        due_date: date(2026, 9, 15),
        owner_id: None,
        is_on_critical_path: false,
        dependencies: vec![],
    }
}

// ========== Create ==========

#[tokio::test]
async fn test_create_milestone() {
    let mut store = open_store();

    let created = store
        .create(milestone_request("contract-1", "Foundation pour"))
        .await
        .unwrap();

    assert!(created.id.as_str().starts_with("test-"));
    assert_eq!(created.contract_id.as_str(), "contract-1");
    assert_eq!(created.name, "Foundation pour");
    assert_eq!(created.status, MilestoneStatus::NotStarted);
    assert_eq!(created.completed_date, None);
    assert_eq!(created.completion_notes, None);
    assert!(created.dependencies.is_empty());
    assert_eq!(created.created_at, created.updated_at);
}

#[tokio::test]
async fn test_create_generates_unique_ids() {
    let mut store = open_store();
    let mut ids = HashSet::new();

    for i in 0..50 {
        let created = store
            .create(milestone_request("contract-1", &format!("Milestone {i}")))
            .await
            .unwrap();
        assert!(ids.insert(created.id), "duplicate id generated");
    }
}

#[tokio::test]
async fn test_create_rejects_empty_name() {
    let mut store = open_store();

    let result = store.create(milestone_request("contract-1", "")).await;

    assert!(matches!(result, Err(Error::Validation(_))));
}

#[tokio::test]
async fn test_create_rejects_unknown_contract() {
    let directory = Arc::new(StaticContracts::new(["contract-1"]));
    let mut store = new_in_memory_store("test".to_string(), directory);

    store
        .create(milestone_request("contract-1", "Known"))
        .await
        .unwrap();
    let result = store.create(milestone_request("contract-9", "Ghost")).await;

    assert!(matches!(result, Err(Error::ContractNotFound(_))));
}

#[tokio::test]
async fn test_create_with_initial_dependencies() {
    let mut store = open_store();

    let prep = store
        .create(milestone_request("contract-1", "Site prep"))
        .await
        .unwrap();
    let pour = store
        .create(milestone_request("contract-1", "Foundation pour"))
        .await
        .unwrap();

    let mut request = milestone_request("contract-1", "Framing");
    request.dependencies = vec![prep.id.clone(), pour.id.clone()];
    let framing = store.create(request).await.unwrap();

    assert_eq!(framing.dependencies, vec![prep.id, pour.id]);
    assert!(!store.dependencies_met(&framing.id).await.unwrap());
}

#[tokio::test]
async fn test_create_rejects_missing_initial_dependency() {
    let mut store = open_store();

    let mut request = milestone_request("contract-1", "Framing");
    request.dependencies = vec![MilestoneId::new("test-nope")];
    let result = store.create(request).await;

    assert!(matches!(result, Err(Error::MilestoneNotFound(_))));
}

#[tokio::test]
async fn test_create_rejects_initial_dependency_from_other_contract() {
    let mut store = open_store();

    let other = store
        .create(milestone_request("contract-1", "Site prep"))
        .await
        .unwrap();

    let mut request = milestone_request("contract-2", "Framing");
    request.dependencies = vec![other.id];
    let result = store.create(request).await;

    assert!(matches!(result, Err(Error::Validation(_))));
}

// ========== Get ==========

#[tokio::test]
async fn test_get_returns_stored_milestone() {
    let mut store = open_store();
    let created = store
        .create(milestone_request("contract-1", "Foundation pour"))
        .await
        .unwrap();

    let fetched = store.get(&created.id).await.unwrap();

    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.name, "Foundation pour");
    assert_eq!(fetched.description, Some("Test description".to_string()));
}

#[tokio::test]
async fn test_get_missing_milestone() {
    let store = open_store();

    let result = store.get(&MilestoneId::new("test-nope")).await;

    assert!(matches!(result, Err(Error::MilestoneNotFound(_))));
}

// ========== Update ==========

#[tokio::test]
async fn test_update_milestone_fields() {
    let mut store = open_store();
    let created = store
        .create(milestone_request("contract-1", "Foundation pour"))
        .await
        .unwrap();

    let updated = store
        .update(
            &created.id,
            MilestoneUpdate {
                name: Some("Foundation pour and cure".to_string()),
                due_date: Some(date(2026, 10, 1)),
                owner_id: Some(Some("site-lead".to_string())),
                is_on_critical_path: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.name, "Foundation pour and cure");
    assert_eq!(updated.due_date, date(2026, 10, 1));
    assert_eq!(updated.owner_id, Some("site-lead".to_string()));
    assert!(updated.is_on_critical_path);
    assert!(updated.updated_at > created.updated_at);
    // Status is not updatable through this path.
    assert_eq!(updated.status, MilestoneStatus::NotStarted);
}

#[tokio::test]
async fn test_update_clears_owner_with_explicit_none() {
    let mut store = open_store();
    let mut request = milestone_request("contract-1", "Foundation pour");
    request.owner_id = Some("site-lead".to_string());
    let created = store.create(request).await.unwrap();
    assert_eq!(created.owner_id, Some("site-lead".to_string()));

    let updated = store
        .update(
            &created.id,
            MilestoneUpdate {
                owner_id: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.owner_id, None);
}

#[tokio::test]
async fn test_update_leaves_absent_fields_untouched() {
    let mut store = open_store();
    let created = store
        .create(milestone_request("contract-1", "Foundation pour"))
        .await
        .unwrap();

    let updated = store
        .update(
            &created.id,
            MilestoneUpdate {
                due_date: Some(date(2026, 10, 1)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.name, "Foundation pour");
    assert_eq!(updated.description, Some("Test description".to_string()));
    assert_eq!(updated.owner_id, None);
}

#[tokio::test]
async fn test_rejected_update_leaves_milestone_untouched() {
    let mut store = open_store();
    let created = store
        .create(milestone_request("contract-1", "Foundation pour"))
        .await
        .unwrap();

    let result = store
        .update(
            &created.id,
            MilestoneUpdate {
                name: Some(String::new()),
                due_date: Some(date(2027, 1, 1)),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(Error::Validation(_))));

    // The failed update must not leak the due-date half of the request.
    let fetched = store.get(&created.id).await.unwrap();
    assert_eq!(fetched.name, "Foundation pour");
    assert_eq!(fetched.due_date, created.due_date);
    assert_eq!(fetched.updated_at, created.updated_at);
}

#[tokio::test]
async fn test_update_missing_milestone() {
    let mut store = open_store();

    let result = store
        .update(&MilestoneId::new("test-nope"), MilestoneUpdate::default())
        .await;

    assert!(matches!(result, Err(Error::MilestoneNotFound(_))));
}

// ========== Delete ==========

#[tokio::test]
async fn test_delete_milestone() {
    let mut store = open_store();
    let created = store
        .create(milestone_request("contract-1", "Foundation pour"))
        .await
        .unwrap();

    store.delete(&created.id).await.unwrap();

    let result = store.get(&created.id).await;
    assert!(matches!(result, Err(Error::MilestoneNotFound(_))));
}

#[tokio::test]
async fn test_delete_prunes_dependent_edges() {
    let mut store = open_store();
    let prep = store
        .create(milestone_request("contract-1", "Site prep"))
        .await
        .unwrap();
    let pour = store
        .create(milestone_request("contract-1", "Foundation pour"))
        .await
        .unwrap();
    store.add_dependency(&pour.id, &prep.id).await.unwrap();
    assert!(!store.dependencies_met(&pour.id).await.unwrap());

    store.delete(&prep.id).await.unwrap();

    let fetched = store.get(&pour.id).await.unwrap();
    assert!(fetched.dependencies.is_empty());
    assert!(store.dependencies_met(&pour.id).await.unwrap());
}

#[tokio::test]
async fn test_delete_missing_milestone() {
    let mut store = open_store();

    let result = store.delete(&MilestoneId::new("test-nope")).await;

    assert!(matches!(result, Err(Error::MilestoneNotFound(_))));
}

// ========== List ==========

#[tokio::test]
async fn test_list_by_contract_is_scoped_and_sorted() {
    let mut store = open_store();

    let mut late = milestone_request("contract-1", "Roofing");
    late.due_date = date(2026, 12, 1);
    let mut early = milestone_request("contract-1", "Site prep");
    early.due_date = date(2026, 8, 1);

    let late = store.create(late).await.unwrap();
    let early = store.create(early).await.unwrap();
    store
        .create(milestone_request("contract-2", "Unrelated"))
        .await
        .unwrap();

    let listed = store
        .list_by_contract(&ContractId::new("contract-1"))
        .await
        .unwrap();

    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, early.id);
    assert_eq!(listed[1].id, late.id);
}

#[tokio::test]
async fn test_list_unknown_contract_is_empty() {
    let store = open_store();

    let listed = store
        .list_by_contract(&ContractId::new("contract-9"))
        .await
        .unwrap();

    assert!(listed.is_empty());
}

// ========== Dependency Edges ==========

#[tokio::test]
async fn test_add_dependency_blocks_successor() {
    let mut store = open_store();
    let prep = store
        .create(milestone_request("contract-1", "Site prep"))
        .await
        .unwrap();
    let pour = store
        .create(milestone_request("contract-1", "Foundation pour"))
        .await
        .unwrap();

    store.add_dependency(&pour.id, &prep.id).await.unwrap();

    let fetched = store.get(&pour.id).await.unwrap();
    assert_eq!(fetched.dependencies, vec![prep.id.clone()]);
    assert!(!store.dependencies_met(&pour.id).await.unwrap());
    // The predecessor itself stays unblocked.
    assert!(store.dependencies_met(&prep.id).await.unwrap());
}

#[tokio::test]
async fn test_add_dependency_is_idempotent() {
    let mut store = open_store();
    let prep = store
        .create(milestone_request("contract-1", "Site prep"))
        .await
        .unwrap();
    let pour = store
        .create(milestone_request("contract-1", "Foundation pour"))
        .await
        .unwrap();

    store.add_dependency(&pour.id, &prep.id).await.unwrap();
    store.add_dependency(&pour.id, &prep.id).await.unwrap();

    let fetched = store.get(&pour.id).await.unwrap();
    assert_eq!(fetched.dependencies.len(), 1);
}

#[tokio::test]
async fn test_add_dependency_rejects_direct_cycle() {
    let mut store = open_store();
    let prep = store
        .create(milestone_request("contract-1", "Site prep"))
        .await
        .unwrap();
    let pour = store
        .create(milestone_request("contract-1", "Foundation pour"))
        .await
        .unwrap();

    store.add_dependency(&pour.id, &prep.id).await.unwrap();
    let result = store.add_dependency(&prep.id, &pour.id).await;

    assert!(matches!(result, Err(Error::CircularDependency { .. })));
}

#[tokio::test]
async fn test_add_dependency_rejects_transitive_cycle() {
    let mut store = open_store();
    let prep = store
        .create(milestone_request("contract-1", "Site prep"))
        .await
        .unwrap();
    let pour = store
        .create(milestone_request("contract-1", "Foundation pour"))
        .await
        .unwrap();
    let framing = store
        .create(milestone_request("contract-1", "Framing"))
        .await
        .unwrap();

    store.add_dependency(&pour.id, &prep.id).await.unwrap();
    store.add_dependency(&framing.id, &pour.id).await.unwrap();
    let result = store.add_dependency(&prep.id, &framing.id).await;

    assert!(matches!(result, Err(Error::CircularDependency { .. })));
}

#[tokio::test]
async fn test_add_dependency_rejects_self_edge() {
    let mut store = open_store();
    let prep = store
        .create(milestone_request("contract-1", "Site prep"))
        .await
        .unwrap();

    let result = store.add_dependency(&prep.id, &prep.id).await;

    assert!(matches!(result, Err(Error::CircularDependency { .. })));
}

#[tokio::test]
async fn test_add_dependency_rejects_cross_contract_edge() {
    let mut store = open_store();
    let ours = store
        .create(milestone_request("contract-1", "Ours"))
        .await
        .unwrap();
    let theirs = store
        .create(milestone_request("contract-2", "Theirs"))
        .await
        .unwrap();

    let result = store.add_dependency(&ours.id, &theirs.id).await;

    assert!(matches!(result, Err(Error::CrossContract { .. })));
}

#[tokio::test]
async fn test_remove_dependency_is_idempotent() {
    let mut store = open_store();
    let prep = store
        .create(milestone_request("contract-1", "Site prep"))
        .await
        .unwrap();
    let pour = store
        .create(milestone_request("contract-1", "Foundation pour"))
        .await
        .unwrap();

    store.add_dependency(&pour.id, &prep.id).await.unwrap();
    store.remove_dependency(&pour.id, &prep.id).await.unwrap();
    store.remove_dependency(&pour.id, &prep.id).await.unwrap();

    let fetched = store.get(&pour.id).await.unwrap();
    assert!(fetched.dependencies.is_empty());
    assert!(store.dependencies_met(&pour.id).await.unwrap());
}

#[tokio::test]
async fn test_removing_an_edge_unblocks_the_reverse_direction() {
    let mut store = open_store();
    let prep = store
        .create(milestone_request("contract-1", "Site prep"))
        .await
        .unwrap();
    let pour = store
        .create(milestone_request("contract-1", "Foundation pour"))
        .await
        .unwrap();

    store.add_dependency(&pour.id, &prep.id).await.unwrap();
    store.remove_dependency(&pour.id, &prep.id).await.unwrap();

    // With the original edge gone the reverse direction is legal again.
    store.add_dependency(&prep.id, &pour.id).await.unwrap();
}

#[tokio::test]
async fn test_would_cycle_previews_without_mutating() {
    let mut store = open_store();
    let prep = store
        .create(milestone_request("contract-1", "Site prep"))
        .await
        .unwrap();
    let pour = store
        .create(milestone_request("contract-1", "Foundation pour"))
        .await
        .unwrap();
    let framing = store
        .create(milestone_request("contract-1", "Framing"))
        .await
        .unwrap();

    store.add_dependency(&pour.id, &prep.id).await.unwrap();

    assert!(store.would_cycle(&prep.id, &pour.id).await.unwrap());
    assert!(store.would_cycle(&prep.id, &prep.id).await.unwrap());
    assert!(!store.would_cycle(&framing.id, &prep.id).await.unwrap());

    // The preview must not insert anything.
    let fetched = store.get(&prep.id).await.unwrap();
    assert!(fetched.dependencies.is_empty());
}

// ========== Concurrent Access ==========

#[tokio::test]
async fn test_concurrent_reads_share_the_store() {
    let mut store = open_store();
    let ours = store
        .create(milestone_request("contract-1", "Ours"))
        .await
        .unwrap();
    let theirs = store
        .create(milestone_request("contract-2", "Theirs"))
        .await
        .unwrap();

    let contract_one = ContractId::new("contract-1");
    let (got_ours, got_theirs, listed) = tokio::join!(
        store.get(&ours.id),
        store.get(&theirs.id),
        store.list_by_contract(&contract_one),
    );

    assert_eq!(got_ours.unwrap().id, ours.id);
    assert_eq!(got_theirs.unwrap().id, theirs.id);
    assert_eq!(listed.unwrap().len(), 1);
}

// ========== Import and Export ==========

#[tokio::test]
async fn test_export_all_spans_contracts_in_stable_order() {
    let mut store = open_store();
    store
        .create(milestone_request("contract-2", "Theirs"))
        .await
        .unwrap();
    store
        .create(milestone_request("contract-1", "Ours"))
        .await
        .unwrap();

    let exported = store.export_all().await.unwrap();

    assert_eq!(exported.len(), 2);
    assert_eq!(exported[0].contract_id.as_str(), "contract-1");
    assert_eq!(exported[1].contract_id.as_str(), "contract-2");
}

#[tokio::test]
async fn test_import_restores_milestones_and_edges() {
    let mut source = open_store();
    let prep = source
        .create(milestone_request("contract-1", "Site prep"))
        .await
        .unwrap();
    let pour = source
        .create(milestone_request("contract-1", "Foundation pour"))
        .await
        .unwrap();
    source.add_dependency(&pour.id, &prep.id).await.unwrap();

    let exported = source.export_all().await.unwrap();

    let mut target = open_store();
    target.import_milestones(exported).await.unwrap();

    let fetched = target.get(&pour.id).await.unwrap();
    assert_eq!(fetched.dependencies, vec![prep.id.clone()]);
    assert!(!target.dependencies_met(&pour.id).await.unwrap());
}

#[tokio::test]
async fn test_import_does_not_collide_with_future_ids() {
    let mut source = open_store();
    source
        .create(milestone_request("contract-1", "Imported"))
        .await
        .unwrap();
    let exported = source.export_all().await.unwrap();
    let imported_id = exported[0].id.clone();

    let mut target = open_store();
    target.import_milestones(exported).await.unwrap();
    let fresh = target
        .create(milestone_request("contract-1", "Fresh"))
        .await
        .unwrap();

    assert_ne!(fresh.id, imported_id);
}
