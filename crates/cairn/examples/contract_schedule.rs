//! End-to-end walkthrough of the milestone scheduler.
//!
//! Builds a JSONL-backed store in a temporary directory, lays out a small
//! construction contract, wires dependencies, completes early work, and
//! prints the critical path plus the date-window reports.
//!
//! Run with `cargo run --example contract_schedule`; set
//! `RUST_LOG=cairn=debug` to watch the store at work.

use anyhow::Result;
use cairn::contracts::StaticContracts;
use cairn::domain::{ContractId, Milestone, MilestoneId, MilestoneStatus, NewMilestone};
use cairn::storage::{StoreBackend, create_store};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cairn=info")),
        )
        .with_target(false)
        .init();

    let data_dir = tempfile::tempdir()?;
    let data_file = data_dir.path().join("milestones.jsonl");

    let contract = ContractId::new("contract-7");
    let directory = Arc::new(StaticContracts::new(["contract-7"]));
    let mut store = create_store(
        StoreBackend::Jsonl(data_file.clone()),
        "acme".to_string(),
        directory,
    )
    .await?;

    // Lay out the schedule relative to today so every report below has
    // something to show.
    let today = Utc::now().date_naive();
    let permits = store
        .create(request(
            &contract,
            "Permits approved",
            today - Duration::days(3),
            true,
            vec![],
        ))
        .await?;
    let site_prep = store
        .create(request(
            &contract,
            "Site preparation",
            today + Duration::days(4),
            true,
            vec![permits.id.clone()],
        ))
        .await?;
    let foundation = store
        .create(request(
            &contract,
            "Foundation pour",
            today + Duration::days(10),
            true,
            vec![site_prep.id.clone()],
        ))
        .await?;
    let framing = store
        .create(request(
            &contract,
            "Framing complete",
            today + Duration::days(30),
            true,
            vec![foundation.id.clone()],
        ))
        .await?;
    store
        .create(request(
            &contract,
            "Landscaping plan",
            today + Duration::days(10),
            false,
            vec![],
        ))
        .await?;
    store
        .create(request(
            &contract,
            "Fixture order",
            today - Duration::days(1),
            false,
            vec![],
        ))
        .await?;

    // The cycle guard can answer hypotheticals before anything mutates.
    let would_close = store.would_cycle(&permits.id, &framing.id).await?;
    println!("Would permits-after-framing close a cycle? {would_close}");

    // Knock out the first deliverable and start the next.
    store
        .complete(&permits.id, Some("Approved on the second review".to_string()))
        .await?;
    store
        .update_status(&site_prep.id, MilestoneStatus::InProgress)
        .await?;

    println!(
        "Site preparation unblocked: {}",
        store.dependencies_met(&site_prep.id).await?
    );
    println!(
        "Foundation pour unblocked:  {}",
        store.dependencies_met(&foundation.id).await?
    );

    print_schedule(
        "Critical path:",
        &store.critical_path(&contract).await?,
    );
    print_schedule(
        "Due in the next 14 days:",
        &store.upcoming(&contract, 14).await?,
    );
    print_schedule("Overdue:", &store.overdue(&contract).await?);
    print_schedule("Due this week:", &store.due_this_week(&contract).await?);

    store.save().await?;
    println!("\nSchedule persisted to {}", data_file.display());

    Ok(())
}

fn request(
    contract: &ContractId,
    name: &str,
    due: chrono::NaiveDate,
    critical: bool,
    dependencies: Vec<MilestoneId>,
) -> NewMilestone {
    NewMilestone {
        contract_id: contract.clone(),
        name: name.to_string(),
        description: None,
        due_date: due,
        owner_id: Some("dana".to_string()),
        is_on_critical_path: critical,
        dependencies,
    }
}

fn print_schedule(header: &str, milestones: &[Milestone]) {
    println!("\n{header}");
    if milestones.is_empty() {
        println!("  (none)");
    }
    for milestone in milestones {
        println!(
            "  {}  {}  due {}  [{}]",
            milestone.id, milestone.name, milestone.due_date, milestone.status
        );
    }
}
