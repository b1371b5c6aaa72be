//! Cairn - contract milestone scheduling.
//!
//! This crate models the delivery milestones of commercial contracts as
//! per-contract dependency graphs: cycle-checked dependency edges, a status
//! state machine with completion side effects, critical-path extraction,
//! and due-date window queries, all behind one async storage trait with
//! in-memory and JSONL-backed implementations.
//!
//! The usual entry point is [`storage::create_store`], which hands back a
//! boxed [`storage::MilestoneStore`].

#![forbid(unsafe_code)]

// Public modules for library usage
pub mod config;
pub mod contracts;
pub mod domain;
pub mod error;
pub mod id_generation;
pub mod storage;

// Re-export the error types used across the public API
pub use error::{Error, Result};
