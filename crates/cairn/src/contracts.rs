//! Contract directory abstraction.
//!
//! Milestones live inside contracts, and creating one must reference a
//! contract the deployment knows about. [`ContractDirectory`] is the seam
//! between this crate and whatever system owns contract records (an ERP, a
//! project database, a config file). Only milestone creation consults the
//! directory; every later operation trusts the membership recorded at
//! creation time, so a contract disappearing upstream never strands stored
//! milestones.

use crate::domain::ContractId;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashSet;

/// Source of truth for which contracts exist.
///
/// Implementations must be `Send + Sync`; the store keeps one behind an
/// `Arc` and calls it while holding no locks.
#[async_trait]
pub trait ContractDirectory: Send + Sync {
    /// Check whether a contract is known.
    ///
    /// # Errors
    ///
    /// Returns `Error::Storage` if the backing system cannot be reached.
    async fn contract_exists(&self, contract: &ContractId) -> Result<bool>;
}

/// Directory backed by a fixed set of contract ids.
///
/// Useful when the deployment enumerates its contracts up front, from
/// configuration or a one-time sync.
#[derive(Debug, Clone, Default)]
pub struct StaticContracts {
    known: HashSet<ContractId>,
}

impl StaticContracts {
    /// Create a directory containing the given contracts.
    #[must_use]
    pub fn new<I, C>(contracts: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ContractId>,
    {
        Self {
            known: contracts.into_iter().map(Into::into).collect(),
        }
    }

    /// Add a contract to the directory.
    pub fn insert(&mut self, contract: impl Into<ContractId>) {
        self.known.insert(contract.into());
    }
}

#[async_trait]
impl ContractDirectory for StaticContracts {
    async fn contract_exists(&self, contract: &ContractId) -> Result<bool> {
        Ok(self.known.contains(contract))
    }
}

/// Directory that treats every non-empty contract id as known.
///
/// The permissive default for embedders that validate contract references
/// somewhere else in their stack.
#[derive(Debug, Clone, Copy, Default)]
#[non_exhaustive]
pub struct OpenContracts;

impl OpenContracts {
    /// Create a new open directory.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ContractDirectory for OpenContracts {
    async fn contract_exists(&self, contract: &ContractId) -> Result<bool> {
        Ok(!contract.as_str().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_directory_knows_only_its_contracts() {
        let directory = StaticContracts::new(["contract-1", "contract-2"]);

        assert!(directory
            .contract_exists(&ContractId::new("contract-1"))
            .await
            .unwrap());
        assert!(!directory
            .contract_exists(&ContractId::new("contract-9"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn static_directory_accepts_inserts() {
        let mut directory = StaticContracts::default();
        assert!(!directory
            .contract_exists(&ContractId::new("contract-1"))
            .await
            .unwrap());

        directory.insert("contract-1");
        assert!(directory
            .contract_exists(&ContractId::new("contract-1"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn open_directory_accepts_anything_non_empty() {
        let directory = OpenContracts::new();

        assert!(directory
            .contract_exists(&ContractId::new("anything"))
            .await
            .unwrap());
        assert!(!directory.contract_exists(&ContractId::new("")).await.unwrap());
    }

    #[tokio::test]
    async fn directory_is_object_safe() {
        let directory: std::sync::Arc<dyn ContractDirectory> =
            std::sync::Arc::new(OpenContracts::new());
        assert!(directory
            .contract_exists(&ContractId::new("contract-1"))
            .await
            .unwrap());
    }
}
