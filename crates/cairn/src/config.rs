//! Configuration for the milestone scheduler.
//!
//! Deployments describe the store in a small YAML file:
//!
//! ```yaml
//! milestone-prefix: acme
//! storage:
//!   backend: jsonl
//!   data-file: milestones.jsonl
//! ```
//!
//! [`SchedulerConfig::load`] parses and validates the file;
//! [`StorageSection::to_backend`] turns the storage section into a
//! [`StoreBackend`] for [`create_store`](crate::storage::create_store).

use crate::error::{Error, Result};
use crate::storage::StoreBackend;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

/// Default milestone ID prefix if none specified.
pub const DEFAULT_PREFIX: &str = "mst";

/// Default data file name for the JSONL backend.
pub const DEFAULT_DATA_FILE: &str = "milestones.jsonl";

/// Minimum prefix length.
pub const MIN_PREFIX_LENGTH: usize = 2;

/// Maximum prefix length.
pub const MAX_PREFIX_LENGTH: usize = 20;

/// Top-level configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Milestone ID prefix (e.g. "acme" for "acme-a3f8").
    #[serde(rename = "milestone-prefix")]
    pub milestone_prefix: String,

    /// Storage configuration.
    pub storage: StorageSection,
}

/// Storage configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageSection {
    /// Storage backend type: "memory" or "jsonl".
    pub backend: String,

    /// Path to the data file, relative to the config's base directory
    /// unless absolute. Ignored by the "memory" backend.
    #[serde(rename = "data-file")]
    pub data_file: String,
}

impl SchedulerConfig {
    /// Create a new configuration with the given prefix and the JSONL
    /// backend writing to [`DEFAULT_DATA_FILE`].
    pub fn new(prefix: &str) -> Self {
        Self {
            milestone_prefix: prefix.to_string(),
            storage: StorageSection {
                backend: "jsonl".to_string(),
                data_file: DEFAULT_DATA_FILE.to_string(),
            },
        }
    }

    /// Load and validate configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be read, `Error::Config` if it
    /// is not valid YAML or the prefix fails [`validate_prefix`].
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        let config: Self =
            serde_yaml::from_str(&content).map_err(|e| Error::Config(e.to_string()))?;
        validate_prefix(&config.milestone_prefix)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` on serialization failure, `Error::Io` on
    /// write failure.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_yaml::to_string(self).map_err(|e| Error::Config(format!("YAML error: {e}")))?;
        fs::write(path, content).await?;
        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl StorageSection {
    /// Resolve this section into a [`StoreBackend`].
    ///
    /// Relative data file paths are resolved against `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for an unknown backend name or a "jsonl"
    /// backend with an empty data file.
    pub fn to_backend(&self, base_dir: &Path) -> Result<StoreBackend> {
        match self.backend.as_str() {
            "memory" => Ok(StoreBackend::InMemory),
            "jsonl" => {
                if self.data_file.is_empty() {
                    return Err(Error::Config(
                        "jsonl backend requires a data-file".to_string(),
                    ));
                }
                let path = Path::new(&self.data_file);
                let resolved = if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    base_dir.join(path)
                };
                Ok(StoreBackend::Jsonl(resolved))
            }
            other => Err(Error::Config(format!("unknown storage backend '{other}'"))),
        }
    }
}

/// Validate a milestone ID prefix.
///
/// Requirements:
/// - 2-20 characters
/// - Letters, digits, `-`, and `_` only
/// - Must start with a letter or digit
///
/// Note: Expects pre-trimmed input. Callers should trim whitespace before
/// calling.
///
/// # Errors
///
/// Returns `Error::Config` describing the first violated requirement.
pub fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.len() < MIN_PREFIX_LENGTH {
        return Err(Error::Config(format!(
            "Prefix must be at least {MIN_PREFIX_LENGTH} characters"
        )));
    }

    if prefix.len() > MAX_PREFIX_LENGTH {
        return Err(Error::Config(format!(
            "Prefix cannot exceed {MAX_PREFIX_LENGTH} characters"
        )));
    }

    if !prefix
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(Error::Config(
            "Prefix must contain only alphanumeric characters, '-', or '_'".to_string(),
        ));
    }

    if !prefix.chars().next().is_some_and(|c| c.is_ascii_alphanumeric()) {
        return Err(Error::Config(
            "Prefix must start with a letter or digit".to_string(),
        ));
    }

    Ok(())
}
