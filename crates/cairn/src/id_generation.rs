//! Hash-based milestone ID generation.
//!
//! Milestone ids are collision-resistant, human-pasteable handles of the form
//! `{prefix}-{hash}` (e.g. "acme-a3f8"). The hash is SHA-256 over the
//! creation request plus a timestamp and retry nonce, base36-encoded and
//! truncated to an adaptive length that grows with the number of stored
//! milestones.
//!
//! # Example
//!
//! ```
//! use cairn::id_generation::{IdGenerator, IdGeneratorConfig};
//!
//! let mut generator = IdGenerator::new(IdGeneratorConfig {
//!     prefix: "acme".to_string(),
//!     database_size: 100,
//! });
//!
//! let id = generator
//!     .generate("contract-7", "Foundation pour", Some("complete by June"), Some("alice"))
//!     .unwrap();
//! assert!(id.starts_with("acme-"));
//! ```

use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, warn};

const BASE36_CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const MAX_NONCE: u32 = 100;

/// Errors that can occur during ID generation.
#[derive(Debug, Error)]
pub enum IdGenerationError {
    /// Unable to generate a unique ID after exhausting all nonces and the
    /// length increase.
    #[error("Unable to generate unique ID after {attempts} attempts")]
    CollisionExhausted {
        /// Number of nonce attempts made.
        attempts: u32,
    },

    /// Base36 encoding failed.
    #[error("Base36 encoding failed: {0}")]
    EncodingFailed(String),

    /// Requested encoding length was zero.
    #[error("Length must be greater than 0")]
    InvalidLength,
}

/// Configuration for ID generation.
#[derive(Debug, Clone)]
pub struct IdGeneratorConfig {
    /// Prefix for all IDs (e.g. "acme").
    pub prefix: String,

    /// Current number of stored milestones (drives adaptive length).
    pub database_size: usize,
}

/// Hash-based ID generator with collision detection.
///
/// The generator keeps every id it has seen in a set, so collisions are
/// detected locally without consulting storage. Registries recreate the
/// generator when the database grows past a length threshold, re-registering
/// the live ids; for typical contract sizes (well under 10,000 milestones)
/// the memory held by the set is negligible.
pub struct IdGenerator {
    config: IdGeneratorConfig,
    existing_ids: HashSet<String>,
}

impl IdGenerator {
    /// Create a new ID generator with the given configuration.
    #[must_use]
    pub fn new(config: IdGeneratorConfig) -> Self {
        Self {
            config,
            existing_ids: HashSet::new(),
        }
    }

    /// Register an existing ID to prevent collisions with it.
    pub fn register_id(&mut self, id: String) {
        self.existing_ids.insert(id);
    }

    /// The database size this generator was configured with.
    #[must_use]
    pub fn database_size(&self) -> usize {
        self.config.database_size
    }

    /// Generate a new unique ID.
    ///
    /// The contract id participates in the hash, so identically named
    /// milestones in different contracts diverge even within one timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`IdGenerationError::CollisionExhausted`] if no unique id
    /// could be produced after all nonce retries and a length increase.
    pub fn generate(
        &mut self,
        contract: &str,
        name: &str,
        description: Option<&str>,
        owner: Option<&str>,
    ) -> Result<String, IdGenerationError> {
        let id_length = self.adaptive_length();

        for nonce in 0..MAX_NONCE {
            let id = self.generate_hash_id(contract, name, description, owner, nonce, id_length)?;

            if !self.existing_ids.contains(&id) {
                if nonce > 0 {
                    debug!(nonce, id_length, "generated unique ID after collision retries");
                }
                self.existing_ids.insert(id.clone());
                return Ok(id);
            }
        }

        // All nonces collided at this length; one more try a character wider.
        if id_length < 6 {
            warn!(
                id_length,
                max_nonce = MAX_NONCE,
                "all nonces exhausted, increasing ID length"
            );
            let longer_id =
                self.generate_hash_id(contract, name, description, owner, 0, id_length + 1)?;
            if !self.existing_ids.contains(&longer_id) {
                self.existing_ids.insert(longer_id.clone());
                return Ok(longer_id);
            }
        }

        Err(IdGenerationError::CollisionExhausted {
            attempts: MAX_NONCE,
        })
    }

    /// Build one candidate id from the request content, a nonce, and the
    /// current timestamp.
    fn generate_hash_id(
        &self,
        contract: &str,
        name: &str,
        description: Option<&str>,
        owner: Option<&str>,
        nonce: u32,
        length: usize,
    ) -> Result<String, IdGenerationError> {
        let timestamp = Utc::now().timestamp();
        let content = format!(
            "{}|{}|{}|{}|{}|{}",
            contract,
            name,
            description.unwrap_or(""),
            owner.unwrap_or(""),
            timestamp,
            nonce
        );

        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        let hash_bytes = hasher.finalize();

        let hash_str = encode_base36(&hash_bytes[..8], length)?;

        Ok(format!("{}-{}", self.config.prefix, hash_str))
    }

    /// Determine ID length from database size.
    ///
    /// - 0-500 milestones: 4 chars
    /// - 501-1,500: 5 chars
    /// - 1,501+: 6 chars
    fn adaptive_length(&self) -> usize {
        match self.config.database_size {
            0..=500 => 4,
            501..=1500 => 5,
            _ => 6,
        }
    }
}

/// Encode bytes as a base36 string of exactly `length` characters.
///
/// Uses wrapping arithmetic when folding the input bytes into a `u64`; the
/// caller passes at most 8 hash bytes, and a wrapped value still encodes to a
/// deterministic string of the requested length.
///
/// # Errors
///
/// Returns an error if `length` is 0 or if UTF-8 conversion fails.
fn encode_base36(bytes: &[u8], length: usize) -> Result<String, IdGenerationError> {
    if length == 0 {
        return Err(IdGenerationError::InvalidLength);
    }

    let mut num: u64 = 0;
    for &byte in bytes {
        num = num.wrapping_shl(8).wrapping_add(u64::from(byte));
    }

    let mut result = Vec::new();
    let mut n = num;

    while result.len() < length {
        let remainder = usize::try_from(n % 36).unwrap_or(0);
        result.push(BASE36_CHARS[remainder]);
        n /= 36;
    }

    result.reverse();

    String::from_utf8(result)
        .map_err(|e| IdGenerationError::EncodingFailed(format!("UTF-8 conversion failed: {e}")))
}

/// Validate an id against the `{prefix}-{hash}` format.
///
/// The hash part must be 4-6 ASCII alphanumeric characters.
#[must_use]
pub fn validate_id(id: &str, prefix: &str) -> bool {
    let Some(hash) = id.strip_prefix(prefix).and_then(|rest| rest.strip_prefix('-')) else {
        return false;
    };

    (4..=6).contains(&hash.len()) && hash.chars().all(|c| c.is_ascii_alphanumeric())
}
