//! Configuration for citeledger-core
//!
//! Loaded from TOML. Every section and field has a default, so an empty file
//! (or no file at all) is a valid configuration.
//!
//! ```toml
//! [verification]
//! timeout_secs = 10
//! concurrency_limit = 4
//! retry_count = 1
//! retry_backoff_ms = 500
//! batch_deadline_secs = 120
//! user_agent = "citeledger/0.1"
//!
//! [bibliography]
//! default_entry_type = "article"
//! misc_without_journal = false
//!
//! [dedup]
//! strategy = "most_identifiers"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CiteError, Result};
use crate::store::DedupStrategy;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CiteLedgerConfig {
    pub verification: VerificationConfig,
    pub bibliography: BibliographyConfig,
    pub dedup: DedupConfig,
}

/// Network verification settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum records probed at once by a batch
    pub concurrency_limit: usize,
    /// Retries after a transient failure (timeout, connection error)
    pub retry_count: u32,
    /// Backoff before the first retry; doubles for each further retry
    pub retry_backoff_ms: u64,
    /// Overall deadline for one batch run in seconds
    pub batch_deadline_secs: u64,
    pub user_agent: String,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            concurrency_limit: 4,
            retry_count: 1,
            retry_backoff_ms: 500,
            batch_deadline_secs: 120,
            user_agent: concat!("citeledger/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl VerificationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn batch_deadline(&self) -> Duration {
        Duration::from_secs(self.batch_deadline_secs)
    }

    /// Concurrency limit, never below one
    pub fn concurrency(&self) -> usize {
        self.concurrency_limit.max(1)
    }
}

/// Bibliography output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BibliographyConfig {
    /// Entry type written for every record, e.g. "article"
    pub default_entry_type: String,
    /// Write `@misc` instead of the default type when a record has no journal
    pub misc_without_journal: bool,
}

impl Default for BibliographyConfig {
    fn default() -> Self {
        Self {
            default_entry_type: "article".to_string(),
            misc_without_journal: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    pub strategy: DedupStrategy,
}

impl CiteLedgerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| CiteError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// `<config dir>/citeledger/config.toml`, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("citeledger").join("config.toml"))
    }

    /// Load from the default path; a missing file yields the defaults
    pub fn load_or_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => {
                tracing::debug!("Loading configuration from {:?}", path);
                Self::load(path)
            }
            _ => Ok(Self::default()),
        }
    }
}
