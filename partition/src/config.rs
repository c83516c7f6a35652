//! Partition configuration with TOML file support.

use accrue_types::PartitionId;
use accrue_utils::LogFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::PartitionError;

/// Configuration for one partition.
///
/// Can be loaded from a TOML file via [`PartitionConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartitionConfig {
    /// This partition's identifier, matched against envelope destinations.
    #[serde(default)]
    pub partition: PartitionId,

    /// Global rate at genesis, scaled by `PRECISION`, per second.
    ///
    /// Only used when no persisted ledger exists.
    #[serde(default = "default_initial_global_rate")]
    pub initial_global_rate: u64,

    /// LMDB data directory. Without one the ledger lives in memory only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// LMDB map size in bytes.
    #[serde(default = "default_map_size")]
    pub map_size: usize,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Filter used when `RUST_LOG` is unset, e.g. `"info,accrue_ledger=debug"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

/// 5e-11 per second.
fn default_initial_global_rate() -> u64 {
    50_000_000
}

fn default_map_size() -> usize {
    256 * 1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl PartitionConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, PartitionError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| PartitionError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, PartitionError> {
        toml::from_str(s).map_err(|e| PartitionError::Config(e.to_string()))
    }

    /// Install the global tracing subscriber described by this config.
    ///
    /// Returns `false` if one was already installed.
    pub fn init_logging(&self) -> bool {
        accrue_utils::init_tracing(self.log_format, &self.log_level)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, PartitionError> {
        toml::to_string_pretty(self).map_err(|e| PartitionError::Config(e.to_string()))
    }
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            partition: PartitionId::default(),
            initial_global_rate: default_initial_global_rate(),
            data_dir: None,
            map_size: default_map_size(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
        }
    }
}
