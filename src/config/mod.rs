//! Configuration for savesync.
//!
//! The configuration file is optional TOML. Every field has a default, so an
//! absent file, an empty file, or a file setting only one key all work:
//!
//! ```toml
//! [backup]
//! keep = 10
//!
//! [states]
//! dir_names = ["states", "States", "savestates"]
//! ```

pub mod validator;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Snapshot settings
    #[serde(default)]
    pub backup: BackupConfig,

    /// Tree walk settings
    #[serde(default)]
    pub scan: ScanConfig,

    /// Content comparison settings
    #[serde(default)]
    pub compare: CompareConfig,

    /// Save-state directory discovery
    #[serde(default)]
    pub states: StatesConfig,
}

/// Backup snapshot settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackupConfig {
    /// Number of archives retained per backup directory.
    #[serde(default = "default_keep")]
    pub keep: usize,
    /// Name of the backup directory created under a tree root when no
    /// explicit override is given.
    #[serde(default = "default_backup_dir_name")]
    pub dir_name: String,
    /// When false, `--backup` snapshots both trees on every run even if
    /// nothing would be copied.
    #[serde(default = "default_true")]
    pub require_changes: bool,
    /// Archive file name prefix; the timestamp and `.zip` follow it.
    #[serde(default = "default_archive_prefix")]
    pub archive_prefix: String,
}

/// Tree walk settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanConfig {
    /// Path segments that remove a file from sync consideration.
    #[serde(default = "default_exclude_names")]
    pub exclude_names: Vec<String>,
    /// Follow symbolic links while walking.
    #[serde(default)]
    pub follow_symlinks: bool,
}

/// Content comparison settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompareConfig {
    /// Read buffer size used while hashing.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

/// Save-state directory discovery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatesConfig {
    /// Sibling directory names tried in order.
    #[serde(default = "default_states_names")]
    pub dir_names: Vec<String>,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            keep: default_keep(),
            dir_name: default_backup_dir_name(),
            require_changes: true,
            archive_prefix: default_archive_prefix(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            exclude_names: default_exclude_names(),
            follow_symlinks: false,
        }
    }
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
        }
    }
}

impl Default for StatesConfig {
    fn default() -> Self {
        Self {
            dir_names: default_states_names(),
        }
    }
}

impl Config {
    /// Resolves the configuration file location.
    ///
    /// Precedence: explicit path, then `SAVESYNC_CONFIG_PATH`, then
    /// `<config dir>/savesync/config.toml`.
    #[must_use]
    pub fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        if let Ok(path) = std::env::var(crate::CONFIG_PATH_ENV) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|dir| dir.join(crate::DEFAULT_CONFIG_PATH))
    }

    /// Load configuration from a file, falling back to defaults when the
    /// file does not exist. The file is never created.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, is not valid
    /// TOML, or contains invalid values.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        validator::ConfigValidator::new().warn_unknown_fields(&content);
        Ok(config)
    }

    /// Parse and validate configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed TOML or out-of-range values.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse TOML config")?;
        validator::validate(&config)?;
        Ok(config)
    }

    /// Serialize the configuration as pretty TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

const fn default_keep() -> usize {
    5
}

fn default_backup_dir_name() -> String {
    "backups".to_string()
}

const fn default_true() -> bool {
    true
}

fn default_archive_prefix() -> String {
    "saves_backup".to_string()
}

fn default_exclude_names() -> Vec<String> {
    vec!["backup".to_string(), "backups".to_string()]
}

const fn default_chunk_size() -> usize {
    65_536
}

fn default_states_names() -> Vec<String> {
    vec!["states".to_string(), "States".to_string()]
}
