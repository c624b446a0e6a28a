use super::Config;
use anyhow::{Result, bail};
use colored::Colorize;
use std::collections::HashSet;
use std::path::{Component, Path};

/// Recognizes the configuration keys savesync understands.
pub struct ConfigValidator {
    /// Dotted names of every known leaf and section
    known_fields: HashSet<&'static str>,
}

impl ConfigValidator {
    /// Create a new validator with known configuration fields
    #[must_use]
    pub fn new() -> Self {
        let known_fields = [
            "backup",
            "backup.keep",
            "backup.dir_name",
            "backup.require_changes",
            "backup.archive_prefix",
            "scan",
            "scan.exclude_names",
            "scan.follow_symlinks",
            "compare",
            "compare.chunk_size",
            "states",
            "states.dir_names",
        ]
        .into_iter()
        .collect();

        Self { known_fields }
    }

    /// Collect dotted keys in `content` that savesync does not recognize.
    ///
    /// Unparseable input yields no unknown keys; parse errors are reported
    /// by [`Config::from_toml`] instead.
    #[must_use]
    pub fn unknown_fields(&self, content: &str) -> Vec<String> {
        let mut unknown = Vec::new();
        if let Ok(parsed) = toml::from_str::<toml::Value>(content) {
            self.check_table(&parsed, "", &mut unknown);
        }
        unknown
    }

    /// Print a warning block listing unrecognized keys, if any.
    pub fn warn_unknown_fields(&self, content: &str) {
        let unknown = self.unknown_fields(content);
        if unknown.is_empty() {
            return;
        }

        crate::output::warning("Configuration warnings:");
        for field in unknown {
            eprintln!("  Unknown configuration field: {}", field.yellow());
        }
        eprintln!();
    }

    /// Recursively walk a TOML table, recording unknown dotted keys.
    fn check_table(&self, table: &toml::Value, prefix: &str, unknown: &mut Vec<String>) {
        let toml::Value::Table(map) = table else {
            return;
        };

        for (key, value) in map {
            let full_key = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };

            if !self.known_fields.contains(full_key.as_str()) {
                unknown.push(full_key);
            } else if value.is_table() {
                self.check_table(value, &full_key, unknown);
            }
        }
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Reject configuration values that would make a run meaningless or unsafe.
///
/// # Errors
///
/// Returns an error describing the first invalid value found.
pub fn validate(config: &Config) -> Result<()> {
    if config.backup.keep == 0 {
        bail!("backup.keep must be at least 1");
    }
    if config.compare.chunk_size == 0 {
        bail!("compare.chunk_size must be at least 1");
    }
    require_segment("backup.dir_name", &config.backup.dir_name)?;
    require_segment("backup.archive_prefix", &config.backup.archive_prefix)?;

    if config.states.dir_names.is_empty() {
        bail!("states.dir_names must list at least one directory name");
    }
    for name in &config.states.dir_names {
        require_segment("states.dir_names", name)?;
    }
    for name in &config.scan.exclude_names {
        require_segment("scan.exclude_names", name)?;
    }
    Ok(())
}

/// Require `value` to be exactly one normal path component.
fn require_segment(field: &str, value: &str) -> Result<()> {
    let mut components = Path::new(value).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => bail!("{field} must be a single directory name, got {value:?}"),
    }
}
