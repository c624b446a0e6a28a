use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};

/// Ensures parent directories exist for a given path
///
/// # Errors
///
/// Returns an error if the parent directories cannot be created
pub fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create parent directories for {}", path.display())
        })?;
    }
    Ok(())
}

/// Expands a leading `~` to the home directory.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined
pub fn expand_tilde(path: &Path) -> Result<PathBuf> {
    let Some(path_str) = path.to_str() else {
        return Ok(path.to_path_buf());
    };

    if path_str == "~" {
        return dirs::home_dir().context("Could not find home directory");
    }
    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir().context("Could not find home directory")?;
        return Ok(home.join(rest));
    }
    Ok(path.to_path_buf())
}

/// Makes a path absolute, resolving relative paths from current directory
///
/// # Errors
///
/// Returns an error if the current directory cannot be determined
pub fn make_absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        let current_dir = std::env::current_dir().context("Could not read current directory")?;
        Ok(current_dir.join(path))
    }
}

/// Turns a user-supplied tree root into an absolute path to an existing
/// directory.
///
/// # Errors
///
/// Returns an error if the path does not exist or is not a directory.
pub fn resolve_tree_root(path: &Path) -> Result<PathBuf> {
    let absolute = make_absolute(&expand_tilde(path)?)?;
    if !absolute.exists() {
        bail!("Directory not found: {}", absolute.display());
    }
    if !absolute.is_dir() {
        bail!("Not a directory: {}", absolute.display());
    }
    Ok(absolute)
}
