use super::eligibility::{is_backup_path, is_eligible};
use crate::config::ScanConfig;
use crate::output;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Controls which entries [`walk_eligible`] yields.
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// Descend into symlinked directories. Symlinked files are always
    /// yielded.
    pub follow_symlinks: bool,
    /// Segments that exclude a path outright (`backup`, `backups`).
    pub exclude_names: Vec<String>,
    /// Directories pruned from the walk wherever they appear.
    pub exclude_dirs: Vec<PathBuf>,
}

impl WalkOptions {
    /// Options for sync and change detection: hidden and backup-named
    /// segments are excluded.
    #[must_use]
    pub fn for_sync(scan: &ScanConfig) -> Self {
        Self {
            follow_symlinks: scan.follow_symlinks,
            exclude_names: scan.exclude_names.clone(),
            exclude_dirs: Vec::new(),
        }
    }

    /// Options for snapshotting a tree: hidden segments and the snapshot's
    /// own backup directory are excluded, nothing else.
    #[must_use]
    pub fn for_backup(scan: &ScanConfig, backup_dir: &Path) -> Self {
        Self {
            follow_symlinks: scan.follow_symlinks,
            exclude_names: Vec::new(),
            exclude_dirs: vec![backup_dir.to_path_buf()],
        }
    }

    /// Adds `dirs` to the pruned directories.
    #[must_use]
    pub fn excluding<I>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        self.exclude_dirs.extend(dirs);
        self
    }
}

/// Lists every eligible regular file under `root` as a root-relative path.
///
/// Hidden and excluded directories are pruned rather than filtered, so
/// nothing beneath them is ever read. Entries are visited in file-name order
/// within each directory. A symlink to a file counts as that file; a
/// symlink to a directory is only entered when `follow_symlinks` is set.
///
/// # Errors
///
/// Returns an error if `root` cannot be resolved or any entry cannot be read.
pub fn walk_eligible(root: &Path, opts: &WalkOptions) -> Result<Vec<PathBuf>> {
    let root = root
        .canonicalize()
        .with_context(|| format!("Failed to resolve directory: {}", root.display()))?;
    let exclude_dirs: Vec<PathBuf> = opts
        .exclude_dirs
        .iter()
        .map(|dir| dir.canonicalize().unwrap_or_else(|_| dir.clone()))
        .collect();

    let mut files = Vec::new();

    let walker = WalkDir::new(&root)
        .follow_links(opts.follow_symlinks)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            if exclude_dirs.iter().any(|dir| dir == entry.path()) {
                return false;
            }
            let rel = entry.path().strip_prefix(&root).unwrap_or(entry.path());
            is_eligible(rel) && !is_backup_path(rel, &opts.exclude_names)
        });

    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        let Ok(rel) = entry.path().strip_prefix(&root) else {
            continue;
        };
        if is_regular_file(&entry, rel) {
            files.push(rel.to_path_buf());
        }
    }

    tracing::debug!(root = %root.display(), files = files.len(), "Walk complete");
    Ok(files)
}

/// Whether `entry` is a regular file or an unfollowed symlink to one.
fn is_regular_file(entry: &DirEntry, rel: &Path) -> bool {
    if entry.file_type().is_file() {
        return true;
    }
    if !entry.file_type().is_symlink() {
        return false;
    }
    match fs::metadata(entry.path()) {
        Ok(meta) if meta.is_file() => true,
        Ok(_) => {
            output::verbose(&format!("Skipping symlinked directory: {}", rel.display()));
            false
        }
        Err(_) => {
            output::verbose(&format!("Skipping broken symlink: {}", rel.display()));
            false
        }
    }
}
