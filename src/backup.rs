//! Timestamped zip snapshots of a tree, with count-based retention.
//!
//! A snapshot is written once and never modified. Archives are written under
//! a `.partial` name and renamed into place, so an interrupted or failed
//! write never shows up as a retained snapshot and never triggers pruning.

use crate::config::{Config, ScanConfig};
use crate::output;
use crate::scanner::{WalkOptions, walk_eligible};
use crate::utils::{files_word, format_size};
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Datelike, Local, Timelike};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use tracing::{Level, debug, span};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Archives retained per backup directory unless configured otherwise.
pub const DEFAULT_KEEP: usize = 5;

/// Extension of retained snapshot archives.
const ARCHIVE_EXTENSION: &str = "zip";

/// Extension used while an archive is still being written.
const PARTIAL_EXTENSION: &str = "zip.partial";

/// What a call to [`BackupManager::backup`] did or would do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
    /// A snapshot was written and old ones pruned.
    Created {
        /// Path of the new archive
        archive: PathBuf,
        /// Number of files stored
        files: usize,
        /// Archives deleted by retention
        pruned: Vec<PathBuf>,
    },
    /// Dry run: nothing was written.
    Planned {
        /// Path the archive would have
        archive: PathBuf,
        /// Number of files that would be stored
        files: usize,
        /// Archives retention would delete once the new one exists
        would_prune: Vec<PathBuf>,
    },
}

impl BackupOutcome {
    /// Path of the created or planned archive.
    #[must_use]
    pub fn archive(&self) -> &Path {
        match self {
            Self::Created { archive, .. } | Self::Planned { archive, .. } => archive,
        }
    }
}

/// Writes and prunes snapshots in one backup directory.
#[derive(Debug, Clone)]
pub struct BackupManager {
    /// Directory holding the archives
    backup_dir: PathBuf,
    /// Number of archives retained
    keep: usize,
    /// File name prefix before the timestamp
    archive_prefix: String,
    /// Walk settings shared with the sync scanner
    scan: ScanConfig,
}

impl BackupManager {
    /// Manager for `backup_dir` retaining `keep` archives.
    #[must_use]
    pub fn new(backup_dir: PathBuf, keep: usize) -> Self {
        Self {
            backup_dir,
            keep,
            archive_prefix: "saves_backup".to_string(),
            scan: ScanConfig::default(),
        }
    }

    /// Manager for `backup_dir` using the configured retention and naming.
    #[must_use]
    pub fn from_config(backup_dir: PathBuf, config: &Config) -> Self {
        Self {
            backup_dir,
            keep: config.backup.keep,
            archive_prefix: config.backup.archive_prefix.clone(),
            scan: config.scan.clone(),
        }
    }

    /// Directory holding the archives.
    #[must_use]
    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Number of archives retained.
    #[must_use]
    pub const fn keep(&self) -> usize {
        self.keep
    }

    /// Archive file name for a snapshot taken at `at`.
    #[must_use]
    pub fn archive_name(&self, at: DateTime<Local>) -> String {
        format!("{}.{ARCHIVE_EXTENSION}", self.archive_stem(at))
    }

    /// Path for a snapshot taken at `at` that names no existing file.
    ///
    /// A second snapshot within the same second, for instance from another
    /// tree sharing this backup directory, gets a `_1`, `_2`, ... suffix.
    #[must_use]
    pub fn archive_path(&self, at: DateTime<Local>) -> PathBuf {
        let stem = self.archive_stem(at);
        let mut candidate = self.backup_dir.join(self.archive_name(at));
        let mut suffix = 1;
        while candidate.exists() || candidate.with_extension(PARTIAL_EXTENSION).exists() {
            candidate = self
                .backup_dir
                .join(format!("{stem}_{suffix}.{ARCHIVE_EXTENSION}"));
            suffix += 1;
        }
        candidate
    }

    /// Prefix and timestamp, without extension.
    fn archive_stem(&self, at: DateTime<Local>) -> String {
        format!("{}_{}", self.archive_prefix, at.format("%Y%m%d%H%M%S"))
    }

    /// Snapshots every eligible file under `tree_root`, then prunes.
    ///
    /// The backup directory itself is never included, wherever it lives.
    /// In a dry run the archive name, file count, and the archives pruning
    /// would remove are reported, and nothing is created or deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree cannot be walked, the backup directory
    /// cannot be created, or the archive cannot be written. Pruning does not
    /// run after a failed write.
    pub fn backup(&self, tree_root: &Path, dry_run: bool) -> Result<BackupOutcome> {
        let span = span!(Level::DEBUG, "backup", root = %tree_root.display(), dry_run);
        let _guard = span.enter();

        output::info(&format!("Backing up {}...", tree_root.display()));

        let walk = WalkOptions::for_backup(&self.scan, &self.backup_dir);
        let files = walk_eligible(tree_root, &walk)?;
        let archive = self.archive_path(Local::now());

        if dry_run {
            if !self.backup_dir.is_dir() {
                output::dry_run(&format!(
                    "Would create backup directory: {}",
                    self.backup_dir.display()
                ));
            }
            output::dry_run(&format!("Would create backup zip file: {}", archive.display()));
            output::dry_run(&format!("Would zip {} {}.", files.len(), files_word(files.len())));

            let would_prune = self.plan_prune(1)?;
            for old in &would_prune {
                output::dry_run(&format!("Would remove old backup: {}", old.display()));
            }
            return Ok(BackupOutcome::Planned {
                archive,
                files: files.len(),
                would_prune,
            });
        }

        fs::create_dir_all(&self.backup_dir).with_context(|| {
            format!(
                "Failed to create backup directory: {}",
                self.backup_dir.display()
            )
        })?;
        write_archive(tree_root, &files, &archive)?;
        let size = fs::metadata(&archive).map(|m| m.len()).unwrap_or(0);
        output::success(&format!(
            "Backup saved to {} ({})",
            archive.display(),
            format_size(size)
        ));

        let pruned = self.prune()?;
        Ok(BackupOutcome::Created {
            archive,
            files: files.len(),
            pruned,
        })
    }

    /// Snapshot archives directly inside the backup directory, newest first.
    ///
    /// Only regular `.zip` files count; subdirectories, partial writes and
    /// other files are ignored. A missing directory has no archives.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be listed.
    pub fn list_archives(&self) -> Result<Vec<PathBuf>> {
        if !self.backup_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut archives: Vec<(SystemTime, PathBuf)> = Vec::new();
        let entries = fs::read_dir(&self.backup_dir)
            .with_context(|| format!("Failed to list {}", self.backup_dir.display()))?;
        for entry in entries {
            let entry = entry
                .with_context(|| format!("Failed to list {}", self.backup_dir.display()))?;
            let path = entry.path();
            let meta = entry
                .metadata()
                .with_context(|| format!("Failed to stat {}", path.display()))?;
            if !meta.is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(ARCHIVE_EXTENSION)
            {
                continue;
            }
            let modified = meta
                .modified()
                .with_context(|| format!("Failed to read modification time of {}", path.display()))?;
            archives.push((modified, path));
        }

        archives.sort_by(|a, b| b.cmp(a));
        Ok(archives.into_iter().map(|(_, path)| path).collect())
    }

    /// Archives pruning would delete if `reserve` newer snapshots were
    /// added first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backup directory cannot be listed.
    pub fn plan_prune(&self, reserve: usize) -> Result<Vec<PathBuf>> {
        let keep_existing = self.keep.saturating_sub(reserve);
        Ok(self
            .list_archives()?
            .into_iter()
            .skip(keep_existing)
            .collect())
    }

    /// Deletes all but the newest `keep` archives.
    ///
    /// # Errors
    ///
    /// Returns an error if listing or any deletion fails.
    pub fn prune(&self) -> Result<Vec<PathBuf>> {
        let doomed = self.plan_prune(0)?;
        for old in &doomed {
            output::info(&format!("Removing old backup: {}", old.display()));
            fs::remove_file(old)
                .with_context(|| format!("Failed to remove old backup: {}", old.display()))?;
        }
        Ok(doomed)
    }
}

/// Writes `files` (relative to `tree_root`) into `archive` atomically.
fn write_archive(tree_root: &Path, files: &[PathBuf], archive: &Path) -> Result<()> {
    let partial = archive.with_extension(PARTIAL_EXTENSION);
    let result = write_zip(tree_root, files, &partial).and_then(|()| {
        if archive.exists() {
            bail!("Refusing to overwrite existing backup: {}", archive.display());
        }
        fs::rename(&partial, archive)
            .with_context(|| format!("Failed to finalize {}", archive.display()))
    });

    if result.is_err() {
        let _ = fs::remove_file(&partial);
    }
    result
}

/// Streams each file into a DEFLATE zip at `dest`.
fn write_zip(tree_root: &Path, files: &[PathBuf], dest: &Path) -> Result<()> {
    let file =
        File::create(dest).with_context(|| format!("Failed to create {}", dest.display()))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let base_options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut progress = output::start_progress("Zipping backup", files.len());

    for rel in files {
        let source = tree_root.join(rel);
        let meta = fs::metadata(&source)
            .with_context(|| format!("Failed to stat {}", source.display()))?;

        let mut options = base_options.large_file(meta.len() > u64::from(u32::MAX));
        if let Some(stamp) = meta.modified().ok().and_then(zip_timestamp) {
            options = options.last_modified_time(stamp);
        }

        zip.start_file(entry_name(rel), options)
            .with_context(|| format!("Failed to add {} to archive", rel.display()))?;
        let mut reader =
            File::open(&source).with_context(|| format!("Failed to open {}", source.display()))?;
        io::copy(&mut reader, &mut zip)
            .with_context(|| format!("Failed to archive {}", source.display()))?;
        progress.inc();
    }

    let mut writer = zip
        .finish()
        .with_context(|| format!("Failed to finish {}", dest.display()))?;
    writer.flush()?;
    progress.finish();

    debug!(archive = %dest.display(), files = files.len(), "Archive written");
    Ok(())
}

/// Archive entry name: relative path with `/` separators on every platform.
fn entry_name(rel: &Path) -> String {
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(segment) => Some(segment.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Local-time zip timestamp, if the date fits the zip format (1980-2107).
fn zip_timestamp(modified: SystemTime) -> Option<zip::DateTime> {
    let local: DateTime<Local> = modified.into();
    zip::DateTime::from_date_and_time(
        u16::try_from(local.year()).ok()?,
        u8::try_from(local.month()).ok()?,
        u8::try_from(local.day()).ok()?,
        u8::try_from(local.hour()).ok()?,
        u8::try_from(local.minute()).ok()?,
        u8::try_from(local.second()).ok()?,
    )
    .ok()
}
