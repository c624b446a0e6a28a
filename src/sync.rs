//! Change detection and the directional sync engine.
//!
//! A directional pass walks its source tree afresh, compares every eligible
//! file against the same relative path under the destination, and copies
//! the ones that differ. Nothing found only in the destination is touched,
//! so running A→B then B→A leaves both trees holding the union of their
//! files. Each pass reads the filesystem at call time and shares no state
//! with any other pass.

use crate::compare::{ContentComparator, ContentHasher, Sha256Hasher};
use crate::config::Config;
use crate::output;
use crate::scanner::{WalkOptions, walk_eligible};
use crate::utils::{files_word, paths::ensure_parent_dirs};
use anyhow::{Context, Result};
use filetime::FileTime;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{Level, debug, span};

/// Outcome of one directional pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Eligible files examined in the source tree
    pub scanned: usize,
    /// Root-relative paths copied, or that would be copied in a dry run
    pub copied: Vec<PathBuf>,
    /// Files already identical at the destination
    pub unchanged: usize,
    /// Whether the pass was simulated
    pub dry_run: bool,
}

/// How a file reached its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyMode {
    /// Content, permissions and timestamps copied.
    Full,
    /// Content copied plainly; only the modification time was restored.
    ContentOnly,
}

/// Returns true as soon as any eligible file under `source_root` differs
/// from its counterpart under `dest_root`.
///
/// Used to decide whether a backup is worth taking; it never copies.
///
/// # Errors
///
/// Returns an error if the walk or any comparison fails.
pub fn has_pending_changes<H: ContentHasher>(
    source_root: &Path,
    dest_root: &Path,
    comparator: &ContentComparator<H>,
    walk: &WalkOptions,
) -> Result<bool> {
    let span = span!(Level::DEBUG, "has_pending_changes", source = %source_root.display());
    let _guard = span.enter();

    for rel in walk_eligible(source_root, walk)? {
        let comparison = comparator.compare(&source_root.join(&rel), &dest_root.join(&rel))?;
        if comparison.differs() {
            debug!(path = %rel.display(), reason = comparison.reason(), "Pending change");
            return Ok(true);
        }
    }
    Ok(false)
}

/// Copies differing files from one tree into another.
#[derive(Debug, Clone, Default)]
pub struct SyncEngine<H = Sha256Hasher> {
    /// Decides which files need copying
    comparator: ContentComparator<H>,
    /// Eligibility rules for the source walk
    walk: WalkOptions,
}

impl SyncEngine {
    /// Engine using the configured chunk size and exclusion rules.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            ContentComparator::new(Sha256Hasher::new(config.compare.chunk_size)),
            WalkOptions::for_sync(&config.scan),
        )
    }
}

impl<H: ContentHasher> SyncEngine<H> {
    /// Engine from explicit parts.
    pub fn new(comparator: ContentComparator<H>, walk: WalkOptions) -> Self {
        Self { comparator, walk }
    }

    /// Also prunes `dirs` from every walk this engine makes.
    #[must_use]
    pub fn excluding_dirs<I>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        self.walk = std::mem::take(&mut self.walk).excluding(dirs);
        self
    }

    /// See [`has_pending_changes`].
    ///
    /// # Errors
    ///
    /// Returns an error if the walk or any comparison fails.
    pub fn has_pending_changes(&self, source_root: &Path, dest_root: &Path) -> Result<bool> {
        has_pending_changes(source_root, dest_root, &self.comparator, &self.walk)
    }

    /// Runs one directional pass from `source_root` into `dest_root`.
    ///
    /// In a dry run the files that would be copied are reported and
    /// returned, and the filesystem is left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error on the first unreadable source, unwritable
    /// destination, or failed comparison. Files copied before the failure
    /// stay copied.
    pub fn sync(&self, source_root: &Path, dest_root: &Path, dry_run: bool) -> Result<SyncReport> {
        self.sync_after(source_root, dest_root, dry_run, &BTreeSet::new())
    }

    /// Like [`sync`](Self::sync), but paths in `settled` count as unchanged
    /// without being compared.
    ///
    /// A dry-run reverse pass is given the forward pass's plan: once those
    /// copies happen the paths match on both sides, so the real reverse
    /// pass would find them identical.
    ///
    /// # Errors
    ///
    /// See [`sync`](Self::sync).
    pub fn sync_after(
        &self,
        source_root: &Path,
        dest_root: &Path,
        dry_run: bool,
        settled: &BTreeSet<PathBuf>,
    ) -> Result<SyncReport> {
        let span = span!(
            Level::DEBUG,
            "sync",
            source = %source_root.display(),
            dest = %dest_root.display(),
            dry_run
        );
        let _guard = span.enter();

        output::info(&format!(
            "Syncing {} -> {}...",
            source_root.display(),
            dest_root.display()
        ));

        let candidates = walk_eligible(source_root, &self.walk)?;
        let mut report = SyncReport {
            scanned: candidates.len(),
            dry_run,
            ..SyncReport::default()
        };
        let mut progress = output::start_progress("Scan", candidates.len());

        for rel in candidates {
            if settled.contains(&rel) {
                progress.inc();
                report.unchanged += 1;
                continue;
            }
            let source = source_root.join(&rel);
            let dest = dest_root.join(&rel);
            let comparison = self.comparator.compare(&source, &dest)?;
            progress.inc();

            if !comparison.differs() {
                output::verbose(&format!("Unchanged: {}", rel.display()));
                report.unchanged += 1;
                continue;
            }

            if dry_run {
                output::dry_run(&format!("Would copy: {}", rel.display()));
            } else {
                ensure_parent_dirs(&dest)?;
                let mode = copy_preserving_mtime(&source, &dest)?;
                debug!(path = %rel.display(), reason = comparison.reason(), ?mode, "Copied");
                output::action("Copied:", &rel.display().to_string());
            }
            report.copied.push(rel);
        }
        progress.finish();

        let verb = if dry_run { "would be copied" } else { "copied" };
        output::success(&format!(
            "Sync complete: {} {} {verb}, {} unchanged.",
            report.copied.len(),
            files_word(report.copied.len()),
            report.unchanged
        ));
        Ok(report)
    }
}

/// Copies `source` to `dest` and gives `dest` the source's modification
/// time.
///
/// The first attempt copies content and permissions and then both
/// timestamps. If any part of that fails (permission bits unsupported on a
/// FAT-formatted card, for instance) the content is streamed into a fresh
/// file and the modification time is set on its own.
///
/// # Errors
///
/// Returns an error only if the plain content copy or the modification time
/// update fails as well.
pub fn copy_preserving_mtime(source: &Path, dest: &Path) -> Result<CopyMode> {
    copy_preserving_mtime_with(source, dest, copy_with_metadata)
}

/// [`copy_preserving_mtime`] with the first-attempt copy supplied by the caller.
fn copy_preserving_mtime_with<F>(source: &Path, dest: &Path, full_copy: F) -> Result<CopyMode>
where
    F: FnOnce(&Path, &Path, FileTime, FileTime) -> io::Result<()>,
{
    let meta =
        fs::metadata(source).with_context(|| format!("Failed to stat {}", source.display()))?;
    let mtime = FileTime::from_last_modification_time(&meta);
    let atime = FileTime::from_last_access_time(&meta);

    match full_copy(source, dest, atime, mtime) {
        Ok(()) => Ok(CopyMode::Full),
        Err(e) => {
            debug!(
                source = %source.display(),
                error = %e,
                "Metadata copy failed, falling back to content copy"
            );
            copy_content_only(source, dest, mtime)?;
            Ok(CopyMode::ContentOnly)
        }
    }
}

/// Content, permissions, and both timestamps.
fn copy_with_metadata(source: &Path, dest: &Path, atime: FileTime, mtime: FileTime) -> io::Result<()> {
    fs::copy(source, dest)?;
    filetime::set_file_times(dest, atime, mtime)
}

/// Plain byte copy followed by an explicit modification time update.
pub(crate) fn copy_content_only(source: &Path, dest: &Path, mtime: FileTime) -> Result<()> {
    let mut reader =
        File::open(source).with_context(|| format!("Failed to open {}", source.display()))?;
    let mut writer =
        File::create(dest).with_context(|| format!("Failed to create {}", dest.display()))?;
    io::copy(&mut reader, &mut writer)
        .with_context(|| format!("Failed to copy {} to {}", source.display(), dest.display()))?;
    drop(writer);

    filetime::set_file_mtime(dest, mtime)
        .with_context(|| format!("Failed to set modification time on {}", dest.display()))
}
