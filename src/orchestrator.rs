//! Sequencing of a complete run.
//!
//! For each tree pair (saves, then optionally states) a run:
//!
//! 1. resolves each side's backup directory,
//! 2. snapshots both sides if backups are enabled and warranted,
//! 3. syncs A→B, then B→A.
//!
//! Nothing is remembered between runs. A second run over unchanged trees
//! copies nothing and, with change-gated backups, writes no snapshot.

use crate::backup::{BackupManager, BackupOutcome};
use crate::config::{Config, StatesConfig};
use crate::output;
use crate::sync::{SyncEngine, SyncReport};
use crate::utils::paths::{expand_tilde, make_absolute, resolve_tree_root};
use anyhow::{Context, Result, bail};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{Level, info, span};

/// Finds the save-state directory belonging to a saves tree.
pub trait StatesLocator {
    /// States directory for `tree_root`, if one exists.
    fn locate(&self, tree_root: &Path) -> Option<PathBuf>;
}

impl<F> StatesLocator for F
where
    F: Fn(&Path) -> Option<PathBuf>,
{
    fn locate(&self, tree_root: &Path) -> Option<PathBuf> {
        self(tree_root)
    }
}

/// Looks for a directory next to the saves tree, trying names in order.
///
/// With the default names, `/sd/RetroArch/saves` resolves to
/// `/sd/RetroArch/states` or, failing that, `/sd/RetroArch/States`.
#[derive(Debug, Clone)]
pub struct SiblingStatesLocator {
    /// Candidate directory names, first match wins
    names: Vec<String>,
}

impl SiblingStatesLocator {
    /// Locator trying `names` in order.
    #[must_use]
    pub const fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Locator using the configured names.
    #[must_use]
    pub fn from_config(states: &StatesConfig) -> Self {
        Self::new(states.dir_names.clone())
    }
}

impl Default for SiblingStatesLocator {
    fn default() -> Self {
        Self::from_config(&StatesConfig::default())
    }
}

impl StatesLocator for SiblingStatesLocator {
    fn locate(&self, tree_root: &Path) -> Option<PathBuf> {
        let parent = tree_root.parent()?;
        self.names
            .iter()
            .map(|name| parent.join(name))
            .find(|candidate| candidate.is_dir())
    }
}

/// Inputs for one run, mirroring the command-line flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Tree root A
    pub mac_path: PathBuf,
    /// Tree root B
    pub handheld_path: PathBuf,
    /// Snapshot both trees before syncing
    pub backup: bool,
    /// Report instead of acting
    pub dry_run: bool,
    /// Also sync the sibling states directories
    pub transfer_states: bool,
    /// Backup directory override for A
    pub mac_backup: Option<PathBuf>,
    /// Backup directory override for B
    pub handheld_backup: Option<PathBuf>,
    /// States backup directory override for A
    pub mac_states_backup: Option<PathBuf>,
    /// States backup directory override for B
    pub handheld_states_backup: Option<PathBuf>,
}

impl RunOptions {
    /// Options syncing `mac_path` and `handheld_path` with every flag off.
    #[must_use]
    pub fn new(mac_path: impl Into<PathBuf>, handheld_path: impl Into<PathBuf>) -> Self {
        Self {
            mac_path: mac_path.into(),
            handheld_path: handheld_path.into(),
            ..Self::default()
        }
    }
}

/// Two trees synced against each other, with their backup directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreePair {
    /// Name used in messages (`saves`, `states`)
    pub label: String,
    /// First tree
    pub a: PathBuf,
    /// Second tree
    pub b: PathBuf,
    /// Where snapshots of `a` go
    pub a_backup: PathBuf,
    /// Where snapshots of `b` go
    pub b_backup: PathBuf,
}

/// Why and whether snapshots were taken for a pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupDecision {
    /// `--backup` was not given.
    Disabled,
    /// Backups were enabled but neither direction had anything to copy.
    NoChanges,
    /// Both sides were snapshotted (or would be, in a dry run).
    Taken(Vec<BackupOutcome>),
}

/// Result of syncing one pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairSummary {
    /// Backup step result
    pub backup: BackupDecision,
    /// Pass from `a` into `b`
    pub a_to_b: SyncReport,
    /// Pass from `b` into `a`
    pub b_to_a: SyncReport,
}

impl PairSummary {
    /// Files copied in both directions.
    #[must_use]
    pub fn copied(&self) -> usize {
        self.a_to_b.copied.len() + self.b_to_a.copied.len()
    }
}

/// Result of a whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Saves pair result
    pub saves: PairSummary,
    /// States pair result, when states were synced
    pub states: Option<PairSummary>,
    /// Why states were requested but not synced
    pub states_skipped_reason: Option<String>,
}

impl RunSummary {
    /// Files copied across every pass of the run.
    #[must_use]
    pub fn total_copied(&self) -> usize {
        self.saves.copied() + self.states.as_ref().map_or(0, PairSummary::copied)
    }
}

/// Message shown when one or both states directories are missing.
pub const STATES_NOT_FOUND: &str =
    "States folder not found on one or both devices; skipping states synchronization.";

/// Message shown when both saves trees share one states directory.
pub const STATES_SHARED: &str =
    "Both devices resolve to the same states folder; skipping states synchronization.";

/// Runs a full pass with the configured states lookup.
///
/// # Errors
///
/// Returns an error if either root is missing, or any backup or sync step
/// fails. Work done before the failure is not rolled back.
pub fn run(opts: &RunOptions, config: &Config) -> Result<RunSummary> {
    run_with_locator(opts, config, &SiblingStatesLocator::from_config(&config.states))
}

/// Runs a full pass, finding states directories with `locator`.
///
/// # Errors
///
/// See [`run`].
pub fn run_with_locator<L: StatesLocator + ?Sized>(
    opts: &RunOptions,
    config: &Config,
    locator: &L,
) -> Result<RunSummary> {
    let span = span!(Level::DEBUG, "run", dry_run = opts.dry_run, backup = opts.backup);
    let _guard = span.enter();

    let mac = resolve_tree_root(&opts.mac_path)?;
    let handheld = resolve_tree_root(&opts.handheld_path)?;
    if same_directory(&mac, &handheld)? {
        bail!(
            "Both paths refer to the same directory: {}",
            mac.display()
        );
    }

    if opts.dry_run {
        output::dry_run("No files will be created, modified, or deleted.");
    }

    let saves = TreePair {
        label: "saves".to_string(),
        a_backup: resolve_backup_dir(&mac, opts.mac_backup.as_deref(), config)?,
        b_backup: resolve_backup_dir(&handheld, opts.handheld_backup.as_deref(), config)?,
        a: mac.clone(),
        b: handheld.clone(),
    };
    let saves_summary = run_pair(&saves, opts, config)?;

    if !opts.transfer_states {
        return Ok(RunSummary {
            saves: saves_summary,
            states: None,
            states_skipped_reason: None,
        });
    }

    let (Some(mac_states), Some(handheld_states)) = (locator.locate(&mac), locator.locate(&handheld))
    else {
        output::info(STATES_NOT_FOUND);
        return Ok(RunSummary {
            saves: saves_summary,
            states: None,
            states_skipped_reason: Some(STATES_NOT_FOUND.to_string()),
        });
    };

    if same_directory(&mac_states, &handheld_states)? {
        output::info(STATES_SHARED);
        return Ok(RunSummary {
            saves: saves_summary,
            states: None,
            states_skipped_reason: Some(STATES_SHARED.to_string()),
        });
    }

    let states = TreePair {
        label: "states".to_string(),
        a_backup: resolve_backup_dir(&mac_states, opts.mac_states_backup.as_deref(), config)?,
        b_backup: resolve_backup_dir(
            &handheld_states,
            opts.handheld_states_backup.as_deref(),
            config,
        )?,
        a: mac_states,
        b: handheld_states,
    };
    let states_summary = run_pair(&states, opts, config)?;

    Ok(RunSummary {
        saves: saves_summary,
        states: Some(states_summary),
        states_skipped_reason: None,
    })
}

/// Whether `a` and `b` resolve to one directory.
fn same_directory(a: &Path, b: &Path) -> Result<bool> {
    let a = a
        .canonicalize()
        .with_context(|| format!("Failed to resolve directory: {}", a.display()))?;
    let b = b
        .canonicalize()
        .with_context(|| format!("Failed to resolve directory: {}", b.display()))?;
    Ok(a == b)
}

/// Backup directory for `root`: the override if given, otherwise the
/// configured directory name directly under `root`.
///
/// # Errors
///
/// Returns an error if a relative override cannot be made absolute.
pub fn resolve_backup_dir(
    root: &Path,
    override_dir: Option<&Path>,
    config: &Config,
) -> Result<PathBuf> {
    match override_dir {
        Some(dir) => make_absolute(&expand_tilde(dir)?),
        None => Ok(root.join(&config.backup.dir_name)),
    }
}

/// Backs up (if warranted) and syncs one pair in both directions.
///
/// # Errors
///
/// Returns an error if change detection, a backup, or a sync pass fails.
pub fn run_pair(pair: &TreePair, opts: &RunOptions, config: &Config) -> Result<PairSummary> {
    let span = span!(Level::DEBUG, "run_pair", label = %pair.label);
    let _guard = span.enter();

    // Snapshots never travel to the other side, whatever the directory is called.
    let engine = SyncEngine::from_config(config)
        .excluding_dirs([pair.a_backup.clone(), pair.b_backup.clone()]);

    let backup = if !opts.backup {
        output::info(&format!(
            "Backup disabled; skipping {} backup.",
            pair.label
        ));
        BackupDecision::Disabled
    } else if config.backup.require_changes
        && !engine.has_pending_changes(&pair.a, &pair.b)?
        && !engine.has_pending_changes(&pair.b, &pair.a)?
    {
        output::info(&format!(
            "No {} changes detected; skipping {} backup.",
            pair.label, pair.label
        ));
        BackupDecision::NoChanges
    } else {
        let outcomes = vec![
            BackupManager::from_config(pair.a_backup.clone(), config).backup(&pair.a, opts.dry_run)?,
            BackupManager::from_config(pair.b_backup.clone(), config).backup(&pair.b, opts.dry_run)?,
        ];
        BackupDecision::Taken(outcomes)
    };

    let a_to_b = engine.sync(&pair.a, &pair.b, opts.dry_run)?;
    let settled: BTreeSet<PathBuf> = if opts.dry_run {
        a_to_b.copied.iter().cloned().collect()
    } else {
        BTreeSet::new()
    };
    let b_to_a = engine.sync_after(&pair.b, &pair.a, opts.dry_run, &settled)?;

    info!(
        label = %pair.label,
        a_to_b = a_to_b.copied.len(),
        b_to_a = b_to_a.copied.len(),
        "Pair synced"
    );
    Ok(PairSummary {
        backup,
        a_to_b,
        b_to_a,
    })
}
