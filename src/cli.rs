//! Command-line interface definitions for savesync.
//!
//! The CLI definition is shared between the main binary and the xtask man
//! page generator.
//!
//! Field-level documentation doubles as clap help text, so the usual
//! missing-docs lints are relaxed here.

#![allow(clippy::missing_docs_in_private_items)]

use crate::orchestrator::RunOptions;
use clap::Parser;
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

/// Multi-letter single-dash spellings accepted for compatibility, and the
/// long flags they stand for.
pub const LEGACY_FLAGS: &[(&str, &str)] = &[
    ("-mp", "--macpath"),
    ("-hp", "--handheldpath"),
    ("-mb", "--macbackup"),
    ("-hb", "--handheldbackup"),
    ("-msb", "--macstatesbackup"),
    ("-hsb", "--handheldstatesbackup"),
];

/// Sync emulator saves between a computer and a handheld.
#[derive(Parser, Debug)]
#[command(
    name = "savesync",
    version = crate::VERSION,
    about = "Two-way sync of emulator saves (and optionally states) between a computer and a handheld",
    long_about = "Copies every save that differs in either direction, never deleting anything. \
                  Optionally snapshots both sides into rotating zip backups first."
)]
pub struct Cli {
    /// Path to the saves directory on the computer (also -mp)
    #[arg(long = "macpath", value_name = "DIR")]
    pub mac_path: PathBuf,

    /// Path to the saves directory on the handheld (also -hp)
    #[arg(long = "handheldpath", value_name = "DIR")]
    pub handheld_path: PathBuf,

    /// Back up both sides before syncing when anything would change
    #[arg(long)]
    pub backup: bool,

    /// Show what would be done without changing any files
    #[arg(long = "dryrun", visible_alias = "dry-run")]
    pub dry_run: bool,

    /// Also sync the states directory found next to each saves directory
    #[arg(long)]
    pub transfer_states: bool,

    /// Backup directory for the computer's saves (also -mb)
    #[arg(long = "macbackup", value_name = "DIR")]
    pub mac_backup: Option<PathBuf>,

    /// Backup directory for the handheld's saves (also -hb)
    #[arg(long = "handheldbackup", value_name = "DIR")]
    pub handheld_backup: Option<PathBuf>,

    /// Backup directory for the computer's states (also -msb)
    #[arg(long = "macstatesbackup", value_name = "DIR")]
    pub mac_states_backup: Option<PathBuf>,

    /// Backup directory for the handheld's states (also -hsb)
    #[arg(long = "handheldstatesbackup", value_name = "DIR")]
    pub handheld_states_backup: Option<PathBuf>,

    /// Number of backup archives to keep per backup directory
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub keep: Option<u64>,

    /// Configuration file (default: <config dir>/savesync/config.toml)
    #[arg(long, value_name = "FILE", env = "SAVESYNC_CONFIG_PATH")]
    pub config: Option<PathBuf>,

    /// Show verbose output
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress informational messages
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Parses the process arguments, accepting legacy `-mp` style flags.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse_from(normalize_legacy_args(std::env::args_os()))
    }

    /// Run options described by these arguments.
    #[must_use]
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            mac_path: self.mac_path.clone(),
            handheld_path: self.handheld_path.clone(),
            backup: self.backup,
            dry_run: self.dry_run,
            transfer_states: self.transfer_states,
            mac_backup: self.mac_backup.clone(),
            handheld_backup: self.handheld_backup.clone(),
            mac_states_backup: self.mac_states_backup.clone(),
            handheld_states_backup: self.handheld_states_backup.clone(),
        }
    }
}

/// Rewrites `-mp DIR` and `-mp=DIR` style arguments to their long forms.
///
/// Arguments after a bare `--` are left alone.
pub fn normalize_legacy_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut passthrough = false;
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            if passthrough {
                return arg;
            }
            if arg == "--" {
                passthrough = true;
                return arg;
            }
            rewrite_legacy(&arg).unwrap_or(arg)
        })
        .collect()
}

/// Long form of a single legacy argument, if it is one.
fn rewrite_legacy(arg: &OsStr) -> Option<OsString> {
    let text = arg.to_str()?;
    let (flag, value) = match text.split_once('=') {
        Some((flag, value)) => (flag, Some(value)),
        None => (text, None),
    };
    let (_, long) = LEGACY_FLAGS.iter().find(|(short, _)| *short == flag)?;

    let mut rewritten = OsString::from(*long);
    if let Some(value) = value {
        rewritten.push("=");
        rewritten.push(value);
    }
    Some(rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn test_legacy_flags_rewritten() {
        let normalized = normalize_legacy_args(strings(&[
            "savesync", "-mp", "/a", "-hp=/b", "-msb", "/c", "--backup",
        ]));
        assert_eq!(
            normalized,
            strings(&[
                "savesync",
                "--macpath",
                "/a",
                "--handheldpath=/b",
                "--macstatesbackup",
                "/c",
                "--backup"
            ])
        );
    }

    #[test]
    fn test_values_and_passthrough_untouched() {
        let args = strings(&["savesync", "--macpath", "-mp", "--", "-hp"]);
        let normalized = normalize_legacy_args(args);
        // A value that happens to look like a legacy flag is still rewritten;
        // only arguments after `--` are protected.
        assert_eq!(
            normalized,
            strings(&["savesync", "--macpath", "--macpath", "--", "-hp"])
        );
    }

    #[test]
    fn test_parse_full_command_line() {
        let cli = Cli::parse_from(normalize_legacy_args(strings(&[
            "savesync",
            "-mp",
            "/mac/saves",
            "-hp",
            "/sd/saves",
            "--backup",
            "--dryrun",
            "--transfer-states",
            "-hb",
            "/sd/bk",
            "--keep",
            "3",
        ])));
        let opts = cli.run_options();
        assert_eq!(opts.mac_path, PathBuf::from("/mac/saves"));
        assert_eq!(opts.handheld_path, PathBuf::from("/sd/saves"));
        assert!(opts.backup && opts.dry_run && opts.transfer_states);
        assert_eq!(opts.handheld_backup, Some(PathBuf::from("/sd/bk")));
        assert_eq!(opts.mac_backup, None);
        assert_eq!(cli.keep, Some(3));
    }

    #[test]
    fn test_paths_are_required() {
        assert!(Cli::try_parse_from(["savesync", "--macpath", "/a"]).is_err());
    }

    #[test]
    fn test_keep_zero_rejected() {
        assert!(
            Cli::try_parse_from(["savesync", "--macpath", "/a", "--handheldpath", "/b", "--keep", "0"])
                .is_err()
        );
    }
}
