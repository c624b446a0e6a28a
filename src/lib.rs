#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]
#![allow(clippy::arithmetic_side_effects)] // Simple counters and size calculations cannot overflow
#![allow(clippy::float_arithmetic)] // Required for file size formatting

//! # Savesync - Two-Way Emulator Save Synchronization
//!
//! Savesync keeps emulator save files (and optionally save states) in step
//! between two locally mounted directory trees, such as a desktop library and
//! a handheld's SD card. Each run is a fresh, stateless pass:
//!
//! 1. Optionally snapshot both trees into timestamped zip archives, but only
//!    when something would actually change.
//! 2. Copy every file that differs from tree A into tree B.
//! 3. Copy every file that differs from tree B into tree A.
//!
//! Sync is additive: nothing is ever deleted from a destination tree.
//!
//! ## Architecture
//!
//! - [`scanner`]: Eligibility rules and directory traversal
//! - [`compare`]: Size-then-hash file comparison
//! - [`sync`]: Change detection and the directional sync engine
//! - [`backup`]: Zip snapshots with count-based retention
//! - [`orchestrator`]: Runs a complete saves (and states) pass
//! - [`config`]: TOML configuration and validation
//! - [`output`]: Console styling and progress display
//! - [`utils`]: Small helpers shared across modules
//!
//! ## Example Usage
//!
//! ```no_run
//! use savesync::config::Config;
//! use savesync::orchestrator::{self, RunOptions};
//!
//! # fn main() -> anyhow::Result<()> {
//! let opts = RunOptions::new("/Users/me/RetroArch/saves", "/Volumes/SD/RetroArch/saves");
//! let summary = orchestrator::run(&opts, &Config::default())?;
//! println!("copied {} file(s)", summary.total_copied());
//! # Ok(())
//! # }
//! ```

/// Backup snapshot creation and retention pruning.
pub mod backup;

/// Command-line interface definitions (argument parsing structures).
pub mod cli;

/// Content comparison between a source file and its destination counterpart.
pub mod compare;

/// Configuration parsing, validation, and defaults.
pub mod config;

/// High-level sequencing of backups and directional sync passes.
pub mod orchestrator;

/// Output formatting and progress display.
pub mod output;

/// Filesystem scanning and eligibility rules.
pub mod scanner;

/// Change detection and the directional sync engine.
pub mod sync;

/// Utility functions and helpers.
pub mod utils;

/// Current version of the savesync binary.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable that overrides the configuration file location.
pub const CONFIG_PATH_ENV: &str = "SAVESYNC_CONFIG_PATH";

/// Environment variable holding the `tracing` filter directive.
pub const LOG_ENV: &str = "SAVESYNC_LOG";

/// Default configuration file path relative to the user's config directory.
pub const DEFAULT_CONFIG_PATH: &str = "savesync/config.toml";

/// Prefix used for every dry-run message.
pub const DRY_RUN_PREFIX: &str = "[Dry Run]";
