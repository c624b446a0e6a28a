//! Console output for savesync.
//!
//! Every user-facing line goes to stderr so that stdout stays free for
//! scripting. Routine messages are dimmed, actions carry a bold verb, and
//! simulated actions are always tagged with the dry-run prefix so they can
//! never be mistaken for real filesystem changes.

mod progress;

use crate::DRY_RUN_PREFIX;
use colored::Colorize;
use std::sync::atomic::{AtomicU8, Ordering};

pub use progress::Progress;

/// Verbosity level for output messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Only warnings and errors.
    Quiet = 0,
    /// Standard progress and action lines.
    Normal = 1,
    /// Standard output plus per-file diagnostics.
    Verbose = 2,
}

/// Global verbosity setting (default: Normal).
static VERBOSITY: AtomicU8 = AtomicU8::new(1);

/// Sets the global verbosity level for all output functions.
pub fn set_verbosity(level: Verbosity) {
    VERBOSITY.store(level as u8, Ordering::Relaxed);
}

/// Gets the current global verbosity level.
pub fn get_verbosity() -> Verbosity {
    match VERBOSITY.load(Ordering::Relaxed) {
        0 => Verbosity::Quiet,
        2 => Verbosity::Verbose,
        _ => Verbosity::Normal,
    }
}

/// Whether informational lines should be printed.
fn chatty() -> bool {
    get_verbosity() != Verbosity::Quiet
}

/// Prints a success message in green (respects quiet mode).
pub fn success(message: &str) {
    if chatty() {
        eprintln!("{}", message.green());
    }
}

/// Prints a warning message in bold yellow (always shown).
pub fn warning(message: &str) {
    eprintln!("{}", message.yellow().bold());
}

/// Prints an informational message in dimmed color (respects quiet mode).
pub fn info(message: &str) {
    if chatty() {
        eprintln!("{}", message.dimmed());
    }
}

/// Prints a message only in verbose mode.
pub fn verbose(message: &str) {
    if get_verbosity() == Verbosity::Verbose {
        eprintln!("{}", message.dimmed());
    }
}

/// Prints an action line such as `Copied: gba/zelda.srm`.
pub fn action(verb: &str, message: &str) {
    if chatty() {
        eprintln!("{} {}", verb.bold(), message);
    }
}

/// Prints a simulated action, prefixed with `[Dry Run]`.
pub fn dry_run(message: &str) {
    if chatty() {
        eprintln!("{} {}", DRY_RUN_PREFIX.cyan().bold(), message);
    }
}

/// Starts a new progress bar for tracking long operations.
#[must_use]
pub fn start_progress(title: &str, total: usize) -> Progress {
    Progress::new(title, total)
}
