use anyhow::{Context, Result};
use colored::Colorize;
use savesync::cli::Cli;
use savesync::config::Config;
use savesync::output::{self, Verbosity};
use savesync::{LOG_ENV, orchestrator};
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse_args();

    init_tracing(cli.verbose);
    output::set_verbosity(if cli.quiet {
        Verbosity::Quiet
    } else if cli.verbose {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    });

    let mut config = match Config::resolve_path(cli.config.as_deref()) {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };
    if let Some(keep) = cli.keep {
        config.backup.keep = usize::try_from(keep).context("--keep is too large")?;
    }

    let summary = orchestrator::run(&cli.run_options(), &config)?;

    let copied = summary.total_copied();
    if cli.dry_run {
        output::dry_run(&format!("{copied} file(s) would be copied in total."));
    } else if copied == 0 {
        output::success("Everything is already in sync.");
    } else {
        output::success(&format!("{copied} file(s) copied in total."));
    }
    Ok(())
}

/// Installs the stderr `tracing` subscriber, filtered by `SAVESYNC_LOG`.
fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "savesync=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
