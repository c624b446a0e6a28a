//! Inline progress display for scans and archive writes.

use colored::Colorize;
use std::io::{self, IsTerminal, Write};

/// A progress counter that redraws in place when stderr is a TTY.
///
/// Renders as `Scanning saves: 42% (21/50)` and finishes with `, done.`.
/// Off a terminal it stays silent so logs and test output remain clean.
pub struct Progress {
    /// Label shown before the percentage
    title: String,
    /// Number of items expected
    total: usize,
    /// Items processed so far
    current: usize,
    /// Whether stderr is a TTY
    is_tty: bool,
    /// Last rendered percentage, to skip redundant redraws
    last_percent: u8,
}

impl Progress {
    /// Creates a progress display and draws its initial state.
    #[must_use]
    pub fn new(title: &str, total: usize) -> Self {
        let progress = Self {
            title: title.to_string(),
            total,
            current: 0,
            is_tty: io::stderr().is_terminal(),
            last_percent: 0,
        };
        progress.draw();
        progress
    }

    /// Advances the counter by one item.
    pub fn inc(&mut self) {
        self.update(self.current + 1);
    }

    /// Moves the counter to `current`, clamped to the total.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn update(&mut self, current: usize) {
        self.current = current.min(self.total);

        let percent = if self.total > 0 {
            ((self.current as f64 / self.total as f64) * 100.0) as u8
        } else {
            0
        };

        if percent != self.last_percent {
            self.last_percent = percent;
            self.draw();
        }
    }

    /// Number of items processed so far.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.current
    }

    /// Completes the display with a final `done.` line.
    pub fn finish(mut self) {
        self.current = self.total;
        self.last_percent = 100;
        if self.is_tty && self.total > 0 {
            eprintln!(
                "\r{}: 100% ({}/{}), done.",
                self.title.dimmed(),
                self.total,
                self.total
            );
        }
        // Drop must not emit the dangling newline once finished.
        self.is_tty = false;
    }

    /// Redraws the current state on the same line.
    fn draw(&self) {
        if !self.is_tty || self.total == 0 {
            return;
        }
        eprint!(
            "\r{}: {}% ({}/{})",
            self.title.dimmed(),
            self.last_percent.to_string().dimmed(),
            self.current,
            self.total
        );
        let _ = io::stderr().flush();
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        if self.is_tty && self.total > 0 && self.current < self.total {
            eprintln!();
        }
    }
}
