//! Utility functions and helpers.
//!
//! - [`hash`]: Streaming SHA-256 file digests
//! - [`paths`]: Path manipulation and directory creation
//!
//! # Examples
//!
//! ```
//! use savesync::utils::format_size;
//!
//! assert_eq!(format_size(512), "512 B");
//! assert_eq!(format_size(1024 * 1024), "1.00 MB");
//! ```

/// Streaming content hashes
pub mod hash;
/// Path manipulation and resolution utilities
pub mod paths;

/// Formats a file size in bytes into a human-readable string with appropriate units.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn format_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size.round() as u64, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

/// Pluralizes `file` for count messages.
#[must_use]
pub const fn files_word(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}
