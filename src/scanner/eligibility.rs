use std::ffi::OsStr;
use std::path::{Component, Path};

/// True for a path segment that starts with a dot (`.git`, `.DS_Store`).
#[must_use]
pub fn is_hidden_segment(segment: &OsStr) -> bool {
    segment.as_encoded_bytes().first() == Some(&b'.')
}

/// Returns whether a root-relative path may be synced or archived.
///
/// A path is ineligible when any of its segments is hidden. `.` and `..`
/// components are not segments of a walked path and are ignored.
#[must_use]
pub fn is_eligible(rel: &Path) -> bool {
    !rel.components().any(|c| match c {
        Component::Normal(segment) => is_hidden_segment(segment),
        _ => false,
    })
}

/// Returns whether any segment of `rel` is exactly one of `names`.
///
/// The match is literal and case-sensitive: with the default names
/// `backups/2024/a.srm` matches while `Backups/a.srm` and
/// `my_backup/a.srm` do not.
#[must_use]
pub fn is_backup_path(rel: &Path, names: &[String]) -> bool {
    rel.components().any(|c| match c {
        Component::Normal(segment) => names.iter().any(|name| segment == name.as_str()),
        _ => false,
    })
}
