/// Rules deciding whether a relative path takes part in sync.
pub mod eligibility;

/// Directory traversal yielding eligible files.
pub mod walk;

pub use eligibility::{is_backup_path, is_eligible, is_hidden_segment};
pub use walk::{WalkOptions, walk_eligible};
