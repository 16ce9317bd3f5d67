pub mod diff;
pub mod export;
pub mod reapply;
pub mod revert;
pub mod status;

use aitrack_core::TrackerManager;
use std::path::Path;

pub fn build_manager(root: &Path, kinds: &str) -> TrackerManager {
    let kinds: Vec<String> = kinds
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    TrackerManager::with_root_kinds(root, kinds)
}
