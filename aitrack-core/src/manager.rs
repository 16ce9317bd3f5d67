//! Tracker discovery and routing across an installation's root directories.
//!
//! The manager owns no durable state: its directory -> tracker index is a
//! process-scoped cache that can always be rebuilt by rescanning disk.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::Result;
use crate::models::ChangeKind;
use crate::repo::{META_DIR, AI_BRANCH};
use crate::tracker::Tracker;

/// Default two-segment root kinds: `<root-kind>/<name>/...`.
pub const DEFAULT_ROOT_KINDS: &[&str] = &["plugins", "themes"];

pub struct TrackerManager {
    install_root: PathBuf,
    root_kinds: Vec<String>,
    trackers: HashMap<String, Tracker>,
}

impl TrackerManager {
    pub fn new(install_root: &Path) -> Self {
        Self::with_root_kinds(
            install_root,
            DEFAULT_ROOT_KINDS.iter().map(|s| s.to_string()).collect(),
        )
    }

    pub fn with_root_kinds(install_root: &Path, root_kinds: Vec<String>) -> Self {
        Self {
            install_root: install_root.to_path_buf(),
            root_kinds,
            trackers: HashMap::new(),
        }
    }

    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    /// Scan each root kind's immediate subdirectories for active trackers.
    ///
    /// A directory counts iff its metadata store exists, has a
    /// `refs/heads` location, and an `ai-changes` ref file is present —
    /// content does not matter (an empty ref file still counts). A
    /// present-but-malformed store is skipped silently; the scan never
    /// fails because of one bad directory.
    pub fn get_active_trackers(&mut self) -> BTreeMap<PathBuf, &Tracker> {
        let dirs = self.discover_active_dirs();

        for dir in &dirs {
            if !self.trackers.contains_key(dir) {
                match Tracker::open(&self.install_root, dir) {
                    Ok(tracker) => {
                        self.trackers.insert(dir.clone(), tracker);
                    }
                    Err(err) => {
                        warn!(dir, %err, "skipping tracker with unreadable state");
                    }
                }
            }
        }

        let mut active = BTreeMap::new();
        for dir in dirs {
            if let Some(tracker) = self.trackers.get(&dir) {
                active.insert(self.install_root.join(&dir), tracker);
            }
        }
        active
    }

    fn discover_active_dirs(&self) -> Vec<String> {
        let mut dirs = Vec::new();
        for kind in &self.root_kinds {
            let kind_dir = self.install_root.join(kind);
            let entries = match fs::read_dir(&kind_dir) {
                Ok(entries) => entries,
                Err(_) => continue,
            };
            for entry in entries.flatten() {
                if !entry.path().is_dir() {
                    continue;
                }
                let meta = entry.path().join(META_DIR);
                if !meta.is_dir() {
                    continue;
                }
                // Minimal well-formedness: a refs/heads location must exist.
                if !meta.join("refs").join("heads").is_dir() {
                    continue;
                }
                // Presence test, not content test.
                if !meta.join("refs").join("heads").join(AI_BRANCH).is_file() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy().into_owned();
                dirs.push(format!("{kind}/{name}"));
            }
        }
        dirs.sort();
        dirs
    }

    /// Resolve the tracker owning `relative_path` by its first two
    /// segments; `None` when the path is too short or its root kind is
    /// not configured.
    pub fn get_tracker_for_path(&mut self, relative_path: &str) -> Result<Option<&mut Tracker>> {
        let mut segments = relative_path.split('/').filter(|s| !s.is_empty());
        let (kind, name) = match (segments.next(), segments.next()) {
            (Some(kind), Some(name)) => (kind, name),
            _ => return Ok(None),
        };
        if !self.root_kinds.iter().any(|k| k == kind) {
            return Ok(None);
        }

        let dir = format!("{kind}/{name}");
        if !self.trackers.contains_key(&dir) {
            let tracker = Tracker::open(&self.install_root, &dir)?;
            self.trackers.insert(dir.clone(), tracker);
        }
        Ok(self.trackers.get_mut(&dir))
    }

    /// Forward one recorded mutation to the owning tracker. Returns false
    /// when no tracker owns the path.
    pub fn record(
        &mut self,
        relative_path: &str,
        kind: ChangeKind,
        original: Option<&[u8]>,
        reason: &str,
    ) -> Result<bool> {
        match self.get_tracker_for_path(relative_path)? {
            Some(tracker) => tracker.record(relative_path, kind, original, reason),
            None => Ok(false),
        }
    }

    /// True iff any discovered tracker reports changes.
    pub fn has_changes(&mut self) -> bool {
        let dirs = self.discover_active_dirs();
        for dir in dirs {
            if !self.trackers.contains_key(&dir) {
                match Tracker::open(&self.install_root, &dir) {
                    Ok(tracker) => {
                        self.trackers.insert(dir.clone(), tracker);
                    }
                    Err(_) => continue,
                }
            }
            if self.trackers[&dir].has_changes() {
                return true;
            }
        }
        false
    }

    /// Export one tracked directory as a standalone repository at `target`.
    pub fn export_directory(&mut self, relative_dir: &str, target: &Path) -> Result<bool> {
        match self.get_tracker_for_path(relative_dir)? {
            Some(tracker) => crate::export::export_standalone(tracker, target),
            None => Ok(false),
        }
    }
}
