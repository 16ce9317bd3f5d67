//! Per-directory change tracker.
//!
//! A `Tracker` owns one working directory's repository and its change
//! log. The lifecycle is a two-state machine: Uninitialized (no metadata
//! store on disk) until the first `record` call, then Active. The first
//! `record` creates the store, captures a `main` baseline commit of the
//! recorded path's pre-change content, and switches HEAD to `ai-changes`;
//! every subsequent record appends exactly one commit to `ai-changes`.
//!
//! Paths are always relative to the installation root
//! (`<root-kind>/<name>/...`), matching the tool-layer call contract.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::diff::FileDiff;
use crate::error::{Error, Result};
use crate::lock::DirLock;
use crate::models::{ChangeKind, ChangeRecord, DirectoryChanges};
use crate::object::ObjectKind;
use crate::repo::{Repository, AI_BRANCH, MAIN_BRANCH};
use crate::tree::{build_tree, flatten_tree};

const STATE_FILE: &str = "ai-tracker.json";
const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Durable tracker state kept alongside the object store.
#[derive(Debug, Default, Serialize, Deserialize)]
struct TrackerState {
    changes: Vec<ChangeRecord>,
    reverted: BTreeSet<String>,
}

pub struct Tracker {
    install_root: PathBuf,
    /// Installation-root-relative directory this tracker owns, e.g. `plugins/x`.
    relative_dir: String,
    workdir: PathBuf,
    repo: Repository,
    state: TrackerState,
    /// Latest blob digest per tracked path; mirrors the `ai-changes` tip tree.
    tree_files: BTreeMap<String, String>,
}

impl Tracker {
    /// Open a tracker for `relative_dir` under `install_root`, loading any
    /// persisted state if the directory is already tracked.
    pub fn open(install_root: &Path, relative_dir: &str) -> Result<Self> {
        validate_relative(relative_dir)?;
        let workdir = install_root.join(relative_dir);
        let repo = Repository::open(&workdir);

        let mut tracker = Self {
            install_root: install_root.to_path_buf(),
            relative_dir: relative_dir.to_string(),
            workdir,
            repo,
            state: TrackerState::default(),
            tree_files: BTreeMap::new(),
        };
        if tracker.is_active() {
            tracker.load_state()?;
        }
        Ok(tracker)
    }

    pub fn relative_dir(&self) -> &str {
        &self.relative_dir
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    pub fn changes(&self) -> &[ChangeRecord] {
        &self.state.changes
    }

    /// True iff the metadata store exists and the `ai-changes` ref exists.
    pub fn is_active(&self) -> bool {
        self.repo.exists() && self.repo.has_ref(AI_BRANCH)
    }

    /// True iff at least one change record exists, regardless of `is_active`.
    pub fn has_changes(&self) -> bool {
        !self.state.changes.is_empty()
    }

    pub fn is_tracked(&self, path: &str) -> bool {
        self.state.changes.iter().any(|c| c.path == path)
    }

    pub fn is_reverted(&self, path: &str) -> bool {
        self.state.reverted.contains(path)
    }

    fn load_state(&mut self) -> Result<()> {
        let path = self.repo.git_dir().join(STATE_FILE);
        if path.is_file() {
            self.state = serde_json::from_str(&fs::read_to_string(&path)?)?;
        }
        if let Some(tip) = self.repo.read_ref(AI_BRANCH)? {
            let commit = self.repo.read_commit(&tip)?;
            self.tree_files = flatten_tree(self.repo.objects(), &commit.tree)?;
        }
        Ok(())
    }

    fn save_state(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.state)?;
        fs::write(self.repo.git_dir().join(STATE_FILE), json)?;
        Ok(())
    }

    /// Record one file mutation. The new content (for created/modified) is
    /// snapshotted from disk; the tool layer has already applied it.
    ///
    /// A failed first record leaves no metadata store behind: the directory
    /// stays Uninitialized until a record fully succeeds.
    pub fn record(
        &mut self,
        path: &str,
        kind: ChangeKind,
        original: Option<&[u8]>,
        reason: &str,
    ) -> Result<bool> {
        self.validate_tracked_path(path)?;

        // Snapshot the post-change content before touching the store, so a
        // missing file or transient read error cannot materialize anything.
        let new_content = match kind {
            ChangeKind::Deleted => None,
            ChangeKind::Created | ChangeKind::Modified => {
                Some(fs::read(self.install_root.join(path))?)
            }
        };

        let was_active = self.is_active();
        fs::create_dir_all(self.repo.git_dir())?;
        let _lock = DirLock::acquire(self.repo.git_dir(), LOCK_TIMEOUT)?;

        let result = self.apply_record(path, kind, original, new_content, reason, was_active);
        if result.is_err() && !was_active {
            // Roll back the partially materialized store; the lock fd
            // stays valid across the unlink.
            let _ = fs::remove_dir_all(self.repo.git_dir());
            self.state = TrackerState::default();
            self.tree_files.clear();
        }
        result
    }

    fn apply_record(
        &mut self,
        path: &str,
        kind: ChangeKind,
        original: Option<&[u8]>,
        new_content: Option<Vec<u8>>,
        reason: &str,
        was_active: bool,
    ) -> Result<bool> {
        if !was_active {
            self.initialize(path, kind, original)?;
        }

        // Blob for the record's original content, kept for diff/revert.
        let original_digest = match original {
            Some(bytes) => Some(self.repo.objects().write_object(ObjectKind::Blob, bytes)?),
            None => None,
        };

        match new_content {
            None => {
                self.tree_files.remove(path);
            }
            Some(content) => {
                let digest = self.repo.objects().write_object(ObjectKind::Blob, &content)?;
                self.tree_files.insert(path.to_string(), digest);
            }
        }

        let tree = build_tree(self.repo.objects(), &self.tree_files)?;
        let parent = self.repo.read_ref(AI_BRANCH)?;
        self.repo.commit_now(AI_BRANCH, &tree, reason, parent.as_deref())?;

        let mut record = ChangeRecord::new(path.to_string(), kind, reason.to_string());
        if let (Some(digest), Some(bytes)) = (&original_digest, original) {
            record = record.with_original(digest.clone(), bytes);
        }
        self.state.changes.push(record);
        // A fresh edit supersedes a prior revert of this path.
        self.state.reverted.remove(path);
        self.save_state()?;

        debug!(path, kind = kind.as_str(), dir = %self.relative_dir, "recorded change");
        Ok(true)
    }

    /// First-change initialization: metadata layout, `main` baseline
    /// commit of the pre-change state, HEAD switched to `ai-changes`.
    fn initialize(&mut self, path: &str, kind: ChangeKind, original: Option<&[u8]>) -> Result<()> {
        self.repo = Repository::init(&self.workdir)?;

        let mut baseline = BTreeMap::new();
        if kind != ChangeKind::Created {
            if let Some(bytes) = original {
                let digest = self.repo.objects().write_object(ObjectKind::Blob, bytes)?;
                baseline.insert(path.to_string(), digest);
            }
        }

        let tree = build_tree(self.repo.objects(), &baseline)?;
        let main_commit = self
            .repo
            .commit_now(MAIN_BRANCH, &tree, "Baseline before AI changes", None)?;
        // ai-changes branches off the baseline; records stack on top of it.
        self.repo.update_ref(AI_BRANCH, &main_commit)?;
        self.repo.set_head(AI_BRANCH)?;
        self.tree_files = baseline;
        Ok(())
    }

    /// Original content captured at first tracking of `path`; `None` if
    /// the path was created (no prior content) or was never tracked.
    pub fn get_original_content(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let first = self.state.changes.iter().find(|c| c.path == path);
        match first.and_then(|c| c.original_digest.as_ref()) {
            Some(digest) => {
                let (_, content) = self.repo.objects().read_object(digest)?;
                Ok(Some(content))
            }
            None => Ok(None),
        }
    }

    /// Latest recorded content of `path`; `None` once deleted.
    pub fn get_latest_content(&self, path: &str) -> Result<Option<Vec<u8>>> {
        match self.tree_files.get(path) {
            Some(digest) => {
                let (_, content) = self.repo.objects().read_object(digest)?;
                Ok(Some(content))
            }
            None => Ok(None),
        }
    }

    /// Distinct tracked paths, in first-seen order.
    pub fn tracked_paths(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut paths = Vec::new();
        for change in &self.state.changes {
            if seen.insert(change.path.as_str()) {
                paths.push(change.path.clone());
            }
        }
        paths
    }

    /// One unified-diff-style section per tracked path, original vs latest.
    pub fn generate_diff(&self) -> Result<String> {
        let mut output = String::new();
        for path in self.tracked_paths() {
            let old = self
                .get_original_content(&path)?
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned());
            let new = self
                .get_latest_content(&path)?
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned());
            output.push_str(&FileDiff::new(path, old, new).render());
        }
        Ok(output)
    }

    /// Restore the path's original content on disk (or delete it, for a
    /// created file) and mark the path reverted.
    pub fn revert_file(&mut self, path: &str) -> Result<bool> {
        if !self.is_tracked(path) {
            return Err(Error::NotTracked(path.to_string()));
        }
        let _lock = DirLock::acquire(self.repo.git_dir(), LOCK_TIMEOUT)?;

        let abs = self.install_root.join(path);
        match self.get_original_content(path)? {
            Some(content) => {
                if let Some(parent) = abs.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&abs, content)?;
            }
            None => {
                if abs.exists() {
                    fs::remove_file(&abs)?;
                }
            }
        }

        self.state.reverted.insert(path.to_string());
        self.save_state()?;
        debug!(path, "reverted file");
        Ok(true)
    }

    /// Restore the latest recorded content on disk and clear the reverted
    /// flag. Idempotent with `revert_file`.
    pub fn reapply_file(&mut self, path: &str) -> Result<bool> {
        if !self.is_tracked(path) {
            return Err(Error::NotTracked(path.to_string()));
        }
        let _lock = DirLock::acquire(self.repo.git_dir(), LOCK_TIMEOUT)?;

        let abs = self.install_root.join(path);
        match self.get_latest_content(path)? {
            Some(content) => {
                if let Some(parent) = abs.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&abs, content)?;
            }
            // Latest recorded state is absence (deleted).
            None => {
                if abs.exists() {
                    fs::remove_file(&abs)?;
                }
            }
        }

        self.state.reverted.remove(path);
        self.save_state()?;
        debug!(path, "reapplied file");
        Ok(true)
    }

    /// Group all change records by their immediate containing directory,
    /// relative to the installation root.
    pub fn get_changes_by_directory(&self) -> BTreeMap<String, DirectoryChanges> {
        let mut map: BTreeMap<String, DirectoryChanges> = BTreeMap::new();
        for change in &self.state.changes {
            let dir = match change.path.rsplit_once('/') {
                Some((dir, _)) => dir.to_string(),
                None => String::new(),
            };
            let entry = map.entry(dir).or_default();
            entry.count += 1;
            if !entry.paths.contains(&change.path) {
                entry.paths.push(change.path.clone());
            }
        }
        map
    }

    /// Delete the entire metadata store and the in-memory change log.
    /// Returns the number of change records that existed.
    pub fn clear_all(&mut self) -> Result<usize> {
        let count = self.state.changes.len();
        if self.repo.exists() {
            // Exclude concurrent writers before tearing the store down;
            // the lock fd stays valid across the unlink.
            let _lock = DirLock::acquire(self.repo.git_dir(), LOCK_TIMEOUT)?;
            fs::remove_dir_all(self.repo.git_dir())?;
        }
        self.state = TrackerState::default();
        self.tree_files.clear();
        debug!(dir = %self.relative_dir, count, "cleared tracker");
        Ok(count)
    }

    fn validate_tracked_path(&self, path: &str) -> Result<()> {
        validate_relative(path)?;
        if !path.starts_with(&format!("{}/", self.relative_dir)) {
            return Err(Error::InvalidPath(format!(
                "{path} is outside tracked directory {}",
                self.relative_dir
            )));
        }
        Ok(())
    }
}

/// Reject absolute paths and traversal segments before any write happens.
fn validate_relative(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(Error::InvalidPath("empty path".to_string()));
    }
    let p = Path::new(path);
    if p.is_absolute() {
        return Err(Error::AccessDenied(format!("absolute path: {path}")));
    }
    for component in p.components() {
        if matches!(component, Component::ParentDir) {
            return Err(Error::AccessDenied(format!("path escapes root: {path}")));
        }
    }
    Ok(())
}
