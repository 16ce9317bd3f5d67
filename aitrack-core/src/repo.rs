//! Per-directory repository: metadata layout, branch references, HEAD,
//! and the commit chain builder.
//!
//! The on-disk layout mirrors the standard format so existing inspection
//! tooling can read a tracked directory:
//!
//! ```text
//! <workdir>/.git/
//!   HEAD                     "ref: refs/heads/ai-changes\n"
//!   config                   includes "filemode = false"
//!   objects/<2-hex>/<38-hex> zlib-compressed objects
//!   refs/heads/main          baseline commit digest
//!   refs/heads/ai-changes    tip of the recorded-edit line
//! ```

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::debug;

use crate::error::{Error, Result};
use crate::object::{ObjectKind, ObjectStore};

/// Name of the metadata directory.
pub const META_DIR: &str = ".git";
/// The pristine baseline branch.
pub const MAIN_BRANCH: &str = "main";
/// The running line of recorded agent edits.
pub const AI_BRANCH: &str = "ai-changes";

const AUTHOR: &str = "AI Tracker <aitrack@localhost>";

const CONFIG: &str = "[core]\n\
    \trepositoryformatversion = 0\n\
    \tfilemode = false\n\
    \tbare = false\n";

/// A parsed commit object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitData {
    pub digest: String,
    pub tree: String,
    pub parent: Option<String>,
    pub timestamp: i64,
    pub message: String,
}

/// Repository rooted at one working directory's metadata store.
pub struct Repository {
    git_dir: PathBuf,
    objects: ObjectStore,
}

impl Repository {
    /// Open the repository under `workdir` without creating anything.
    pub fn open(workdir: &Path) -> Self {
        let git_dir = workdir.join(META_DIR);
        let objects = ObjectStore::new(&git_dir.join("objects"));
        Self { git_dir, objects }
    }

    /// Create the metadata layout under `workdir`. Idempotent.
    pub fn init(workdir: &Path) -> Result<Self> {
        let repo = Self::open(workdir);
        fs::create_dir_all(repo.git_dir.join("objects"))?;
        fs::create_dir_all(repo.git_dir.join("refs").join("heads"))?;
        if !repo.git_dir.join("config").exists() {
            fs::write(repo.git_dir.join("config"), CONFIG)?;
        }
        if !repo.git_dir.join("HEAD").exists() {
            repo.set_head(MAIN_BRANCH)?;
        }
        debug!(path = %repo.git_dir.display(), "initialized repository");
        Ok(repo)
    }

    /// True iff the metadata directory exists on disk.
    pub fn exists(&self) -> bool {
        self.git_dir.is_dir()
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }

    fn ref_path(&self, branch: &str) -> PathBuf {
        self.git_dir.join("refs").join("heads").join(branch)
    }

    /// True iff the branch's ref file exists, regardless of its content.
    pub fn has_ref(&self, branch: &str) -> bool {
        self.ref_path(branch).is_file()
    }

    /// Read a branch ref; `Ok(None)` when the file is absent or empty.
    pub fn read_ref(&self, branch: &str) -> Result<Option<String>> {
        let path = self.ref_path(branch);
        if !path.is_file() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)?;
        let digest = text.trim();
        if digest.is_empty() {
            return Ok(None);
        }
        Ok(Some(digest.to_string()))
    }

    /// Advance a branch ref atomically (temp-file-then-rename), so a
    /// concurrent reader sees either the old tip or the new one.
    pub fn update_ref(&self, branch: &str, digest: &str) -> Result<()> {
        let path = self.ref_path(branch);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        atomic_write(&path, format!("{digest}\n").as_bytes())
    }

    /// Point HEAD at the named branch.
    pub fn set_head(&self, branch: &str) -> Result<()> {
        atomic_write(
            &self.git_dir.join("HEAD"),
            format!("ref: refs/heads/{branch}\n").as_bytes(),
        )
    }

    /// Branch currently named by HEAD.
    pub fn head_branch(&self) -> Result<String> {
        let text = fs::read_to_string(self.git_dir.join("HEAD"))?;
        let name = text
            .trim()
            .strip_prefix("ref: refs/heads/")
            .ok_or_else(|| Error::InvalidState(format!("unexpected HEAD: {}", text.trim())))?;
        Ok(name.to_string())
    }

    /// Write a commit object and advance `branch` to it. The object write
    /// always precedes the ref update, so no ref ever names a commit that
    /// was not fully written.
    pub fn commit_on(
        &self,
        branch: &str,
        tree: &str,
        message: &str,
        parent: Option<&str>,
        timestamp: i64,
    ) -> Result<String> {
        let mut data = String::new();
        data.push_str(&format!("tree {tree}\n"));
        if let Some(parent) = parent {
            data.push_str(&format!("parent {parent}\n"));
        }
        data.push_str(&format!("author {AUTHOR} {timestamp} +0000\n"));
        data.push_str(&format!("committer {AUTHOR} {timestamp} +0000\n"));
        data.push('\n');
        data.push_str(message);
        data.push('\n');

        let digest = self.objects.write_object(ObjectKind::Commit, data.as_bytes())?;
        self.update_ref(branch, &digest)?;
        debug!(%digest, branch, "committed");
        Ok(digest)
    }

    /// Convenience for `commit_on` stamped with the current time.
    pub fn commit_now(
        &self,
        branch: &str,
        tree: &str,
        message: &str,
        parent: Option<&str>,
    ) -> Result<String> {
        self.commit_on(branch, tree, message, parent, Utc::now().timestamp())
    }

    /// Parse a commit object back into its fields.
    pub fn read_commit(&self, digest: &str) -> Result<CommitData> {
        let (kind, data) = self.objects.read_object(digest)?;
        if kind != ObjectKind::Commit {
            return Err(Error::InvalidState(format!("object {digest} is not a commit")));
        }
        let text = String::from_utf8(data)
            .map_err(|_| Error::InvalidState(format!("commit {digest} is not UTF-8")))?;

        let (headers, message) = text
            .split_once("\n\n")
            .ok_or_else(|| Error::InvalidState(format!("commit {digest} has no message")))?;

        let mut tree = None;
        let mut parent = None;
        let mut timestamp = 0i64;
        for line in headers.lines() {
            if let Some(value) = line.strip_prefix("tree ") {
                tree = Some(value.to_string());
            } else if let Some(value) = line.strip_prefix("parent ") {
                parent = Some(value.to_string());
            } else if let Some(value) = line.strip_prefix("author ") {
                // "Name <email> <unix> <tz>" -> second-to-last field
                let mut fields: Vec<&str> = value.split(' ').collect();
                fields.pop();
                if let Some(ts) = fields.pop() {
                    timestamp = ts.parse().unwrap_or(0);
                }
            }
        }

        Ok(CommitData {
            digest: digest.to_string(),
            tree: tree
                .ok_or_else(|| Error::InvalidState(format!("commit {digest} has no tree")))?,
            parent,
            timestamp,
            message: message.trim_end_matches('\n').to_string(),
        })
    }

    /// Walk a branch's commit chain and return it oldest-first.
    pub fn log(&self, branch: &str) -> Result<Vec<CommitData>> {
        let mut commits = Vec::new();
        let mut cursor = self.read_ref(branch)?;
        while let Some(digest) = cursor {
            let commit = self.read_commit(&digest)?;
            cursor = commit.parent.clone();
            commits.push(commit);
        }
        commits.reverse();
        Ok(commits)
    }
}

/// Write a file atomically using temp-file-then-rename, syncing the temp
/// file first so the rename publishes durable bytes.
fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    let mut file = File::create(&tmp)?;
    file.write_all(data)?;
    file.sync_data()?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::build_tree;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn empty_tree(repo: &Repository) -> String {
        build_tree(repo.objects(), &BTreeMap::new()).unwrap()
    }

    #[test]
    fn test_init_layout() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();

        assert!(repo.exists());
        assert!(dir.path().join(".git/objects").is_dir());
        assert!(dir.path().join(".git/refs/heads").is_dir());
        let config = fs::read_to_string(dir.path().join(".git/config")).unwrap();
        assert!(config.contains("filemode = false"));
        assert_eq!(repo.head_branch().unwrap(), MAIN_BRANCH);
    }

    #[test]
    fn test_commit_round_trip() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let tree = empty_tree(&repo);

        let digest = repo
            .commit_on(MAIN_BRANCH, &tree, "baseline", None, 1_700_000_000)
            .unwrap();
        assert_eq!(digest.len(), 40);

        let commit = repo.read_commit(&digest).unwrap();
        assert_eq!(commit.tree, tree);
        assert_eq!(commit.parent, None);
        assert_eq!(commit.timestamp, 1_700_000_000);
        assert_eq!(commit.message, "baseline");
        assert_eq!(repo.read_ref(MAIN_BRANCH).unwrap(), Some(digest));
    }

    #[test]
    fn test_chain_and_log_order() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let tree = empty_tree(&repo);

        let first = repo.commit_now(AI_BRANCH, &tree, "first", None).unwrap();
        let second = repo
            .commit_now(AI_BRANCH, &tree, "second", Some(&first))
            .unwrap();
        assert_ne!(first, second);

        let log = repo.log(AI_BRANCH).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].message, "first");
        assert_eq!(log[1].message, "second");
        assert_eq!(log[1].parent.as_deref(), Some(first.as_str()));
    }

    #[test]
    fn test_empty_ref_reads_as_none() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();

        fs::write(dir.path().join(".git/refs/heads/ai-changes"), "").unwrap();
        assert!(repo.has_ref(AI_BRANCH));
        assert_eq!(repo.read_ref(AI_BRANCH).unwrap(), None);
    }
}
