//! Standalone repository export.
//!
//! Rebuilds a brand-new, independent repository for one tracked directory
//! by replaying the source `ai-changes` chain oldest-first, filtering each
//! commit's tree to the subtree rooted at the directory and re-rooting
//! paths under the new repository. Because digests are content-derived,
//! every replayed commit necessarily gets a new digest; the parent linkage
//! is reconstructed fresh rather than filtered in place.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};
use crate::object::ObjectKind;
use crate::repo::{Repository, AI_BRANCH, MAIN_BRANCH};
use crate::tracker::Tracker;
use crate::tree::{build_tree, flatten_tree};

/// Export `tracker`'s directory as a self-contained repository at `target`.
///
/// Returns false — writing nothing — when the tracker has no change
/// records. Otherwise the export's `main` holds a single commit of the
/// directory's original-content snapshot (an empty tree when every tracked
/// file was created), `ai-changes` carries the full replayed chain with
/// source messages and timestamps preserved, and HEAD names `ai-changes`.
pub fn export_standalone(tracker: &Tracker, target: &Path) -> Result<bool> {
    if !tracker.is_active() || !tracker.has_changes() {
        return Ok(false);
    }

    let prefix = format!("{}/", tracker.relative_dir());
    let source = tracker.repo();
    let chain = source.log(AI_BRANCH)?;
    // Change records always carry a commit, so an empty chain means the
    // source store is corrupted. Bail before creating anything at `target`.
    if chain.is_empty() {
        return Err(Error::ExportFailed(format!(
            "{} has change records but no commit chain",
            tracker.relative_dir()
        )));
    }

    let dest = Repository::init(target)?;

    // main: one commit of the original-content snapshot, no history.
    let mut baseline = BTreeMap::new();
    for path in tracker.tracked_paths() {
        let Some(rest) = path.strip_prefix(&prefix) else {
            continue;
        };
        if let Some(content) = tracker.get_original_content(&path)? {
            let digest = dest.objects().write_object(ObjectKind::Blob, &content)?;
            baseline.insert(rest.to_string(), digest);
        }
    }
    let main_tree = build_tree(dest.objects(), &baseline)?;
    let main_commit = dest.commit_now(
        MAIN_BRANCH,
        &main_tree,
        &format!("Original state of {}", tracker.relative_dir()),
        None,
    )?;

    // Forward replay, oldest to newest, chaining fresh parents.
    let mut parent = main_commit.clone();
    let mut replayed = 0usize;
    for commit in chain {
        let files = flatten_tree(source.objects(), &commit.tree)?;
        let mut filtered = BTreeMap::new();
        for (path, digest) in files {
            let Some(rest) = path.strip_prefix(&prefix) else {
                continue;
            };
            let (_, content) = source.objects().read_object(&digest)?;
            let new_digest = dest.objects().write_object(ObjectKind::Blob, &content)?;
            filtered.insert(rest.to_string(), new_digest);
        }
        if filtered.is_empty() {
            continue;
        }

        let tree = build_tree(dest.objects(), &filtered)?;
        parent = dest.commit_on(AI_BRANCH, &tree, &commit.message, Some(&parent), commit.timestamp)?;
        replayed += 1;
    }

    // Every tracked file was created and then deleted, or only empty
    // trees survived filtering: still publish the branch.
    if dest.read_ref(AI_BRANCH)?.is_none() {
        dest.update_ref(AI_BRANCH, &main_commit)?;
    }
    dest.set_head(AI_BRANCH)?;

    debug!(
        dir = tracker.relative_dir(),
        target = %target.display(),
        replayed,
        "exported standalone repository"
    );
    Ok(true)
}
