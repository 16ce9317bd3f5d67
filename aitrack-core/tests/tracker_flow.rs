//! End-to-end flow: record through the manager, review, revert, export.

use std::fs;
use std::path::Path;

use aitrack_core::repo::{Repository, AI_BRANCH};
use aitrack_core::tree::flatten_tree;
use aitrack_core::{ChangeKind, TrackerManager};
use tempfile::tempdir;

fn write_file(root: &Path, path: &str, content: &str) {
    let abs = root.join(path);
    fs::create_dir_all(abs.parent().unwrap()).unwrap();
    fs::write(abs, content).unwrap();
}

#[test]
fn full_session_through_manager() {
    let install = tempdir().unwrap();
    let root = install.path();
    fs::create_dir_all(root.join("plugins")).unwrap();
    fs::create_dir_all(root.join("themes")).unwrap();

    let mut manager = TrackerManager::new(root);
    assert!(!manager.has_changes());

    // Agent modifies an existing plugin file.
    write_file(root, "plugins/seo/seo.php", "line1\nline2\nmodified");
    assert!(manager
        .record(
            "plugins/seo/seo.php",
            ChangeKind::Modified,
            Some(b"line1\nline2\noriginal"),
            "Fix meta description output",
        )
        .unwrap());

    // And creates a new file in a theme.
    write_file(root, "themes/dark/footer.php", "new content");
    assert!(manager
        .record("themes/dark/footer.php", ChangeKind::Created, None, "Add footer")
        .unwrap());

    assert!(manager.has_changes());
    let active = manager.get_active_trackers();
    assert_eq!(active.len(), 2);
    assert!(active.contains_key(&root.join("plugins/seo")));
    assert!(active.contains_key(&root.join("themes/dark")));

    // Diff review for the plugin.
    let tracker = manager
        .get_tracker_for_path("plugins/seo/seo.php")
        .unwrap()
        .unwrap();
    let diff = tracker.generate_diff().unwrap();
    assert!(diff.contains("-original"));
    assert!(diff.contains("+modified"));

    let by_dir = tracker.get_changes_by_directory();
    assert_eq!(by_dir["plugins/seo"].count, 1);

    // Revert, then reapply, landing back on the agent's version.
    tracker.revert_file("plugins/seo/seo.php").unwrap();
    assert_eq!(
        fs::read_to_string(root.join("plugins/seo/seo.php")).unwrap(),
        "line1\nline2\noriginal"
    );
    tracker.reapply_file("plugins/seo/seo.php").unwrap();
    assert_eq!(
        fs::read_to_string(root.join("plugins/seo/seo.php")).unwrap(),
        "line1\nline2\nmodified"
    );
    assert!(!tracker.is_reverted("plugins/seo/seo.php"));

    // Export the plugin as a standalone repository.
    let target = root.join("export/seo");
    assert!(manager.export_directory("plugins/seo", &target).unwrap());

    let exported = Repository::open(&target);
    assert_eq!(exported.head_branch().unwrap(), AI_BRANCH);
    let tip = exported.read_ref(AI_BRANCH).unwrap().unwrap();
    assert_eq!(tip.len(), 40);

    let final_tree = exported.read_commit(&tip).unwrap().tree;
    let files = flatten_tree(exported.objects(), &final_tree).unwrap();
    assert_eq!(files.len(), 1);
    assert!(files.contains_key("seo.php"));
}

#[test]
fn manager_rediscovers_state_after_restart() {
    let install = tempdir().unwrap();
    let root = install.path();

    write_file(root, "plugins/cache/cache.php", "v2");
    {
        let mut manager = TrackerManager::new(root);
        manager
            .record(
                "plugins/cache/cache.php",
                ChangeKind::Modified,
                Some(b"v1"),
                "Bust cache on save",
            )
            .unwrap();
    }

    // A fresh manager rebuilds its index from disk alone.
    let mut manager = TrackerManager::new(root);
    assert!(manager.has_changes());

    let tracker = manager
        .get_tracker_for_path("plugins/cache/cache.php")
        .unwrap()
        .unwrap();
    assert!(tracker.is_tracked("plugins/cache/cache.php"));
    assert_eq!(
        tracker
            .get_original_content("plugins/cache/cache.php")
            .unwrap(),
        Some(b"v1".to_vec())
    );

    // Two records on the same path chain two commits.
    write_file(root, "plugins/cache/cache.php", "v3");
    tracker
        .record(
            "plugins/cache/cache.php",
            ChangeKind::Modified,
            Some(b"v2"),
            "Second pass",
        )
        .unwrap();
    let log = tracker.repo().log(AI_BRANCH).unwrap();
    let last = log.last().unwrap();
    let previous = &log[log.len() - 2];
    assert_eq!(last.parent.as_deref(), Some(previous.digest.as_str()));
}
