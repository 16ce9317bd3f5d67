//! Tree objects: directory listings mapping names to blob/tree digests.
//!
//! A tree's digest is a pure function of its sorted entry list, so two
//! directories with identical contents always produce identical digests.
//! File-mode tracking is disabled: every file entry is recorded as a
//! regular, non-executable file for portability across filesystems.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::object::{ObjectKind, ObjectStore};

/// Mode for regular, non-executable files.
const MODE_FILE: &str = "100644";
/// Mode for subdirectory entries.
const MODE_DIR: &str = "40000";

/// One entry in a tree object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub name: String,
    pub kind: ObjectKind,
    pub digest: String,
}

/// Serialize entries into the tree object encoding:
/// `"{mode} {name}\0"` followed by the 20 raw digest bytes, per entry.
fn encode_tree(entries: &[TreeEntry]) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    for entry in entries {
        let mode = match entry.kind {
            ObjectKind::Tree => MODE_DIR,
            _ => MODE_FILE,
        };
        data.extend_from_slice(format!("{} {}\0", mode, entry.name).as_bytes());
        let raw = hex::decode(&entry.digest)
            .map_err(|_| Error::InvalidState(format!("bad digest in tree: {}", entry.digest)))?;
        data.extend_from_slice(&raw);
    }
    Ok(data)
}

/// Parse a tree object's content back into entries.
pub fn parse_tree(data: &[u8]) -> Result<Vec<TreeEntry>> {
    let mut entries = Vec::new();
    let mut pos = 0;

    while pos < data.len() {
        let null_pos = data[pos..]
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| Error::InvalidState("truncated tree entry".to_string()))?
            + pos;
        let head = std::str::from_utf8(&data[pos..null_pos])
            .map_err(|_| Error::InvalidState("tree entry header is not UTF-8".to_string()))?;
        let (mode, name) = head
            .split_once(' ')
            .ok_or_else(|| Error::InvalidState(format!("malformed tree entry '{head}'")))?;

        let digest_end = null_pos + 1 + 20;
        if digest_end > data.len() {
            return Err(Error::InvalidState("truncated tree digest".to_string()));
        }
        let digest = hex::encode(&data[null_pos + 1..digest_end]);

        entries.push(TreeEntry {
            name: name.to_string(),
            kind: if mode == MODE_DIR {
                ObjectKind::Tree
            } else {
                ObjectKind::Blob
            },
            digest,
        });
        pos = digest_end;
    }

    Ok(entries)
}

/// Build a nested tree graph from a flat map of relative path -> blob
/// digest, writing one tree object per directory level bottom-up, and
/// return the root tree digest.
///
/// The map's ordering provides the deterministic sort; directories with
/// zero entries never materialize. An empty map yields the empty tree.
pub fn build_tree(store: &ObjectStore, files: &BTreeMap<String, String>) -> Result<String> {
    // Group by top-level path segment.
    let mut blobs: Vec<TreeEntry> = Vec::new();
    let mut subdirs: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();

    for (path, digest) in files {
        match path.split_once('/') {
            None => blobs.push(TreeEntry {
                name: path.clone(),
                kind: ObjectKind::Blob,
                digest: digest.clone(),
            }),
            Some((dir, rest)) => {
                subdirs
                    .entry(dir.to_string())
                    .or_default()
                    .insert(rest.to_string(), digest.clone());
            }
        }
    }

    let mut entries = blobs;
    for (name, sub_files) in &subdirs {
        let sub_digest = build_tree(store, sub_files)?;
        entries.push(TreeEntry {
            name: name.clone(),
            kind: ObjectKind::Tree,
            digest: sub_digest,
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));

    let data = encode_tree(&entries)?;
    store.write_object(ObjectKind::Tree, &data)
}

/// Walk a tree graph back into a flat map of relative path -> blob digest.
pub fn flatten_tree(store: &ObjectStore, digest: &str) -> Result<BTreeMap<String, String>> {
    let mut files = BTreeMap::new();
    flatten_into(store, digest, "", &mut files)?;
    Ok(files)
}

fn flatten_into(
    store: &ObjectStore,
    digest: &str,
    prefix: &str,
    files: &mut BTreeMap<String, String>,
) -> Result<()> {
    let (kind, data) = store.read_object(digest)?;
    if kind != ObjectKind::Tree {
        return Err(Error::InvalidState(format!("object {digest} is not a tree")));
    }

    for entry in parse_tree(&data)? {
        let path = if prefix.is_empty() {
            entry.name.clone()
        } else {
            format!("{}/{}", prefix, entry.name)
        };
        match entry.kind {
            ObjectKind::Tree => flatten_into(store, &entry.digest, &path, files)?,
            _ => {
                files.insert(path, entry.digest);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectKind;
    use tempfile::tempdir;

    fn blob(store: &ObjectStore, content: &[u8]) -> String {
        store.write_object(ObjectKind::Blob, content).unwrap()
    }

    #[test]
    fn test_build_tree_deterministic() {
        let dir = tempdir().unwrap();
        let store = ObjectStore::new(dir.path());

        let a = blob(&store, b"aaa");
        let b = blob(&store, b"bbb");

        let mut first = BTreeMap::new();
        first.insert("z.txt".to_string(), b.clone());
        first.insert("a.txt".to_string(), a.clone());

        // Insertion order differs; digest must not.
        let mut second = BTreeMap::new();
        second.insert("a.txt".to_string(), a);
        second.insert("z.txt".to_string(), b);

        assert_eq!(
            build_tree(&store, &first).unwrap(),
            build_tree(&store, &second).unwrap()
        );
    }

    #[test]
    fn test_nested_round_trip() {
        let dir = tempdir().unwrap();
        let store = ObjectStore::new(dir.path());

        let mut files = BTreeMap::new();
        files.insert("plugins/x/main.php".to_string(), blob(&store, b"<?php"));
        files.insert("plugins/x/inc/util.php".to_string(), blob(&store, b"util"));
        files.insert("readme.txt".to_string(), blob(&store, b"hi"));

        let root = build_tree(&store, &files).unwrap();
        assert_eq!(flatten_tree(&store, &root).unwrap(), files);
    }

    #[test]
    fn test_empty_tree() {
        let dir = tempdir().unwrap();
        let store = ObjectStore::new(dir.path());

        let root = build_tree(&store, &BTreeMap::new()).unwrap();
        // The well-known empty tree digest.
        assert_eq!(root, "4b825dc642cb6eb9a060e54bf8d69288fbee4904");
        assert!(flatten_tree(&store, &root).unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_truncated() {
        assert!(parse_tree(b"100644 a.txt").is_err());
    }
}
