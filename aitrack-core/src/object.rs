//! Content-addressable object store.
//!
//! Objects are zlib-compressed loose files under `objects/` using a
//! 2-character prefix directory scheme. The digest is the SHA-1 of
//! `"{kind} {len}\0"` followed by the content, hex encoded (40 chars),
//! so the store is readable by standard inspection tooling.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use sha1::{Digest, Sha1};
use tracing::debug;

use crate::error::{Error, Result};

/// The three object kinds the store knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Blob,
    Tree,
    Commit,
}

impl ObjectKind {
    pub fn as_str(&self) -> &str {
        match self {
            ObjectKind::Blob => "blob",
            ObjectKind::Tree => "tree",
            ObjectKind::Commit => "commit",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "blob" => Some(ObjectKind::Blob),
            "tree" => Some(ObjectKind::Tree),
            "commit" => Some(ObjectKind::Commit),
            _ => None,
        }
    }
}

/// Compute the digest for an object without storing it.
pub fn compute_digest(kind: ObjectKind, content: &[u8]) -> String {
    let header = format!("{} {}\0", kind.as_str(), content.len());
    let mut hasher = Sha1::new();
    hasher.update(header.as_bytes());
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// On-disk store of immutable blob/tree/commit objects.
pub struct ObjectStore {
    /// Root path, e.g. `<workdir>/.git/objects`.
    root: PathBuf,
}

impl ObjectStore {
    pub fn new(objects_dir: &Path) -> Self {
        Self {
            root: objects_dir.to_path_buf(),
        }
    }

    /// Store an object and return its digest.
    ///
    /// Idempotent: writing the same kind+content twice leaves exactly one
    /// object on disk and returns the same digest. The prefix directory is
    /// created lazily on first use.
    pub fn write_object(&self, kind: ObjectKind, content: &[u8]) -> Result<String> {
        let digest = compute_digest(kind, content);
        let path = self.object_path(&digest);

        if path.exists() {
            return Ok(digest);
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let header = format!("{} {}\0", kind.as_str(), content.len());
        let file = File::create(&path)?;
        let mut encoder = ZlibEncoder::new(file, Compression::default());
        encoder.write_all(header.as_bytes())?;
        encoder.write_all(content)?;
        encoder.finish()?;

        debug!(%digest, kind = kind.as_str(), "stored object");
        Ok(digest)
    }

    /// Read an object back as `(kind, content)`.
    pub fn read_object(&self, digest: &str) -> Result<(ObjectKind, Vec<u8>)> {
        let path = self.object_path(digest);
        if !path.exists() {
            return Err(Error::ObjectNotFound(digest.to_string()));
        }

        let file = File::open(&path)?;
        let mut decoder = ZlibDecoder::new(file);
        let mut raw = Vec::new();
        decoder.read_to_end(&mut raw)?;

        let null_pos = raw
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| Error::InvalidState(format!("object {digest} has no header")))?;
        let header = std::str::from_utf8(&raw[..null_pos])
            .map_err(|_| Error::InvalidState(format!("object {digest} header is not UTF-8")))?;
        let kind_str = header
            .split_whitespace()
            .next()
            .ok_or_else(|| Error::InvalidState(format!("object {digest} header is empty")))?;
        let kind = ObjectKind::parse(kind_str)
            .ok_or_else(|| Error::InvalidState(format!("unknown object kind '{kind_str}'")))?;

        Ok((kind, raw[null_pos + 1..].to_vec()))
    }

    pub fn exists(&self, digest: &str) -> bool {
        self.object_path(digest).exists()
    }

    /// Path for a digest: `abcdef...` -> `ab/cdef...`
    fn object_path(&self, digest: &str) -> PathBuf {
        let (prefix, rest) = digest.split_at(2);
        self.root.join(prefix).join(rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_and_read() {
        let dir = tempdir().unwrap();
        let store = ObjectStore::new(dir.path());

        let digest = store.write_object(ObjectKind::Blob, b"hello world").unwrap();
        let (kind, content) = store.read_object(&digest).unwrap();

        assert_eq!(kind, ObjectKind::Blob);
        assert_eq!(content, b"hello world");
    }

    #[test]
    fn test_known_blob_digest() {
        // git hash-object of "test\n"
        let digest = compute_digest(ObjectKind::Blob, b"test\n");
        assert_eq!(digest, "9daeafb9864cf43055ae93beb0afd6c7d144bfa4");
        assert_eq!(digest.len(), 40);
    }

    #[test]
    fn test_write_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = ObjectStore::new(dir.path());

        let d1 = store.write_object(ObjectKind::Blob, b"same content").unwrap();
        let d2 = store.write_object(ObjectKind::Blob, b"same content").unwrap();
        assert_eq!(d1, d2);

        // Exactly one object on disk.
        let prefix_dir = dir.path().join(&d1[..2]);
        assert_eq!(fs::read_dir(prefix_dir).unwrap().count(), 1);
    }

    #[test]
    fn test_kind_distinguishes_digest() {
        let blob = compute_digest(ObjectKind::Blob, b"x");
        let tree = compute_digest(ObjectKind::Tree, b"x");
        assert_ne!(blob, tree);
    }

    #[test]
    fn test_read_nonexistent() {
        let dir = tempdir().unwrap();
        let store = ObjectStore::new(dir.path());

        let result = store.read_object("deadbeefdeadbeefdeadbeefdeadbeefdeadbeef");
        assert!(matches!(result, Err(Error::ObjectNotFound(_))));
    }
}
