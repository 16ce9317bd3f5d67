use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What the agent did to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
}

impl ChangeKind {
    pub fn as_str(&self) -> &str {
        match self {
            ChangeKind::Created => "created",
            ChangeKind::Modified => "modified",
            ChangeKind::Deleted => "deleted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(ChangeKind::Created),
            "modified" => Some(ChangeKind::Modified),
            "deleted" => Some(ChangeKind::Deleted),
            _ => None,
        }
    }
}

/// One recorded file mutation. Records are kept in insertion order and
/// never deduplicated: editing the same path twice appends two records.
///
/// Original content is not stored inline; it lives in the object store as
/// a blob and the record carries its digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub id: Uuid,
    /// Installation-root-relative path, e.g. `plugins/x/y.php`.
    pub path: String,
    pub kind: ChangeKind,
    /// Blob digest of the content before the change; `None` for `Created`.
    pub original_digest: Option<String>,
    /// SHA-256 of the original content, for integrity checks on restore.
    pub original_hash: Option<String>,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

impl ChangeRecord {
    pub fn new(path: String, kind: ChangeKind, reason: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            path,
            kind,
            original_digest: None,
            original_hash: None,
            reason,
            timestamp: Utc::now(),
        }
    }

    pub fn with_original(mut self, digest: String, content: &[u8]) -> Self {
        self.original_hash = Some(Self::hash_content(content));
        self.original_digest = Some(digest);
        self
    }

    pub fn hash_content(content: &[u8]) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(content);
        hex::encode(hasher.finalize())
    }
}

/// Change summary for one directory, as returned by
/// `Tracker::get_changes_by_directory`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryChanges {
    /// Number of change records touching this directory.
    pub count: usize,
    /// Distinct paths changed, in first-seen order.
    pub paths: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_creation() {
        let record = ChangeRecord::new(
            "plugins/x/y.php".to_string(),
            ChangeKind::Created,
            "add helper".to_string(),
        );

        assert_eq!(record.kind, ChangeKind::Created);
        assert_eq!(record.path, "plugins/x/y.php");
        assert!(record.original_digest.is_none());
    }

    #[test]
    fn test_record_with_original() {
        let content = b"<?php echo 1;";
        let record = ChangeRecord::new(
            "plugins/x/y.php".to_string(),
            ChangeKind::Modified,
            "tweak output".to_string(),
        )
        .with_original("a".repeat(40), content);

        assert_eq!(record.original_digest.as_deref(), Some("a".repeat(40).as_str()));
        assert_eq!(
            record.original_hash.as_deref(),
            Some(ChangeRecord::hash_content(content).as_str())
        );
    }

    #[test]
    fn test_kind_round_trip() {
        for kind in [ChangeKind::Created, ChangeKind::Modified, ChangeKind::Deleted] {
            assert_eq!(ChangeKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ChangeKind::parse("renamed"), None);
    }
}
