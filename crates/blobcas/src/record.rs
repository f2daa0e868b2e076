//! BlobRecord: the structured descriptor persisted alongside blob content.
//!
//! One record per stored blob, written as a JSON sidecar file. Records are
//! immutable after creation and removed only by `delete`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::blob_id::BlobId;
use crate::hash::ContentHash;

/// Metadata for a single stored blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobRecord {
    /// The blob's identifier (`blob://...`).
    pub blob_id: BlobId,

    /// Original filename as supplied by the caller.
    pub filename: String,

    /// MIME type inferred from the filename extension.
    pub mime_type: String,

    /// Exact byte length of the content.
    pub size_bytes: u64,

    /// SHA-256 hex digest of the content.
    pub sha256: ContentHash,

    /// Filesystem path of the content file.
    pub file_path: PathBuf,

    /// Caller-supplied tags, insertion order preserved.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Advisory lifetime hint in hours. Resolved at upload time (caller
    /// value, or the store's configured default); never enforced here.
    pub ttl_hours: u32,

    /// Timestamp captured at ingestion.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> BlobRecord {
        let sha256 = ContentHash::from_data(b"record test");
        BlobRecord {
            blob_id: BlobId::encode(1700000000, &sha256, Some("txt")),
            filename: "record.txt".to_string(),
            mime_type: "text/plain".to_string(),
            size_bytes: 11,
            sha256,
            file_path: PathBuf::from("/tmp/store/blobs/ab/x"),
            tags: vec!["a".to_string(), "b".to_string()],
            ttl_hours: 24,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_serde_roundtrip() {
        let record = sample_record();
        let json = serde_json::to_string(&record).unwrap();
        let restored: BlobRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, restored);
    }

    #[test]
    fn test_tags_default_to_empty() {
        let record = sample_record();
        let mut value: serde_json::Value = serde_json::to_value(&record).unwrap();
        value.as_object_mut().unwrap().remove("tags");
        let restored: BlobRecord = serde_json::from_value(value).unwrap();
        assert!(restored.tags.is_empty());
    }
}
