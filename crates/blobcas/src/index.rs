//! FileMetadataIndex: one JSON sidecar record per blob, plus filtered,
//! paginated enumeration.
//!
//! Layout mirrors the content tree:
//! ```text
//! {storage_root}/meta/
//! ├── 01/
//! │   └── 1700000000-0123456789abcdef.png.json
//! └── ab/
//!     └── 1700000001-ab12cd34ef567890.json
//! ```
//!
//! Records are published with the same write-temp-then-rename discipline as
//! content. Listing walks the tree, applies a predicate, sorts by identifier
//! (the timestamp prefix makes that chronological) and returns a stable
//! 1-indexed page.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::blob_id::BlobId;
use crate::error::{Result, StoreError};
use crate::mime::MimePattern;
use crate::record::BlobRecord;

/// Default page size for listings.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// One page of a filtered listing.
#[derive(Debug, Clone, Serialize)]
pub struct BlobPage {
    /// Records on this page, ordered by identifier.
    pub blobs: Vec<BlobRecord>,
    /// Count of all records matching the filter, across every page.
    pub total: usize,
    /// 1-indexed page number, echoed back.
    pub page: usize,
    /// Page size, echoed back.
    pub page_size: usize,
}

/// Record filter: MIME pattern and required tag set.
///
/// An unset MIME filter matches everything; tags use AND semantics (the
/// record's tags must be a superset of the requested set).
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub mime_type: Option<String>,
    pub tags: Vec<String>,
}

impl ListFilter {
    pub fn matches(&self, record: &BlobRecord) -> bool {
        if let Some(pattern) = &self.mime_type {
            let ok = MimePattern::parse(pattern)
                .map(|p| p.matches(&record.mime_type))
                .unwrap_or(false);
            if !ok {
                return false;
            }
        }
        self.tags.iter().all(|t| record.tags.contains(t))
    }
}

/// Trait for metadata index backends.
pub trait MetadataIndex: Send + Sync {
    /// Persist a record, keyed by its identifier, durably and atomically.
    fn put(&self, record: &BlobRecord) -> Result<()>;

    /// Point lookup; `NotFound` if absent.
    fn get(&self, id: &BlobId) -> Result<BlobRecord>;

    /// Remove a record; `NotFound` if absent.
    fn delete(&self, id: &BlobId) -> Result<()>;

    /// Whether a record exists for the identifier.
    fn contains(&self, id: &BlobId) -> bool;

    /// Enumerate records satisfying `pred` and return the requested page.
    ///
    /// `total` counts every matching record regardless of the pagination
    /// window. `page` is 1-indexed; out-of-range pages yield empty slices.
    fn list_where(
        &self,
        pred: &dyn Fn(&BlobRecord) -> bool,
        page: usize,
        page_size: usize,
    ) -> Result<BlobPage>;
}

/// Filesystem-backed metadata index.
#[derive(Debug, Clone)]
pub struct FileMetadataIndex {
    meta_dir: PathBuf,
    staging_dir: PathBuf,
}

impl FileMetadataIndex {
    /// Create an index, creating its directories if needed.
    pub fn new(meta_dir: PathBuf, staging_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&meta_dir)?;
        fs::create_dir_all(&staging_dir)?;
        Ok(Self {
            meta_dir,
            staging_dir,
        })
    }

    fn record_path(&self, id: &BlobId) -> PathBuf {
        self.meta_dir
            .join(id.shard())
            .join(format!("{}.json", id.file_name()))
    }

    /// Load every record on disk, sorted by identifier.
    ///
    /// Unreadable or unparsable sidecar files are skipped with a warning
    /// rather than failing the whole enumeration.
    pub fn all_records(&self) -> Result<Vec<BlobRecord>> {
        let mut records = Vec::new();
        for shard in fs::read_dir(&self.meta_dir)? {
            let shard = shard?;
            if !shard.file_type()?.is_dir() {
                continue;
            }
            for entry in fs::read_dir(shard.path())? {
                let entry = entry?;
                let path = entry.path();
                match fs::read_to_string(&path)
                    .map_err(StoreError::from)
                    .and_then(|s| Ok(serde_json::from_str::<BlobRecord>(&s)?))
                {
                    Ok(record) => records.push(record),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "skipping unreadable metadata record");
                    }
                }
            }
        }
        records.sort_by(|a, b| a.blob_id.as_str().cmp(b.blob_id.as_str()));
        Ok(records)
    }
}

impl MetadataIndex for FileMetadataIndex {
    fn put(&self, record: &BlobRecord) -> Result<()> {
        let path = self.record_path(&record.blob_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_vec_pretty(record)?;
        let mut tmp = NamedTempFile::new_in(&self.staging_dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;

        Ok(())
    }

    fn get(&self, id: &BlobId) -> Result<BlobRecord> {
        let path = self.record_path(id);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::not_found(id));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&json)?)
    }

    fn delete(&self, id: &BlobId) -> Result<()> {
        let path = self.record_path(id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::not_found(id)),
            Err(e) => Err(e.into()),
        }
    }

    fn contains(&self, id: &BlobId) -> bool {
        self.record_path(id).exists()
    }

    fn list_where(
        &self,
        pred: &dyn Fn(&BlobRecord) -> bool,
        page: usize,
        page_size: usize,
    ) -> Result<BlobPage> {
        let page = page.max(1);
        let page_size = page_size.max(1);

        let matching: Vec<BlobRecord> = self
            .all_records()?
            .into_iter()
            .filter(|r| pred(r))
            .collect();
        let total = matching.len();

        let blobs: Vec<BlobRecord> = matching
            .into_iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .collect();

        Ok(BlobPage {
            blobs,
            total,
            page,
            page_size,
        })
    }
}
