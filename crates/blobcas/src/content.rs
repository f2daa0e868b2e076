//! FileContentStore: durable content persistence under a sharded tree.
//!
//! Layout:
//! ```text
//! {storage_root}/
//! ├── blobs/
//! │   ├── 01/
//! │   │   └── 1700000000-0123456789abcdef.png
//! │   └── ab/
//! │       └── 1700000001-ab12cd34ef567890
//! └── staging/
//!     └── .tmpXXXXXX   # in-flight writes, renamed into place when complete
//! ```
//!
//! The two shard characters come from the identifier's hash fragment, so a
//! path is a pure function of the identifier. Writes go to a temp file in
//! `staging/` (same filesystem) and are published with an atomic rename; a
//! reader never observes a partially written file under the final path.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use tempfile::NamedTempFile;

use crate::blob_id::BlobId;
use crate::error::{Result, StoreError};

/// Trait for content storage backends.
///
/// Narrow by design: the facade only needs write/read/delete/path, so the
/// filesystem backend could be swapped for an embedded key-value engine
/// without touching it.
pub trait ContentStore: Send + Sync {
    /// Persist bytes under the identifier, atomically. Returns the final
    /// content path.
    fn write(&self, id: &BlobId, data: &[u8]) -> Result<PathBuf>;

    /// Resolve the identifier to its content path; `NotFound` if absent.
    fn resolve_path(&self, id: &BlobId) -> Result<PathBuf>;

    /// Read the full content bytes; `NotFound` if absent.
    fn read(&self, id: &BlobId) -> Result<Vec<u8>>;

    /// Whether content exists for the identifier.
    fn exists(&self, id: &BlobId) -> bool;

    /// Remove the persisted bytes; `NotFound` if absent.
    fn delete(&self, id: &BlobId) -> Result<()>;
}

/// Filesystem-backed content store.
#[derive(Debug, Clone)]
pub struct FileContentStore {
    blobs_dir: PathBuf,
    staging_dir: PathBuf,
}

impl FileContentStore {
    /// Create a content store, creating its directories if needed.
    pub fn new(blobs_dir: PathBuf, staging_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&blobs_dir)?;
        fs::create_dir_all(&staging_dir)?;
        Ok(Self {
            blobs_dir,
            staging_dir,
        })
    }

    /// Deterministic mapping from identifier to content path.
    pub fn blob_path(&self, id: &BlobId) -> PathBuf {
        self.blobs_dir.join(id.shard()).join(id.file_name())
    }

    /// Enumerate identifiers of all content files on disk.
    ///
    /// File names that don't parse as identifiers (stray files) are skipped
    /// with a warning.
    pub fn enumerate(&self) -> Result<Vec<BlobId>> {
        let mut ids = Vec::new();
        for shard in fs::read_dir(&self.blobs_dir)? {
            let shard = shard?;
            if !shard.file_type()?.is_dir() {
                continue;
            }
            for entry in fs::read_dir(shard.path())? {
                let entry = entry?;
                let name = entry.file_name();
                let Some(name) = name.to_str() else { continue };
                match BlobId::from_file_name(name) {
                    Ok(id) => ids.push(id),
                    Err(e) => {
                        tracing::warn!(file = name, error = %e, "skipping stray content file");
                    }
                }
            }
        }
        Ok(ids)
    }
}

impl ContentStore for FileContentStore {
    fn write(&self, id: &BlobId, data: &[u8]) -> Result<PathBuf> {
        let path = self.blob_path(id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut tmp = NamedTempFile::new_in(&self.staging_dir)?;
        tmp.write_all(data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;

        Ok(path)
    }

    fn resolve_path(&self, id: &BlobId) -> Result<PathBuf> {
        let path = self.blob_path(id);
        if !path.exists() {
            return Err(StoreError::not_found(id));
        }
        Ok(path)
    }

    fn read(&self, id: &BlobId) -> Result<Vec<u8>> {
        let path = self.resolve_path(id)?;
        Ok(fs::read(path)?)
    }

    fn exists(&self, id: &BlobId) -> bool {
        self.blob_path(id).exists()
    }

    fn delete(&self, id: &BlobId) -> Result<()> {
        let path = self.blob_path(id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::not_found(id)),
            Err(e) => Err(e.into()),
        }
    }
}
