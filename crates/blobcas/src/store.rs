//! BlobStore: the public facade over content, metadata, and dedup.
//!
//! Owns the configuration and orchestrates the five operations: `upload`,
//! `get_metadata`, `list`, `delete`, `resolve_path` (plus `read` and
//! `reconcile`). Every operation is synchronous; validation always runs
//! before any durable side effect, size before MIME.

use std::path::PathBuf;

use chrono::Utc;
use serde::Serialize;

use crate::blob_id::BlobId;
use crate::config::StoreConfig;
use crate::content::{ContentStore, FileContentStore};
use crate::dedup::{DedupMap, Registration};
use crate::error::{Result, StoreError};
use crate::hash::ContentHash;
use crate::index::{BlobPage, FileMetadataIndex, ListFilter, MetadataIndex, DEFAULT_PAGE_SIZE};
use crate::mime;
use crate::record::BlobRecord;

/// Optional upload parameters.
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    /// Tags attached to the record, insertion order preserved.
    pub tags: Vec<String>,
    /// TTL hint in hours; the store's configured default applies when unset.
    pub ttl_hours: Option<u32>,
}

/// Listing parameters: optional filters plus a pagination window.
#[derive(Debug, Clone)]
pub struct ListQuery {
    /// Exact `type/subtype` or wildcard `type/*` MIME filter.
    pub mime_type: Option<String>,
    /// Required tags (AND semantics).
    pub tags: Vec<String>,
    /// 1-indexed page number.
    pub page: usize,
    /// Records per page.
    pub page_size: usize,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            mime_type: None,
            tags: Vec::new(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Result of a reconciliation scan.
///
/// A crash between the content and metadata publishes (or mid-delete)
/// leaves one side orphaned; this report surfaces both directions plus
/// dedup entries whose record is gone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileReport {
    /// Content files with no metadata record.
    pub orphan_content: Vec<BlobId>,
    /// Metadata records with no content file.
    pub orphan_records: Vec<BlobId>,
    /// Dedup entries pointing at a missing record.
    pub stale_dedup: Vec<ContentHash>,
    /// Whether the orphans were removed.
    pub repaired: bool,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.orphan_content.is_empty()
            && self.orphan_records.is_empty()
            && self.stale_dedup.is_empty()
    }
}

/// A local content-addressable blob store.
#[derive(Debug, Clone)]
pub struct BlobStore {
    config: StoreConfig,
    content: FileContentStore,
    index: FileMetadataIndex,
    dedup: DedupMap,
}

impl BlobStore {
    /// Open (or initialize) a store with the given configuration.
    pub fn new(config: StoreConfig) -> Result<Self> {
        let staging = config.staging_dir();
        let content = FileContentStore::new(config.blobs_dir(), staging.clone())?;
        let index = FileMetadataIndex::new(config.meta_dir(), staging.clone())?;
        let dedup = DedupMap::new(config.dedup_dir(), staging)?;
        Ok(Self {
            config,
            content,
            index,
            dedup,
        })
    }

    /// Open a store at a specific root with default settings.
    pub fn at_path(path: impl Into<PathBuf>) -> Result<Self> {
        Self::new(StoreConfig::with_root(path))
    }

    /// Get the configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Upload with default options.
    pub fn upload(&self, data: &[u8], filename: &str) -> Result<BlobRecord> {
        self.upload_with(data, filename, UploadOptions::default())
    }

    /// Validate, hash, and durably store a payload, returning its record.
    ///
    /// With deduplication enabled, a payload whose bytes are already stored
    /// short-circuits to the existing record: no new content, no new record,
    /// no mutation of the existing tags or TTL.
    pub fn upload_with(
        &self,
        data: &[u8],
        filename: &str,
        opts: UploadOptions,
    ) -> Result<BlobRecord> {
        mime::check_size(data.len() as u64, self.config.max_size_bytes())?;
        let mime_type = mime::infer_mime(filename);
        mime::check_mime(mime_type, &self.config.allowed_mime_types)?;

        let sha256 = ContentHash::from_data(data);

        if self.config.enable_deduplication {
            if let Some(existing) = self.existing_record(&sha256)? {
                tracing::debug!(blob_id = %existing.blob_id, sha256 = %sha256, "dedup hit");
                return Ok(existing);
            }
        }

        let now = Utc::now();
        let id = self.fresh_id(&sha256, mime::extension_of(filename).as_deref());

        let file_path = self.content.write(&id, data)?;
        let record = BlobRecord {
            blob_id: id.clone(),
            filename: filename.to_string(),
            mime_type: mime_type.to_string(),
            size_bytes: data.len() as u64,
            sha256: sha256.clone(),
            file_path,
            tags: opts.tags,
            ttl_hours: opts.ttl_hours.unwrap_or(self.config.default_ttl_hours),
            created_at: now,
        };

        // Metadata is published only after content publish succeeded; if
        // the record can't be written, roll the content back so no orphan
        // outlives this call.
        if let Err(e) = self.index.put(&record) {
            if let Err(cleanup) = self.content.delete(&id) {
                tracing::warn!(blob_id = %id, error = %cleanup, "content rollback failed");
            }
            return Err(e);
        }

        if self.config.enable_deduplication {
            match self.dedup.register(&sha256, &id)? {
                Registration::Registered => {}
                // A concurrent caller can derive the identical id (same
                // second, same hash) and register it first; the published
                // content is ours too, nothing to discard.
                Registration::Existing(winner) if winner == id => {}
                Registration::Existing(winner) => {
                    // Lost a concurrent first-upload race: discard our copy
                    // and return the winner's record.
                    tracing::debug!(blob_id = %id, winner = %winner, "lost dedup race");
                    if let Err(e) = self.index.delete(&id) {
                        tracing::warn!(blob_id = %id, error = %e, "race cleanup: record removal failed");
                    }
                    if let Err(e) = self.content.delete(&id) {
                        tracing::warn!(blob_id = %id, error = %e, "race cleanup: content removal failed");
                    }
                    return self.index.get(&winner);
                }
            }
        }

        tracing::info!(
            blob_id = %record.blob_id,
            size_bytes = record.size_bytes,
            mime_type = %record.mime_type,
            "stored blob"
        );
        Ok(record)
    }

    /// Fetch the metadata record for an identifier.
    pub fn get_metadata(&self, id: &str) -> Result<BlobRecord> {
        let id = BlobId::parse(id)?;
        self.index.get(&id)
    }

    /// List records matching the query's filters, paginated.
    ///
    /// A record whose content file is missing (crash window between the two
    /// publishes) is never returned and not counted in `total`.
    pub fn list(&self, query: &ListQuery) -> Result<BlobPage> {
        let filter = ListFilter {
            mime_type: query.mime_type.clone(),
            tags: query.tags.clone(),
        };
        self.index.list_where(
            &|r| filter.matches(r) && self.content.exists(&r.blob_id),
            query.page,
            query.page_size,
        )
    }

    /// Remove a blob's content and metadata together.
    pub fn delete(&self, id: &str) -> Result<()> {
        let id = BlobId::parse(id)?;
        let record = self.index.get(&id)?;

        // Content first, then the record: a crash in between leaves an
        // orphan record that `reconcile` detects. Missing content here
        // means a previous crash already half-deleted; still drop the rest.
        match self.content.delete(&id) {
            Ok(()) | Err(StoreError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
        self.index.delete(&id)?;

        if self.config.enable_deduplication {
            if self.dedup.lookup(&record.sha256)? == Some(id.clone()) {
                self.dedup.remove(&record.sha256)?;
            }
        }

        tracing::info!(blob_id = %id, "deleted blob");
        Ok(())
    }

    /// Resolve an identifier to its content file path.
    pub fn resolve_path(&self, id: &str) -> Result<PathBuf> {
        let id = BlobId::parse(id)?;
        self.content.resolve_path(&id)
    }

    /// Read a stored blob's bytes.
    pub fn read(&self, id: &str) -> Result<Vec<u8>> {
        let id = BlobId::parse(id)?;
        self.content.read(&id)
    }

    /// Scan content against metadata (and the dedup map) and report
    /// inconsistencies; with `repair`, remove the orphans.
    pub fn reconcile(&self, repair: bool) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();

        for id in self.content.enumerate()? {
            if !self.index.contains(&id) {
                report.orphan_content.push(id);
            }
        }
        for record in self.index.all_records()? {
            if !self.content.exists(&record.blob_id) {
                report.orphan_records.push(record.blob_id);
            }
        }
        for (hash, id) in self.dedup.entries()? {
            if !self.index.contains(&id) {
                report.stale_dedup.push(hash);
            }
        }

        if repair {
            for id in &report.orphan_content {
                self.content.delete(id)?;
            }
            for id in &report.orphan_records {
                self.index.delete(id)?;
            }
            for hash in &report.stale_dedup {
                self.dedup.remove(hash)?;
            }
            report.repaired = true;
        }

        if !report.is_clean() {
            tracing::warn!(
                orphan_content = report.orphan_content.len(),
                orphan_records = report.orphan_records.len(),
                stale_dedup = report.stale_dedup.len(),
                repaired = report.repaired,
                "reconciliation found inconsistencies"
            );
        }
        Ok(report)
    }

    /// Dedup lookup that tolerates a stale map entry (record deleted by a
    /// crashed process): such entries are cleared and treated as a miss.
    fn existing_record(&self, sha256: &ContentHash) -> Result<Option<BlobRecord>> {
        let Some(existing) = self.dedup.lookup(sha256)? else {
            return Ok(None);
        };
        match self.index.get(&existing) {
            Ok(record) => Ok(Some(record)),
            Err(StoreError::NotFound(_)) => {
                tracing::warn!(blob_id = %existing, "clearing stale dedup entry");
                self.dedup.remove(sha256)?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Encode an identifier that isn't already live.
    ///
    /// Seconds-resolution timestamps can collide when deduplication is off
    /// and identical bytes arrive within one second; bumping the timestamp
    /// disambiguates. Identifiers of deleted blobs are never reissued in
    /// practice because wall time has moved past their timestamp.
    fn fresh_id(&self, sha256: &ContentHash, extension: Option<&str>) -> BlobId {
        let mut ts = Utc::now().timestamp().max(0) as u64;
        loop {
            let id = BlobId::encode(ts, sha256, extension);
            if !self.index.contains(&id) && !self.content.exists(&id) {
                return id;
            }
            ts += 1;
        }
    }
}
