//! blobcas: a local, single-node content-addressable blob store.
//!
//! Binary attachments are ingested with size and MIME validation, hashed
//! with SHA-256, optionally deduplicated, and persisted under an opaque
//! identifier alongside a queryable metadata record (tags, MIME type, TTL
//! hint). Content and metadata land on disk via write-temp-then-atomic-
//! rename, so a crash never leaves a half-written file visible.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use blobcas::{BlobStore, ListQuery, UploadOptions};
//!
//! let store = BlobStore::at_path("/var/lib/blobcas").unwrap();
//!
//! // Store content
//! let record = store.upload(b"Hello, World!", "hello.txt").unwrap();
//! println!("Stored as: {}", record.blob_id);
//!
//! // Look it up again
//! let meta = store.get_metadata(record.blob_id.as_str()).unwrap();
//! println!("{} bytes of {}", meta.size_bytes, meta.mime_type);
//!
//! // Filesystem path (for external tools)
//! let path = store.resolve_path(record.blob_id.as_str()).unwrap();
//! println!("File at: {}", path.display());
//!
//! // Filtered listing
//! let page = store.list(&ListQuery {
//!     mime_type: Some("text/*".to_string()),
//!     ..Default::default()
//! }).unwrap();
//! println!("{} text blobs", page.total);
//! # let _ = UploadOptions::default();
//! ```
//!
//! # Identifiers
//!
//! `blob://<10-digit-timestamp>-<16-hex-hash-fragment>[.<ext>]`, e.g.
//! `blob://1700000000-0123456789abcdef.png`. Identifiers are validated
//! lexically before any lookup, so a malformed string fails with
//! `InvalidIdentifier` rather than `NotFound`.
//!
//! # Configuration
//!
//! A [`StoreConfig`] is an explicit per-instance value; stores pointed at
//! different roots coexist in one process. `StoreConfig::from_env` reads
//! `BLOBCAS_PATH`, `BLOBCAS_MAX_SIZE_MB`, and `BLOBCAS_DEDUP`;
//! `from_file` reads a TOML `[store]` section.

pub mod blob_id;
pub mod config;
pub mod content;
pub mod dedup;
pub mod error;
pub mod hash;
pub mod index;
pub mod mime;
pub mod record;
pub mod store;

// Re-exports for convenience
pub use blob_id::{BlobId, BlobIdError};
pub use config::{ConfigError, StoreConfig};
pub use content::{ContentStore, FileContentStore};
pub use dedup::{DedupMap, Registration};
pub use error::{Result, StoreError};
pub use hash::{ContentHash, HashError};
pub use index::{BlobPage, FileMetadataIndex, ListFilter, MetadataIndex, DEFAULT_PAGE_SIZE};
pub use record::BlobRecord;
pub use store::{BlobStore, ListQuery, ReconcileReport, UploadOptions};
