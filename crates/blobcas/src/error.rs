//! Error taxonomy for the blob store.
//!
//! The four caller-facing conditions (`InvalidIdentifier`, `NotFound`,
//! `SizeLimitExceeded`, `MimeNotAllowed`) are raised synchronously, before
//! any durable side effect for the failing call. `Io` and `Codec` cover
//! storage-level failures underneath them.

use thiserror::Error;

use crate::blob_id::BlobIdError;

/// Errors returned by blob store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The supplied identifier fails lexical validation. Raised before any
    /// storage lookup, so callers can tell malformed input apart from a
    /// well-formed identifier that simply doesn't exist.
    #[error("invalid blob identifier: {0}")]
    InvalidIdentifier(#[from] BlobIdError),

    /// The identifier is well-formed but nothing is stored under it.
    #[error("blob not found: {0}")]
    NotFound(String),

    /// Payload length exceeds the configured ceiling.
    #[error("blob size {size} bytes exceeds limit of {limit} bytes")]
    SizeLimitExceeded { size: u64, limit: u64 },

    /// Resolved MIME type matches none of the configured allow patterns.
    #[error("MIME type not allowed: {0}")]
    MimeNotAllowed(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("metadata encoding error: {0}")]
    Codec(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Construct a `NotFound` for the given identifier.
    pub(crate) fn not_found(id: impl std::fmt::Display) -> Self {
        StoreError::NotFound(id.to_string())
    }
}
