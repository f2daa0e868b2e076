//! BlobId: the opaque, self-describing blob identifier.
//!
//! Wire format: `blob://<10-digit-timestamp>-<16-hex-hash-fragment>[.<ext>]`
//! e.g. `blob://1700000000-0123456789abcdef.png`.
//!
//! Decoding is purely syntactic - it never touches storage. A syntactically
//! valid identifier that doesn't exist is a different failure (`NotFound`)
//! raised later by whoever performs the lookup.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::hash::{ContentHash, FRAGMENT_LEN};

/// Identifier scheme prefix.
pub const SCHEME: &str = "blob://";

const TIMESTAMP_LEN: usize = 10;
// `<timestamp>-<fragment>`, before any extension
const BODY_LEN: usize = TIMESTAMP_LEN + 1 + FRAGMENT_LEN;

/// A validated blob identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobId(String);

/// Lexical validation failures for blob identifiers.
#[derive(Debug, Error)]
pub enum BlobIdError {
    #[error("missing `{SCHEME}` scheme prefix")]
    MissingScheme,

    #[error("timestamp must be exactly {TIMESTAMP_LEN} decimal digits")]
    BadTimestamp,

    #[error("hash fragment must be exactly {FRAGMENT_LEN} hex characters")]
    BadFragment,

    #[error("extension must be non-empty and alphanumeric")]
    BadExtension,
}

impl BlobId {
    /// Encode an identifier from its parts.
    ///
    /// `extension` is embedded verbatim after a `.` separator when present;
    /// callers pass the already-normalized (lowercase alphanumeric)
    /// extension of the original filename.
    pub fn encode(timestamp: u64, hash: &ContentHash, extension: Option<&str>) -> Self {
        let mut s = format!("{SCHEME}{timestamp:010}-{}", hash.fragment());
        if let Some(ext) = extension {
            s.push('.');
            s.push_str(ext);
        }
        Self(s)
    }

    /// Parse and validate an identifier string.
    pub fn parse(s: &str) -> Result<Self, BlobIdError> {
        let rest = s.strip_prefix(SCHEME).ok_or(BlobIdError::MissingScheme)?;

        let (body, ext) = match rest.split_once('.') {
            Some((body, ext)) => (body, Some(ext)),
            None => (rest, None),
        };

        if body.len() < TIMESTAMP_LEN
            || !body[..TIMESTAMP_LEN].bytes().all(|b| b.is_ascii_digit())
        {
            return Err(BlobIdError::BadTimestamp);
        }
        let frag = body[TIMESTAMP_LEN..]
            .strip_prefix('-')
            .ok_or(BlobIdError::BadFragment)?;
        if frag.len() != FRAGMENT_LEN || !frag.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(BlobIdError::BadFragment);
        }
        debug_assert_eq!(body.len(), BODY_LEN);
        if let Some(ext) = ext {
            if ext.is_empty() || !ext.bytes().all(|b| b.is_ascii_alphanumeric()) {
                return Err(BlobIdError::BadExtension);
            }
        }

        Ok(Self(s.to_string()))
    }

    /// Reconstruct an identifier from its on-disk file name
    /// (the part after the scheme prefix).
    pub fn from_file_name(name: &str) -> Result<Self, BlobIdError> {
        Self::parse(&format!("{SCHEME}{name}"))
    }

    /// The embedded unix-seconds timestamp.
    pub fn timestamp(&self) -> u64 {
        // validated at construction
        self.0[SCHEME.len()..SCHEME.len() + TIMESTAMP_LEN]
            .parse()
            .unwrap_or(0)
    }

    /// The embedded hash fragment (first 16 hex chars of the content hash).
    pub fn hash_fragment(&self) -> &str {
        let start = SCHEME.len() + TIMESTAMP_LEN + 1;
        &self.0[start..start + FRAGMENT_LEN]
    }

    /// The embedded file extension, without the dot.
    pub fn extension(&self) -> Option<&str> {
        self.file_name().split_once('.').map(|(_, ext)| ext)
    }

    /// The identifier without its scheme prefix; used as the on-disk
    /// file name for both content and metadata.
    pub fn file_name(&self) -> &str {
        &self.0[SCHEME.len()..]
    }

    /// First 2 characters of the hash fragment (directory sharding).
    pub fn shard(&self) -> &str {
        &self.hash_fragment()[..2]
    }

    /// Get the full identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BlobId {
    type Err = BlobIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for BlobId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_hash() -> ContentHash {
        ContentHash::from_data(b"sample")
    }

    #[test]
    fn test_encode_with_extension() {
        let hash = sample_hash();
        let id = BlobId::encode(1700000000, &hash, Some("png"));
        assert_eq!(
            id.as_str(),
            format!("blob://1700000000-{}.png", hash.fragment())
        );
    }

    #[test]
    fn test_encode_without_extension() {
        let hash = sample_hash();
        let id = BlobId::encode(1700000000, &hash, None);
        assert!(!id.as_str().contains('.'));
        assert_eq!(id.extension(), None);
    }

    #[test]
    fn test_encode_zero_pads_timestamp() {
        let id = BlobId::encode(42, &sample_hash(), None);
        assert!(id.as_str().starts_with("blob://0000000042-"));
        assert_eq!(id.timestamp(), 42);
    }

    #[test]
    fn test_parse_roundtrip() {
        let id = BlobId::encode(1700000000, &sample_hash(), Some("txt"));
        let parsed = BlobId::parse(id.as_str()).unwrap();
        assert_eq!(parsed, id);
        assert_eq!(parsed.timestamp(), 1700000000);
        assert_eq!(parsed.hash_fragment(), sample_hash().fragment());
        assert_eq!(parsed.extension(), Some("txt"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            BlobId::parse("invalid"),
            Err(BlobIdError::MissingScheme)
        ));
    }

    #[test]
    fn test_parse_rejects_short_timestamp() {
        assert!(matches!(
            BlobId::parse("blob://123-0123456789abcdef"),
            Err(BlobIdError::BadTimestamp)
        ));
    }

    #[test]
    fn test_parse_rejects_non_decimal_timestamp() {
        assert!(matches!(
            BlobId::parse("blob://17000000ab-0123456789abcdef"),
            Err(BlobIdError::BadTimestamp)
        ));
    }

    #[test]
    fn test_parse_rejects_bad_fragment() {
        assert!(matches!(
            BlobId::parse("blob://1700000000-0123456789abcdez"),
            Err(BlobIdError::BadFragment)
        ));
    }

    #[test]
    fn test_parse_rejects_bad_extension() {
        assert!(matches!(
            BlobId::parse("blob://1700000000-0123456789abcdef."),
            Err(BlobIdError::BadExtension)
        ));
        assert!(matches!(
            BlobId::parse("blob://1700000000-0123456789abcdef.t..t"),
            Err(BlobIdError::BadExtension)
        ));
    }

    #[test]
    fn test_file_name_and_shard() {
        let id = BlobId::parse("blob://1700000000-0123456789abcdef.png").unwrap();
        assert_eq!(id.file_name(), "1700000000-0123456789abcdef.png");
        assert_eq!(id.shard(), "01");
        let rebuilt = BlobId::from_file_name(id.file_name()).unwrap();
        assert_eq!(rebuilt, id);
    }

    #[test]
    fn test_serde_transparent() {
        let id = BlobId::parse("blob://1700000000-0123456789abcdef.png").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"blob://1700000000-0123456789abcdef.png\"");
        let restored: BlobId = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, id);
    }
}
