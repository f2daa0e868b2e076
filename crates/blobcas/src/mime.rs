//! Validation policy: size ceiling, MIME inference, and MIME allow-listing.
//!
//! MIME patterns are matched structurally on the `type/subtype` pair, never
//! as a raw string prefix, so `image/svg+xml` matches `image/*` but not
//! `images/*`. Matching is case-insensitive. All checks here are pure; they
//! run before any persistence side effect.

use std::path::Path;

use crate::error::{Result, StoreError};

/// MIME type used when inference finds no known extension.
pub const DEFAULT_MIME: &str = "application/octet-stream";

/// Reject payloads larger than the configured ceiling.
///
/// A payload exactly at the limit is accepted.
pub fn check_size(size: u64, limit: u64) -> Result<()> {
    if size > limit {
        return Err(StoreError::SizeLimitExceeded { size, limit });
    }
    Ok(())
}

/// Normalized (lowercase alphanumeric) extension of a filename, if any.
pub fn extension_of(filename: &str) -> Option<String> {
    let ext = Path::new(filename).extension()?.to_str()?;
    if ext.is_empty() || !ext.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Infer a MIME type from a filename's extension.
///
/// Lookup is case-insensitive; unknown extensions (and filenames without
/// one) fall back to `application/octet-stream`.
pub fn infer_mime(filename: &str) -> &'static str {
    let Some(ext) = extension_of(filename) else {
        return DEFAULT_MIME;
    };
    match ext.as_str() {
        "txt" | "text" | "log" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "js" => "text/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "yaml" | "yml" => "application/yaml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "ico" => "image/vnd.microsoft.icon",
        "tif" | "tiff" => "image/tiff",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => DEFAULT_MIME,
    }
}

/// An allow-list entry: exact `type/subtype` or wildcard `type/*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimePattern {
    major: String,
    /// `None` means the `*` wildcard.
    subtype: Option<String>,
}

impl MimePattern {
    /// Parse a pattern string. Returns `None` for anything that isn't a
    /// two-part `type/subtype` or `type/*`; such entries never match.
    pub fn parse(pattern: &str) -> Option<Self> {
        let (major, subtype) = pattern.split_once('/')?;
        if major.is_empty() || subtype.is_empty() {
            return None;
        }
        Some(Self {
            major: major.to_ascii_lowercase(),
            subtype: if subtype == "*" {
                None
            } else {
                Some(subtype.to_ascii_lowercase())
            },
        })
    }

    /// Whether a concrete MIME type matches this pattern.
    pub fn matches(&self, mime_type: &str) -> bool {
        let Some((major, subtype)) = mime_type.split_once('/') else {
            return false;
        };
        if !major.eq_ignore_ascii_case(&self.major) {
            return false;
        }
        match &self.subtype {
            None => true,
            Some(want) => subtype.eq_ignore_ascii_case(want),
        }
    }
}

/// Reject MIME types outside the allow-list.
///
/// An empty list accepts every MIME type.
pub fn check_mime(mime_type: &str, allowed: &[String]) -> Result<()> {
    if allowed.is_empty() {
        return Ok(());
    }
    let accepted = allowed
        .iter()
        .filter_map(|p| MimePattern::parse(p))
        .any(|p| p.matches(mime_type));
    if !accepted {
        return Err(StoreError::MimeNotAllowed(mime_type.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_size_boundary() {
        assert!(check_size(100, 100).is_ok());
        let err = check_size(101, 100).unwrap_err();
        assert!(matches!(
            err,
            StoreError::SizeLimitExceeded { size: 101, limit: 100 }
        ));
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("photo.PNG"), Some("png".to_string()));
        assert_eq!(extension_of("archive.tar.gz"), Some("gz".to_string()));
        assert_eq!(extension_of("README"), None);
        assert_eq!(extension_of("weird.t-r"), None);
    }

    #[test]
    fn test_infer_mime_known_extensions() {
        assert_eq!(infer_mime("test.txt"), "text/plain");
        assert_eq!(infer_mime("image.png"), "image/png");
        assert_eq!(infer_mime("photo.JPEG"), "image/jpeg");
        assert_eq!(infer_mime("doc.pdf"), "application/pdf");
    }

    #[test]
    fn test_infer_mime_unknown_falls_back() {
        assert_eq!(infer_mime("data.xyz123"), DEFAULT_MIME);
        assert_eq!(infer_mime("no_extension"), DEFAULT_MIME);
    }

    #[test]
    fn test_pattern_exact_match() {
        let p = MimePattern::parse("text/plain").unwrap();
        assert!(p.matches("text/plain"));
        assert!(p.matches("TEXT/Plain"));
        assert!(!p.matches("text/html"));
    }

    #[test]
    fn test_pattern_wildcard_is_structural() {
        let p = MimePattern::parse("image/*").unwrap();
        assert!(p.matches("image/png"));
        assert!(p.matches("image/svg+xml"));
        // not a string-prefix match
        assert!(!MimePattern::parse("images/*").unwrap().matches("image/svg+xml"));
        assert!(!p.matches("imagepng"));
    }

    #[test]
    fn test_pattern_malformed_never_matches() {
        assert!(MimePattern::parse("image").is_none());
        assert!(MimePattern::parse("/png").is_none());
        assert!(MimePattern::parse("image/").is_none());
    }

    #[test]
    fn test_check_mime_empty_allows_all() {
        assert!(check_mime("application/octet-stream", &[]).is_ok());
    }

    #[test]
    fn test_check_mime_allow_list() {
        let allowed = vec!["image/*".to_string(), "application/pdf".to_string()];
        assert!(check_mime("image/png", &allowed).is_ok());
        assert!(check_mime("application/pdf", &allowed).is_ok());
        let err = check_mime("text/plain", &allowed).unwrap_err();
        assert!(matches!(err, StoreError::MimeNotAllowed(_)));
    }
}
