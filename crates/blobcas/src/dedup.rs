//! DedupMap: filesystem-backed content-hash to identifier mapping.
//!
//! One file per hash, sharded like the content tree:
//! ```text
//! {storage_root}/dedup/
//! └── e3/
//!     └── b0c442...b855   # file body is the winning blob id
//! ```
//!
//! Registration must resolve concurrent first-uploads of the same content
//! to a single winner, so the entry is published with `fs::hard_link` from
//! a fully written temp file: link creation is an atomic create-if-absent,
//! and the entry is never observable half-written. The map persists across
//! restarts, which keeps re-uploads of old content deduplicated in new
//! processes.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use tempfile::NamedTempFile;

use crate::blob_id::BlobId;
use crate::error::Result;
use crate::hash::ContentHash;

/// Outcome of a registration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// This caller's identifier is now the canonical one for the hash.
    Registered,
    /// Another identifier already owns the hash; the caller lost the race.
    Existing(BlobId),
}

/// Filesystem-backed hash-to-id map.
#[derive(Debug, Clone)]
pub struct DedupMap {
    dedup_dir: PathBuf,
    staging_dir: PathBuf,
}

impl DedupMap {
    /// Create a dedup map, creating its directories if needed.
    pub fn new(dedup_dir: PathBuf, staging_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dedup_dir)?;
        fs::create_dir_all(&staging_dir)?;
        Ok(Self {
            dedup_dir,
            staging_dir,
        })
    }

    fn entry_path(&self, hash: &ContentHash) -> PathBuf {
        self.dedup_dir.join(hash.prefix()).join(hash.remainder())
    }

    /// Look up the canonical identifier for a hash.
    ///
    /// Entries that fail to parse are treated as absent (and reported); the
    /// caller will then re-register.
    pub fn lookup(&self, hash: &ContentHash) -> Result<Option<BlobId>> {
        let path = self.entry_path(hash);
        let body = match fs::read_to_string(&path) {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match BlobId::parse(body.trim()) {
            Ok(id) => Ok(Some(id)),
            Err(e) => {
                tracing::warn!(hash = %hash, error = %e, "ignoring corrupt dedup entry");
                Ok(None)
            }
        }
    }

    /// Exclusively register `hash -> id`.
    ///
    /// Exactly one concurrent caller observes `Registered`; all others get
    /// `Existing` with the winner's identifier.
    pub fn register(&self, hash: &ContentHash, id: &BlobId) -> Result<Registration> {
        let path = self.entry_path(hash);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut tmp = NamedTempFile::new_in(&self.staging_dir)?;
        tmp.write_all(id.as_str().as_bytes())?;
        tmp.as_file().sync_all()?;

        match fs::hard_link(tmp.path(), &path) {
            Ok(()) => Ok(Registration::Registered),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                match self.lookup(hash)? {
                    Some(existing) => Ok(Registration::Existing(existing)),
                    // entry vanished or was corrupt between link and read;
                    // let the caller keep its own id
                    None => Ok(Registration::Registered),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove the entry for a hash. Absence is not an error; clearing is
    /// part of a logical delete and must not fail it.
    pub fn remove(&self, hash: &ContentHash) -> Result<()> {
        match fs::remove_file(self.entry_path(hash)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Enumerate all `(hash, id)` entries. Corrupt entries are skipped.
    pub fn entries(&self) -> Result<Vec<(ContentHash, BlobId)>> {
        let mut out = Vec::new();
        for shard in fs::read_dir(&self.dedup_dir)? {
            let shard = shard?;
            if !shard.file_type()?.is_dir() {
                continue;
            }
            let prefix = shard.file_name();
            let Some(prefix) = prefix.to_str() else { continue };
            for entry in fs::read_dir(shard.path())? {
                let entry = entry?;
                let name = entry.file_name();
                let Some(remainder) = name.to_str() else { continue };
                let Ok(hash) = ContentHash::from_str_checked(&format!("{prefix}{remainder}"))
                else {
                    tracing::warn!(file = remainder, "skipping stray dedup entry");
                    continue;
                };
                if let Some(id) = self.lookup(&hash)? {
                    out.push((hash, id));
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn map() -> (TempDir, DedupMap) {
        let dir = TempDir::new().unwrap();
        let map = DedupMap::new(dir.path().join("dedup"), dir.path().join("staging")).unwrap();
        (dir, map)
    }

    fn sample() -> (ContentHash, BlobId) {
        let hash = ContentHash::from_data(b"dedup sample");
        let id = BlobId::encode(1700000000, &hash, Some("bin"));
        (hash, id)
    }

    #[test]
    fn test_lookup_absent() {
        let (_dir, map) = map();
        let (hash, _) = sample();
        assert_eq!(map.lookup(&hash).unwrap(), None);
    }

    #[test]
    fn test_register_then_lookup() {
        let (_dir, map) = map();
        let (hash, id) = sample();
        assert_eq!(map.register(&hash, &id).unwrap(), Registration::Registered);
        assert_eq!(map.lookup(&hash).unwrap(), Some(id));
    }

    #[test]
    fn test_second_register_loses() {
        let (_dir, map) = map();
        let (hash, winner) = sample();
        let loser = BlobId::encode(1700000099, &hash, Some("bin"));

        map.register(&hash, &winner).unwrap();
        assert_eq!(
            map.register(&hash, &loser).unwrap(),
            Registration::Existing(winner)
        );
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (_dir, map) = map();
        let (hash, id) = sample();
        map.register(&hash, &id).unwrap();
        map.remove(&hash).unwrap();
        map.remove(&hash).unwrap();
        assert_eq!(map.lookup(&hash).unwrap(), None);
    }

    #[test]
    fn test_entries() {
        let (_dir, map) = map();
        let (hash, id) = sample();
        let hash2 = ContentHash::from_data(b"other");
        let id2 = BlobId::encode(1700000001, &hash2, None);

        map.register(&hash, &id).unwrap();
        map.register(&hash2, &id2).unwrap();

        let mut entries = map.entries().unwrap();
        entries.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
        let mut want = vec![(hash, id), (hash2, id2)];
        want.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
        assert_eq!(entries, want);
    }

    #[test]
    fn test_corrupt_entry_treated_as_absent() {
        let (_dir, map) = map();
        let (hash, _) = sample();
        let path = map.entry_path(&hash);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"not a blob id").unwrap();

        assert_eq!(map.lookup(&hash).unwrap(), None);
    }
}
