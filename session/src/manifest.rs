//! Checksum manifest written next to every backup.
//!
//! `<db>.manifest.json` lists each file the backup copied with its SHA-256
//! digest and size. Restore checks the backup against it before copying
//! anything back; a mismatch is reported but does not block the restore.
//!
//! # Examples
//!
//! ```no_run
//! use trivialdb_shell_session::manifest::BackupManifest;
//!
//! let manifest = BackupManifest::load("backup/shop.manifest.json").unwrap();
//! for problem in manifest.verify("backup") {
//!     eprintln!("{problem}");
//! }
//! ```

use std::collections::BTreeMap;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Result, SessionError};
use crate::report::CopyWarning;

/// Checksum and size of one backed-up file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub checksum: String,
    pub size_bytes: u64,
}

/// Files belonging to one backup, keyed by file name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupManifest {
    pub database: String,
    /// Version of the tool that wrote the backup.
    pub tool_version: String,
    /// RFC 3339 timestamp of the backup.
    pub created_at: String,
    pub files: BTreeMap<String, FileRecord>,
}

impl BackupManifest {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            files: BTreeMap::new(),
        }
    }

    /// Hashes `path` and records it under its file name.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] if the file cannot be read.
    pub fn record(&mut self, path: &Path) -> Result<()> {
        let bytes = std::fs::read(path).map_err(|err| SessionError::io(path, err))?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.files.insert(
            name,
            FileRecord {
                checksum: checksum_bytes(&bytes),
                size_bytes: bytes.len() as u64,
            },
        );
        Ok(())
    }

    /// Loads a manifest from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](SessionError::Io) if the file cannot be read, or
    /// [`JsonError`](SessionError::JsonError) if it is not a manifest.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|err| SessionError::io(path, err))?;
        let reader = BufReader::new(file);
        let manifest = serde_json::from_reader(reader)?;
        Ok(manifest)
    }

    /// Saves the manifest as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](SessionError::Io) if the file cannot be written, or
    /// [`JsonError`](SessionError::JsonError) if serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = std::fs::File::create(path).map_err(|err| SessionError::io(path, err))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Compares every recorded file under `dir` with its checksum.
    pub fn verify(&self, dir: impl AsRef<Path>) -> Vec<CopyWarning> {
        let dir = dir.as_ref();
        let mut problems = Vec::new();
        for (name, record) in &self.files {
            match calculate_checksum(dir.join(name)) {
                Ok(actual) => {
                    if actual != record.checksum {
                        problems.push(CopyWarning::ChecksumMismatch {
                            file: name.clone(),
                            expected: record.checksum.clone(),
                            actual,
                        });
                    }
                }
                Err(_) => problems.push(CopyWarning::MissingBackupFile { file: name.clone() }),
            }
        }
        problems
    }
}

fn checksum_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// SHA-256 hex digest of a file.
///
/// # Errors
///
/// Returns [`SessionError::Io`] if the file cannot be read.
pub fn calculate_checksum(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|err| SessionError::io(path, err))?;
    Ok(checksum_bytes(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        assert_eq!(
            checksum_bytes(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_record_save_load_verify() {
        let dir = tempfile::tempdir().unwrap();
        let users = dir.path().join("users.thead");
        std::fs::write(&users, b"header").unwrap();

        let mut manifest = BackupManifest::new("shop");
        manifest.record(&users).unwrap();
        assert_eq!(manifest.files["users.thead"].size_bytes, 6);

        let path = dir.path().join("shop.manifest.json");
        manifest.save(&path).unwrap();
        let loaded = BackupManifest::load(&path).unwrap();
        assert_eq!(loaded.database, "shop");
        assert!(loaded.verify(dir.path()).is_empty());
    }

    #[test]
    fn test_verify_reports_changes() {
        let dir = tempfile::tempdir().unwrap();
        let users = dir.path().join("users.tdata");
        let orders = dir.path().join("orders.tdata");
        std::fs::write(&users, b"rows").unwrap();
        std::fs::write(&orders, b"rows").unwrap();

        let mut manifest = BackupManifest::new("shop");
        manifest.record(&users).unwrap();
        manifest.record(&orders).unwrap();

        std::fs::write(&users, b"tampered").unwrap();
        std::fs::remove_file(&orders).unwrap();

        let problems = manifest.verify(dir.path());
        assert_eq!(problems.len(), 2);
        assert!(problems.contains(&CopyWarning::MissingBackupFile {
            file: "orders.tdata".to_string()
        }));
        assert!(problems
            .iter()
            .any(|p| matches!(p, CopyWarning::ChecksumMismatch { file, .. } if file == "users.tdata")));
    }

    #[test]
    fn test_calculate_checksum_matches_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shop.database");
        std::fs::write(&path, [2, 0, 0, 0]).unwrap();
        let mut manifest = BackupManifest::new("shop");
        manifest.record(&path).unwrap();
        assert_eq!(
            manifest.files["shop.database"].checksum,
            calculate_checksum(&path).unwrap()
        );
    }
}
