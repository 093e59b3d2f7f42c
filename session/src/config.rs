//! Shell configuration.
//!
//! Loaded from a YAML file; every field has a default so an empty file (or no
//! file at all) is valid.
//!
//! # Example YAML
//!
//! ```yaml
//! engine:
//!   binary: ../../build/bin/trivial_db
//!   timeout_secs: null
//!   fallback_encodings: [gbk]
//!   max_tables: 64
//! storage:
//!   root: null          # defaults to the engine binary's directory
//!   backup_root: null   # defaults to <root>/backup
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use trivialdb_shell_core::catalog::{DEFAULT_MAX_TABLES, NAME_FIELD_WIDTH};
use trivialdb_shell_core::decode::DEFAULT_FALLBACK_LABELS;
use trivialdb_shell_core::{CatalogSchema, StorageLayout, TextDecoder};

use crate::error::{Result, SessionError};

/// Default engine binary, looked up on `PATH`.
pub const DEFAULT_ENGINE_BINARY: &str = "trivial_db";

/// Directory name of the backup root inside the storage root.
pub const DEFAULT_BACKUP_DIR: &str = "backup";

/// How the engine process is located and run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Path to the engine executable. The engine runs with its working
    /// directory set to the directory containing this file.
    pub binary: PathBuf,
    /// Kill the engine after this many seconds. `None` waits forever.
    pub timeout_secs: Option<u64>,
    /// Encodings tried after UTF-8 when decoding engine output (WHATWG labels).
    pub fallback_encodings: Vec<String>,
    /// Table capacity of one database (`MAX_TABLE_NUM` the engine was built with).
    pub max_tables: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from(DEFAULT_ENGINE_BINARY),
            timeout_secs: None,
            fallback_encodings: DEFAULT_FALLBACK_LABELS
                .iter()
                .map(|label| label.to_string())
                .collect(),
            max_tables: DEFAULT_MAX_TABLES,
        }
    }
}

impl EngineConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Decoder for engine output.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] for an unknown encoding label.
    pub fn decoder(&self) -> Result<TextDecoder> {
        Ok(TextDecoder::with_fallbacks(self.fallback_encodings.as_slice())?)
    }

    pub fn catalog_schema(&self) -> CatalogSchema {
        CatalogSchema {
            name_width: NAME_FIELD_WIDTH,
            max_tables: self.max_tables,
        }
    }

    /// Directory the engine runs in, or `None` for a bare command name that
    /// is resolved through `PATH`.
    pub fn working_dir(&self) -> Option<&Path> {
        self.binary
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
    }
}

/// Where database files live.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding `<db>.database`, `<t>.thead` and `<t>.tdata`.
    pub root: Option<PathBuf>,
    /// Directory holding backups.
    pub backup_root: Option<PathBuf>,
}

/// Top-level configuration.
///
/// # Examples
///
/// ```
/// use trivialdb_shell_session::config::ShellConfig;
///
/// let config: ShellConfig = serde_yaml::from_str("engine:\n  binary: /opt/tdb/bin/trivial_db\n").unwrap();
/// assert_eq!(config.storage_root(), std::path::PathBuf::from("/opt/tdb/bin"));
/// assert_eq!(config.backup_root(), std::path::PathBuf::from("/opt/tdb/bin/backup"));
/// assert!(config.engine.timeout().is_none());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    pub engine: EngineConfig,
    pub storage: StorageConfig,
}

impl ShellConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](SessionError::Io) if the file cannot be read, or
    /// [`YamlError`](SessionError::YamlError) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|err| SessionError::io(path, err))?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](SessionError::Io) if the file cannot be written, or
    /// [`YamlError`](SessionError::YamlError) if serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = std::fs::File::create(path).map_err(|err| SessionError::io(path, err))?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Live storage root: explicit setting, else the engine's working
    /// directory, else the current directory.
    pub fn storage_root(&self) -> PathBuf {
        if let Some(root) = &self.storage.root {
            return root.clone();
        }
        self.engine
            .working_dir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Backup root: explicit setting, else `<storage root>/backup`.
    pub fn backup_root(&self) -> PathBuf {
        self.storage
            .backup_root
            .clone()
            .unwrap_or_else(|| self.storage_root().join(DEFAULT_BACKUP_DIR))
    }

    pub fn storage_layout(&self) -> StorageLayout {
        StorageLayout::new(self.storage_root())
    }

    pub fn backup_layout(&self) -> StorageLayout {
        StorageLayout::new(self.backup_root())
    }

    /// Checks values that serde cannot.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] for a zero timeout, an empty binary
    /// path, an unknown encoding label, or a backup root that is the storage
    /// root.
    pub fn validate(&self) -> Result<()> {
        if self.engine.binary.as_os_str().is_empty() {
            return Err(SessionError::Config("engine.binary must not be empty".to_string()));
        }
        if self.engine.timeout_secs == Some(0) {
            return Err(SessionError::Config(
                "engine.timeout_secs must be positive; omit it to wait forever".to_string(),
            ));
        }
        self.engine.decoder()?;
        ensure_distinct_roots(&self.storage_root(), &self.backup_root())
    }
}

/// Fails when `storage` and `backup` name the same directory.
///
/// Existing directories are compared after canonicalizing; otherwise the
/// paths are compared lexically, ignoring `.` components.
pub(crate) fn ensure_distinct_roots(storage: &Path, backup: &Path) -> Result<()> {
    let same = match (std::fs::canonicalize(storage), std::fs::canonicalize(backup)) {
        (Ok(storage), Ok(backup)) => storage == backup,
        _ => lexical(storage) == lexical(backup),
    };
    if same {
        return Err(SessionError::Config(format!(
            "storage root and backup root must differ (both are {})",
            storage.display()
        )));
    }
    Ok(())
}

fn lexical(path: &Path) -> PathBuf {
    path.components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect()
}
