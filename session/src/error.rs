//! Error types for engine sessions and backup/restore.
//!
//! Precondition failures ([`NoDatabaseSelected`](SessionError::NoDatabaseSelected),
//! [`MissingDatabaseFile`](SessionError::MissingDatabaseFile),
//! [`BackupNotFound`](SessionError::BackupNotFound)) are raised before any
//! file is touched. Per-file copy problems are not errors; they are returned
//! as [`CopyWarning`](crate::report::CopyWarning)s inside a successful report.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use trivialdb_shell_core::CoreError;

/// Errors that can occur while talking to the engine or moving its files.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Engine binary is missing or cannot be executed.
    #[error("failed to launch engine '{}': {source}", .binary.display())]
    ProcessLaunchFailure {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Engine wrote to stderr; carries that text verbatim.
    #[error("engine reported an error: {}", .0.trim_end())]
    EngineReportedError(String),

    /// Engine was still running when the configured timeout expired.
    #[error("engine did not exit within {0:?} and was killed")]
    EngineTimeout(Duration),

    /// Operation needs a selected database and the session has none.
    #[error("no database selected")]
    NoDatabaseSelected,

    /// Descriptor of the database is absent from the storage root.
    #[error("database file not found: {}", .0.display())]
    MissingDatabaseFile(PathBuf),

    /// Backup descriptor for the database is absent from the backup root.
    #[error("no backup of database '{database}' at {}", .path.display())]
    BackupNotFound { database: String, path: PathBuf },

    /// Backup has no checksum manifest to verify against.
    #[error("backup manifest not found: {}", .0.display())]
    ManifestNotFound(PathBuf),

    /// Descriptor bytes do not match the catalog layout.
    #[error("corrupt catalog: {0}")]
    CorruptCatalog(String),

    /// Database or table name rejected before reaching the engine.
    #[error("invalid identifier '{name}': {reason}")]
    InvalidIdentifier { name: String, reason: String },

    /// Filesystem failure on a specific path.
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration value is unusable.
    #[error("configuration error: {0}")]
    Config(String),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl SessionError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<CoreError> for SessionError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::CatalogIo { path, source } => Self::Io { path, source },
            CoreError::CorruptCatalog(msg) => Self::CorruptCatalog(msg),
            CoreError::InvalidIdentifier { name, reason } => {
                Self::InvalidIdentifier { name, reason }
            }
            CoreError::UnknownEncoding(label) => {
                Self::Config(format!("unknown text encoding label: {label}"))
            }
        }
    }
}

/// Convenience alias for results with [`SessionError`].
pub type Result<T> = std::result::Result<T, SessionError>;
