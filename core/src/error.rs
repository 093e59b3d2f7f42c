//! Error types for catalog parsing and name validation.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Descriptor file could not be read from disk.
    #[error("failed to read catalog '{}': {source}", .path.display())]
    CatalogIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Descriptor bytes do not match the fixed catalog layout.
    #[error("corrupt catalog: {0}")]
    CorruptCatalog(String),

    /// Name cannot be spliced into engine SQL safely.
    #[error("invalid identifier '{name}': {reason}")]
    InvalidIdentifier { name: String, reason: String },

    /// Encoding label is not known to the decoder.
    #[error("unknown text encoding label: {0}")]
    UnknownEncoding(String),
}

/// Convenience alias for results with [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;
