//! Structured results of backup and restore runs.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use trivialdb_shell_core::TableFileKind;

/// Step of a backup or restore run.
///
/// Runs move through `Idle → Validating → CopyingCatalog → ReadingCatalog →
/// CopyingTableFiles` and end in `Succeeded` or `SucceededWithWarnings`.
/// Any fatal error ends in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Validating,
    CopyingCatalog,
    ReadingCatalog,
    CopyingTableFiles,
    Succeeded,
    SucceededWithWarnings,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::SucceededWithWarnings | Self::Failed
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Validating => write!(f, "validating"),
            Self::CopyingCatalog => write!(f, "copying_catalog"),
            Self::ReadingCatalog => write!(f, "reading_catalog"),
            Self::CopyingTableFiles => write!(f, "copying_table_files"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::SucceededWithWarnings => write!(f, "succeeded_with_warnings"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Direction of a copy run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Backup,
    Restore,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backup => write!(f, "backup"),
            Self::Restore => write!(f, "restore"),
        }
    }
}

/// Non-fatal problem recorded during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CopyWarning {
    /// A catalog-declared table has no structure or data file at the source.
    MissingTableFile {
        table: String,
        file_kind: TableFileKind,
        path: PathBuf,
    },
    /// The source file exists but copying it failed.
    CopyFailed { path: PathBuf, error: String },
    /// A table name that cannot be used as a file name was skipped.
    InvalidTableName { table: String, error: String },
    /// The catalog gave no tables, so table files were discovered by
    /// extension instead.
    CatalogFallback { reason: String, tables: Vec<String> },
    /// A backup file no longer matches its manifest checksum.
    ChecksumMismatch {
        file: String,
        expected: String,
        actual: String,
    },
    /// A file listed in the manifest is gone from the backup root.
    MissingBackupFile { file: String },
    /// The manifest could not be written or read.
    ManifestUnavailable { path: PathBuf, error: String },
}

impl fmt::Display for CopyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTableFile {
                table,
                file_kind,
                path,
            } => write!(
                f,
                "table `{table}` has no {file_kind} file at {}",
                path.display()
            ),
            Self::CopyFailed { path, error } => {
                write!(f, "failed to copy {}: {error}", path.display())
            }
            Self::InvalidTableName { table, error } => {
                write!(f, "skipped table {table:?}: {error}")
            }
            Self::CatalogFallback { reason, tables } => write!(
                f,
                "{reason}; restoring structure files found by extension: {}",
                if tables.is_empty() {
                    "(none)".to_string()
                } else {
                    tables.join(", ")
                }
            ),
            Self::ChecksumMismatch {
                file,
                expected,
                actual,
            } => write!(
                f,
                "{file} does not match its manifest checksum (expected {expected}, found {actual})"
            ),
            Self::MissingBackupFile { file } => {
                write!(f, "{file} is listed in the manifest but missing")
            }
            Self::ManifestUnavailable { path, error } => {
                write!(f, "manifest {} unavailable: {error}", path.display())
            }
        }
    }
}

/// Outcome of a successful backup or restore.
///
/// A report is only produced when the run got past its preconditions;
/// warnings never turn it into a failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationReport {
    pub operation: Operation,
    pub database: String,
    pub source_root: PathBuf,
    pub target_root: PathBuf,
    /// Phases in the order they were entered, ending with the terminal one.
    pub phases: Vec<Phase>,
    /// Table names the run worked from.
    pub tables: Vec<String>,
    /// Destination paths written.
    pub copied: Vec<PathBuf>,
    pub warnings: Vec<CopyWarning>,
}

impl OperationReport {
    /// Terminal phase of the run.
    pub fn status(&self) -> Phase {
        if self.warnings.is_empty() {
            Phase::Succeeded
        } else {
            Phase::SucceededWithWarnings
        }
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Human-readable multi-line summary.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "{} of `{}`: {} ({} file(s) copied, {} table(s))",
            self.operation,
            self.database,
            self.status(),
            self.copied.len(),
            self.tables.len()
        );
        for warning in &self.warnings {
            out.push_str("\n  warning: ");
            out.push_str(&warning.to_string());
        }
        out
    }
}
