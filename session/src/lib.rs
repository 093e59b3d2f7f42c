//! Session layer over the TrivialDB engine.
//!
//! - [`bridge`]: runs one engine process per [`CommandBatch`] and decides
//!   success by which stream produced output.
//! - [`session`]: selected database and credentials.
//! - [`backup`]: catalog-aware backup and restore.
//! - [`manifest`]: checksum manifests written next to backups.
//! - [`shell`]: everything above behind one handle.
//! - [`config`]: YAML configuration.

pub mod backup;
pub mod bridge;
pub mod config;
mod error;
pub mod manifest;
pub mod report;
pub mod session;
pub mod shell;

#[cfg(test)]
mod testing;

pub use backup::BackupOrchestrator;
pub use bridge::{CommandBatch, Engine, EngineOutput, ProcessEngine};
pub use config::ShellConfig;
pub use error::{Result, SessionError};
pub use manifest::BackupManifest;
pub use report::{CopyWarning, Operation, OperationReport, Phase};
pub use session::{Credentials, Session};
pub use shell::Shell;
