//! Core building blocks for driving the TrivialDB engine from the outside.
//!
//! - [`decode`]: turns raw engine output into text under mixed encodings.
//! - [`catalog`]: reads the engine's binary `<db>.database` descriptor.
//! - [`layout`]: names descriptor, structure and data files in a root.
//! - [`statement`]: renders SQL in the engine's dialect with identifier
//!   validation.
//!
//! Nothing here launches a process; see `trivialdb-shell-session` for the
//! bridge and the backup orchestrator.
//!
//! # Example
//!
//! ```no_run
//! use trivialdb_shell_core::catalog::read_table_names;
//! use trivialdb_shell_core::layout::StorageLayout;
//!
//! let storage = StorageLayout::new("/var/lib/trivialdb");
//! for table in read_table_names(storage.descriptor_path("shop")).unwrap() {
//!     println!("{}", storage.structure_path(&table).display());
//! }
//! ```

pub mod catalog;
pub mod decode;
mod error;
pub mod layout;
pub mod statement;

pub use catalog::{Catalog, CatalogSchema};
pub use decode::{TextDecoder, decode_output};
pub use error::{CoreError, Result};
pub use layout::{StorageLayout, TableFileKind};
pub use statement::{AlterAction, Statement, validate_identifier};
