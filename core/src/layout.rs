//! File naming inside a storage or backup root.
//!
//! All files of all databases are siblings in one directory:
//! `<db>.database`, `<table>.thead` and `<table>.tdata`.

use std::path::{Path, PathBuf};

/// Extension of the per-database descriptor.
pub const DESCRIPTOR_EXT: &str = "database";
/// Extension of the per-table structure (header) file.
pub const STRUCTURE_EXT: &str = "thead";
/// Extension of the per-table row data file.
pub const DATA_EXT: &str = "tdata";
/// Extension of the checksum manifest written next to a backup.
pub const MANIFEST_EXT: &str = "manifest.json";

/// Which member of a table's file pair a path refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableFileKind {
    Structure,
    Data,
}

impl TableFileKind {
    pub const ALL: [TableFileKind; 2] = [TableFileKind::Structure, TableFileKind::Data];

    pub fn extension(self) -> &'static str {
        match self {
            Self::Structure => STRUCTURE_EXT,
            Self::Data => DATA_EXT,
        }
    }
}

impl std::fmt::Display for TableFileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Structure => write!(f, "structure"),
            Self::Data => write!(f, "data"),
        }
    }
}

/// A directory laid out the way the engine lays out its working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn descriptor_file_name(database: &str) -> String {
        format!("{database}.{DESCRIPTOR_EXT}")
    }

    pub fn table_file_name(table: &str, kind: TableFileKind) -> String {
        format!("{table}.{}", kind.extension())
    }

    pub fn descriptor_path(&self, database: &str) -> PathBuf {
        self.root.join(Self::descriptor_file_name(database))
    }

    pub fn table_path(&self, table: &str, kind: TableFileKind) -> PathBuf {
        self.root.join(Self::table_file_name(table, kind))
    }

    pub fn structure_path(&self, table: &str) -> PathBuf {
        self.table_path(table, TableFileKind::Structure)
    }

    pub fn data_path(&self, table: &str) -> PathBuf {
        self.table_path(table, TableFileKind::Data)
    }

    pub fn manifest_path(&self, database: &str) -> PathBuf {
        self.root.join(format!("{database}.{MANIFEST_EXT}"))
    }

    /// Table names that have a structure file in this root, sorted.
    ///
    /// This ignores the catalog entirely and will pick up tables of every
    /// database stored in the root.
    pub fn structure_file_stems(&self) -> std::io::Result<Vec<String>> {
        let mut stems = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|ext| ext.to_str()) != Some(STRUCTURE_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                stems.push(stem.to_string());
            }
        }
        stems.sort();
        Ok(stems)
    }
}
