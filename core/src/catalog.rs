//! Reader for the engine's binary database descriptor (`<db>.database`).
//!
//! The engine dumps a fixed-capacity C struct:
//!
//! ```text
//! offset 0    i32 (LE)   table_count
//! offset 4    char[64]   database name, NUL padded
//! offset 68   char[64]   table name 0
//! offset 132  char[64]   table name 1
//! ...                    (max_tables slots, only table_count are meaningful)
//! ```
//!
//! Parsing is driven by an explicit field list ([`FieldSpec`]) read through a
//! bounds-checked [`CatalogCursor`], so every truncation is reported against
//! the field that was cut short.
//!
//! # Example
//!
//! ```
//! use trivialdb_shell_core::catalog::parse_catalog;
//!
//! let mut bytes = 1i32.to_le_bytes().to_vec();
//! let field = |name: &str| {
//!     let mut f = name.as_bytes().to_vec();
//!     f.resize(64, 0);
//!     f
//! };
//! bytes.extend(field("shop"));
//! bytes.extend(field("users"));
//!
//! let catalog = parse_catalog(&bytes).unwrap();
//! assert_eq!(catalog.database_name, "shop");
//! assert_eq!(catalog.tables, vec!["users"]);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, Result};

/// Width of every name field in the descriptor (engine `MAX_NAME_LEN`).
pub const NAME_FIELD_WIDTH: usize = 64;

/// Table capacity of one database (engine `MAX_TABLE_NUM`).
pub const DEFAULT_MAX_TABLES: usize = 64;

/// Width of the leading table counter.
pub const TABLE_COUNT_WIDTH: usize = 4;

/// How the raw bytes of one field turn into a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeRule {
    /// Little-endian two's complement 32-bit integer.
    LeI32,
    /// C string: bytes up to the first NUL, strict UTF-8.
    NulTerminatedUtf8,
    /// C string: bytes up to the first NUL, invalid UTF-8 replaced.
    NulTerminatedLossy,
}

/// One fixed-width field of the descriptor layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub width: usize,
    pub rule: DecodeRule,
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Int(i32),
    Text(String),
}

/// Bounds-checked sequential reader over descriptor bytes.
#[derive(Debug)]
pub struct CatalogCursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> CatalogCursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    /// Current byte offset.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Reads `field`, advancing past it.
    ///
    /// `index` is only used to label table slots in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CorruptCatalog`] when fewer than `field.width`
    /// bytes remain, or when a strict text field is not valid UTF-8.
    pub fn read(&mut self, field: &FieldSpec, index: Option<usize>) -> Result<FieldValue> {
        let label = match index {
            Some(i) => format!("{}[{i}]", field.name),
            None => field.name.to_string(),
        };
        let remaining = self.bytes.len().saturating_sub(self.offset);
        if remaining < field.width {
            return Err(CoreError::CorruptCatalog(format!(
                "truncated at field `{label}` (offset {}): need {} bytes, {remaining} available",
                self.offset, field.width
            )));
        }
        let raw = &self.bytes[self.offset..self.offset + field.width];
        let start = self.offset;
        self.offset += field.width;

        match field.rule {
            DecodeRule::LeI32 => {
                let word: [u8; 4] = raw.try_into().map_err(|_| {
                    CoreError::CorruptCatalog(format!(
                        "field `{label}` is {} bytes wide, expected 4",
                        field.width
                    ))
                })?;
                Ok(FieldValue::Int(i32::from_le_bytes(word)))
            }
            DecodeRule::NulTerminatedUtf8 => {
                let text = std::str::from_utf8(c_string(raw)).map_err(|err| {
                    CoreError::CorruptCatalog(format!(
                        "field `{label}` (offset {start}) is not valid UTF-8: {err}"
                    ))
                })?;
                Ok(FieldValue::Text(text.to_string()))
            }
            DecodeRule::NulTerminatedLossy => Ok(FieldValue::Text(
                String::from_utf8_lossy(c_string(raw)).into_owned(),
            )),
        }
    }
}

/// Bytes before the first NUL. Anything after it is padding or a leftover
/// from a longer name that used to occupy the slot.
fn c_string(raw: &[u8]) -> &[u8] {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    &raw[..end]
}

/// Parsed descriptor contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub database_name: String,
    /// Table names in slot order; empty slots are skipped.
    pub tables: Vec<String>,
}

/// Engine constants the descriptor layout depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogSchema {
    pub name_width: usize,
    pub max_tables: usize,
}

impl Default for CatalogSchema {
    fn default() -> Self {
        Self {
            name_width: NAME_FIELD_WIDTH,
            max_tables: DEFAULT_MAX_TABLES,
        }
    }
}

impl CatalogSchema {
    pub fn table_count_field(&self) -> FieldSpec {
        FieldSpec {
            name: "table_count",
            width: TABLE_COUNT_WIDTH,
            rule: DecodeRule::LeI32,
        }
    }

    pub fn database_name_field(&self) -> FieldSpec {
        FieldSpec {
            name: "database_name",
            width: self.name_width,
            rule: DecodeRule::NulTerminatedLossy,
        }
    }

    pub fn table_name_field(&self) -> FieldSpec {
        FieldSpec {
            name: "table_name",
            width: self.name_width,
            rule: DecodeRule::NulTerminatedUtf8,
        }
    }

    /// Parses descriptor bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CorruptCatalog`] if the buffer is truncated, the
    /// table count is negative or above `max_tables`, or a table name is not
    /// valid UTF-8. No partial list is returned.
    pub fn parse(&self, bytes: &[u8]) -> Result<Catalog> {
        let mut cursor = CatalogCursor::new(bytes);

        let count = match cursor.read(&self.table_count_field(), None)? {
            FieldValue::Int(n) => n,
            FieldValue::Text(_) => {
                return Err(CoreError::CorruptCatalog(
                    "table_count is not an integer field".to_string(),
                ));
            }
        };
        let count = usize::try_from(count)
            .ok()
            .filter(|&n| n <= self.max_tables)
            .ok_or_else(|| {
                CoreError::CorruptCatalog(format!(
                    "table count {count} outside 0..={}",
                    self.max_tables
                ))
            })?;

        let database_name = into_text(cursor.read(&self.database_name_field(), None)?);

        let table_field = self.table_name_field();
        let mut tables = Vec::with_capacity(count);
        for slot in 0..count {
            let name = into_text(cursor.read(&table_field, Some(slot))?);
            if name.is_empty() {
                debug!(slot, database = %database_name, "skipping empty table slot");
                continue;
            }
            tables.push(name);
        }

        Ok(Catalog {
            database_name,
            tables,
        })
    }

    /// Reads and parses a descriptor file.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CatalogIo`] if the file cannot be read, otherwise
    /// the same errors as [`parse`](Self::parse).
    pub fn read(&self, path: impl AsRef<Path>) -> Result<Catalog> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| CoreError::CatalogIo {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = self.parse(&bytes).map_err(|err| match err {
            CoreError::CorruptCatalog(msg) => {
                CoreError::CorruptCatalog(format!("{}: {msg}", path.display()))
            }
            other => other,
        })?;
        debug!(
            path = %path.display(),
            tables = catalog.tables.len(),
            "read catalog"
        );
        Ok(catalog)
    }
}

impl CatalogSchema {
    /// Size in bytes of a full descriptor as the engine writes it.
    pub fn descriptor_len(&self) -> usize {
        TABLE_COUNT_WIDTH + self.name_width * (self.max_tables + 1)
    }

    /// Serializes `catalog` in the engine's fixed layout, unused slots zeroed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CorruptCatalog`] if there are more tables than
    /// slots or a name does not fit its field with a NUL terminator.
    pub fn encode(&self, catalog: &Catalog) -> Result<Vec<u8>> {
        if catalog.tables.len() > self.max_tables {
            return Err(CoreError::CorruptCatalog(format!(
                "{} tables do not fit {} slots",
                catalog.tables.len(),
                self.max_tables
            )));
        }
        let count = i32::try_from(catalog.tables.len()).map_err(|_| {
            CoreError::CorruptCatalog("table count does not fit an i32".to_string())
        })?;

        let mut bytes = Vec::with_capacity(self.descriptor_len());
        bytes.extend_from_slice(&count.to_le_bytes());
        self.push_name(&mut bytes, &catalog.database_name)?;
        for table in &catalog.tables {
            self.push_name(&mut bytes, table)?;
        }
        bytes.resize(self.descriptor_len(), 0);
        Ok(bytes)
    }

    fn push_name(&self, bytes: &mut Vec<u8>, name: &str) -> Result<()> {
        if name.len() >= self.name_width {
            return Err(CoreError::CorruptCatalog(format!(
                "name `{name}` does not fit a {}-byte field",
                self.name_width
            )));
        }
        let start = bytes.len();
        bytes.extend_from_slice(name.as_bytes());
        bytes.resize(start + self.name_width, 0);
        Ok(())
    }
}

fn into_text(value: FieldValue) -> String {
    match value {
        FieldValue::Text(text) => text,
        FieldValue::Int(n) => n.to_string(),
    }
}

/// Parses descriptor bytes with the engine's default constants.
pub fn parse_catalog(bytes: &[u8]) -> Result<Catalog> {
    CatalogSchema::default().parse(bytes)
}

/// Reads a descriptor file with the engine's default constants.
pub fn read_catalog(path: impl AsRef<Path>) -> Result<Catalog> {
    CatalogSchema::default().read(path)
}

/// Table names declared by the descriptor at `path`, in slot order.
pub fn read_table_names(path: impl AsRef<Path>) -> Result<Vec<String>> {
    Ok(read_catalog(path)?.tables)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name_field(name: &str) -> Vec<u8> {
        let mut field = name.as_bytes().to_vec();
        field.resize(NAME_FIELD_WIDTH, 0);
        field
    }

    fn descriptor(count: i32, db: &str, tables: &[&str]) -> Vec<u8> {
        let mut bytes = count.to_le_bytes().to_vec();
        bytes.extend(name_field(db));
        for table in tables {
            bytes.extend(name_field(table));
        }
        bytes
    }

    #[test]
    fn test_reads_tables_in_slot_order() {
        let bytes = descriptor(2, "shop", &["users", "orders"]);
        let catalog = parse_catalog(&bytes).unwrap();
        assert_eq!(catalog.database_name, "shop");
        assert_eq!(catalog.tables, vec!["users", "orders"]);
    }

    #[test]
    fn test_ignores_slack_after_declared_tables() {
        // The engine writes all MAX_TABLE_NUM slots; stale names past the
        // count must not leak into the result.
        let mut bytes = descriptor(1, "shop", &["users", "dropped"]);
        bytes.resize(TABLE_COUNT_WIDTH + NAME_FIELD_WIDTH * (DEFAULT_MAX_TABLES + 1), 0);
        let catalog = parse_catalog(&bytes).unwrap();
        assert_eq!(catalog.tables, vec!["users"]);
    }

    #[test]
    fn test_truncated_table_field_is_corrupt() {
        let mut bytes = descriptor(2, "shop", &["users", "orders"]);
        bytes.truncate(bytes.len() - 10);
        let err = parse_catalog(&bytes).unwrap_err();
        match err {
            CoreError::CorruptCatalog(msg) => assert!(msg.contains("table_name[1]"), "{msg}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_truncated_header_is_corrupt() {
        assert!(matches!(
            parse_catalog(&[1, 0]),
            Err(CoreError::CorruptCatalog(_))
        ));
        assert!(matches!(
            parse_catalog(&[]),
            Err(CoreError::CorruptCatalog(_))
        ));
        let mut bytes = 0i32.to_le_bytes().to_vec();
        bytes.extend_from_slice(b"shop");
        assert!(matches!(
            parse_catalog(&bytes),
            Err(CoreError::CorruptCatalog(_))
        ));
    }

    #[test]
    fn test_out_of_range_counts_rejected() {
        for count in [-1, i32::MIN, DEFAULT_MAX_TABLES as i32 + 1] {
            let bytes = descriptor(count, "shop", &["users"]);
            assert!(
                matches!(parse_catalog(&bytes), Err(CoreError::CorruptCatalog(_))),
                "count {count} accepted"
            );
        }
    }

    #[test]
    fn test_empty_slot_skipped() {
        let bytes = descriptor(3, "shop", &["users", "", "orders"]);
        assert_eq!(parse_catalog(&bytes).unwrap().tables, vec!["users", "orders"]);
    }

    #[test]
    fn test_name_cut_at_first_nul() {
        // strcpy over a longer name leaves its tail behind the terminator.
        let mut slot = name_field("orders_archive");
        slot[..6].copy_from_slice(b"users\0");
        let mut bytes = descriptor(1, "shop", &[]);
        bytes.extend(slot);
        assert_eq!(parse_catalog(&bytes).unwrap().tables, vec!["users"]);
    }

    #[test]
    fn test_full_width_name_without_terminator() {
        let long = "t".repeat(NAME_FIELD_WIDTH);
        let bytes = descriptor(1, "shop", &[&long]);
        assert_eq!(parse_catalog(&bytes).unwrap().tables, vec![long]);
    }

    #[test]
    fn test_invalid_utf8_table_name_is_corrupt() {
        let mut bytes = descriptor(1, "shop", &[]);
        let mut slot = vec![0xff, 0xfe];
        slot.resize(NAME_FIELD_WIDTH, 0);
        bytes.extend(slot);
        assert!(matches!(
            parse_catalog(&bytes),
            Err(CoreError::CorruptCatalog(_))
        ));
    }

    #[test]
    fn test_custom_schema_limits() {
        let schema = CatalogSchema {
            name_width: 8,
            max_tables: 2,
        };
        let mut bytes = 2i32.to_le_bytes().to_vec();
        bytes.extend(b"shop\0\0\0\0");
        bytes.extend(b"a\0\0\0\0\0\0\0");
        bytes.extend(b"b\0\0\0\0\0\0\0");
        assert_eq!(schema.parse(&bytes).unwrap().tables, vec!["a", "b"]);

        let mut over = 3i32.to_le_bytes().to_vec();
        over.extend(&bytes[4..]);
        assert!(schema.parse(&over).is_err());
    }

    #[test]
    fn test_encode_matches_engine_layout() {
        let schema = CatalogSchema::default();
        let catalog = Catalog {
            database_name: "shop".to_string(),
            tables: vec!["users".to_string(), "orders".to_string()],
        };
        let bytes = schema.encode(&catalog).unwrap();
        assert_eq!(bytes.len(), schema.descriptor_len());
        assert_eq!(&bytes[..4], &[2, 0, 0, 0]);
        assert_eq!(&bytes[4..9], b"shop\0");
        assert_eq!(schema.parse(&bytes).unwrap(), catalog);
    }

    #[test]
    fn test_encode_rejects_overflow() {
        let schema = CatalogSchema {
            name_width: 8,
            max_tables: 1,
        };
        let too_many = Catalog {
            database_name: "shop".to_string(),
            tables: vec!["a".to_string(), "b".to_string()],
        };
        assert!(schema.encode(&too_many).is_err());
        let too_long = Catalog {
            database_name: "shopping".to_string(),
            tables: Vec::new(),
        };
        assert!(schema.encode(&too_long).is_err());
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_catalog(dir.path().join("nope.database")).unwrap_err();
        assert!(matches!(err, CoreError::CatalogIo { .. }));
    }

    #[test]
    fn test_read_from_disk_labels_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shop.database");
        std::fs::write(&path, [9, 0, 0, 0]).unwrap();
        let err = read_catalog(&path).unwrap_err().to_string();
        assert!(err.contains("shop.database"), "{err}");
    }
}
