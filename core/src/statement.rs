//! SQL text for the engine's dialect.
//!
//! Names are validated before they are spliced into SQL; column lists,
//! values, `SET` clauses and `WHERE` conditions are passed through verbatim
//! since the engine is the only thing that can judge them.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::catalog::NAME_FIELD_WIDTH;
use crate::error::{CoreError, Result};

static IDENTIFIER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex must compile")
});

/// Checks that `name` can be used as a database, table or column name.
///
/// Names must be plain identifiers and short enough to fit a descriptor
/// name field together with its NUL terminator.
///
/// # Examples
///
/// ```
/// use trivialdb_shell_core::statement::validate_identifier;
///
/// assert!(validate_identifier("shop_2024").is_ok());
/// assert!(validate_identifier("shop; DROP DATABASE x").is_err());
/// assert!(validate_identifier("").is_err());
/// ```
pub fn validate_identifier(name: &str) -> Result<&str> {
    let invalid = |reason: &str| CoreError::InvalidIdentifier {
        name: name.to_string(),
        reason: reason.to_string(),
    };
    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.len() >= NAME_FIELD_WIDTH {
        return Err(invalid(&format!(
            "name must be shorter than {NAME_FIELD_WIDTH} bytes"
        )));
    }
    if !IDENTIFIER_RE.is_match(name) {
        return Err(invalid(
            "only ASCII letters, digits and underscores are allowed, not starting with a digit",
        ));
    }
    Ok(name)
}

/// Column change carried by `ALTER TABLE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlterAction {
    AddColumn { column: String, column_type: String },
    DropColumn { column: String },
    RenameColumn { from: String, to: String },
    ModifyColumn { column: String, column_type: String },
}

/// One engine statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    CreateDatabase(String),
    ShowDatabase(String),
    DropDatabase(String),
    CreateTable { table: String, columns: String },
    ShowTable(String),
    RenameTable { from: String, to: String },
    AlterTable { table: String, action: AlterAction },
    DropTable(String),
    Insert { table: String, values: String },
    Select { table: String, condition: Option<String> },
    Update { table: String, assignments: String, condition: Option<String> },
    Delete { table: String, condition: Option<String> },
}

impl Statement {
    /// Validates every identifier the statement carries.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidIdentifier`] for the first bad name.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::CreateDatabase(name)
            | Self::ShowDatabase(name)
            | Self::DropDatabase(name)
            | Self::ShowTable(name)
            | Self::DropTable(name) => {
                validate_identifier(name)?;
            }
            Self::CreateTable { table, .. }
            | Self::Insert { table, .. }
            | Self::Select { table, .. }
            | Self::Update { table, .. }
            | Self::Delete { table, .. } => {
                validate_identifier(table)?;
            }
            Self::RenameTable { from, to } => {
                validate_identifier(from)?;
                validate_identifier(to)?;
            }
            Self::AlterTable { table, action } => {
                validate_identifier(table)?;
                match action {
                    AlterAction::AddColumn { column, .. }
                    | AlterAction::DropColumn { column }
                    | AlterAction::ModifyColumn { column, .. } => {
                        validate_identifier(column)?;
                    }
                    AlterAction::RenameColumn { from, to } => {
                        validate_identifier(from)?;
                        validate_identifier(to)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Whether the statement must run inside `USE <db>;`.
    pub fn needs_database(&self) -> bool {
        !matches!(
            self,
            Self::CreateDatabase(_) | Self::ShowDatabase(_) | Self::DropDatabase(_)
        )
    }

    /// One `INSERT` per non-blank line of `rows`.
    pub fn insert_rows(table: &str, rows: &str) -> Vec<Statement> {
        rows.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|values| Statement::Insert {
                table: table.to_string(),
                values: values.to_string(),
            })
            .collect()
    }
}

fn where_clause(condition: &Option<String>) -> String {
    match condition.as_deref().map(str::trim) {
        Some(cond) if !cond.is_empty() => format!(" WHERE {cond}"),
        _ => String::new(),
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateDatabase(db) => write!(f, "CREATE DATABASE {db};"),
            Self::ShowDatabase(db) => write!(f, "SHOW DATABASE {db};"),
            Self::DropDatabase(db) => write!(f, "DROP DATABASE {db};"),
            Self::CreateTable { table, columns } => {
                write!(f, "CREATE TABLE {table} ({});", columns.trim())
            }
            Self::ShowTable(table) => write!(f, "SHOW TABLE {table};"),
            Self::RenameTable { from, to } => write!(f, "RENAME TABLE {from} TO {to};"),
            Self::AlterTable { table, action } => match action {
                AlterAction::AddColumn {
                    column,
                    column_type,
                } => write!(f, "ALTER TABLE {table} ADD COLUMN {column} {column_type};"),
                AlterAction::DropColumn { column } => {
                    write!(f, "ALTER TABLE {table} DROP COLUMN {column};")
                }
                AlterAction::RenameColumn { from, to } => {
                    write!(f, "ALTER TABLE {table} RENAME COLUMN {from} TO {to};")
                }
                AlterAction::ModifyColumn {
                    column,
                    column_type,
                } => write!(
                    f,
                    "ALTER TABLE {table} MODIFY COLUMN {column} {column_type};"
                ),
            },
            Self::DropTable(table) => write!(f, "DROP TABLE {table};"),
            Self::Insert { table, values } => {
                write!(f, "INSERT INTO {table} VALUES ({});", values.trim())
            }
            Self::Select { table, condition } => {
                write!(f, "SELECT * FROM {table}{};", where_clause(condition))
            }
            Self::Update {
                table,
                assignments,
                condition,
            } => write!(
                f,
                "UPDATE {table} SET {}{};",
                assignments.trim(),
                where_clause(condition)
            ),
            Self::Delete { table, condition } => {
                write!(f, "DELETE FROM {table}{};", where_clause(condition))
            }
        }
    }
}
