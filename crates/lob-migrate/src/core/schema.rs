//! Catalog snapshot types: tables, columns, and the backend they came from.
//!
//! These are read fresh from the live database once per run and never
//! mutated by the migration engine.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, Result};

/// Storage semantics of the connected database.
///
/// Determines the unit of length measurements and which DDL strategy
/// converts a large-object column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// MySQL/MariaDB: lengths in bytes, single-statement `MODIFY`.
    ByteOriented,
    /// Oracle: lengths in characters, multi-step temp-column conversion.
    CharacterOriented,
}

impl BackendKind {
    /// Resolve a configured database type string.
    ///
    /// # Errors
    ///
    /// Returns `MigrateError::UnsupportedBackend` for unknown types.
    pub fn from_db_type(db_type: &str) -> Result<Self> {
        match db_type.to_lowercase().as_str() {
            "mysql" | "mysqli" | "mariadb" => Ok(BackendKind::ByteOriented),
            "oracle" | "oci" => Ok(BackendKind::CharacterOriented),
            other => Err(MigrateError::UnsupportedBackend(other.to_string())),
        }
    }

    /// Unit that length measurements are expressed in.
    pub fn unit(&self) -> LengthUnit {
        match self {
            BackendKind::ByteOriented => LengthUnit::Bytes,
            BackendKind::CharacterOriented => LengthUnit::Characters,
        }
    }
}

/// Unit of a [`LengthMeasurement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthUnit {
    Bytes,
    Characters,
}

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LengthUnit::Bytes => f.write_str("bytes"),
            LengthUnit::Characters => f.write_str("characters"),
        }
    }
}

/// Maximum stored length of a column's data; `None` when there is nothing
/// to measure (no rows, or only NULLs). Unit implied by [`BackendKind`].
pub type LengthMeasurement = Option<u64>;

/// Declared column type, as classified by the catalog reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    /// The backend's large-object text class (`longtext`, `CLOB`).
    LongText,
    /// Anything else, carrying the backend-native type name.
    Other(String),
}

impl ColumnType {
    /// Classify a backend-native type name against the long-text marker.
    pub fn classify(native: &str, long_text_marker: &str) -> Self {
        if native.eq_ignore_ascii_case(long_text_marker) {
            ColumnType::LongText
        } else {
            ColumnType::Other(native.to_string())
        }
    }

    pub fn is_long_text(&self) -> bool {
        matches!(self, ColumnType::LongText)
    }
}

/// Column metadata snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Owning table name.
    pub table: String,

    /// Column name.
    pub column: String,

    /// Declared type.
    pub col_type: ColumnType,

    /// Whether NULL values are allowed.
    pub nullable: bool,

    /// Declared default, unquoted. `None` when absent.
    pub default_value: Option<String>,
}

impl ColumnDescriptor {
    /// `table.column`, as shown in reports.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.table, self.column)
    }
}

/// A table and its columns in ordinal order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
}

impl TableDef {
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.column == name)
    }
}

/// Table name -> column name -> metadata, in catalog order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaCatalog {
    pub tables: Vec<TableDef>,
}

impl SchemaCatalog {
    /// Build a catalog from flat column rows, grouping consecutive rows by
    /// table. Rows must arrive ordered by table name, then ordinal position.
    pub fn from_columns(columns: impl IntoIterator<Item = ColumnDescriptor>) -> Self {
        let mut tables: Vec<TableDef> = Vec::new();
        for col in columns {
            match tables.last_mut() {
                Some(t) if t.name == col.table => t.columns.push(col),
                _ => tables.push(TableDef {
                    name: col.table.clone(),
                    columns: vec![col],
                }),
            }
        }
        Self { tables }
    }

    pub fn table(&self, name: &str) -> Option<&TableDef> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// All long-text columns, in catalog order.
    pub fn long_text_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.tables
            .iter()
            .flat_map(|t| t.columns.iter())
            .filter(|c| c.col_type.is_long_text())
    }
}

/// Normalize a catalog-reported default expression.
///
/// Catalogs report defaults in different shapes: MySQL 5.7 returns the bare
/// value, MariaDB 10.2+ and Oracle return a quoted literal (Oracle often
/// with trailing whitespace or a newline). `NULL`, empty strings, and absent
/// values all normalize to `None`.
pub fn normalize_default(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
        return None;
    }

    let unquoted = match trimmed
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
    {
        Some(inner) => inner.replace("''", "'"),
        None => trimmed.to_string(),
    };

    if unquoted.is_empty() {
        None
    } else {
        Some(unquoted)
    }
}
