//! Oracle SQL dialect (Strategy pattern).
//!
//! `CLOB` is the large-object text class. Oracle cannot change a LOB
//! column's type in place, so conversion goes through a temporary
//! `VARCHAR2` column; this type only renders the statements; sequencing and
//! compensation live in the column backend.

use crate::core::identifier::{quote_literal_oracle, Identifier};
use crate::core::schema::{normalize_default, BackendKind};
use crate::core::traits::Dialect;
use crate::error::Result;

/// Characters of the original name kept in the temp column name.
pub const TEMP_COLUMN_BUDGET: usize = 26;

/// Suffix appended to the temp column name.
pub const TEMP_COLUMN_SUFFIX: &str = "_tmp";

/// Oracle dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct OracleDialect;

impl OracleDialect {
    /// Create a new Oracle dialect instance.
    pub fn new() -> Self {
        Self
    }

    /// Name of the temporary column used while converting `column`.
    ///
    /// Truncated so the result fits Oracle's 30-byte identifier limit.
    pub fn temp_column(&self, column: &Identifier) -> Result<Identifier> {
        column.truncated_with_suffix(TEMP_COLUMN_BUDGET, TEMP_COLUMN_SUFFIX)
    }

    /// Default value to carry onto the temp column, from `DATA_DEFAULT`.
    ///
    /// `DATA_DEFAULT` is expression text. Only a single quoted string
    /// literal survives; expressions such as `EMPTY_CLOB()` or `SYSDATE`
    /// yield `None`.
    pub fn literal_default(&self, raw: Option<&str>) -> Option<String> {
        let trimmed = raw?.trim();
        let inner = trimmed.strip_prefix('\'')?.strip_suffix('\'')?;
        if inner.replace("''", "").contains('\'') {
            // 'a' || 'b'
            return None;
        }
        normalize_default(Some(trimmed))
    }

    /// `ALTER TABLE t ADD tmp VARCHAR2(n) [DEFAULT '...']`
    pub fn build_add_column(
        &self,
        table: &Identifier,
        column: &Identifier,
        width: u64,
        default_value: Option<&str>,
    ) -> String {
        let mut sql = format!(
            "ALTER TABLE {} ADD {} {}",
            table,
            column,
            self.varchar_type(width)
        );
        if let Some(default) = default_value.filter(|d| !d.is_empty()) {
            sql.push_str(&format!(" DEFAULT {}", self.quote_literal(default)));
        }
        sql
    }

    /// `UPDATE t SET tmp = DBMS_LOB.SUBSTR(c, n, 1)`
    pub fn build_copy_lob_prefix(
        &self,
        table: &Identifier,
        target: &Identifier,
        source: &Identifier,
        width: u64,
    ) -> String {
        format!(
            "UPDATE {} SET {} = DBMS_LOB.SUBSTR({}, {}, 1)",
            table, target, source, width
        )
    }

    /// `ALTER TABLE t MODIFY (c NOT NULL)`
    pub fn build_set_not_null(&self, table: &Identifier, column: &Identifier) -> String {
        format!("ALTER TABLE {} MODIFY ({} NOT NULL)", table, column)
    }

    /// `ALTER TABLE t DROP COLUMN c`
    pub fn build_drop_column(&self, table: &Identifier, column: &Identifier) -> String {
        format!("ALTER TABLE {} DROP COLUMN {}", table, column)
    }

    /// `ALTER TABLE t RENAME COLUMN a TO b`
    pub fn build_rename_column(
        &self,
        table: &Identifier,
        from: &Identifier,
        to: &Identifier,
    ) -> String {
        format!("ALTER TABLE {} RENAME COLUMN {} TO {}", table, from, to)
    }
}

impl Dialect for OracleDialect {
    fn name(&self) -> &str {
        "oracle"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::CharacterOriented
    }

    fn long_text_marker(&self) -> &str {
        "CLOB"
    }

    fn varchar_type(&self, width: u64) -> String {
        format!("VARCHAR2({})", width)
    }

    fn quote_literal(&self, value: &str) -> String {
        quote_literal_oracle(value)
    }

    fn build_max_length_query(&self, table: &Identifier, column: &Identifier) -> String {
        // GETLENGTH on a CLOB counts characters.
        format!(
            "SELECT MAX(DBMS_LOB.GETLENGTH({})) AS maxsize FROM {}",
            column, table
        )
    }
}
