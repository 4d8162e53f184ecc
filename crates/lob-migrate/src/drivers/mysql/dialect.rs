//! MySQL/MariaDB SQL dialect (Strategy pattern).
//!
//! `LONGTEXT` is the large-object text class. Lengths are measured with
//! `LENGTH()`, which counts bytes, and the type is changed in place with a
//! single `ALTER TABLE ... MODIFY`.

use crate::core::identifier::{quote_literal_mysql, Identifier};
use crate::core::schema::{BackendKind, ColumnDescriptor};
use crate::core::traits::Dialect;
use crate::migrate::policy::MIGRATION_THRESHOLD;

/// MySQL/MariaDB dialect implementation.
///
/// Compatible with MySQL 5.7+, 8.0+, and MariaDB 10.2+.
#[derive(Debug, Clone, Default)]
pub struct MysqlDialect;

impl MysqlDialect {
    /// Create a new MySQL dialect instance.
    pub fn new() -> Self {
        Self
    }

    /// Column definition replacing a `LONGTEXT` column.
    ///
    /// `NOT NULL` is carried over. A literal `DEFAULT` is only emitted when
    /// the catalog reported one; MySQL does not allow defaults on TEXT
    /// columns, so in practice this restores defaults set outside MySQL's
    /// rules (e.g. by MariaDB 10.2+).
    pub fn build_varchar_definition(&self, column: &ColumnDescriptor) -> String {
        let mut def = self.varchar_type(MIGRATION_THRESHOLD);
        if !column.nullable {
            def.push_str(" NOT NULL");
        }
        if let Some(default) = column.default_value.as_deref().filter(|d| !d.is_empty()) {
            def.push_str(&format!(" DEFAULT {}", self.quote_literal(default)));
        }
        def
    }

    /// `ALTER TABLE t MODIFY c VARCHAR(4000) [NOT NULL] [DEFAULT '...']`
    pub fn build_modify_column(
        &self,
        table: &Identifier,
        column: &Identifier,
        descriptor: &ColumnDescriptor,
    ) -> String {
        format!(
            "ALTER TABLE {} MODIFY {} {}",
            table,
            column,
            self.build_varchar_definition(descriptor)
        )
    }
}

impl Dialect for MysqlDialect {
    fn name(&self) -> &str {
        "mysql"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::ByteOriented
    }

    fn long_text_marker(&self) -> &str {
        "longtext"
    }

    fn varchar_type(&self, width: u64) -> String {
        format!("VARCHAR({})", width)
    }

    fn quote_literal(&self, value: &str) -> String {
        quote_literal_mysql(value)
    }

    fn build_max_length_query(&self, table: &Identifier, column: &Identifier) -> String {
        // LENGTH() counts bytes, not characters.
        format!("SELECT MAX(LENGTH({})) AS maxsize FROM {}", column, table)
    }
}
