//! In-memory database for exercising the engine without a server.
//!
//! Interprets the statement shapes the dialects emit (ADD, MODIFY, DROP
//! COLUMN, RENAME COLUMN, the temp-column UPDATE, and the MAX length probes)
//! against a small schema model, so tests can re-read the catalog after a
//! run and check post-conditions. Any statement can be made to fail by exact
//! text; unknown statements are recorded and otherwise ignored.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::schema::{
    normalize_default, BackendKind, ColumnDescriptor, ColumnType, LengthMeasurement,
    SchemaCatalog,
};
use crate::core::traits::{CatalogReader, SqlSession};
use crate::error::{MigrateError, Result};
use crate::migrate::policy::MIGRATION_THRESHOLD;

#[derive(Debug, Clone)]
pub(crate) struct SimColumn {
    pub name: String,
    pub native_type: String,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub max_length: Option<u64>,
}

#[derive(Debug, Clone)]
struct SimTable {
    name: String,
    columns: Vec<SimColumn>,
}

#[derive(Debug, Default)]
struct SimState {
    tables: Vec<SimTable>,
    executed: Vec<String>,
    failures: HashSet<String>,
}

pub(crate) struct SimulatedDatabase {
    kind: BackendKind,
    long_text_marker: &'static str,
    state: Mutex<SimState>,
}

impl SimulatedDatabase {
    pub fn mysql() -> Self {
        Self {
            kind: BackendKind::ByteOriented,
            long_text_marker: "longtext",
            state: Mutex::new(SimState::default()),
        }
    }

    pub fn oracle() -> Self {
        Self {
            kind: BackendKind::CharacterOriented,
            long_text_marker: "CLOB",
            state: Mutex::new(SimState::default()),
        }
    }

    /// Add a column, creating its table on first use.
    pub fn with_column(
        self,
        table: &str,
        column: &str,
        native_type: &str,
        nullable: bool,
        max_length: Option<u64>,
    ) -> Self {
        self.with_column_default(table, column, native_type, nullable, max_length, None)
    }

    pub fn with_column_default(
        self,
        table: &str,
        column: &str,
        native_type: &str,
        nullable: bool,
        max_length: Option<u64>,
        default_value: Option<&str>,
    ) -> Self {
        {
            let mut state = self.lock();
            let col = SimColumn {
                name: column.to_string(),
                native_type: native_type.to_string(),
                nullable,
                default_value: default_value.map(str::to_string),
                max_length,
            };
            match state.tables.iter_mut().find(|t| t.name == table) {
                Some(t) => t.columns.push(col),
                None => state.tables.push(SimTable {
                    name: table.to_string(),
                    columns: vec![col],
                }),
            }
        }
        self
    }

    /// Make the statement with exactly this text fail.
    pub fn fail_on(&self, sql: &str) {
        self.lock().failures.insert(sql.to_string());
    }

    /// Every statement attempted so far, failed ones included.
    pub fn executed(&self) -> Vec<String> {
        self.lock().executed.clone()
    }

    pub fn clear_executed(&self) {
        self.lock().executed.clear();
    }

    /// Column names of a table, in order.
    pub fn columns(&self, table: &str) -> Vec<String> {
        self.lock()
            .tables
            .iter()
            .find(|t| t.name == table)
            .map(|t| t.columns.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default()
    }

    pub fn column(&self, table: &str, column: &str) -> Option<SimColumn> {
        self.lock()
            .tables
            .iter()
            .find(|t| t.name == table)
            .and_then(|t| t.columns.iter().find(|c| c.name == column).cloned())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn apply(state: &mut SimState, sql: &str) -> Result<()> {
        let tokens: Vec<&str> = sql.split_whitespace().collect();
        match tokens.as_slice() {
            ["ALTER", "TABLE", table, "ADD", column, native_type, rest @ ..] => {
                let t = Self::table_mut(state, table)?;
                if t.columns.iter().any(|c| c.name == *column) {
                    return Err(MigrateError::query("column already exists", "simulated"));
                }
                t.columns.push(SimColumn {
                    name: column.to_string(),
                    native_type: native_type.to_string(),
                    nullable: true,
                    default_value: Self::parse_default(rest),
                    max_length: None,
                });
            }
            ["ALTER", "TABLE", table, "MODIFY", paren, "NOT", "NULL)"]
                if paren.starts_with('(') =>
            {
                let col = Self::column_mut(state, table, paren.trim_start_matches('('))?;
                col.nullable = false;
            }
            ["ALTER", "TABLE", table, "MODIFY", column, native_type, rest @ ..] => {
                let width = Self::varchar_width(native_type);
                let col = Self::column_mut(state, table, column)?;
                col.native_type = native_type.to_string();
                col.nullable = !rest.windows(2).any(|w| w[0] == "NOT" && w[1] == "NULL");
                col.default_value = Self::parse_default(rest);
                if let (Some(width), Some(len)) = (width, col.max_length) {
                    col.max_length = Some(len.min(width));
                }
            }
            ["ALTER", "TABLE", table, "DROP", "COLUMN", column] => {
                let t = Self::table_mut(state, table)?;
                let before = t.columns.len();
                t.columns.retain(|c| c.name != *column);
                if t.columns.len() == before {
                    return Err(MigrateError::query("invalid identifier", "simulated"));
                }
            }
            ["ALTER", "TABLE", table, "RENAME", "COLUMN", from, "TO", to] => {
                let col = Self::column_mut(state, table, from)?;
                col.name = to.to_string();
            }
            ["UPDATE", table, "SET", target, "=", expr @ ..] => {
                let expr = expr.join(" ");
                let source = expr
                    .split_once('(')
                    .and_then(|(_, rest)| rest.split_once(','))
                    .map(|(col, _)| col.trim().to_string())
                    .ok_or_else(|| MigrateError::query("unparsable UPDATE", "simulated"))?;
                let len = Self::column_mut(state, table, &source)?.max_length;
                let col = Self::column_mut(state, table, target)?;
                col.max_length = len.map(|l| l.min(MIGRATION_THRESHOLD));
            }
            _ => {}
        }
        Ok(())
    }

    fn table_mut<'a>(state: &'a mut SimState, table: &str) -> Result<&'a mut SimTable> {
        state
            .tables
            .iter_mut()
            .find(|t| t.name == table)
            .ok_or_else(|| MigrateError::query("table or view does not exist", "simulated"))
    }

    fn column_mut<'a>(
        state: &'a mut SimState,
        table: &str,
        column: &str,
    ) -> Result<&'a mut SimColumn> {
        Self::table_mut(state, table)?
            .columns
            .iter_mut()
            .find(|c| c.name == column)
            .ok_or_else(|| MigrateError::query("invalid identifier", "simulated"))
    }

    fn parse_default(rest: &[&str]) -> Option<String> {
        let pos = rest.iter().position(|t| *t == "DEFAULT")?;
        normalize_default(Some(&rest[pos + 1..].join(" ")))
    }

    fn varchar_width(native_type: &str) -> Option<u64> {
        native_type
            .split_once('(')
            .and_then(|(_, rest)| rest.trim_end_matches(')').parse().ok())
    }
}

#[async_trait]
impl SqlSession for SimulatedDatabase {
    async fn execute(&self, sql: &str) -> Result<()> {
        let mut state = self.lock();
        state.executed.push(sql.to_string());
        if state.failures.contains(sql) {
            return Err(MigrateError::query("simulated failure", sql));
        }
        Self::apply(&mut state, sql)
    }

    async fn query_max_length(&self, sql: &str) -> Result<LengthMeasurement> {
        let mut state = self.lock();
        state.executed.push(sql.to_string());
        if state.failures.contains(sql) {
            return Err(MigrateError::query("simulated failure", sql));
        }

        let (select, table) = sql
            .split_once(" FROM ")
            .ok_or_else(|| MigrateError::query("unparsable probe", "simulated"))?;
        let column = select
            .rsplit_once('(')
            .and_then(|(_, rest)| rest.split_once(')'))
            .map(|(col, _)| col.trim())
            .ok_or_else(|| MigrateError::query("unparsable probe", "simulated"))?;

        Ok(Self::column_mut(&mut state, table.trim(), column)?.max_length)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn db_type(&self) -> &str {
        match self.kind {
            BackendKind::ByteOriented => "mysql",
            BackendKind::CharacterOriented => "oracle",
        }
    }

    async fn close(&self) {}
}

#[async_trait]
impl CatalogReader for SimulatedDatabase {
    async fn read_catalog(&self) -> Result<SchemaCatalog> {
        let state = self.lock();
        let columns = state.tables.iter().flat_map(|t| {
            t.columns.iter().map(move |c| ColumnDescriptor {
                table: t.name.clone(),
                column: c.name.clone(),
                col_type: ColumnType::classify(&c.native_type, self.long_text_marker),
                nullable: c.nullable,
                default_value: c.default_value.clone(),
            })
        });
        Ok(SchemaCatalog::from_columns(columns.collect::<Vec<_>>()))
    }
}
