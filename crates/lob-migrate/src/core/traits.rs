//! Core traits at the seams between the migration engine and a live database.
//!
//! - [`CatalogReader`]: yields the table/column catalog, once per run
//! - [`SqlSession`]: executes single statements on the one connection
//! - [`LobColumnBackend`]: the per-backend capability the driver depends on
//! - [`Dialect`]: SQL text strategy for one database engine
//!
//! The driver only ever sees a `LobColumnBackend`; which database sits behind
//! it is decided once, at connection time.

use async_trait::async_trait;

use super::identifier::Identifier;
use super::schema::{BackendKind, ColumnDescriptor, LengthMeasurement, SchemaCatalog};
use crate::error::Result;
use crate::migrate::outcome::MigrationOutcome;

/// Source of the live schema catalog.
#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// Read every table and column visible to the connected user, in
    /// backend-native ("local") representation with long-text columns
    /// classified as [`ColumnType::LongText`](super::schema::ColumnType).
    async fn read_catalog(&self) -> Result<SchemaCatalog>;
}

/// A single blocking-in-order statement channel to the database.
///
/// Implementations issue exactly one statement per call and never pipeline;
/// DML is committed before the call returns.
#[async_trait]
pub trait SqlSession: Send + Sync {
    /// Execute a DDL or DML statement.
    async fn execute(&self, sql: &str) -> Result<()>;

    /// Run an aggregate query whose first column is an optional length.
    ///
    /// Returns `None` when the result set is empty or the aggregate is NULL.
    async fn query_max_length(&self, sql: &str) -> Result<LengthMeasurement>;

    /// Round-trip a trivial query to check the connection.
    async fn ping(&self) -> Result<()>;

    /// Get the database type identifier (e.g., "mysql", "oracle").
    fn db_type(&self) -> &str;

    /// Close the connection.
    async fn close(&self);
}

/// Large-object column conversion for one backend kind.
///
/// # Contract
///
/// - `probe_length` issues one read-only aggregate query and reports the
///   length in the backend's unit.
/// - `migrate` never returns an error: every failure becomes a
///   [`MigrationOutcome::Failed`] that names the stage and whether the
///   schema was left inconsistent.
#[async_trait]
pub trait LobColumnBackend: Send + Sync {
    /// Storage semantics of this backend.
    fn kind(&self) -> BackendKind;

    /// Measure the maximum stored length of a column's data.
    async fn probe_length(&self, column: &ColumnDescriptor) -> Result<LengthMeasurement>;

    /// Convert a long-text column to `VARCHAR(4000)`.
    async fn migrate(&self, column: &ColumnDescriptor) -> MigrationOutcome;
}

/// SQL syntax strategy for different database engines.
///
/// Covers what the engine needs from every backend; statements that only
/// exist on one backend live on the concrete dialect type.
pub trait Dialect: Send + Sync {
    /// Get the dialect name (e.g., "mysql", "oracle").
    fn name(&self) -> &str;

    /// Storage semantics of the engine.
    fn kind(&self) -> BackendKind;

    /// Catalog type name of the large-object text class.
    fn long_text_marker(&self) -> &str;

    /// Fixed-width replacement type, e.g. `VARCHAR(4000)`.
    fn varchar_type(&self, width: u64) -> String;

    /// Quote a string literal (DEFAULT values).
    fn quote_literal(&self, value: &str) -> String;

    /// Aggregate query returning the maximum stored length of `column` as
    /// `maxsize`, in the engine's length unit.
    fn build_max_length_query(&self, table: &Identifier, column: &Identifier) -> String;
}
