//! Core abstractions shared by every backend.
//!
//! - [`schema`]: catalog snapshot types and [`BackendKind`]
//! - [`identifier`]: validated SQL identifiers and literal quoting
//! - [`traits`]: catalog reader, statement session, and backend capability traits

pub mod identifier;
pub mod schema;
pub mod traits;

pub use identifier::Identifier;
pub use schema::{
    BackendKind, ColumnDescriptor, ColumnType, LengthMeasurement, LengthUnit, SchemaCatalog,
    TableDef,
};
pub use traits::{CatalogReader, Dialect, LobColumnBackend, SqlSession};
