//! Oracle database driver.
//!
//! - [`OracleDialect`]: SQL syntax strategy
//! - [`OracleConnection`]: blocking `oracle` crate session and catalog reader
//! - [`OracleColumnBackend`]: checkpointed `CLOB` conversion through a temp column
//!
//! Requires Oracle Instant Client (ODPI-C loads `libclntsh` at runtime).

mod connection;
mod converter;
mod dialect;

pub use connection::OracleConnection;
pub use converter::OracleColumnBackend;
pub use dialect::{OracleDialect, TEMP_COLUMN_BUDGET, TEMP_COLUMN_SUFFIX};
