//! # lob-migrate
//!
//! Converts large-object text columns (`LONGTEXT` on MySQL/MariaDB, `CLOB`
//! on Oracle) to `VARCHAR(4000)` when their data fits.
//!
//! For every long-text column in the connected schema the engine measures
//! the longest stored value, decides whether it fits, and converts it:
//!
//! - **MySQL/MariaDB**: one `ALTER TABLE ... MODIFY`, atomic per column
//! - **Oracle**: a checkpointed temp-column sequence with declared
//!   compensation for each step
//!
//! Columns are processed one at a time over a single connection; a failing
//! column is reported and the run continues.
//!
//! ## Example
//!
//! ```rust,no_run
//! use lob_migrate::{drivers, Config, MigrationDriver, RunMode};
//!
//! #[tokio::main]
//! async fn main() -> lob_migrate::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let db = drivers::connect(&config).await?;
//!     let driver = MigrationDriver::new(db.catalog.clone(), db.backend.clone())
//!         .with_filter(config.table_filter()?);
//!     let report = driver
//!         .run(RunMode::Migrate { force: false }, |r| println!("{}", r))
//!         .await?;
//!     println!("{} columns migrated", report.summary.migrated);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod migrate;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenient access
pub use config::{Config, DatabaseConfig, MigrationConfig, TableFilter};
pub use self::core::schema::BackendKind;
pub use drivers::DatabaseHandle;
pub use error::{MigrateError, Result};
pub use migrate::{ColumnReport, MigrationDriver, MigrationOutcome, RunMode, RunReport};
