//! MySQL/MariaDB database driver.
//!
//! - [`MysqlDialect`]: SQL syntax strategy
//! - [`MysqlConnection`]: SQLx session and catalog reader
//! - [`MysqlColumnBackend`]: single-statement `LONGTEXT` conversion
//!
//! # Supported Versions
//!
//! - MySQL 5.7+, 8.0+
//! - MariaDB 10.2+

mod connection;
mod converter;
mod dialect;

pub use connection::MysqlConnection;
pub use converter::MysqlColumnBackend;
pub use dialect::MysqlDialect;
