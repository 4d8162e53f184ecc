//! Database driver implementations.
//!
//! This module provides database-specific implementations of the core traits:
//!
//! - [`mysql`]: MySQL/MariaDB driver (byte-oriented lengths)
//! - [`oracle`]: Oracle driver (character-oriented lengths)
//!
//! # Architecture
//!
//! Each driver module implements:
//! - `Dialect`: SQL syntax strategy for the database engine
//! - `SqlSession` + `CatalogReader`: the live connection
//! - `LobColumnBackend`: probing and conversion of one long-text column
//!
//! [`connect`] is the only place that branches on the database type; the
//! migration driver receives the result as trait objects.

pub mod mysql;
pub mod oracle;

pub use self::mysql::{MysqlColumnBackend, MysqlConnection, MysqlDialect};
pub use self::oracle::{OracleColumnBackend, OracleConnection, OracleDialect};

use std::sync::Arc;

use crate::config::Config;
use crate::core::schema::BackendKind;
use crate::core::traits::{CatalogReader, LobColumnBackend, SqlSession};
use crate::error::Result;

/// A connected database, seen only through the core traits.
#[derive(Clone)]
pub struct DatabaseHandle {
    pub session: Arc<dyn SqlSession>,
    pub catalog: Arc<dyn CatalogReader>,
    pub backend: Arc<dyn LobColumnBackend>,
}

impl DatabaseHandle {
    pub fn new(
        session: Arc<dyn SqlSession>,
        catalog: Arc<dyn CatalogReader>,
        backend: Arc<dyn LobColumnBackend>,
    ) -> Self {
        Self {
            session,
            catalog,
            backend,
        }
    }

    pub fn kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub async fn close(&self) {
        self.session.close().await;
    }
}

/// Connect to the configured database and wire up its backend.
///
/// The backend kind is resolved here once; nothing downstream inspects the
/// database type again.
pub async fn connect(config: &Config) -> Result<DatabaseHandle> {
    let timeout = config.migration.statement_timeout_secs;

    match BackendKind::from_db_type(&config.database.r#type)? {
        BackendKind::ByteOriented => {
            let conn = Arc::new(MysqlConnection::connect(&config.database, timeout).await?);
            let backend = Arc::new(MysqlColumnBackend::new(conn.clone()));
            Ok(DatabaseHandle::new(conn.clone(), conn, backend))
        }
        BackendKind::CharacterOriented => {
            let conn = Arc::new(OracleConnection::connect(&config.database, timeout).await?);
            let backend = Arc::new(OracleColumnBackend::new(conn.clone()));
            Ok(DatabaseHandle::new(conn.clone(), conn, backend))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MigrateError;

    #[tokio::test]
    async fn test_connect_rejects_unknown_backend_before_connecting() {
        let mut config = Config::from_yaml(
            "database:\n  type: mysql\n  host: localhost\n  database: x\n  user: root\n",
        )
        .unwrap();
        config.database.r#type = "postgres".to_string();

        let err = connect(&config).await.err().unwrap();
        assert!(matches!(err, MigrateError::UnsupportedBackend(_)));
    }
}
