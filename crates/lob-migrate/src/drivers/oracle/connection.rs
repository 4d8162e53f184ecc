//! Oracle connection: statement session and catalog reader.
//!
//! The `oracle` crate is blocking, so every call runs on the blocking pool
//! behind a mutex. There is one connection and statements are issued one at
//! a time; DML is committed before the call returns (DDL commits implicitly).

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use oracle::Connection;
use tracing::{debug, info, warn};

use crate::config::DatabaseConfig;
use crate::core::schema::{
    normalize_default, ColumnDescriptor, ColumnType, LengthMeasurement, SchemaCatalog,
};
use crate::core::traits::{CatalogReader, Dialect, SqlSession};
use crate::error::{MigrateError, Result};

use super::dialect::OracleDialect;

const CATALOG_QUERY: &str = "\
    SELECT TABLE_NAME, COLUMN_NAME, DATA_TYPE, NULLABLE, DATA_DEFAULT \
    FROM USER_TAB_COLUMNS \
    WHERE TABLE_NAME IN (SELECT TABLE_NAME FROM USER_TABLES) \
    ORDER BY TABLE_NAME, COLUMN_ID";

/// Table, column, data type, nullable flag, default expression.
type CatalogRow = (String, String, String, String, Option<String>);

/// Oracle session over a single blocking connection.
pub struct OracleConnection {
    conn: Arc<Mutex<Connection>>,
    long_text_marker: String,
}

impl OracleConnection {
    /// Connect using the database section of the configuration.
    ///
    /// `statement_timeout_secs` becomes the OCI call timeout: a statement
    /// running longer than that is aborted with an error.
    pub async fn connect(
        config: &DatabaseConfig,
        statement_timeout_secs: Option<u64>,
    ) -> Result<Self> {
        let user = config.user.clone();
        let password = config.password.clone();
        let connect_string = config.oracle_connect_string();

        let conn = tokio::task::spawn_blocking(move || -> Result<Connection> {
            let conn = Connection::connect(&user, &password, &connect_string).map_err(|e| {
                MigrateError::connection(e, format!("connecting to {}", connect_string))
            })?;
            if let Some(secs) = statement_timeout_secs {
                conn.set_call_timeout(Some(Duration::from_secs(secs)))
                    .map_err(|e| MigrateError::connection(e, "setting call timeout"))?;
            }
            conn.query_row_as::<i64>("SELECT 1 FROM DUAL", &[])
                .map_err(|e| MigrateError::connection(e, "testing Oracle connection"))?;
            Ok(conn)
        })
        .await
        .map_err(|e| MigrateError::connection(e, "Oracle connect task"))??;

        info!("Connected to Oracle: {}", config.oracle_connect_string());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            long_text_marker: OracleDialect::new().long_text_marker().to_string(),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, context: &str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().unwrap_or_else(|e| e.into_inner());
            f(&guard)
        })
        .await
        .map_err(|e| MigrateError::query(e, context))?
    }
}

#[async_trait]
impl SqlSession for OracleConnection {
    async fn execute(&self, sql: &str) -> Result<()> {
        debug!("oracle execute: {}", sql);
        let owned = sql.to_string();
        self.with_conn(sql, move |conn| {
            conn.execute(&owned, &[])
                .map_err(|e| MigrateError::query(e, owned.as_str()))?;
            conn.commit()
                .map_err(|e| MigrateError::query(e, "commit"))?;
            Ok(())
        })
        .await
    }

    async fn query_max_length(&self, sql: &str) -> Result<LengthMeasurement> {
        debug!("oracle probe: {}", sql);
        let owned = sql.to_string();
        let max = self
            .with_conn(sql, move |conn| {
                conn.query_row_as::<Option<i64>>(&owned, &[])
                    .map_err(|e| MigrateError::query(e, owned.as_str()))
            })
            .await?;
        Ok(max.map(|n| n.max(0) as u64))
    }

    async fn ping(&self) -> Result<()> {
        self.with_conn("ping", |conn| {
            conn.ping()
                .map_err(|e| MigrateError::connection(e, "pinging Oracle"))
        })
        .await
    }

    fn db_type(&self) -> &str {
        "oracle"
    }

    async fn close(&self) {
        let result = self
            .with_conn("close", |conn| {
                conn.close()
                    .map_err(|e| MigrateError::connection(e, "closing Oracle connection"))
            })
            .await;
        if let Err(e) = result {
            warn!("{}", e);
        }
    }
}

#[async_trait]
impl CatalogReader for OracleConnection {
    async fn read_catalog(&self) -> Result<SchemaCatalog> {
        let marker = self.long_text_marker.clone();
        let columns = self
            .with_conn("loading Oracle catalog", move |conn| {
                let rows = conn
                    .query_as::<CatalogRow>(CATALOG_QUERY, &[])
                    .map_err(|e| MigrateError::query(e, "loading Oracle catalog"))?;

                let dialect = OracleDialect::new();
                let mut columns = Vec::new();
                for row in rows {
                    let (table, column, data_type, nullable, default) =
                        row.map_err(|e| MigrateError::query(e, "loading Oracle catalog"))?;
                    let default_value = dialect.literal_default(default.as_deref());
                    if default_value.is_none() {
                        if let Some(expr) = normalize_default(default.as_deref()) {
                            warn!(
                                "{}.{}: non-literal default '{}' is not carried over",
                                table, column, expr
                            );
                        }
                    }
                    columns.push(ColumnDescriptor {
                        table,
                        column,
                        col_type: ColumnType::classify(&data_type, &marker),
                        nullable: nullable == "Y",
                        default_value,
                    });
                }
                Ok(columns)
            })
            .await?;

        debug!("Loaded {} Oracle columns", columns.len());
        Ok(SchemaCatalog::from_columns(columns))
    }
}
