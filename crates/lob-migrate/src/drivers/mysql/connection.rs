//! MySQL/MariaDB connection: statement session and catalog reader.
//!
//! Uses SQLx with a single-connection pool. Every statement goes through the
//! same connection, one at a time, in program order.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow, MySqlSslMode};
use sqlx::Row;
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::core::schema::{
    normalize_default, ColumnDescriptor, ColumnType, LengthMeasurement, SchemaCatalog,
};
use crate::core::traits::{CatalogReader, Dialect, SqlSession};
use crate::error::{MigrateError, Result};

use super::dialect::MysqlDialect;

/// Connection acquire timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// MySQL/MariaDB session over one pooled connection.
pub struct MysqlConnection {
    pool: MySqlPool,
    long_text_marker: String,
}

impl MysqlConnection {
    /// Connect using the database section of the configuration.
    ///
    /// When `statement_timeout_secs` is set, `lock_wait_timeout` (DDL
    /// metadata locks) and the server's execution limit (probe queries) are
    /// applied to the session on connect.
    pub async fn connect(
        config: &DatabaseConfig,
        statement_timeout_secs: Option<u64>,
    ) -> Result<Self> {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port_or_default())
            .database(&config.database)
            .username(&config.user)
            .password(&config.password)
            .ssl_mode(parse_ssl_mode(&config.ssl_mode)?);

        let configured_mariadb = is_mariadb(&config.r#type);

        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(POOL_CONNECTION_TIMEOUT)
            .after_connect(move |conn, _meta| {
                Box::pin(async move {
                    if let Some(secs) = statement_timeout_secs {
                        let version: String = sqlx::query_scalar("SELECT VERSION()")
                            .fetch_one(&mut *conn)
                            .await?;
                        let flavor = ServerFlavor::detect(configured_mariadb, &version);
                        debug!("Server version {} ({:?})", version, flavor);
                        for sql in session_timeout_statements(flavor, secs) {
                            sqlx::query(&sql).execute(&mut *conn).await?;
                        }
                    }
                    Ok(())
                })
            })
            .connect_with(options)
            .await
            .map_err(|e| MigrateError::connection(e, "creating MySQL pool"))?;

        sqlx::query("SELECT 1")
            .fetch_one(&pool)
            .await
            .map_err(|e| MigrateError::connection(e, "testing MySQL connection"))?;

        info!(
            "Connected to MySQL: {}:{}/{}",
            config.host,
            config.port_or_default(),
            config.database
        );

        Ok(Self {
            pool,
            long_text_marker: MysqlDialect::new().long_text_marker().to_string(),
        })
    }
}

/// Server family behind the MySQL protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServerFlavor {
    Mysql,
    Mariadb,
}

impl ServerFlavor {
    /// MariaDB when configured as `mariadb` or when `VERSION()` says so
    /// (e.g. `10.11.6-MariaDB-log`).
    fn detect(configured_mariadb: bool, version: &str) -> Self {
        if configured_mariadb || is_mariadb(version) {
            ServerFlavor::Mariadb
        } else {
            ServerFlavor::Mysql
        }
    }
}

fn is_mariadb(text: &str) -> bool {
    text.to_ascii_lowercase().contains("mariadb")
}

/// Session statements that apply a `secs` statement timeout.
///
/// MySQL limits execution with `max_execution_time` in milliseconds; MariaDB
/// has no such variable and uses `max_statement_time` in seconds.
fn session_timeout_statements(flavor: ServerFlavor, secs: u64) -> Vec<String> {
    let execution_limit = match flavor {
        ServerFlavor::Mysql => format!(
            "SET SESSION max_execution_time = {}",
            secs.saturating_mul(1000)
        ),
        ServerFlavor::Mariadb => format!("SET SESSION max_statement_time = {}", secs),
    };
    vec![
        format!("SET SESSION lock_wait_timeout = {}", secs),
        execution_limit,
    ]
}

fn parse_ssl_mode(mode: &str) -> Result<MySqlSslMode> {
    match mode.to_lowercase().as_str() {
        "disable" | "disabled" => Ok(MySqlSslMode::Disabled),
        "prefer" | "preferred" => Ok(MySqlSslMode::Preferred),
        "require" | "required" => Ok(MySqlSslMode::Required),
        "verify-ca" | "verify_ca" => Ok(MySqlSslMode::VerifyCa),
        "verify-full" | "verify_full" | "verify-identity" => Ok(MySqlSslMode::VerifyIdentity),
        other => Err(MigrateError::Config(format!(
            "invalid database.ssl_mode '{}': expected disable, prefer, require, \
             verify-ca or verify-full",
            other
        ))),
    }
}

/// `MAX(LENGTH(..))` is signed on MySQL and unsigned on some MariaDB
/// versions; accept either.
fn decode_length(row: &MySqlRow) -> Result<LengthMeasurement> {
    if let Ok(v) = row.try_get::<Option<i64>, _>(0) {
        return Ok(v.map(|n| n.max(0) as u64));
    }
    row.try_get::<Option<u64>, _>(0)
        .map_err(|e| MigrateError::query(e, "decoding maxsize"))
}

#[async_trait]
impl SqlSession for MysqlConnection {
    async fn execute(&self, sql: &str) -> Result<()> {
        debug!("mysql execute: {}", sql);
        sqlx::query(sql)
            .execute(&self.pool)
            .await
            .map_err(|e| MigrateError::query(e, sql))?;
        Ok(())
    }

    async fn query_max_length(&self, sql: &str) -> Result<LengthMeasurement> {
        debug!("mysql probe: {}", sql);
        let row = sqlx::query(sql)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| MigrateError::query(e, sql))?;

        match row {
            Some(row) => decode_length(&row),
            None => Ok(None),
        }
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| MigrateError::connection(e, "pinging MySQL"))?;
        Ok(())
    }

    fn db_type(&self) -> &str {
        "mysql"
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl CatalogReader for MysqlConnection {
    async fn read_catalog(&self) -> Result<SchemaCatalog> {
        // CAST to CHAR to avoid collation/binary-string differences between
        // MySQL and MariaDB information_schema definitions.
        let query = r#"
            SELECT
                CAST(c.TABLE_NAME AS CHAR(255)) AS TABLE_NAME,
                CAST(c.COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME,
                CAST(c.DATA_TYPE AS CHAR(255)) AS DATA_TYPE,
                CAST(IF(c.IS_NULLABLE = 'YES', 1, 0) AS SIGNED) AS is_nullable,
                CAST(c.COLUMN_DEFAULT AS CHAR(4000)) AS COLUMN_DEFAULT
            FROM INFORMATION_SCHEMA.COLUMNS c
            JOIN INFORMATION_SCHEMA.TABLES t
                ON t.TABLE_SCHEMA = c.TABLE_SCHEMA AND t.TABLE_NAME = c.TABLE_NAME
            WHERE c.TABLE_SCHEMA = DATABASE() AND t.TABLE_TYPE = 'BASE TABLE'
            ORDER BY c.TABLE_NAME, c.ORDINAL_POSITION
        "#;

        let rows: Vec<MySqlRow> = sqlx::query(query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MigrateError::query(e, "loading MySQL catalog"))?;

        let columns: Vec<ColumnDescriptor> = rows
            .iter()
            .map(|row| {
                let default: Option<String> = row.get("COLUMN_DEFAULT");
                ColumnDescriptor {
                    table: row.get("TABLE_NAME"),
                    column: row.get("COLUMN_NAME"),
                    col_type: ColumnType::classify(
                        &row.get::<String, _>("DATA_TYPE"),
                        &self.long_text_marker,
                    ),
                    nullable: row.get::<i64, _>("is_nullable") == 1,
                    default_value: normalize_default(default.as_deref()),
                }
            })
            .collect();

        debug!("Loaded {} MySQL columns", columns.len());
        Ok(SchemaCatalog::from_columns(columns))
    }
}
