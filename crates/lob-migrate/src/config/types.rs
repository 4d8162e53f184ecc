//! Configuration type definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::schema::BackendKind;
use crate::error::Result;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database to inspect and convert.
    pub database: DatabaseConfig,

    /// Migration behavior configuration.
    #[serde(default)]
    pub migration: MigrationConfig,
}

impl Config {
    /// Backend kind for the configured database type.
    ///
    /// Resolved once per run and passed by value from there on.
    pub fn backend_kind(&self) -> Result<BackendKind> {
        BackendKind::from_db_type(&self.database.r#type)
    }
}

/// Database connection configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database type: "mysql", "mariadb", or "oracle".
    pub r#type: String,

    /// Database host.
    #[serde(default)]
    pub host: String,

    /// Database port (default: 3306 for MySQL, 1521 for Oracle).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// MySQL schema name, or Oracle service name.
    #[serde(default)]
    pub database: String,

    /// Username.
    pub user: String,

    /// Password (never serialized).
    #[serde(default, skip_serializing)]
    pub password: String,

    /// Oracle connect string overriding host/port/database
    /// (EZConnect, or a TNS alias).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_string: Option<String>,

    /// MySQL TLS mode: disable, prefer, require, verify-ca, verify-full
    /// (default: "prefer").
    #[serde(default = "default_prefer")]
    pub ssl_mode: String,
}

impl DatabaseConfig {
    /// Configured port, or the default for the database type.
    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or_else(|| match self.r#type.to_lowercase().as_str() {
            "oracle" | "oci" => 1521,
            _ => 3306,
        })
    }

    /// Oracle connect string: the explicit override, or
    /// `//host:port/service` EZConnect syntax.
    pub fn oracle_connect_string(&self) -> String {
        match &self.connect_string {
            Some(cs) if !cs.is_empty() => cs.clone(),
            _ => format!("//{}:{}/{}", self.host, self.port_or_default(), self.database),
        }
    }
}

// Custom Debug implementation to redact password
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("type", &self.r#type)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("connect_string", &self.connect_string)
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

/// Migration behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MigrationConfig {
    /// Tables to include (glob patterns). Empty means all tables.
    #[serde(default)]
    pub include_tables: Vec<String>,

    /// Tables to exclude (glob patterns).
    #[serde(default)]
    pub exclude_tables: Vec<String>,

    /// Convert columns even when their data exceeds the threshold
    /// (data is truncated).
    #[serde(default)]
    pub force: bool,

    /// Server-side statement/lock timeout in seconds. Unset means the
    /// server default (usually unbounded).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement_timeout_secs: Option<u64>,
}

fn default_prefer() -> String {
    "prefer".to_string()
}
