//! Error types for the LOB migration library.

use thiserror::Error;

/// Exit code for configuration errors (invalid YAML, missing fields, etc.)
pub const EXIT_CONFIG_ERROR: u8 = 1;
/// Exit code when the database cannot be reached.
pub const EXIT_CONNECTION_ERROR: u8 = 2;
/// Exit code for failed queries, and for runs where a column failed to migrate.
pub const EXIT_QUERY_ERROR: u8 = 3;
/// Exit code when a column was left with an orphaned or missing column.
pub const EXIT_INCONSISTENT_SCHEMA: u8 = 4;
/// Exit code for a database type the engine cannot drive.
pub const EXIT_UNSUPPORTED_BACKEND: u8 = 5;
/// Exit code when the run was interrupted between columns.
pub const EXIT_CANCELLED: u8 = 6;
/// Exit code for file system errors.
pub const EXIT_IO_ERROR: u8 = 7;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection could not be established or was lost
    #[error("Connection error: {message}\n  Context: {context}")]
    Connection { message: String, context: String },

    /// A probe or DDL statement could not execute
    #[error("Query failed ({context}): {message}")]
    Query { context: String, message: String },

    /// Table or column name outside the safe identifier charset
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Database type not recognized by the executor
    #[error("Unsupported database type: '{0}'. Supported types: mysql, mariadb, oracle")]
    UnsupportedBackend(String),

    /// A compensating action failed, leaving extra or missing columns behind
    #[error("{table}.{column} left in inconsistent state after stage '{stage}'")]
    InconsistentSchemaState {
        table: String,
        column: String,
        stage: String,
    },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Run was cancelled (SIGINT, etc.)
    #[error("Migration cancelled")]
    Cancelled,
}

impl MigrateError {
    /// Create a Connection error with context about where it occurred
    pub fn connection(message: impl ToString, context: impl Into<String>) -> Self {
        MigrateError::Connection {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a Query error with context about which statement failed
    pub fn query(message: impl ToString, context: impl Into<String>) -> Self {
        MigrateError::Query {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Process exit code for this error category.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_)
            | MigrateError::InvalidIdentifier(_)
            | MigrateError::Yaml(_)
            | MigrateError::Json(_) => EXIT_CONFIG_ERROR,
            MigrateError::Connection { .. } => EXIT_CONNECTION_ERROR,
            MigrateError::Query { .. } => EXIT_QUERY_ERROR,
            MigrateError::InconsistentSchemaState { .. } => EXIT_INCONSISTENT_SCHEMA,
            MigrateError::UnsupportedBackend(_) => EXIT_UNSUPPORTED_BACKEND,
            MigrateError::Cancelled => EXIT_CANCELLED,
            MigrateError::Io(_) => EXIT_IO_ERROR,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

impl From<sqlx::Error> for MigrateError {
    fn from(err: sqlx::Error) -> Self {
        MigrateError::query(err, "mysql")
    }
}

impl From<oracle::Error> for MigrateError {
    fn from(err: oracle::Error) -> Self {
        MigrateError::query(err, "oracle")
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
