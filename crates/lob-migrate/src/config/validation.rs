//! Configuration validation.

use super::{Config, TableFilter};
use crate::core::schema::BackendKind;
use crate::error::{MigrateError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    let kind = config.backend_kind()?;
    let db = &config.database;

    if db.user.is_empty() {
        return Err(MigrateError::Config("database.user is required".into()));
    }

    let has_connect_string = db.connect_string.as_deref().is_some_and(|s| !s.is_empty());
    match kind {
        BackendKind::ByteOriented => {
            if db.host.is_empty() {
                return Err(MigrateError::Config("database.host is required".into()));
            }
            if db.database.is_empty() {
                return Err(MigrateError::Config("database.database is required".into()));
            }
            if has_connect_string {
                return Err(MigrateError::Config(
                    "database.connect_string is only supported for oracle".into(),
                ));
            }
        }
        BackendKind::CharacterOriented => {
            if !has_connect_string && (db.host.is_empty() || db.database.is_empty()) {
                return Err(MigrateError::Config(
                    "database.host and database.database (service name) are required \
                     unless database.connect_string is set"
                        .into(),
                ));
            }
        }
    }

    if let Some(0) = db.port {
        return Err(MigrateError::Config("database.port must be non-zero".into()));
    }

    if let Some(0) = config.migration.statement_timeout_secs {
        return Err(MigrateError::Config(
            "migration.statement_timeout_secs must be at least 1".into(),
        ));
    }

    TableFilter::new(
        &config.migration.include_tables,
        &config.migration.exclude_tables,
    )?;

    Ok(())
}
