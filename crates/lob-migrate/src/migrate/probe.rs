//! Length prober: maximum stored data length of a column.

use tracing::debug;

use crate::core::identifier::Identifier;
use crate::core::schema::{ColumnDescriptor, LengthMeasurement};
use crate::core::traits::{Dialect, SqlSession};
use crate::error::Result;

/// Measure the longest value stored in `column`, in the dialect's unit.
///
/// An empty table (or one holding only NULLs) yields `Ok(None)`; it is not
/// a probing failure.
///
/// # Errors
///
/// `InvalidIdentifier` if the table or column name is outside the safe
/// charset, `Query` if the statement cannot execute.
pub async fn probe_length(
    session: &dyn SqlSession,
    dialect: &dyn Dialect,
    column: &ColumnDescriptor,
) -> Result<LengthMeasurement> {
    let table = Identifier::new(&column.table)?;
    let col = Identifier::new(&column.column)?;

    let sql = dialect.build_max_length_query(&table, &col);
    let measurement = session.query_max_length(&sql).await?;

    debug!(
        "{}: max length {:?} {}",
        column.full_name(),
        measurement,
        dialect.kind().unit()
    );
    Ok(measurement)
}
