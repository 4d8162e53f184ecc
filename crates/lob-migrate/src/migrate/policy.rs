//! Migratability policy: whether a measured column fits `VARCHAR(4000)`.
//!
//! The threshold is compared against the raw measurement whatever its unit.
//! On byte-oriented backends that is a byte count; on character-oriented
//! backends a character count, and 4000 multi-byte characters will not
//! necessarily fit a `VARCHAR2(4000 BYTE)` column. The comparison is kept
//! unit-blind on purpose until a unit conversion is agreed on; executors
//! still surface the resulting statement failure as a normal `Failed`.

use serde::{Deserialize, Serialize};

use crate::core::schema::LengthMeasurement;

/// Width of the replacement `VARCHAR` column, and the migratability limit.
pub const MIGRATION_THRESHOLD: u64 = 4000;

/// Policy verdict for one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// Data fits (or `force` accepted truncation): run the executor.
    Migrate,
    /// Data exceeds the threshold and `force` was not given.
    SkipTooLong { measured: u64 },
}

/// Decide whether a column may be migrated.
///
/// - no data, or data within `threshold` => `Migrate`
/// - longer than `threshold` without `force` => `SkipTooLong`
/// - longer than `threshold` with `force` => `Migrate`
pub fn decide(measurement: LengthMeasurement, threshold: u64, force: bool) -> Decision {
    match measurement {
        Some(measured) if measured > threshold && !force => Decision::SkipTooLong { measured },
        _ => Decision::Migrate,
    }
}

/// Eligibility label for list mode: would this column migrate without `force`?
pub fn is_eligible(measurement: LengthMeasurement, threshold: u64) -> bool {
    decide(measurement, threshold, false) == Decision::Migrate
}
