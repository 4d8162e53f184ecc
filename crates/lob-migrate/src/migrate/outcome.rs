//! Per-column results and the report lines rendered from them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::schema::LengthMeasurement;

/// Width the `table.column:` prefix is padded to in report lines.
pub const REPORT_NAME_WIDTH: usize = 62;

/// Checkpoint at which a column migration failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureStage {
    /// Measuring the stored data length.
    Probe,
    /// Single-statement `MODIFY` (byte-oriented backends).
    Alter,
    CreateTemp,
    CopyData,
    EnforceNotNull,
    DropOriginal,
    RenameTemp,
}

impl FailureStage {
    /// Stable stage name used in logs and JSON reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStage::Probe => "probe",
            FailureStage::Alter => "alter",
            FailureStage::CreateTemp => "create-temp",
            FailureStage::CopyData => "copy-data",
            FailureStage::EnforceNotNull => "enforce-not-null",
            FailureStage::DropOriginal => "drop-original",
            FailureStage::RenameTemp => "rename-temp",
        }
    }

    /// Operator-facing reason shown after `NOT migrated:`.
    pub fn reason(&self) -> &'static str {
        match self {
            FailureStage::Probe => "could not measure data length",
            FailureStage::Alter => "could not alter col",
            FailureStage::CreateTemp => "could not create temp col",
            FailureStage::CopyData => "could not copy data into temp col",
            FailureStage::EnforceNotNull => "could not enforce NOT NULL",
            FailureStage::DropOriginal => "could not drop original col",
            FailureStage::RenameTemp => "could not rename temp col",
        }
    }
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal state of one column in a migrate run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MigrationOutcome {
    Migrated,
    SkippedTooLong {
        measured: u64,
    },
    SkippedOther {
        reason: String,
    },
    Failed {
        stage: FailureStage,
        message: String,
        inconsistent_state: bool,
    },
}

impl MigrationOutcome {
    pub fn failed(stage: FailureStage, message: impl ToString, inconsistent_state: bool) -> Self {
        MigrationOutcome::Failed {
            stage,
            message: message.to_string(),
            inconsistent_state,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, MigrationOutcome::Failed { .. })
    }

    /// True when the schema needs manual operator attention.
    pub fn is_inconsistent(&self) -> bool {
        matches!(
            self,
            MigrationOutcome::Failed {
                inconsistent_state: true,
                ..
            }
        )
    }

    /// Text printed after the padded `table.column:` prefix.
    pub fn summary(&self) -> String {
        match self {
            MigrationOutcome::Migrated => "migrated".to_string(),
            MigrationOutcome::SkippedTooLong { measured } => {
                format!("NOT migrated: data too long ({} chars)", measured)
            }
            MigrationOutcome::SkippedOther { reason } => format!("NOT migrated: {}", reason),
            MigrationOutcome::Failed { stage, .. } => format!("NOT migrated: {}", stage.reason()),
        }
    }
}

/// What was reported for a column: a migrate outcome, or a list-mode
/// measurement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnResult {
    /// List modes: measured length, with the eligibility label when annotated.
    Measured {
        length: LengthMeasurement,
        eligible: Option<bool>,
    },
    /// Migrate mode.
    Outcome(MigrationOutcome),
}

/// One report record: table/column identity plus result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnReport {
    pub table: String,
    pub column: String,
    pub result: ColumnResult,
}

impl ColumnReport {
    pub fn outcome(&self) -> Option<&MigrationOutcome> {
        match &self.result {
            ColumnResult::Outcome(o) => Some(o),
            ColumnResult::Measured { .. } => None,
        }
    }
}

impl fmt::Display for ColumnReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = format!("{}.{}:", self.table, self.column);
        let text = match &self.result {
            ColumnResult::Outcome(outcome) => outcome.summary(),
            ColumnResult::Measured { length, eligible } => {
                let len = length.map(|l| l.to_string()).unwrap_or_default();
                match eligible {
                    Some(true) => format!("{} - can be migrated", len),
                    Some(false) => format!("{} - can NOT be migrated", len),
                    None => len,
                }
            }
        };
        write!(f, "{:<width$}{}", name, text, width = REPORT_NAME_WIDTH)
    }
}
