//! CLOB -> VARCHAR2(4000) conversion for Oracle.
//!
//! Oracle has no in-place type change for LOB columns, so the conversion is
//! five independent DDL/DML statements:
//!
//! 1. add a `VARCHAR2(4000)` temp column (with the original default)
//! 2. copy the first 4000 characters of the CLOB into it
//! 3. add `NOT NULL` to the temp column, if the original had it
//! 4. drop the original column
//! 5. rename the temp column to the original name
//!
//! Steps 2 and 3 undo themselves by dropping the temp column. Once step 4
//! has been attempted the temp column holds the only guaranteed copy of the
//! data, so failures from there on are reported as inconsistent and left
//! alone.

use std::sync::Arc;

use async_trait::async_trait;

use super::dialect::OracleDialect;
use crate::core::identifier::Identifier;
use crate::core::schema::{BackendKind, ColumnDescriptor, LengthMeasurement};
use crate::core::traits::{LobColumnBackend, SqlSession};
use crate::error::Result;
use crate::migrate::outcome::{FailureStage, MigrationOutcome};
use crate::migrate::plan::{ConversionPlan, OnFailure, PlanStep};
use crate::migrate::policy::MIGRATION_THRESHOLD;
use crate::migrate::probe;

/// Column backend for character-oriented Oracle servers.
pub struct OracleColumnBackend {
    session: Arc<dyn SqlSession>,
    dialect: OracleDialect,
}

impl OracleColumnBackend {
    pub fn new(session: Arc<dyn SqlSession>) -> Self {
        Self {
            session,
            dialect: OracleDialect::new(),
        }
    }

    /// Build the checkpointed conversion plan for `column`.
    pub fn plan(&self, column: &ColumnDescriptor) -> Result<ConversionPlan> {
        let d = &self.dialect;
        let table = Identifier::new(&column.table)?;
        let original = Identifier::new(&column.column)?;
        let temp = d.temp_column(&original)?;
        let drop_temp = d.build_drop_column(&table, &temp);

        let mut steps = vec![
            PlanStep::new(
                FailureStage::CreateTemp,
                d.build_add_column(
                    &table,
                    &temp,
                    MIGRATION_THRESHOLD,
                    column.default_value.as_deref(),
                ),
                OnFailure::NothingToUndo,
            ),
            PlanStep::new(
                FailureStage::CopyData,
                d.build_copy_lob_prefix(&table, &temp, &original, MIGRATION_THRESHOLD),
                OnFailure::DropTemp(drop_temp.clone()),
            ),
        ];

        // After the copy, or existing rows would violate the constraint.
        if !column.nullable {
            steps.push(PlanStep::new(
                FailureStage::EnforceNotNull,
                d.build_set_not_null(&table, &temp),
                OnFailure::DropTemp(drop_temp),
            ));
        }

        steps.push(PlanStep::new(
            FailureStage::DropOriginal,
            d.build_drop_column(&table, &original),
            OnFailure::Abandon,
        ));
        steps.push(PlanStep::new(
            FailureStage::RenameTemp,
            d.build_rename_column(&table, &temp, &original),
            OnFailure::Abandon,
        ));

        Ok(ConversionPlan::new(steps))
    }
}

#[async_trait]
impl LobColumnBackend for OracleColumnBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::CharacterOriented
    }

    async fn probe_length(&self, column: &ColumnDescriptor) -> Result<LengthMeasurement> {
        probe::probe_length(self.session.as_ref(), &self.dialect, column).await
    }

    async fn migrate(&self, column: &ColumnDescriptor) -> MigrationOutcome {
        match self.plan(column) {
            Ok(plan) => plan.run(self.session.as_ref(), column).await,
            Err(e) => MigrationOutcome::failed(FailureStage::CreateTemp, e, false),
        }
    }
}
