//! LONGTEXT -> VARCHAR(4000) conversion for MySQL/MariaDB.
//!
//! MySQL changes a column type with one `ALTER TABLE ... MODIFY`, which
//! either applies fully or not at all, so the plan has a single step and
//! nothing to compensate.

use std::sync::Arc;

use async_trait::async_trait;

use super::dialect::MysqlDialect;
use crate::core::identifier::Identifier;
use crate::core::schema::{BackendKind, ColumnDescriptor, LengthMeasurement};
use crate::core::traits::{LobColumnBackend, SqlSession};
use crate::error::Result;
use crate::migrate::outcome::{FailureStage, MigrationOutcome};
use crate::migrate::plan::{ConversionPlan, OnFailure, PlanStep};
use crate::migrate::probe;

/// Column backend for byte-oriented MySQL/MariaDB servers.
pub struct MysqlColumnBackend {
    session: Arc<dyn SqlSession>,
    dialect: MysqlDialect,
}

impl MysqlColumnBackend {
    pub fn new(session: Arc<dyn SqlSession>) -> Self {
        Self {
            session,
            dialect: MysqlDialect::new(),
        }
    }

    /// Build the single-statement conversion plan for `column`.
    pub fn plan(&self, column: &ColumnDescriptor) -> Result<ConversionPlan> {
        let table = Identifier::new(&column.table)?;
        let col = Identifier::new(&column.column)?;

        Ok(ConversionPlan::new(vec![PlanStep::new(
            FailureStage::Alter,
            self.dialect.build_modify_column(&table, &col, column),
            OnFailure::NothingToUndo,
        )]))
    }
}

#[async_trait]
impl LobColumnBackend for MysqlColumnBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::ByteOriented
    }

    async fn probe_length(&self, column: &ColumnDescriptor) -> Result<LengthMeasurement> {
        probe::probe_length(self.session.as_ref(), &self.dialect, column).await
    }

    async fn migrate(&self, column: &ColumnDescriptor) -> MigrationOutcome {
        match self.plan(column) {
            Ok(plan) => plan.run(self.session.as_ref(), column).await,
            Err(e) => MigrationOutcome::failed(FailureStage::Alter, e, false),
        }
    }
}
