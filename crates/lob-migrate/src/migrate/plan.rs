//! Checkpointed DDL plans and the runner that executes them.
//!
//! A conversion is an ordered list of independent statements. Backends
//! without transactional DDL can fail between any two of them, so each step
//! declares up front what happens if *it* fails:
//!
//! | on failure          | action                       | inconsistent?                 |
//! |---------------------|------------------------------|-------------------------------|
//! | `NothingToUndo`     | none                         | no                            |
//! | `DropTemp`          | drop the temporary column    | only if the drop also fails   |
//! | `Abandon`           | none (would destroy data)    | yes                           |
//!
//! The runner stops at the first failing step; later steps are never issued.

use tracing::{debug, error, info, warn};

use super::outcome::{FailureStage, MigrationOutcome};
use crate::core::schema::ColumnDescriptor;
use crate::core::traits::SqlSession;

/// Declared response to a step failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OnFailure {
    /// The schema has not been touched yet.
    NothingToUndo,
    /// Run this statement to remove the temporary column.
    DropTemp(String),
    /// The original column may already be gone; leave everything as is.
    Abandon,
}

/// One checkpoint of a conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanStep {
    pub stage: FailureStage,
    pub sql: String,
    pub on_failure: OnFailure,
}

impl PlanStep {
    pub fn new(stage: FailureStage, sql: impl Into<String>, on_failure: OnFailure) -> Self {
        Self {
            stage,
            sql: sql.into(),
            on_failure,
        }
    }
}

/// Ordered statements converting one column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionPlan {
    pub steps: Vec<PlanStep>,
}

impl ConversionPlan {
    pub fn new(steps: Vec<PlanStep>) -> Self {
        Self { steps }
    }

    /// SQL statements in execution order.
    pub fn statements(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.sql.as_str()).collect()
    }

    /// Execute the plan, one statement at a time.
    ///
    /// Returns `Migrated` only when every step succeeded.
    pub async fn run(
        &self,
        session: &dyn SqlSession,
        column: &ColumnDescriptor,
    ) -> MigrationOutcome {
        let name = column.full_name();

        for step in &self.steps {
            debug!("{}: [{}] {}", name, step.stage, step.sql);

            let err = match session.execute(&step.sql).await {
                Ok(()) => continue,
                Err(e) => e,
            };

            warn!("{}: stage '{}' failed: {}", name, step.stage, err);

            let inconsistent = match &step.on_failure {
                OnFailure::NothingToUndo => false,
                OnFailure::DropTemp(drop_sql) => {
                    info!("{}: dropping temp column after failed '{}'", name, step.stage);
                    match session.execute(drop_sql).await {
                        Ok(()) => false,
                        Err(drop_err) => {
                            error!(
                                "{} left in inconsistent state: \
                                 temp column could not be dropped: {}",
                                name, drop_err
                            );
                            true
                        }
                    }
                }
                OnFailure::Abandon => {
                    error!(
                        "{} left in inconsistent state after '{}': manual intervention required",
                        name, step.stage
                    );
                    true
                }
            };

            return MigrationOutcome::failed(step.stage, err, inconsistent);
        }

        MigrationOutcome::Migrated
    }
}
