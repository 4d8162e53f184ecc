//! The migration engine: probing, policy, per-backend plans, and the driver
//! that runs them column by column.

pub mod driver;
pub mod outcome;
pub mod plan;
pub mod policy;
pub mod probe;

pub use driver::{MigrationDriver, RunMode, RunReport, RunSummary};
pub use outcome::{ColumnReport, ColumnResult, FailureStage, MigrationOutcome};
pub use plan::{ConversionPlan, OnFailure, PlanStep};
pub use policy::{decide, is_eligible, Decision, MIGRATION_THRESHOLD};
