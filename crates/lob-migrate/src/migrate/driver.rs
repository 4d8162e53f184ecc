//! Migration driver: walks every long-text column once, in catalog order.
//!
//! Per column: `Start -> Probed -> Decided -> {Migrated | SkippedTooLong |
//! SkippedOther | Failed}`. The terminal state is reported and the driver
//! moves on; one column's failure never aborts the run.
//!
//! Cancellation is checked between columns only. A column whose statements
//! have started always runs to completion or failure.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::outcome::{ColumnReport, ColumnResult, FailureStage, MigrationOutcome};
use super::policy::{decide, is_eligible, Decision, MIGRATION_THRESHOLD};
use crate::config::TableFilter;
use crate::core::identifier::validate_identifier;
use crate::core::schema::{BackendKind, ColumnDescriptor, LengthUnit};
use crate::core::traits::{CatalogReader, LobColumnBackend};
use crate::error::{
    MigrateError, Result, EXIT_CANCELLED, EXIT_INCONSISTENT_SCHEMA, EXIT_QUERY_ERROR,
};

/// What a run does with each long-text column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum RunMode {
    /// Print the measured length with a `can be migrated` label.
    List,
    /// Print the bare measured length; empty or zero-length columns only
    /// with `all`.
    CheckSize { all: bool },
    /// Convert eligible columns; `force` accepts truncation.
    Migrate { force: bool },
}

impl RunMode {
    /// Line printed ahead of the column lines. Names the length unit when
    /// lengths are counted in characters.
    pub fn heading(&self, kind: BackendKind) -> String {
        let unit = match kind.unit() {
            LengthUnit::Characters => " (in characters)",
            LengthUnit::Bytes => "",
        };
        match self {
            RunMode::List => format!("Retrieving CLOB/LONGTEXT lengths{}", unit),
            RunMode::CheckSize { all } => format!(
                "Retrieving CLOB/LONGTEXT lengths{}{}",
                unit,
                if *all { " of all columns" } else { "" }
            ),
            RunMode::Migrate { .. } => {
                format!("Converting CLOB/LONGTEXT cols to VARCHAR({})", MIGRATION_THRESHOLD)
            }
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::List => f.write_str("list"),
            RunMode::CheckSize { .. } => f.write_str("check-size"),
            RunMode::Migrate { force: true } => f.write_str("migrate (force)"),
            RunMode::Migrate { force: false } => f.write_str("migrate"),
        }
    }
}

/// Column counts for a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Long-text columns selected by the table filter.
    pub columns_total: usize,
    pub measured: usize,
    pub migrated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub inconsistent: usize,
}

/// Result of a driver run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique run identifier.
    pub run_id: String,

    /// Database type the run was against.
    pub backend: String,

    pub mode: RunMode,

    /// Final status: completed, failed, or cancelled.
    pub status: String,

    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_seconds: f64,

    pub summary: RunSummary,

    /// One record per reported column, in processing order.
    pub columns: Vec<ColumnReport>,
}

impl RunReport {
    pub fn cancelled(&self) -> bool {
        self.status == "cancelled"
    }

    /// Process exit code: inconsistent schema outranks failures, which
    /// outrank cancellation.
    pub fn exit_code(&self) -> u8 {
        if self.summary.inconsistent > 0 {
            EXIT_INCONSISTENT_SCHEMA
        } else if self.summary.failed > 0 {
            EXIT_QUERY_ERROR
        } else if self.cancelled() {
            EXIT_CANCELLED
        } else {
            0
        }
    }
}

/// Sequential column-by-column driver.
pub struct MigrationDriver {
    catalog: Arc<dyn CatalogReader>,
    backend: Arc<dyn LobColumnBackend>,
    filter: TableFilter,
    cancel: CancellationToken,
    threshold: u64,
}

impl MigrationDriver {
    pub fn new(catalog: Arc<dyn CatalogReader>, backend: Arc<dyn LobColumnBackend>) -> Self {
        Self {
            catalog,
            backend,
            filter: TableFilter::all(),
            cancel: CancellationToken::new(),
            threshold: MIGRATION_THRESHOLD,
        }
    }

    /// Restrict the run to matching tables.
    pub fn with_filter(mut self, filter: TableFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Stop starting new columns once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run over every selected long-text column.
    ///
    /// `on_column` is called with each report as soon as the column reaches
    /// its terminal state, so output can be streamed.
    ///
    /// # Errors
    ///
    /// Only reading the catalog can fail the run; per-column errors are
    /// reported as outcomes.
    pub async fn run<F>(&self, mode: RunMode, mut on_column: F) -> Result<RunReport>
    where
        F: FnMut(&ColumnReport) + Send,
    {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let kind = self.backend.kind();

        info!("Starting {} run {} ({:?} backend)", mode, run_id, kind);

        let catalog = self.catalog.read_catalog().await?;
        let columns: Vec<&ColumnDescriptor> = catalog
            .long_text_columns()
            .filter(|c| self.filter.matches(&c.table))
            .collect();

        info!("Found {} long-text columns", columns.len());

        let mut summary = RunSummary {
            columns_total: columns.len(),
            ..Default::default()
        };
        let mut reports = Vec::with_capacity(columns.len());
        let mut cancelled = false;

        for column in columns {
            if self.cancel.is_cancelled() {
                warn!("Cancellation requested, not starting {}", column.full_name());
                cancelled = true;
                break;
            }

            let Some(result) = self.process_column(column, mode, kind).await else {
                continue;
            };

            match &result {
                ColumnResult::Measured { .. } => summary.measured += 1,
                ColumnResult::Outcome(outcome) => match outcome {
                    MigrationOutcome::Migrated => summary.migrated += 1,
                    MigrationOutcome::SkippedTooLong { .. }
                    | MigrationOutcome::SkippedOther { .. } => summary.skipped += 1,
                    MigrationOutcome::Failed { .. } => {
                        summary.failed += 1;
                        if outcome.is_inconsistent() {
                            summary.inconsistent += 1;
                        }
                    }
                },
            }

            let report = ColumnReport {
                table: column.table.clone(),
                column: column.column.clone(),
                result,
            };
            on_column(&report);
            reports.push(report);
        }

        let completed_at = Utc::now();
        let duration = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;

        let status = if summary.failed > 0 {
            "failed"
        } else if cancelled {
            "cancelled"
        } else {
            "completed"
        };

        info!(
            "Run {}: {} columns, {} migrated, {} skipped, {} failed in {:.1}s",
            status,
            summary.columns_total,
            summary.migrated,
            summary.skipped,
            summary.failed,
            duration
        );
        if summary.inconsistent > 0 {
            error!(
                "{} column(s) left in an inconsistent state; manual intervention required",
                summary.inconsistent
            );
        }

        Ok(RunReport {
            run_id,
            backend: kind_name(kind).to_string(),
            mode,
            status: status.to_string(),
            started_at,
            completed_at,
            duration_seconds: duration,
            summary,
            columns: reports,
        })
    }

    /// Drive one column to its terminal state. `None` means the column is
    /// not reported in this mode.
    async fn process_column(
        &self,
        column: &ColumnDescriptor,
        mode: RunMode,
        kind: BackendKind,
    ) -> Option<ColumnResult> {
        let name = column.full_name();

        let valid =
            validate_identifier(&column.table).and_then(|_| validate_identifier(&column.column));
        if let Err(e) = valid {
            warn!("{}: skipped: {}", name, e);
            return Some(ColumnResult::Outcome(MigrationOutcome::SkippedOther {
                reason: "unsafe identifier".to_string(),
            }));
        }

        let measurement = match self.backend.probe_length(column).await {
            Ok(m) => m,
            Err(e) => {
                warn!("{}: could not measure data length: {}", name, e);
                return Some(ColumnResult::Outcome(MigrationOutcome::failed(
                    FailureStage::Probe,
                    e,
                    false,
                )));
            }
        };

        match mode {
            RunMode::List => Some(ColumnResult::Measured {
                length: measurement,
                eligible: Some(is_eligible(measurement, self.threshold)),
            }),
            RunMode::CheckSize { all } => {
                // Zero-length columns are hidden along with empty ones.
                if measurement.unwrap_or(0) == 0 && !all {
                    return None;
                }
                Some(ColumnResult::Measured {
                    length: measurement,
                    eligible: None,
                })
            }
            RunMode::Migrate { force } => {
                let outcome = match decide(measurement, self.threshold, force) {
                    Decision::SkipTooLong { measured } => {
                        info!(
                            "{}: {} {} exceeds {}, skipped",
                            name,
                            measured,
                            kind.unit(),
                            self.threshold
                        );
                        MigrationOutcome::SkippedTooLong { measured }
                    }
                    Decision::Migrate => {
                        if let Some(len) = measurement.filter(|l| *l > self.threshold) {
                            warn!(
                                "{}: forcing conversion, {} {} truncated to {}",
                                name,
                                len,
                                kind.unit(),
                                self.threshold
                            );
                        }
                        self.backend.migrate(column).await
                    }
                };

                if let MigrationOutcome::Failed {
                    stage,
                    inconsistent_state: true,
                    ..
                } = &outcome
                {
                    let err = MigrateError::InconsistentSchemaState {
                        table: column.table.clone(),
                        column: column.column.clone(),
                        stage: stage.to_string(),
                    };
                    error!("{}; manual intervention required", err);
                }
                Some(ColumnResult::Outcome(outcome))
            }
        }
    }
}

fn kind_name(kind: BackendKind) -> &'static str {
    match kind {
        BackendKind::ByteOriented => "mysql",
        BackendKind::CharacterOriented => "oracle",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::ColumnType;
    use crate::drivers::{MysqlColumnBackend, OracleColumnBackend};
    use crate::testing::SimulatedDatabase;

    fn mysql_driver(db: &Arc<SimulatedDatabase>) -> MigrationDriver {
        MigrationDriver::new(db.clone(), Arc::new(MysqlColumnBackend::new(db.clone())))
    }

    fn oracle_driver(db: &Arc<SimulatedDatabase>) -> MigrationDriver {
        MigrationDriver::new(db.clone(), Arc::new(OracleColumnBackend::new(db.clone())))
    }

    async fn run_lines(driver: &MigrationDriver, mode: RunMode) -> (RunReport, Vec<String>) {
        let mut lines = Vec::new();
        let report = driver
            .run(mode, |r| lines.push(r.to_string().trim_end().to_string()))
            .await
            .unwrap();
        (report, lines)
    }

    fn collapse(line: &str) -> String {
        line.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[tokio::test]
    async fn test_scenario_list_and_migrate_fitting_column() {
        let db = Arc::new(
            SimulatedDatabase::mysql()
                .with_column("T", "id", "int", false, Some(4))
                .with_column("T", "c", "longtext", false, Some(1200)),
        );
        let driver = mysql_driver(&db);

        let (_, lines) = run_lines(&driver, RunMode::List).await;
        assert_eq!(lines.len(), 1);
        assert_eq!(collapse(&lines[0]), "T.c: 1200 - can be migrated");

        let (report, lines) = run_lines(&driver, RunMode::Migrate { force: false }).await;
        assert_eq!(collapse(&lines[0]), "T.c: migrated");
        assert_eq!(report.summary.migrated, 1);
        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.status, "completed");

        let col = db.column("T", "c").unwrap();
        assert_eq!(col.native_type, "VARCHAR(4000)");
        assert!(!col.nullable);
    }

    #[tokio::test]
    async fn test_scenario_too_long_is_skipped_without_ddl() {
        let db = Arc::new(
            SimulatedDatabase::mysql().with_column("T", "c", "longtext", false, Some(5000)),
        );
        let driver = mysql_driver(&db);

        let (report, lines) = run_lines(&driver, RunMode::Migrate { force: false }).await;
        assert_eq!(
            collapse(&lines[0]),
            "T.c: NOT migrated: data too long (5000 chars)"
        );
        assert_eq!(report.summary.skipped, 1);
        assert_eq!(report.exit_code(), 0);

        // Only the probe ran.
        assert_eq!(db.executed(), vec!["SELECT MAX(LENGTH(c)) AS maxsize FROM T"]);
        assert_eq!(db.column("T", "c").unwrap().native_type, "longtext");
    }

    #[tokio::test]
    async fn test_force_migrates_long_column() {
        let db = Arc::new(
            SimulatedDatabase::mysql().with_column("T", "c", "longtext", true, Some(5000)),
        );
        let driver = mysql_driver(&db);

        let (report, _) = run_lines(&driver, RunMode::Migrate { force: true }).await;
        assert_eq!(report.summary.migrated, 1);
        assert_eq!(db.column("T", "c").unwrap().max_length, Some(MIGRATION_THRESHOLD));
    }

    #[tokio::test]
    async fn test_scenario_drop_original_failure_is_inconsistent() {
        let db = Arc::new(
            SimulatedDatabase::oracle()
                .with_column("T", "ID", "NUMBER", false, Some(2))
                .with_column("T", "C", "CLOB", true, Some(300)),
        );
        db.fail_on("ALTER TABLE T DROP COLUMN C");
        let driver = oracle_driver(&db);

        let (report, lines) = run_lines(&driver, RunMode::Migrate { force: false }).await;
        assert_eq!(
            collapse(&lines[0]),
            "T.C: NOT migrated: could not drop original col"
        );

        let outcome = report.columns[0].outcome().unwrap();
        assert!(matches!(
            outcome,
            MigrationOutcome::Failed {
                stage: FailureStage::DropOriginal,
                inconsistent_state: true,
                ..
            }
        ));
        assert_eq!(report.summary.inconsistent, 1);
        assert_eq!(report.exit_code(), EXIT_INCONSISTENT_SCHEMA);
        assert_eq!(db.columns("T"), vec!["ID", "C", "C_tmp"]);
    }

    #[tokio::test]
    async fn test_non_long_text_columns_are_never_touched() {
        let db = Arc::new(
            SimulatedDatabase::mysql()
                .with_column("T", "id", "int", false, Some(4))
                .with_column("T", "title", "varchar", true, Some(100))
                .with_column("U", "body", "mediumtext", true, Some(50)),
        );
        let driver = mysql_driver(&db);

        let (report, lines) = run_lines(&driver, RunMode::Migrate { force: true }).await;
        assert!(lines.is_empty());
        assert_eq!(report.summary.columns_total, 0);
        assert!(db.executed().is_empty());
    }

    #[tokio::test]
    async fn test_second_migrate_run_does_nothing() {
        let db = Arc::new(
            SimulatedDatabase::oracle()
                .with_column("A", "BODY", "CLOB", false, Some(10))
                .with_column("B", "NOTE", "CLOB", true, None),
        );
        let driver = oracle_driver(&db);

        let (first, _) = run_lines(&driver, RunMode::Migrate { force: false }).await;
        assert_eq!(first.summary.migrated, 2);

        db.clear_executed();
        let (second, lines) = run_lines(&driver, RunMode::Migrate { force: false }).await;
        assert_eq!(second.summary.columns_total, 0);
        assert!(lines.is_empty());
        assert!(db.executed().is_empty());
    }

    #[tokio::test]
    async fn test_failure_does_not_abort_run() {
        let db = Arc::new(
            SimulatedDatabase::mysql()
                .with_column("A", "x", "longtext", true, Some(10))
                .with_column("B", "y", "longtext", true, Some(10)),
        );
        db.fail_on("ALTER TABLE A MODIFY x VARCHAR(4000)");
        let driver = mysql_driver(&db);

        let (report, lines) = run_lines(&driver, RunMode::Migrate { force: false }).await;
        assert_eq!(lines.len(), 2);
        assert_eq!(collapse(&lines[0]), "A.x: NOT migrated: could not alter col");
        assert_eq!(collapse(&lines[1]), "B.y: migrated");
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.status, "failed");
        assert_eq!(report.exit_code(), EXIT_QUERY_ERROR);
    }

    #[tokio::test]
    async fn test_probe_failure_is_reported() {
        let db = Arc::new(
            SimulatedDatabase::mysql().with_column("T", "c", "longtext", true, Some(10)),
        );
        db.fail_on("SELECT MAX(LENGTH(c)) AS maxsize FROM T");
        let driver = mysql_driver(&db);

        let (report, lines) = run_lines(&driver, RunMode::Migrate { force: false }).await;
        assert_eq!(
            collapse(&lines[0]),
            "T.c: NOT migrated: could not measure data length"
        );
        assert_eq!(report.summary.failed, 1);
        assert_eq!(db.column("T", "c").unwrap().native_type, "longtext");
    }

    #[tokio::test]
    async fn test_unsafe_identifier_is_skipped() {
        let db = Arc::new(SimulatedDatabase::mysql().with_column(
            "T",
            "bad-name",
            "longtext",
            true,
            Some(10),
        ));
        let driver = mysql_driver(&db);

        let (report, lines) = run_lines(&driver, RunMode::Migrate { force: false }).await;
        assert_eq!(collapse(&lines[0]), "T.bad-name: NOT migrated: unsafe identifier");
        assert_eq!(report.summary.skipped, 1);
        assert!(db.executed().is_empty());
    }

    #[tokio::test]
    async fn test_list_labels_long_and_empty_columns() {
        let db = Arc::new(
            SimulatedDatabase::oracle()
                .with_column("T", "BIG", "CLOB", true, Some(4001))
                .with_column("T", "EMPTY", "CLOB", true, None),
        );
        let driver = oracle_driver(&db);

        let (report, lines) = run_lines(&driver, RunMode::List).await;
        assert_eq!(collapse(&lines[0]), "T.BIG: 4001 - can NOT be migrated");
        assert_eq!(collapse(&lines[1]), "T.EMPTY: - can be migrated");
        assert_eq!(report.summary.measured, 2);
        // List mode is read-only.
        assert!(db.executed().iter().all(|s| s.starts_with("SELECT")));
    }

    #[tokio::test]
    async fn test_check_size_hides_empty_columns_unless_all() {
        let db = Arc::new(
            SimulatedDatabase::oracle()
                .with_column("T", "FULL", "CLOB", true, Some(17))
                .with_column("T", "EMPTY", "CLOB", true, None),
        );
        let driver = oracle_driver(&db);

        let (_, lines) = run_lines(&driver, RunMode::CheckSize { all: false }).await;
        assert_eq!(lines.len(), 1);
        assert_eq!(collapse(&lines[0]), "T.FULL: 17");

        let (_, lines) = run_lines(&driver, RunMode::CheckSize { all: true }).await;
        assert_eq!(lines.len(), 2);
        assert_eq!(collapse(&lines[1]), "T.EMPTY:");
    }

    #[tokio::test]
    async fn test_check_size_hides_zero_length_columns_unless_all() {
        let db = Arc::new(
            SimulatedDatabase::mysql()
                .with_column("T", "blank", "longtext", true, Some(0))
                .with_column("T", "full", "longtext", true, Some(17)),
        );
        let driver = mysql_driver(&db);

        let (report, lines) = run_lines(&driver, RunMode::CheckSize { all: false }).await;
        assert_eq!(lines.len(), 1);
        assert_eq!(collapse(&lines[0]), "T.full: 17");
        assert_eq!(report.summary.measured, 1);

        let (_, lines) = run_lines(&driver, RunMode::CheckSize { all: true }).await;
        assert_eq!(lines.len(), 2);
        assert_eq!(collapse(&lines[0]), "T.blank: 0");
    }

    #[test]
    fn test_heading_names_character_unit() {
        let oracle = BackendKind::CharacterOriented;
        let mysql = BackendKind::ByteOriented;

        assert_eq!(
            RunMode::List.heading(oracle),
            "Retrieving CLOB/LONGTEXT lengths (in characters)"
        );
        assert_eq!(
            RunMode::CheckSize { all: true }.heading(oracle),
            "Retrieving CLOB/LONGTEXT lengths (in characters) of all columns"
        );
        assert_eq!(RunMode::List.heading(mysql), "Retrieving CLOB/LONGTEXT lengths");
        assert_eq!(
            RunMode::CheckSize { all: false }.heading(mysql),
            "Retrieving CLOB/LONGTEXT lengths"
        );
        assert_eq!(
            RunMode::Migrate { force: false }.heading(oracle),
            "Converting CLOB/LONGTEXT cols to VARCHAR(4000)"
        );
    }

    #[tokio::test]
    async fn test_table_filter_limits_columns() {
        let db = Arc::new(
            SimulatedDatabase::mysql()
                .with_column("ezsearch_word", "w", "longtext", true, Some(10))
                .with_column("ezcontent", "c", "longtext", true, Some(10)),
        );
        let filter = TableFilter::new(&[], &["ezsearch_*".to_string()]).unwrap();
        let driver = mysql_driver(&db).with_filter(filter);

        let (report, _) = run_lines(&driver, RunMode::Migrate { force: false }).await;
        assert_eq!(report.summary.columns_total, 1);
        assert_eq!(report.columns[0].table, "ezcontent");
        assert_eq!(db.column("ezsearch_word", "w").unwrap().native_type, "longtext");
    }

    #[tokio::test]
    async fn test_cancelled_before_start_touches_nothing() {
        let db = Arc::new(
            SimulatedDatabase::mysql().with_column("T", "c", "longtext", true, Some(10)),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();
        let driver = mysql_driver(&db).with_cancellation(cancel);

        let (report, lines) = run_lines(&driver, RunMode::Migrate { force: false }).await;
        assert!(lines.is_empty());
        assert!(report.cancelled());
        assert_eq!(report.exit_code(), EXIT_CANCELLED);
        assert!(db.executed().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_between_columns_finishes_current_column() {
        let db = Arc::new(
            SimulatedDatabase::oracle()
                .with_column("A", "X", "CLOB", true, Some(10))
                .with_column("B", "Y", "CLOB", true, Some(10)),
        );
        let cancel = CancellationToken::new();
        let driver = oracle_driver(&db).with_cancellation(cancel.clone());

        let report = driver
            .run(RunMode::Migrate { force: false }, |_| cancel.cancel())
            .await
            .unwrap();

        assert_eq!(report.columns.len(), 1);
        assert_eq!(report.summary.migrated, 1);
        assert!(report.cancelled());
        assert_eq!(db.column("A", "X").unwrap().native_type, "VARCHAR2(4000)");
        assert_eq!(db.column("B", "Y").unwrap().native_type, "CLOB");
    }

    #[tokio::test]
    async fn test_report_serializes() {
        let db = Arc::new(
            SimulatedDatabase::mysql().with_column("T", "c", "longtext", true, Some(10)),
        );
        let (report, _) = run_lines(&mysql_driver(&db), RunMode::Migrate { force: false }).await;

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["backend"], "mysql");
        assert_eq!(json["mode"]["mode"], "migrate");
        assert_eq!(json["columns"][0]["result"]["kind"], "outcome");
        assert_eq!(json["columns"][0]["result"]["status"], "migrated");
        assert!(uuid::Uuid::parse_str(report.run_id.as_str()).is_ok());
    }

    #[test]
    fn test_descriptor_classification_is_case_insensitive() {
        assert!(ColumnType::classify("LONGTEXT", "longtext").is_long_text());
        assert!(!ColumnType::classify("mediumtext", "longtext").is_long_text());
    }
}
