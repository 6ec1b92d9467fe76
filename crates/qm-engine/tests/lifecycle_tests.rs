//! End-to-end migration lifecycle tests against in-memory DuckDB

use qm_core::{Direction, MigrationState};
use qm_db::dialect::DuckDbDialect;
use qm_db::{Connection, DuckDbConnection};
use qm_engine::{ledger, MemoryErrorLogger, Migrator, RunContext};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

struct Project {
    _dir: TempDir,
    root: PathBuf,
    conn: Arc<DuckDbConnection>,
    logger: Arc<MemoryErrorLogger>,
}

impl Project {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("migrations");
        fs::create_dir_all(&root).unwrap();
        Self {
            _dir: dir,
            root,
            conn: Arc::new(DuckDbConnection::in_memory().unwrap()),
            logger: Arc::new(MemoryErrorLogger::new()),
        }
    }

    fn add(&self, name: &str, up: &str, down: &str) {
        fs::write(
            self.root.join(format!("{name}.sql")),
            format!("-- UP\n{up}\n-- DOWN\n{down}\n"),
        )
        .unwrap();
    }

    fn remove(&self, name: &str) {
        fs::remove_file(self.root.join(format!("{name}.sql"))).unwrap();
    }

    fn migrator(&self) -> Migrator {
        Migrator::new(self.conn.clone(), Arc::new(DuckDbDialect))
            .unwrap()
            .with_error_logger(self.logger.clone())
    }

    fn roots(&self) -> Vec<PathBuf> {
        vec![self.root.clone()]
    }

    fn ctx(&self) -> RunContext {
        RunContext::new("_migrations", Arc::new(DuckDbDialect))
    }

    async fn scalar(&self, sql: &str) -> String {
        self.conn
            .run_sql(sql)
            .await
            .unwrap()
            .first_value()
            .unwrap()
            .to_string()
    }
}

fn steps(report: &qm_engine::RunReport) -> Vec<String> {
    report
        .steps
        .iter()
        .map(|s| format!("{} {}", s.direction, s.name))
        .collect()
}

#[tokio::test]
async fn test_create_add_column_then_remove_scenario() {
    let project = Project::new();
    project.add("0001_create_table", "CREATE TABLE t (id INTEGER);", "DROP TABLE t;");
    project.add(
        "0002_add_col",
        "ALTER TABLE t ADD c INT;",
        "ALTER TABLE t DROP COLUMN c;",
    );

    // Run 1: both applied in order
    let run1 = project.migrator().install(&project.roots()).await.unwrap();
    assert_eq!(steps(&run1), vec!["up 0001_create_table", "up 0002_add_col"]);
    assert!(run1.is_success());
    let by_name = ledger::list_all(&project.ctx(), project.conn.as_ref()).await.unwrap();
    assert_eq!(by_name.len(), 2);
    assert!(by_name.values().all(|r| r.state() == MigrationState::Applied));

    // Run 2: nothing to do
    let run2 = project.migrator().update(&project.roots()).await.unwrap();
    assert!(run2.steps.is_empty());

    // Run 3: 0002 removed from the repository is reverted
    project.remove("0002_add_col");
    let run3 = project.migrator().update(&project.roots()).await.unwrap();
    assert_eq!(steps(&run3), vec!["down 0002_add_col"]);
    assert!(run3.is_success());

    let by_name = ledger::list_all(&project.ctx(), project.conn.as_ref()).await.unwrap();
    let reverted = &by_name["0002_add_col"];
    assert_eq!(reverted.state(), MigrationState::Reverted);
    assert!(reverted.up_datetime.is_some());
    assert!(reverted.down_datetime.is_some());
    assert!(reverted.down_result.is_some());
    assert!(project.conn.run_sql("SELECT c FROM t").await.is_err());
    assert!(project.conn.run_sql("SELECT id FROM t").await.is_ok());

    // Run 4: the revert is not repeated
    let run4 = project.migrator().update(&project.roots()).await.unwrap();
    assert!(run4.steps.is_empty());
}

#[tokio::test]
async fn test_converged_ledger_matches_repository() {
    let project = Project::new();
    project.add("0001_a", "CREATE TABLE a (id INTEGER);", "DROP TABLE a;");
    project.add("0002_b", "CREATE TABLE b (id INTEGER);", "DROP TABLE b;");
    project.add("0003_c", "CREATE TABLE c (id INTEGER);", "DROP TABLE c;");
    project.migrator().install(&project.roots()).await.unwrap();

    project.remove("0002_b");
    project.add("0004_d", "CREATE TABLE d (id INTEGER);", "DROP TABLE d;");
    let report = project.migrator().update(&project.roots()).await.unwrap();

    let first_up = report
        .steps
        .iter()
        .position(|s| s.direction == Direction::Up)
        .unwrap();
    assert!(report.steps[first_up..]
        .iter()
        .all(|s| s.direction == Direction::Up));
    assert_eq!(steps(&report), vec!["down 0002_b", "up 0004_d"]);

    let active: Vec<String> = ledger::list_all(&project.ctx(), project.conn.as_ref())
        .await
        .unwrap()
        .into_values()
        .filter(|r| r.state() == MigrationState::Applied)
        .map(|r| r.migration_name.to_string())
        .collect();
    assert_eq!(active, vec!["0001_a", "0003_c", "0004_d"]);
}

#[tokio::test]
async fn test_failed_statement_is_atomic_and_retried() {
    let project = Project::new();
    project.add(
        "0001_seed",
        "CREATE TABLE s (id INTEGER);\nINSERT INTO s VALUES (1);\nINSERT INTO missing VALUES (2);",
        "DROP TABLE s;",
    );

    let run1 = project.migrator().install(&project.roots()).await.unwrap();
    assert_eq!(run1.failed(), 1);
    assert!(project.conn.run_sql("SELECT * FROM s").await.is_err());

    let by_name = ledger::list_all(&project.ctx(), project.conn.as_ref()).await.unwrap();
    let failed = &by_name["0001_seed"];
    assert_eq!(failed.state(), MigrationState::AppliedFailed);
    assert_eq!(
        failed.up_result.as_deref(),
        Some("0 row(s) affected\n1 row(s) affected")
    );
    assert_eq!(failed.log_id, Some(project.logger.entries()[0].log_id.clone()));

    // Fix the script; the same ledger row is reused
    project.add(
        "0001_seed",
        "CREATE TABLE s (id INTEGER);\nINSERT INTO s VALUES (1);",
        "DROP TABLE s;",
    );
    let run2 = project.migrator().update(&project.roots()).await.unwrap();
    assert_eq!(steps(&run2), vec!["up 0001_seed"]);
    assert!(run2.is_success());

    let records = ledger::list_records(&project.ctx(), project.conn.as_ref(), &[])
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, failed.id);
    assert_eq!(records[0].state(), MigrationState::Applied);
    assert_eq!(project.scalar("SELECT COUNT(*) FROM s").await, "1");
}

#[tokio::test]
async fn test_frozen_migration_is_never_planned() {
    let project = Project::new();
    project.add("0001_bad", "INSERT INTO missing VALUES (1);", "");
    project.add("0002_gone", "CREATE TABLE g (id INTEGER);", "DROP TABLE g;");
    project.migrator().install(&project.roots()).await.unwrap();

    project
        .conn
        .run_sql("UPDATE _migrations SET skip_flag = 1")
        .await
        .unwrap();
    project.remove("0002_gone");

    let plan = project.migrator().plan(&project.roots()).await.unwrap();
    assert!(plan.is_empty());
    let report = project.migrator().update(&project.roots()).await.unwrap();
    assert!(report.steps.is_empty());
    assert!(project.conn.run_sql("SELECT * FROM g").await.is_ok());

    let status = project.migrator().status(&project.roots()).await.unwrap();
    assert!(status.iter().all(|e| e.state == MigrationState::Frozen));
}

#[tokio::test]
async fn test_irreversible_migration_is_marked_revert_failed() {
    let project = Project::new();
    project.add("0001_oneway", "CREATE TABLE o (id INTEGER);", "");
    project.migrator().install(&project.roots()).await.unwrap();
    project.remove("0001_oneway");

    let report = project.migrator().update(&project.roots()).await.unwrap();
    assert_eq!(report.failed(), 1);
    assert_eq!(report.steps[0].error.as_deref(), Some("no down script"));
    assert!(project.conn.run_sql("SELECT * FROM o").await.is_ok());

    let by_name = ledger::list_all(&project.ctx(), project.conn.as_ref()).await.unwrap();
    assert_eq!(by_name["0001_oneway"].state(), MigrationState::RevertFailed);
}

#[tokio::test]
async fn test_reverted_migration_reapplied_as_new_row() {
    let project = Project::new();
    project.add("0001_a", "CREATE TABLE a (id INTEGER);", "DROP TABLE a;");
    project.migrator().install(&project.roots()).await.unwrap();
    project.remove("0001_a");
    project.migrator().update(&project.roots()).await.unwrap();

    project.add("0001_a", "CREATE TABLE a (id INTEGER);", "DROP TABLE a;");
    let report = project.migrator().update(&project.roots()).await.unwrap();
    assert_eq!(steps(&report), vec!["up 0001_a"]);

    let records = ledger::list_records(&project.ctx(), project.conn.as_ref(), &[])
        .await
        .unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].state(), MigrationState::Reverted);
    assert_eq!(records[1].state(), MigrationState::Applied);

    let again = project.migrator().update(&project.roots()).await.unwrap();
    assert!(again.steps.is_empty());
}
