use super::*;

#[tokio::test]
async fn test_in_memory() {
    let db = DuckDbConnection::in_memory().unwrap();
    assert_eq!(db.engine(), Engine::DuckDb);
    assert!(db.is_connected());
}

#[tokio::test]
async fn test_run_sql_ddl_and_query() {
    let db = DuckDbConnection::in_memory().unwrap();
    let created = db.run_sql("CREATE TABLE t (id INTEGER, name VARCHAR)").await.unwrap();
    assert!(created.columns.is_empty());

    let inserted = db
        .run_sql("INSERT INTO t VALUES (1, 'a'), (2, NULL)")
        .await
        .unwrap();
    assert_eq!(inserted.affected_rows, 2);
    assert_eq!(inserted.summary(), "2 row(s) affected");

    let result = db
        .run_sql("SELECT id, name FROM t ORDER BY id")
        .await
        .unwrap();
    assert_eq!(result.columns, vec!["id", "name"]);
    assert_eq!(
        result.rows,
        vec![
            vec![Some("1".to_string()), Some("a".to_string())],
            vec![Some("2".to_string()), None],
        ]
    );
    assert_eq!(result.first_value(), Some("1"));
    assert_eq!(result.column_index("NAME"), Some(1));
    assert_eq!(result.summary(), "2 row(s) returned");
}

#[tokio::test]
async fn test_insert_returning() {
    let db = DuckDbConnection::in_memory().unwrap();
    db.run_sql("CREATE SEQUENCE s START 1").await.unwrap();
    db.run_sql("CREATE TABLE r (id INTEGER PRIMARY KEY DEFAULT nextval('s'), v VARCHAR)")
        .await
        .unwrap();
    let first = db
        .run_sql("INSERT INTO r (v) VALUES ('x') RETURNING id")
        .await
        .unwrap();
    let second = db
        .run_sql("INSERT INTO r (v) VALUES ('y') RETURNING id")
        .await
        .unwrap();
    assert_eq!(first.first_value(), Some("1"));
    assert_eq!(second.first_value(), Some("2"));
}

#[tokio::test]
async fn test_execution_error_carries_statement() {
    let db = DuckDbConnection::in_memory().unwrap();
    let err = db.run_sql("INSERT INTO missing VALUES (1)").await.unwrap_err();
    match err {
        DbError::ExecutionError { statement, .. } => {
            assert_eq!(statement, "INSERT INTO missing VALUES (1)")
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_transaction_rollback_discards_changes() {
    let db = DuckDbConnection::in_memory().unwrap();
    db.run_sql("CREATE TABLE t (id INTEGER)").await.unwrap();

    db.transaction_start().await.unwrap();
    db.run_sql("INSERT INTO t VALUES (1)").await.unwrap();
    db.run_sql("CREATE TABLE t2 (id INTEGER)").await.unwrap();
    db.transaction_rollback().await.unwrap();

    let count = db.run_sql("SELECT COUNT(*) FROM t").await.unwrap();
    assert_eq!(count.first_value(), Some("0"));
    assert!(db.run_sql("SELECT * FROM t2").await.is_err());
}

#[tokio::test]
async fn test_transaction_commit_keeps_changes() {
    let db = DuckDbConnection::in_memory().unwrap();
    db.run_sql("CREATE TABLE t (id INTEGER)").await.unwrap();

    db.transaction_start().await.unwrap();
    db.run_sql("INSERT INTO t VALUES (1)").await.unwrap();
    db.transaction_commit().await.unwrap();

    let count = db.run_sql("SELECT COUNT(*) FROM t").await.unwrap();
    assert_eq!(count.first_value(), Some("1"));
}

#[tokio::test]
async fn test_rollback_without_transaction_is_transaction_error() {
    let db = DuckDbConnection::in_memory().unwrap();
    let err = db.transaction_rollback().await.unwrap_err();
    assert!(matches!(err, DbError::TransactionError(_)));
}

#[tokio::test]
async fn test_reconnect_keeps_in_memory_data() {
    let db = DuckDbConnection::in_memory().unwrap();
    db.run_sql("CREATE TABLE kept (id INTEGER)").await.unwrap();
    db.run_sql("INSERT INTO kept VALUES (42)").await.unwrap();

    db.disconnect().await.unwrap();
    assert!(!db.is_connected());
    assert!(matches!(
        db.run_sql("SELECT 1").await,
        Err(DbError::NotConnected)
    ));

    db.connect().await.unwrap();
    assert!(db.is_connected());
    let result = db.run_sql("SELECT id FROM kept").await.unwrap();
    assert_eq!(result.first_value(), Some("42"));
}

#[tokio::test]
async fn test_disconnect_discards_open_transaction() {
    let db = DuckDbConnection::in_memory().unwrap();
    db.run_sql("CREATE TABLE t (id INTEGER)").await.unwrap();
    db.transaction_start().await.unwrap();
    db.run_sql("INSERT INTO t VALUES (1)").await.unwrap();

    db.disconnect().await.unwrap();
    db.connect().await.unwrap();

    let count = db.run_sql("SELECT COUNT(*) FROM t").await.unwrap();
    assert_eq!(count.first_value(), Some("0"));
}

#[tokio::test]
async fn test_file_database_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("target.duckdb");
    {
        let db = DuckDbConnection::from_path(&path).unwrap();
        db.run_sql("CREATE TABLE p (id INTEGER)").await.unwrap();
    }
    let db = DuckDbConnection::new(path.to_str().unwrap()).unwrap();
    let result = db.run_sql("SELECT COUNT(*) FROM p").await.unwrap();
    assert_eq!(result.first_value(), Some("0"));
}

#[test]
fn test_returns_rows() {
    assert!(returns_rows("SELECT 1"));
    assert!(returns_rows("  with x as (select 1) select * from x"));
    assert!(returns_rows("INSERT INTO t (v) VALUES ('a') RETURNING id"));
    assert!(!returns_rows("CREATE TABLE t (id INT)"));
    assert!(!returns_rows("INSERT INTO t VALUES (1)"));
}
