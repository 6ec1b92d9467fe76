use super::*;
use std::fs;
use tempfile::TempDir;

fn repo() -> MigrationRepository {
    MigrationRepository::new(ScriptFormat::default(), SplitOptions::default(), "sql")
}

fn write(dir: &Path, rel: &str, content: &str) {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn names(migrations: &[Migration]) -> Vec<&str> {
    migrations.iter().map(|m| m.name.as_str()).collect()
}

#[test]
fn test_scan_orders_by_name() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "0002_add_col.sql", "ALTER TABLE t ADD c INT;\n-- DOWN\nALTER TABLE t DROP COLUMN c;\n");
    write(dir.path(), "0001_create_table.sql", "CREATE TABLE t (id INT);\n-- DOWN\nDROP TABLE t;\n");

    let migrations = repo().scan_migrations(dir.path()).unwrap();
    assert_eq!(names(&migrations), vec!["0001_create_table", "0002_add_col"]);
    assert_eq!(migrations[0].up_script, "CREATE TABLE t (id INT);");
    assert_eq!(migrations[0].down_script, "DROP TABLE t;");
}

#[test]
fn test_scan_recurses_and_ignores_other_files() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "core/0001_a.sql", "SELECT 1;\n-- DOWN\n");
    write(dir.path(), "extra/0003_c.sql", "SELECT 3;\n-- DOWN\n");
    write(dir.path(), "0002_b.SQL", "SELECT 2;\n-- DOWN\n");
    write(dir.path(), "README.md", "not a migration");
    write(dir.path(), ".hidden.sql", "garbage without marker");

    let migrations = repo().scan_migrations(dir.path()).unwrap();
    assert_eq!(names(&migrations), vec!["0001_a", "0002_b", "0003_c"]);
}

#[test]
fn test_scan_empty_directory() {
    let dir = TempDir::new().unwrap();
    assert!(repo().scan_migrations(dir.path()).unwrap().is_empty());
}

#[test]
fn test_missing_marker_aborts_scan() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "0001_ok.sql", "SELECT 1;\n-- DOWN\n");
    write(dir.path(), "0002_bad.sql", "SELECT 2;\n");

    let err = repo().scan_migrations(dir.path()).unwrap_err();
    match err {
        CoreError::InvalidMigrationFormat { path, marker } => {
            assert!(path.ends_with("0002_bad.sql"));
            assert_eq!(marker, "-- DOWN");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_root_is_an_error() {
    let dir = TempDir::new().unwrap();
    let err = repo()
        .scan_migrations(&dir.path().join("does_not_exist"))
        .unwrap_err();
    assert!(matches!(err, CoreError::MigrationDirNotFound { .. }));
}

#[test]
fn test_unreadable_file_fails_fast() {
    let dir = TempDir::new().unwrap();
    // invalid UTF-8 makes read_to_string fail
    fs::write(dir.path().join("0001_bin.sql"), [0xff, 0xfe, 0x00]).unwrap();
    let err = repo().scan_migrations(dir.path()).unwrap_err();
    assert!(matches!(err, CoreError::IoWithPath { .. }));
}

#[test]
fn test_multi_source_merge_identical_fragments() {
    let a = TempDir::new().unwrap();
    let b = TempDir::new().unwrap();
    let content = "CREATE TABLE shared (id INT);\n-- DOWN\nDROP TABLE shared;\n";
    write(a.path(), "0001_shared.sql", content);
    write(b.path(), "0001_shared.sql", content);
    write(b.path(), "0002_plugin.sql", "SELECT 1;\n-- DOWN\n");

    let migrations = repo()
        .scan_sources(&[a.path().to_path_buf(), b.path().to_path_buf()])
        .unwrap();
    assert_eq!(names(&migrations), vec!["0001_shared", "0002_plugin"]);
    assert!(migrations[0].source.starts_with(a.path()));
}

#[test]
fn test_multi_source_merge_whitespace_only_difference() {
    let a = TempDir::new().unwrap();
    let b = TempDir::new().unwrap();
    write(a.path(), "0001_x.sql", "CREATE TABLE x (id INT);\n-- DOWN\nDROP TABLE x;\n");
    write(b.path(), "0001_x.sql", "-- plugin copy\ncreate   table x\n  (id int);\n-- DOWN\ndrop table x;\n");

    let migrations = repo()
        .scan_sources(&[a.path().to_path_buf(), b.path().to_path_buf()])
        .unwrap();
    assert_eq!(migrations.len(), 1);
}

#[test]
fn test_multi_source_structural_mismatch() {
    let a = TempDir::new().unwrap();
    let b = TempDir::new().unwrap();
    write(a.path(), "0001_x.sql", "CREATE TABLE x (id INT);\n-- DOWN\nDROP TABLE x;\n");
    write(b.path(), "0001_x.sql", "CREATE TABLE x (id INT, name TEXT);\n-- DOWN\nDROP TABLE x;\n");

    let err = repo()
        .scan_sources(&[a.path().to_path_buf(), b.path().to_path_buf()])
        .unwrap_err();
    match err {
        CoreError::StructuralMismatch { name, reason, .. } => {
            assert_eq!(name, "0001_x");
            assert!(reason.contains("up-section statement 1 differs"), "{reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_structural_mismatch_statement_count() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a/0001_x.sql", "SELECT 1;\n-- DOWN\n");
    write(dir.path(), "b/0001_x.sql", "SELECT 1;\nSELECT 2;\n-- DOWN\n");

    let err = repo().scan_migrations(dir.path()).unwrap_err();
    assert!(err.to_string().contains("1 statement(s) vs 2"), "{err}");
}

#[test]
fn test_literal_case_difference_is_a_mismatch() {
    let a = TempDir::new().unwrap();
    let b = TempDir::new().unwrap();
    write(a.path(), "0001_x.sql", "INSERT INTO settings VALUES ('Mode');\n-- DOWN\n");
    write(b.path(), "0001_x.sql", "insert into settings values ('mode');\n-- DOWN\n");

    let err = repo()
        .scan_sources(&[a.path().to_path_buf(), b.path().to_path_buf()])
        .unwrap_err();
    assert!(
        matches!(err, CoreError::StructuralMismatch { ref name, .. } if name == "0001_x"),
        "{err}"
    );
}
