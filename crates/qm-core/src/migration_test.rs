use super::*;
use chrono::NaiveDate;

fn at(h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

fn migration(name: &str) -> Migration {
    Migration::new(
        MigrationName::new(name),
        "CREATE TABLE t (id INT);",
        "DROP TABLE t;",
        PathBuf::from(format!("{name}.sql")),
        "raw",
    )
}

#[test]
fn test_name_rejects_blank() {
    assert!(MigrationName::try_new("").is_none());
    assert!(MigrationName::try_new("   ").is_none());
    assert_eq!(MigrationName::try_new("0001_init").unwrap(), "0001_init");
}

#[test]
fn test_name_ordering_is_lexicographic() {
    let mut names = vec![
        MigrationName::new("0010_b"),
        MigrationName::new("0002_a"),
        MigrationName::new("0001_z"),
    ];
    names.sort();
    let sorted: Vec<&str> = names.iter().map(|n| n.as_str()).collect();
    assert_eq!(sorted, vec!["0001_z", "0002_a", "0010_b"]);
}

#[test]
fn test_has_down_script() {
    let mut m = migration("0001");
    assert!(m.has_down_script());
    m.down_script = "  \n".to_string();
    assert!(!m.has_down_script());
}

#[test]
fn test_checksum_is_stable() {
    assert_eq!(compute_checksum("abc"), compute_checksum("abc"));
    assert_ne!(compute_checksum("abc"), compute_checksum("abd"));
    assert_eq!(compute_checksum("").len(), 64);
}

#[test]
fn test_record_for_migration_copies_scripts() {
    let m = migration("0001_create");
    let r = LedgerRecord::for_migration(&m);
    assert_eq!(r.id, None);
    assert_eq!(r.migration_name, "0001_create");
    assert_eq!(r.up_script, m.up_script);
    assert_eq!(r.down_script, m.down_script);
    assert_eq!(r.state(), MigrationState::Pending);
}

#[test]
fn test_record_state_derivation() {
    let mut r = LedgerRecord::for_migration(&migration("0001"));

    r.up_datetime = Some(at(1));
    assert_eq!(r.state(), MigrationState::Applied);

    r.failed_flag = true;
    assert_eq!(r.state(), MigrationState::AppliedFailed);

    r.failed_flag = false;
    r.down_datetime = Some(at(2));
    assert_eq!(r.state(), MigrationState::Reverted);

    r.failed_flag = true;
    assert_eq!(r.state(), MigrationState::RevertFailed);

    r.skip_flag = true;
    assert_eq!(r.state(), MigrationState::Frozen);
}

#[test]
fn test_state_display() {
    assert_eq!(MigrationState::AppliedFailed.to_string(), "applied_failed");
    assert_eq!(Direction::Down.to_string(), "down");
}
