use rusqlite::Connection;
use sqlmigrate::bootstrap;
use sqlmigrate::{MigrateError, Migrator, MigratorOptions, SqliteDriver, Version};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn v(s: &str) -> Version {
    Version::parse(s).unwrap()
}

fn write_script(base: &Path, rel: &str, body: &str) {
    let path = base.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

fn migrator<'c>(conn: &'c Connection, base: &Path, schema: &str) -> Migrator<'c> {
    Migrator::new(
        conn,
        MigratorOptions::new().schema_name(schema).base_dir(base),
    )
    .unwrap()
}

fn recorded_version(conn: &Connection, schema: &str) -> Option<String> {
    conn.query_row(
        "SELECT version FROM schema_version WHERE schema = ?1",
        [schema],
        |row| row.get(0),
    )
    .ok()
}

fn log_rows(conn: &Connection, schema: &str) -> Vec<(Option<String>, String)> {
    let mut stmt = conn
        .prepare("SELECT from_version, to_version FROM schema_log WHERE schema = ?1 ORDER BY rowid")
        .unwrap();
    let rows = stmt
        .query_map([schema], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap();
    rows.collect::<Result<Vec<_>, _>>().unwrap()
}

#[test]
fn test_fresh_install() {
    let tmp = TempDir::new().unwrap();
    write_script(
        tmp.path(),
        "app/sqlite/0.01/100_a.sql",
        "CREATE TABLE t (id INT);\n",
    );

    let conn = Connection::open_in_memory().unwrap();
    let mut m = migrator(&conn, tmp.path(), "app");
    assert_eq!(m.current_version().unwrap(), None);

    let plan = m.plan(&Version::zero(), &v("0.01")).unwrap();
    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].dir_name, "0.01");

    let reached = m.full_migrate().unwrap();
    assert_eq!(reached, v("0.01"));

    assert_eq!(recorded_version(&conn, "app"), Some("0.01".to_string()));
    assert_eq!(
        log_rows(&conn, "app"),
        vec![(None, "0.01".to_string())]
    );

    // The script actually ran.
    conn.execute("INSERT INTO t (id) VALUES (1)", []).unwrap();
}

#[test]
fn test_upgrade_takes_shortest_path() {
    let tmp = TempDir::new().unwrap();
    write_script(
        tmp.path(),
        "app/sqlite/0.01/100_base.sql",
        "CREATE TABLE base_t (id INT);\n",
    );
    write_script(tmp.path(), "app/sqlite/0.02/100_noop.sql", "SELECT 1;\n");
    write_script(tmp.path(), "app/sqlite/0.03/100_noop.sql", "SELECT 1;\n");
    write_script(
        tmp.path(),
        "app/sqlite/0.01-0.02/100_step.sql",
        "CREATE TABLE via_02 (id INT);\n",
    );
    write_script(
        tmp.path(),
        "app/sqlite/0.01-0.03/100_step.sql",
        "CREATE TABLE direct_03 (id INT);\n",
    );

    let conn = Connection::open_in_memory().unwrap();
    bootstrap::ensure_engine_schema(&conn, &SqliteDriver).unwrap();
    let mut m = migrator(&conn, tmp.path(), "app");
    m.migrate_to(&v("0.01")).unwrap();

    let plan = m.plan(&v("0.01"), &v("0.03")).unwrap();
    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].dir_name, "0.01-0.03");

    m.migrate_to(&v("0.03")).unwrap();
    assert_eq!(recorded_version(&conn, "app"), Some("0.03".to_string()));
    assert_eq!(
        log_rows(&conn, "app"),
        vec![
            (None, "0.01".to_string()),
            (Some("0.01".to_string()), "0.03".to_string()),
        ]
    );

    // The one-edge path ran, the two-edge path did not.
    let via_02: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE name = 'via_02'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(via_02, 0);
}

#[test]
fn test_downgrade_to_removal() {
    let tmp = TempDir::new().unwrap();
    write_script(
        tmp.path(),
        "app/sqlite/0.02/100_install.sql",
        "CREATE TABLE t (id INT);\n",
    );
    write_script(
        tmp.path(),
        "app/sqlite/0.02-0.01/100_down.sql",
        "SELECT 1;\n",
    );
    write_script(
        tmp.path(),
        "app/sqlite/0.01-0.00/100_drop.sql",
        "DROP TABLE t;\n",
    );

    let conn = Connection::open_in_memory().unwrap();
    bootstrap::ensure_engine_schema(&conn, &SqliteDriver).unwrap();
    let mut m = migrator(&conn, tmp.path(), "app");
    m.migrate_to(&v("0.02")).unwrap();

    let plan = m.plan(&v("0.02"), &Version::zero()).unwrap();
    assert_eq!(plan.len(), 2);
    assert_eq!(plan[0].dir_name, "0.02-0.01");
    assert_eq!(plan[1].dir_name, "0.01-0.00");

    m.delete_schema().unwrap();
    assert_eq!(recorded_version(&conn, "app"), None);
    assert_eq!(
        log_rows(&conn, "app"),
        vec![
            (None, "0.02".to_string()),
            (Some("0.02".to_string()), "0.01".to_string()),
            (Some("0.01".to_string()), "0.00".to_string()),
        ]
    );
}

#[test]
fn test_no_migration_path() {
    let tmp = TempDir::new().unwrap();
    write_script(tmp.path(), "app/sqlite/0.01/100_a.sql", "SELECT 1;\n");
    write_script(tmp.path(), "app/sqlite/0.02/100_a.sql", "SELECT 1;\n");

    let conn = Connection::open_in_memory().unwrap();
    bootstrap::ensure_engine_schema(&conn, &SqliteDriver).unwrap();
    let mut m = migrator(&conn, tmp.path(), "app");
    m.migrate_to(&v("0.01")).unwrap();

    let err = m.migrate_to(&v("0.02")).unwrap_err();
    assert!(matches!(err, MigrateError::NoMigrationPath { .. }));
    assert_eq!(recorded_version(&conn, "app"), Some("0.01".to_string()));
}

#[test]
fn test_failed_step_leaves_version_unchanged() {
    let tmp = TempDir::new().unwrap();
    write_script(
        tmp.path(),
        "app/sqlite/0.01/100_a.sql",
        "CREATE TABLE t (id INT);\n",
    );
    write_script(
        tmp.path(),
        "app/sqlite/0.01-0.02/100_bad.sql",
        "CREATE TABLE u (id INT);\nTHIS IS NOT SQL;\n",
    );

    let conn = Connection::open_in_memory().unwrap();
    bootstrap::ensure_engine_schema(&conn, &SqliteDriver).unwrap();
    let mut m = migrator(&conn, tmp.path(), "app");
    m.migrate_to(&v("0.01")).unwrap();
    let logged_before = log_rows(&conn, "app").len();

    let err = m.migrate_to(&v("0.02")).unwrap_err();
    match err {
        MigrateError::ExecutionFailure { edge, file, .. } => {
            assert_eq!(edge, "0.01-0.02");
            assert_eq!(file, "100_bad.sql");
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(m.current_version().unwrap(), Some(v("0.01")));
    assert_eq!(log_rows(&conn, "app").len(), logged_before);
    // The partial edge's first statement was rolled back.
    let u_exists: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE name = 'u'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(u_exists, 0);
}

#[test]
fn test_overlay_applies_driver_override() {
    let tmp = TempDir::new().unwrap();
    write_script(
        tmp.path(),
        "app/sqlite/0.01/100_a.sql",
        "CREATE TABLE driver_t (id INT);\n",
    );
    write_script(
        tmp.path(),
        "app/_common/0.01/100_a.sql",
        "CREATE TABLE common_t (id INT);\n",
    );
    write_script(
        tmp.path(),
        "app/_common/0.01/200_b.sql",
        "CREATE TABLE common_b (id INT);\n",
    );

    let conn = Connection::open_in_memory().unwrap();
    bootstrap::ensure_engine_schema(&conn, &SqliteDriver).unwrap();
    let mut m = migrator(&conn, tmp.path(), "app");
    m.migrate_to(&v("0.01")).unwrap();

    let names: Vec<String> = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name LIKE '%_t' OR name LIKE '%_b' ORDER BY name")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert!(names.contains(&"driver_t".to_string()));
    assert!(names.contains(&"common_b".to_string()));
    assert!(!names.contains(&"common_t".to_string()), "driver file overrides _common");
}

#[test]
fn test_migrate_defaults_to_highest_reachable() {
    let tmp = TempDir::new().unwrap();
    write_script(tmp.path(), "app/sqlite/0.01/100_a.sql", "SELECT 1;\n");
    write_script(tmp.path(), "app/sqlite/0.01-0.02/100_up.sql", "SELECT 1;\n");
    write_script(tmp.path(), "app/sqlite/0.02-0.03/100_up.sql", "SELECT 1;\n");

    let conn = Connection::open_in_memory().unwrap();
    let mut m = migrator(&conn, tmp.path(), "app");
    let reached = m.full_migrate().unwrap();
    assert_eq!(reached, v("0.03"));
    assert_eq!(recorded_version(&conn, "app"), Some("0.03".to_string()));
    assert_eq!(log_rows(&conn, "app").len(), 3);
}

#[test]
fn test_explicit_desired_version_stops_early() {
    let tmp = TempDir::new().unwrap();
    write_script(tmp.path(), "app/sqlite/0.01/100_a.sql", "SELECT 1;\n");
    write_script(tmp.path(), "app/sqlite/0.01-0.02/100_up.sql", "SELECT 1;\n");

    let conn = Connection::open_in_memory().unwrap();
    let mut m = Migrator::new(
        &conn,
        MigratorOptions::new()
            .schema_name("app")
            .base_dir(tmp.path())
            .desired_version(v("0.01")),
    )
    .unwrap();
    let reached = m.full_migrate().unwrap();
    assert_eq!(reached, v("0.01"));
    assert_eq!(recorded_version(&conn, "app"), Some("0.01".to_string()));
}

#[test]
fn test_stranded_schema_is_noop_at_same_version() {
    let tmp = TempDir::new().unwrap();
    write_script(tmp.path(), "app/sqlite/0.01/100_a.sql", "SELECT 1;\n");

    let conn = Connection::open_in_memory().unwrap();
    bootstrap::ensure_engine_schema(&conn, &SqliteDriver).unwrap();
    let mut m = migrator(&conn, tmp.path(), "app");
    m.migrate_to(&v("0.01")).unwrap();

    // No edges leave 0.01, but staying put succeeds.
    m.migrate_to(&v("0.01")).unwrap();
    assert_eq!(log_rows(&conn, "app").len(), 1, "no-op writes no log rows");
}
