use rusqlite::Connection;
use shortnote_core::db::migrations::latest_version;
use shortnote_core::db::{open_db, open_db_in_memory, open_db_with_config, DbError};
use shortnote_core::CoreConfig;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "notes");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shortnote.db");

    let conn_first = open_db(&path).unwrap();
    conn_first
        .execute(
            "INSERT INTO notes (id, content, created_at) VALUES ('keep01', 'kept', 1);",
            [],
        )
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    let content: String = conn_second
        .query_row("SELECT content FROM notes WHERE id = 'keep01';", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(content, "kept");
}

#[test]
fn open_db_with_config_uses_configured_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("configured.db");
    let config = CoreConfig::default().with_db_path(&path);

    let conn = open_db_with_config(&config).unwrap();
    assert_table_exists(&conn, "notes");
    assert!(path.exists());
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn schema_rejects_out_of_range_rows() {
    let conn = open_db_in_memory().unwrap();

    let short_id = conn.execute(
        "INSERT INTO notes (id, content, created_at) VALUES ('abc', 'x', 1);",
        [],
    );
    assert!(short_id.is_err());

    let long_content = conn.execute(
        "INSERT INTO notes (id, content, created_at) VALUES ('abcdef', ?1, 1);",
        ["x".repeat(401)],
    );
    assert!(long_content.is_err());

    let edited_before_created = conn.execute(
        "INSERT INTO notes (id, content, created_at, last_edited_at) VALUES ('abcdef', 'x', 10, 5);",
        [],
    );
    assert!(edited_before_created.is_err());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
