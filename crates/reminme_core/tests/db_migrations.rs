use reminme_core::db::migrations::latest_version;
use reminme_core::db::{open_db, open_db_in_memory, DbError};
use reminme_core::{RepoError, SqlitePeopleRepository};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().expect("in-memory db should open");

    assert_eq!(schema_version(&conn), latest_version());
    for table in [
        "users",
        "api_tokens",
        "people",
        "memories",
        "follow_ups",
        "events",
        "businesses",
        "business_people",
        "business_notes",
        "org_chart_people",
        "org_chart_teams",
        "org_chart_team_members",
        "org_chart_meetings",
        "meetings",
        "meeting_attendees",
        "meeting_agenda",
        "meeting_notes",
        "meeting_questions",
        "meeting_followups",
        "meeting_context_cards",
        "research_results",
        "conversation_strategies",
        "conversation_steps",
        "todo_habits",
        "todo_habit_checks",
        "projects_tasks",
    ] {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let path = dir.path().join("reminme.sqlite3");

    let conn_first = open_db(&path).expect("db should open");
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).expect("db should open");
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "people");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).expect("open should succeed");
    conn.execute_batch("PRAGMA user_version = 999;").expect("execute batch should succeed");
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
fn repositories_reject_unmigrated_connections() {
    let conn = Connection::open_in_memory().expect("open in memory should succeed");
    match SqlitePeopleRepository::try_new(&conn) {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        }) => {
            assert_eq!(expected_version, latest_version());
            assert_eq!(actual_version, 0);
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("unmigrated connection must be rejected"),
    }
}

#[test]
fn foreign_keys_are_enforced() {
    let conn = open_db_in_memory().expect("in-memory db should open");
    let result = conn.execute(
        "INSERT INTO people (id, user_id, name) VALUES ('p1', 'missing-user', 'Ada');",
        [],
    );
    assert!(result.is_err());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .expect("query should return a row")
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
        .expect("query should return a row");
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
