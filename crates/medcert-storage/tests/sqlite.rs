mod common;

use medcert_storage::sqlite::{SqliteStore, current_version, open_memory_database, run_migrations};
use rusqlite::Connection;
use medcert_storage::store::Store;

fn store() -> SqliteStore {
    SqliteStore::open_in_memory().unwrap()
}

#[test]
fn upsert_keeps_identity() {
    common::upsert_keeps_identity(&store());
}

#[test]
fn same_number_other_kind_is_distinct() {
    common::same_number_other_kind_is_distinct(&store());
}

#[test]
fn missing_key_is_none() {
    common::missing_key_is_none(&store());
}

#[test]
fn search_orders_and_limits() {
    common::search_orders_and_limits(&store());
}

#[test]
fn search_folds_accented_letters() {
    common::search_folds_accented_letters(&store());
}

#[test]
fn doctor_search() {
    common::doctor_search(&store());
}

#[test]
fn certificates_need_parents() {
    common::certificates_need_parents(&store());
}

#[test]
fn certificates_newest_first() {
    common::certificates_newest_first(&store());
}

#[test]
fn migrations_are_idempotent() {
    let conn = open_memory_database().unwrap();
    assert_eq!(current_version(&conn), 2);
    run_migrations(&conn).unwrap();
    assert_eq!(current_version(&conn), 2);

    let versions: i64 = conn
        .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
        .unwrap();
    assert_eq!(versions, 2);
}

#[test]
fn upgraded_database_folds_existing_names() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(include_str!("../migrations/001_initial.sql"))
        .unwrap();
    conn.execute(
        "INSERT INTO patients (id, name, document_kind, document_number, created_at, updated_at)
         VALUES (?1, 'ÉRICA Souza', 'CPF', '52998224725', 0, 0)",
        [uuid::Uuid::new_v4().to_string()],
    )
    .unwrap();
    assert_eq!(current_version(&conn), 1);

    run_migrations(&conn).unwrap();
    assert_eq!(current_version(&conn), 2);

    let store = SqliteStore::from_connection(conn);
    let found = store.search_patients("érica", 10).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "ÉRICA Souza");
}

#[test]
fn foreign_keys_are_enforced() {
    let conn = open_memory_database().unwrap();
    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);

    let result = conn.execute(
        "INSERT INTO certificates (id, patient_id, doctor_id, issued_on, days_of_leave, homologated_on, created_at)
         VALUES ('c', 'missing', 'missing', '2025-11-09', 1, '2025-11-10', 0)",
        [],
    );
    assert!(result.is_err());
}

#[test]
fn kind_columns_are_checked() {
    let conn = open_memory_database().unwrap();
    let result = conn.execute(
        "INSERT INTO patients (id, name, document_kind, document_number, created_at, updated_at)
         VALUES ('p', 'Joao Silva', 'PASSPORT', '1', 0, 0)",
        [],
    );
    assert!(result.is_err());
}

#[test]
fn file_database_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("medcert.db");

    let p = common::patient("Joao Silva", "52998224725", 0);
    {
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.schema_version().unwrap(), 2);
        store.upsert_patient(&p).unwrap();
    }

    let store = SqliteStore::open(&path).unwrap();
    let found = store.find_patient(&p.key()).unwrap().unwrap();
    assert_eq!(found.id, p.id);
    assert_eq!(found.job_title, "Analista");
    assert_eq!(found.created_at, p.created_at);
    assert_eq!(store.stats().unwrap().patients, 1);
}
