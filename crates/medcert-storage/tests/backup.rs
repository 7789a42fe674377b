mod common;

use medcert_storage::backup::Backup;
use medcert_storage::memory::MemoryStore;
use medcert_storage::sqlite::SqliteStore;
use medcert_storage::store::Store;

fn seeded() -> MemoryStore {
    let store = MemoryStore::new();
    let p = store
        .upsert_patient(&common::patient("Joao Silva", "52998224725", 0))
        .unwrap();
    let d = store
        .upsert_doctor(&common::doctor("Maria Santos", "12345", 0))
        .unwrap();
    store.insert_certificate(&common::certificate(p.id, d.id, 1)).unwrap();
    store.insert_certificate(&common::certificate(p.id, d.id, 2)).unwrap();
    store
}

#[test]
fn snapshot_captures_everything() {
    let backup = Backup::snapshot(&seeded(), "memory").unwrap();
    assert_eq!(backup.source, "memory");
    assert_eq!(backup.patients.len(), 1);
    assert_eq!(backup.doctors.len(), 1);
    assert_eq!(backup.certificates.len(), 2);

    let name = backup.file_name();
    assert!(name.starts_with("backup_"));
    assert!(name.ends_with(".json"));
    // backup_YYYYMMDD_HHMMSS.json
    assert_eq!(name.len(), "backup_".len() + 15 + ".json".len());
}

#[test]
fn written_backup_reads_back() {
    let dir = tempfile::tempdir().unwrap();
    let backup = Backup::snapshot(&seeded(), "memory").unwrap();

    let path = backup.write_to_dir(&dir.path().join("backups")).unwrap();
    assert!(path.exists());
    assert!(!path.with_extension("json.tmp").exists());

    let read = Backup::read(&path).unwrap();
    assert_eq!(read.timestamp, backup.timestamp);
    assert_eq!(read.patients[0].id, backup.patients[0].id);
    assert_eq!(read.certificates.len(), 2);
}

#[test]
fn backups_in_the_same_second_get_their_own_files() {
    let dir = tempfile::tempdir().unwrap();
    let backups = dir.path().join("backups");
    let backup = Backup::snapshot(&seeded(), "memory").unwrap();

    let first = backup.write_to_dir(&backups).unwrap();
    let second = backup.write_to_dir(&backups).unwrap();
    let third = backup.write_to_dir(&backups).unwrap();

    assert_eq!(first.file_name().unwrap().to_string_lossy(), backup.file_name());
    let stem = backup.file_name().trim_end_matches(".json").to_string();
    assert_eq!(second.file_name().unwrap().to_string_lossy(), format!("{stem}_2.json"));
    assert_eq!(third.file_name().unwrap().to_string_lossy(), format!("{stem}_3.json"));

    let mut names: Vec<String> = std::fs::read_dir(&backups)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names.len(), 3, "{names:?}");
    assert!(Backup::read(&first).is_ok() && Backup::read(&third).is_ok());
}

#[test]
fn restore_into_empty_store() {
    let backup = Backup::snapshot(&seeded(), "memory").unwrap();
    let target = SqliteStore::open_in_memory().unwrap();

    let summary = backup.restore(&target).unwrap();
    assert_eq!(summary.patients, 1);
    assert_eq!(summary.doctors, 1);
    assert_eq!(summary.certificates, 2);
    assert_eq!(summary.skipped_certificates, 0);
    assert_eq!(target.stats().unwrap().certificates, 2);
}

#[test]
fn restore_remaps_existing_records_and_skips_duplicates() {
    let backup = Backup::snapshot(&seeded(), "memory").unwrap();

    // Same people, different ids.
    let target = MemoryStore::new();
    let existing = target
        .upsert_patient(&common::patient("Joao Silva", "52998224725", 0))
        .unwrap();
    target
        .upsert_doctor(&common::doctor("Maria Santos", "12345", 0))
        .unwrap();

    let summary = backup.restore(&target).unwrap();
    assert_eq!(summary.certificates, 2);
    assert_eq!(target.stats().unwrap().patients, 1);
    assert_eq!(target.certificates_for_patient(existing.id).unwrap().len(), 2);

    let again = backup.restore(&target).unwrap();
    assert_eq!(again.certificates, 0);
    assert_eq!(again.skipped_certificates, 2);
    assert_eq!(target.stats().unwrap().certificates, 2);
}
