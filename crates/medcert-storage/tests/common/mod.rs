#![allow(dead_code)]

use jiff::civil::date;
use jiff::{Span, Timestamp};
use uuid::Uuid;

use medcert_core::models::certificate::Certificate;
use medcert_core::models::doctor::{Doctor, RegistryKind};
use medcert_core::models::patient::{DocumentKind, Patient};
use medcert_storage::store::Store;
use medcert_storage::StorageError;

/// A fixed instant so ordering checks do not depend on clock resolution.
pub fn at(minutes: i64) -> Timestamp {
    Timestamp::from_second(1_760_000_000)
        .unwrap()
        .checked_add(Span::new().minutes(minutes))
        .unwrap()
}

pub fn patient(name: &str, number: &str, minutes: i64) -> Patient {
    let mut p = Patient::new(name, DocumentKind::Cpf, number).with_job("Analista", "ACME Ltda");
    p.created_at = at(minutes);
    p.updated_at = at(minutes);
    p
}

pub fn doctor(name: &str, number: &str, minutes: i64) -> Doctor {
    let mut d = Doctor::new(name, RegistryKind::Crm, number, "DF");
    d.created_at = at(minutes);
    d.updated_at = at(minutes);
    d
}

pub fn certificate(patient_id: Uuid, doctor_id: Uuid, minutes: i64) -> Certificate {
    Certificate {
        id: Uuid::new_v4(),
        patient_id,
        doctor_id,
        issued_on: date(2025, 11, 9),
        days_of_leave: 3,
        cid_code: Some("Z76.5".to_string()),
        homologated_on: date(2025, 11, 10),
        created_at: at(minutes),
    }
}

pub fn upsert_keeps_identity(store: &dyn Store) {
    let first = patient("Joao Silva", "52998224725", 0);
    let stored = store.upsert_patient(&first).unwrap();
    assert_eq!(stored.id, first.id);

    let mut again = patient("Joao da Silva", "52998224725", 5);
    again.job_title = "Gerente".to_string();
    let updated = store.upsert_patient(&again).unwrap();

    assert_eq!(updated.id, first.id);
    assert_eq!(updated.created_at, first.created_at);
    assert_eq!(updated.name, "Joao da Silva");
    assert_eq!(updated.job_title, "Gerente");
    assert!(updated.updated_at > first.updated_at);
    assert_eq!(store.stats().unwrap().patients, 1);

    let found = store.find_patient(&first.key()).unwrap().unwrap();
    assert_eq!(found.id, first.id);
    assert_eq!(found.name, "Joao da Silva");

    let doc = doctor("Maria Santos", "12345", 0);
    store.upsert_doctor(&doc).unwrap();
    let mut moved = doctor("Maria S. Santos", "12345", 1);
    moved.registry_uf = "SP".to_string();
    let updated = store.upsert_doctor(&moved).unwrap();
    assert_eq!(updated.id, doc.id);
    assert_eq!(updated.registry_uf, "SP");
    assert_eq!(store.stats().unwrap().doctors, 1);
}

pub fn same_number_other_kind_is_distinct(store: &dyn Store) {
    let cpf = patient("Ana Souza", "12345678", 0);
    let mut rg = patient("Ana Souza", "12345678", 1);
    rg.document_kind = DocumentKind::Rg;
    store.upsert_patient(&cpf).unwrap();
    store.upsert_patient(&rg).unwrap();
    assert_eq!(store.stats().unwrap().patients, 2);
}

pub fn missing_key_is_none(store: &dyn Store) {
    let key = patient("Nobody Here", "00000000191", 0).key();
    assert!(store.find_patient(&key).unwrap().is_none());
    let key = doctor("Nobody Here", "999", 0).key();
    assert!(store.find_doctor(&key).unwrap().is_none());
}

pub fn search_orders_and_limits(store: &dyn Store) {
    store.upsert_patient(&patient("Carlos Lima", "11144477735", 0)).unwrap();
    store.upsert_patient(&patient("ana souza", "52998224725", 1)).unwrap();
    store.upsert_patient(&patient("Bruno Costa", "39053344705", 2)).unwrap();

    let names = |found: Vec<Patient>| found.into_iter().map(|p| p.name).collect::<Vec<_>>();

    // Newest first without a query.
    assert_eq!(
        names(store.search_patients("", 10).unwrap()),
        ["Bruno Costa", "ana souza", "Carlos Lima"]
    );
    assert_eq!(names(store.search_patients("  ", 2).unwrap()), ["Bruno Costa", "ana souza"]);

    // By name, case-insensitively, with a query.
    assert_eq!(
        names(store.search_patients("A", 10).unwrap()),
        ["ana souza", "Bruno Costa", "Carlos Lima"]
    );
    assert_eq!(names(store.search_patients("SOUZA", 10).unwrap()), ["ana souza"]);

    // Formatted numbers match on their digits.
    assert_eq!(names(store.search_patients("529.982", 10).unwrap()), ["ana souza"]);
    assert_eq!(names(store.search_patients("390533", 10).unwrap()), ["Bruno Costa"]);

    assert!(store.search_patients("zzz", 10).unwrap().is_empty());
    assert!(store.search_patients("%", 10).unwrap().is_empty());
}

pub fn search_folds_accented_letters(store: &dyn Store) {
    store.upsert_patient(&patient("João Silva", "52998224725", 0)).unwrap();
    store.upsert_patient(&patient("Ângela Ávila", "11144477735", 1)).unwrap();
    store.upsert_patient(&patient("Zé Ramos", "39053344705", 2)).unwrap();
    store.upsert_doctor(&doctor("CÉLIA ÓRION", "12345", 0)).unwrap();

    let names = |found: Vec<Patient>| found.into_iter().map(|p| p.name).collect::<Vec<_>>();

    assert_eq!(names(store.search_patients("JOÃO", 10).unwrap()), ["João Silva"]);
    assert_eq!(names(store.search_patients("âVILA", 10).unwrap()), ["Ângela Ávila"]);
    assert_eq!(store.search_doctors("célia órion", 10).unwrap().len(), 1);

    // Ordered on the folded name: "â" sorts after every ASCII letter.
    assert_eq!(
        names(store.search_patients("a", 10).unwrap()),
        ["João Silva", "Zé Ramos", "Ângela Ávila"]
    );

    // A rename is searchable under its new spelling.
    store.upsert_patient(&patient("JOÃO DA SILVA", "52998224725", 3)).unwrap();
    assert_eq!(names(store.search_patients("joão da", 10).unwrap()), ["JOÃO DA SILVA"]);
}

pub fn doctor_search(store: &dyn Store) {
    store.upsert_doctor(&doctor("Maria Santos", "12345", 0)).unwrap();
    store.upsert_doctor(&doctor("Jose Pereira", "54321", 1)).unwrap();

    let found = store.search_doctors("santos", 10).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].registry_number, "12345");

    let found = store.search_doctors("543", 10).unwrap();
    assert_eq!(found[0].name, "Jose Pereira");

    let newest = store.search_doctors("", 1).unwrap();
    assert_eq!(newest[0].name, "Jose Pereira");
    assert_eq!(store.list_doctors().unwrap().len(), 2);
}

pub fn certificates_need_parents(store: &dyn Store) {
    let p = store.upsert_patient(&patient("Joao Silva", "52998224725", 0)).unwrap();
    let d = store.upsert_doctor(&doctor("Maria Santos", "12345", 0)).unwrap();

    let err = store
        .insert_certificate(&certificate(Uuid::new_v4(), d.id, 0))
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound { entity: "patient", .. }));

    let err = store
        .insert_certificate(&certificate(p.id, Uuid::new_v4(), 0))
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound { entity: "doctor", .. }));

    let mut zero = certificate(p.id, d.id, 0);
    zero.days_of_leave = 0;
    let err = store.insert_certificate(&zero).unwrap_err();
    assert!(matches!(err, StorageError::ConstraintViolation(_)));

    let ok = certificate(p.id, d.id, 0);
    store.insert_certificate(&ok).unwrap();
    let err = store.insert_certificate(&ok).unwrap_err();
    assert!(matches!(err, StorageError::ConstraintViolation(_)));

    assert_eq!(store.stats().unwrap().certificates, 1);
}

pub fn certificates_newest_first(store: &dyn Store) {
    let a = store.upsert_patient(&patient("Joao Silva", "52998224725", 0)).unwrap();
    let b = store.upsert_patient(&patient("Ana Souza", "11144477735", 0)).unwrap();
    let d = store.upsert_doctor(&doctor("Maria Santos", "12345", 0)).unwrap();

    let old = certificate(a.id, d.id, 1);
    let mut undisclosed = certificate(b.id, d.id, 2);
    undisclosed.cid_code = None;
    let new = certificate(a.id, d.id, 3);
    for c in [&old, &undisclosed, &new] {
        store.insert_certificate(c).unwrap();
    }

    let ids: Vec<Uuid> = store.list_certificates().unwrap().iter().map(|c| c.id).collect();
    assert_eq!(ids, [new.id, undisclosed.id, old.id]);

    let for_a: Vec<Uuid> = store
        .certificates_for_patient(a.id)
        .unwrap()
        .iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(for_a, [new.id, old.id]);

    let stored = store.certificates_for_patient(b.id).unwrap();
    assert_eq!(stored[0].cid_code, None);
    assert_eq!(stored[0].issued_on, date(2025, 11, 9));
    assert_eq!(stored[0].homologated_on, date(2025, 11, 10));
    assert_eq!(stored[0].created_at, at(2));
}
