use serde::Serialize;
use uuid::Uuid;

use medcert_core::models::certificate::Certificate;
use medcert_core::models::doctor::{Doctor, DoctorKey};
use medcert_core::models::patient::{Patient, PatientKey};

use crate::error::StorageError;

/// Autocomplete result cap used by the HTTP API.
pub const DEFAULT_SEARCH_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub patients: usize,
    pub doctors: usize,
    pub certificates: usize,
}

/// Folded form of a name or query used for matching and ordering searches.
pub fn search_key(text: &str) -> String {
    text.to_lowercase()
}

/// Key-lookup and insert/update contract shared by every backend.
///
/// Upserts match on the natural key (`document_kind` + `document_number`
/// for patients, `registry_kind` + `registry_number` for doctors). An
/// existing record gets the incoming mutable fields and a fresh
/// `updated_at` but keeps its `id` and `created_at`; otherwise the record is
/// stored as given. Both return the stored record.
///
/// Searches match the query case-insensitively (full Unicode folding, see
/// [`search_key`]) against the name or the document/registry number. With a
/// query, results are ordered by [`search_key`] of the name; with an empty
/// query, newest first.
pub trait Store: Send + Sync {
    fn upsert_patient(&self, patient: &Patient) -> Result<Patient, StorageError>;

    fn find_patient(&self, key: &PatientKey) -> Result<Option<Patient>, StorageError>;

    fn search_patients(&self, query: &str, limit: usize) -> Result<Vec<Patient>, StorageError>;

    fn list_patients(&self) -> Result<Vec<Patient>, StorageError>;

    fn upsert_doctor(&self, doctor: &Doctor) -> Result<Doctor, StorageError>;

    fn find_doctor(&self, key: &DoctorKey) -> Result<Option<Doctor>, StorageError>;

    fn search_doctors(&self, query: &str, limit: usize) -> Result<Vec<Doctor>, StorageError>;

    fn list_doctors(&self) -> Result<Vec<Doctor>, StorageError>;

    /// Record a certificate. Its patient and doctor must exist, `days_of_leave`
    /// must be positive and the id must be new.
    fn insert_certificate(&self, certificate: &Certificate) -> Result<(), StorageError>;

    /// Every certificate, newest first.
    fn list_certificates(&self) -> Result<Vec<Certificate>, StorageError>;

    fn certificates_for_patient(&self, patient_id: Uuid) -> Result<Vec<Certificate>, StorageError>;

    fn stats(&self) -> Result<StoreStats, StorageError>;
}
