use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use uuid::Uuid;

use medcert_core::models::certificate::Certificate;
use medcert_core::models::doctor::{Doctor, DoctorKey};
use medcert_core::models::patient::{Patient, PatientKey};
use medcert_core::validate::only_digits;

use crate::error::StorageError;
use crate::store::{Store, StoreStats, search_key};

/// Process-local store for tests and throwaway runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<Data>,
}

#[derive(Debug, Default)]
struct Data {
    patients: Vec<Patient>,
    doctors: Vec<Doctor>,
    certificates: Vec<Certificate>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Data>, StorageError> {
        self.data.read().map_err(|_| StorageError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Data>, StorageError> {
        self.data.write().map_err(|_| StorageError::LockPoisoned)
    }
}

/// Case-insensitive match on either field; the number also matches on the
/// query's digits alone.
fn matches(query: &str, name: &str, number: &str) -> bool {
    let needle = search_key(query);
    let digits = only_digits(query);
    search_key(name).contains(&needle)
        || search_key(number).contains(&needle)
        || (!digits.is_empty() && number.contains(&digits))
}

/// Shared ordering for search results: by name when searching, newest
/// first otherwise.
fn order_and_limit<T>(
    mut items: Vec<T>,
    query: &str,
    limit: usize,
    name: impl Fn(&T) -> String,
    created: impl Fn(&T) -> jiff::Timestamp,
) -> Vec<T> {
    if query.is_empty() {
        items.sort_by_key(|item| std::cmp::Reverse(created(item)));
    } else {
        items.sort_by_key(|item| search_key(&name(item)));
    }
    items.truncate(limit);
    items
}

impl Store for MemoryStore {
    fn upsert_patient(&self, patient: &Patient) -> Result<Patient, StorageError> {
        let mut data = self.write()?;
        let key = patient.key();
        if let Some(stored) = data.patients.iter_mut().find(|p| p.key() == key) {
            stored.name = patient.name.clone();
            stored.job_title = patient.job_title.clone();
            stored.employer = patient.employer.clone();
            stored.updated_at = jiff::Timestamp::now();
            return Ok(stored.clone());
        }
        data.patients.push(patient.clone());
        Ok(patient.clone())
    }

    fn find_patient(&self, key: &PatientKey) -> Result<Option<Patient>, StorageError> {
        Ok(self.read()?.patients.iter().find(|p| p.key() == *key).cloned())
    }

    fn search_patients(&self, query: &str, limit: usize) -> Result<Vec<Patient>, StorageError> {
        let query = query.trim();
        let found: Vec<Patient> = self
            .read()?
            .patients
            .iter()
            .filter(|p| query.is_empty() || matches(query, &p.name, &p.document_number))
            .cloned()
            .collect();
        Ok(order_and_limit(found, query, limit, |p| p.name.clone(), |p| p.created_at))
    }

    fn list_patients(&self) -> Result<Vec<Patient>, StorageError> {
        Ok(self.read()?.patients.clone())
    }

    fn upsert_doctor(&self, doctor: &Doctor) -> Result<Doctor, StorageError> {
        let mut data = self.write()?;
        let key = doctor.key();
        if let Some(stored) = data.doctors.iter_mut().find(|d| d.key() == key) {
            stored.name = doctor.name.clone();
            stored.registry_uf = doctor.registry_uf.clone();
            stored.updated_at = jiff::Timestamp::now();
            return Ok(stored.clone());
        }
        data.doctors.push(doctor.clone());
        Ok(doctor.clone())
    }

    fn find_doctor(&self, key: &DoctorKey) -> Result<Option<Doctor>, StorageError> {
        Ok(self.read()?.doctors.iter().find(|d| d.key() == *key).cloned())
    }

    fn search_doctors(&self, query: &str, limit: usize) -> Result<Vec<Doctor>, StorageError> {
        let query = query.trim();
        let found: Vec<Doctor> = self
            .read()?
            .doctors
            .iter()
            .filter(|d| query.is_empty() || matches(query, &d.name, &d.registry_number))
            .cloned()
            .collect();
        Ok(order_and_limit(found, query, limit, |d| d.name.clone(), |d| d.created_at))
    }

    fn list_doctors(&self) -> Result<Vec<Doctor>, StorageError> {
        Ok(self.read()?.doctors.clone())
    }

    fn insert_certificate(&self, certificate: &Certificate) -> Result<(), StorageError> {
        if certificate.days_of_leave == 0 {
            return Err(StorageError::ConstraintViolation(
                "days_of_leave must be greater than zero".to_string(),
            ));
        }
        let mut data = self.write()?;
        if !data.patients.iter().any(|p| p.id == certificate.patient_id) {
            return Err(StorageError::NotFound {
                entity: "patient",
                key: certificate.patient_id.to_string(),
            });
        }
        if !data.doctors.iter().any(|d| d.id == certificate.doctor_id) {
            return Err(StorageError::NotFound {
                entity: "doctor",
                key: certificate.doctor_id.to_string(),
            });
        }
        if data.certificates.iter().any(|c| c.id == certificate.id) {
            return Err(StorageError::ConstraintViolation(format!(
                "certificate {} already exists",
                certificate.id
            )));
        }
        data.certificates.push(certificate.clone());
        Ok(())
    }

    fn list_certificates(&self) -> Result<Vec<Certificate>, StorageError> {
        let mut all = self.read()?.certificates.clone();
        all.reverse();
        all.sort_by_key(|c| std::cmp::Reverse(c.created_at));
        Ok(all)
    }

    fn certificates_for_patient(&self, patient_id: Uuid) -> Result<Vec<Certificate>, StorageError> {
        Ok(self
            .list_certificates()?
            .into_iter()
            .filter(|c| c.patient_id == patient_id)
            .collect())
    }

    fn stats(&self) -> Result<StoreStats, StorageError> {
        let data = self.read()?;
        Ok(StoreStats {
            patients: data.patients.len(),
            doctors: data.doctors.len(),
            certificates: data.certificates.len(),
        })
    }
}
