//! JSON snapshots of a whole store.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use medcert_core::models::certificate::Certificate;
use medcert_core::models::doctor::Doctor;
use medcert_core::models::patient::Patient;

use crate::error::StorageError;
use crate::store::Store;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Backup {
    pub timestamp: jiff::Timestamp,
    /// Where the data came from, e.g. the database path.
    pub source: String,
    pub patients: Vec<Patient>,
    pub doctors: Vec<Doctor>,
    pub certificates: Vec<Certificate>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RestoreSummary {
    pub patients: usize,
    pub doctors: usize,
    pub certificates: usize,
    /// Certificates already present in the target store.
    pub skipped_certificates: usize,
}

impl Backup {
    pub fn snapshot(store: &dyn Store, source: impl Into<String>) -> Result<Self, StorageError> {
        Ok(Self {
            timestamp: jiff::Timestamp::now(),
            source: source.into(),
            patients: store.list_patients()?,
            doctors: store.list_doctors()?,
            certificates: store.list_certificates()?,
        })
    }

    /// `backup_YYYYMMDD_HHMMSS.json`, local time.
    pub fn file_name(&self) -> String {
        let local = self.timestamp.to_zoned(jiff::tz::TimeZone::system());
        format!("backup_{}.json", local.strftime("%Y%m%d_%H%M%S"))
    }

    /// Write the snapshot into `dir` (created if needed) and return its path.
    /// A backup taken in the same second gets a `_2`, `_3`, ... suffix
    /// instead of replacing the earlier file.
    pub fn write_to_dir(&self, dir: &Path) -> Result<PathBuf, StorageError> {
        std::fs::create_dir_all(dir)?;
        let json = serde_json::to_string_pretty(self)?;

        let tmp_path = dir.join(format!(".backup_{}.json.tmp", Uuid::new_v4()));
        std::fs::write(&tmp_path, &json)?;
        let linked = link_unused(&tmp_path, dir, &self.file_name());
        std::fs::remove_file(&tmp_path)?;
        let path = linked?;

        tracing::debug!(path = %path.display(), "backup written");
        Ok(path)
    }

    pub fn read(path: &Path) -> Result<Self, StorageError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Load the snapshot into `store`.
    ///
    /// Patients and doctors are upserted on their natural keys, so the
    /// target may already hold them under other ids; certificates are
    /// re-pointed at whatever ids the target ended up with.
    pub fn restore(&self, store: &dyn Store) -> Result<RestoreSummary, StorageError> {
        let mut summary = RestoreSummary::default();

        let mut patient_ids: HashMap<Uuid, Uuid> = HashMap::new();
        for patient in &self.patients {
            let stored = store.upsert_patient(patient)?;
            patient_ids.insert(patient.id, stored.id);
            summary.patients += 1;
        }

        let mut doctor_ids: HashMap<Uuid, Uuid> = HashMap::new();
        for doctor in &self.doctors {
            let stored = store.upsert_doctor(doctor)?;
            doctor_ids.insert(doctor.id, stored.id);
            summary.doctors += 1;
        }

        for certificate in &self.certificates {
            let mut certificate = certificate.clone();
            if let Some(id) = patient_ids.get(&certificate.patient_id) {
                certificate.patient_id = *id;
            }
            if let Some(id) = doctor_ids.get(&certificate.doctor_id) {
                certificate.doctor_id = *id;
            }
            match store.insert_certificate(&certificate) {
                Ok(()) => summary.certificates += 1,
                Err(StorageError::ConstraintViolation(reason)) => {
                    tracing::debug!(id = %certificate.id, %reason, "certificate skipped");
                    summary.skipped_certificates += 1;
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            patients = summary.patients,
            doctors = summary.doctors,
            certificates = summary.certificates,
            skipped = summary.skipped_certificates,
            "backup restored"
        );
        Ok(summary)
    }
}

/// Hard-link `tmp_path` under `name`, or the first free numbered variant of
/// it. Linking fails on an existing target, so a concurrent writer cannot be
/// overwritten.
fn link_unused(tmp_path: &Path, dir: &Path, name: &str) -> Result<PathBuf, StorageError> {
    let stem = name.strip_suffix(".json").unwrap_or(name);
    let mut n = 1u32;
    loop {
        let candidate = if n == 1 {
            dir.join(name)
        } else {
            dir.join(format!("{stem}_{n}.json"))
        };
        match std::fs::hard_link(tmp_path, &candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => n += 1,
            Err(e) => return Err(e.into()),
        }
    }
}
