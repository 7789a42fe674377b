use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use jiff::Timestamp;
use jiff::civil::Date;
use rusqlite::{Connection, Row, params};
use uuid::Uuid;

use medcert_core::models::certificate::Certificate;
use medcert_core::models::doctor::{Doctor, DoctorKey};
use medcert_core::models::patient::{Patient, PatientKey};
use medcert_core::validate::only_digits;

use crate::error::StorageError;
use crate::store::{Store, StoreStats, search_key};

const PATIENT_COLUMNS: &str =
    "id, name, document_kind, document_number, job_title, employer, created_at, updated_at";
const DOCTOR_COLUMNS: &str =
    "id, name, registry_kind, registry_number, registry_uf, created_at, updated_at";
const CERTIFICATE_COLUMNS: &str =
    "id, patient_id, doctor_id, issued_on, days_of_leave, cid_code, homologated_on, created_at";

/// Open a SQLite connection to the given path and run migrations
pub fn open_database(path: &Path) -> Result<Connection, StorageError> {
    let conn = Connection::open(path)?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing)
pub fn open_memory_database() -> Result<Connection, StorageError> {
    let conn = Connection::open_in_memory()?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

fn configure_pragmas(conn: &Connection) -> Result<(), StorageError> {
    conn.busy_timeout(Duration::from_secs(5))?;
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA foreign_keys=ON;",
    )?;
    Ok(())
}

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> Result<(), StorageError> {
    let current = current_version(conn);

    let migrations: [(i64, &str); 2] = [
        (1, include_str!("../migrations/001_initial.sql")),
        (2, include_str!("../migrations/002_search_name.sql")),
    ];

    for (version, sql) in migrations {
        if version > current {
            tracing::info!(version, "running migration");
            conn.execute_batch(sql)
                .map_err(|e| StorageError::MigrationFailed {
                    version,
                    reason: e.to_string(),
                })?;
        }
    }

    if current < 2 {
        fold_search_names(conn).map_err(|e| StorageError::MigrationFailed {
            version: 2,
            reason: e.to_string(),
        })?;
    }

    Ok(())
}

/// Recompute `search_name` for every row with [`search_key`].
fn fold_search_names(conn: &Connection) -> Result<(), StorageError> {
    for table in ["patients", "doctors"] {
        let names = {
            let mut stmt = conn.prepare(&format!("SELECT id, name FROM {table}"))?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };
        let mut update =
            conn.prepare(&format!("UPDATE {table} SET search_name = ?1 WHERE id = ?2"))?;
        for (id, name) in &names {
            update.execute(params![search_key(name), id])?;
        }
        tracing::debug!(table, rows = names.len(), "search names folded");
    }
    Ok(())
}

/// Current schema version (0 if no schema exists yet)
pub fn current_version(conn: &Connection) -> i64 {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, i64>(0)
    })
    .unwrap_or(0)
}

/// SQLite-backed [`Store`]. One connection, serialised behind a mutex.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (creating if needed) the database file and its parent directory.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = open_database(path)?;
        tracing::info!(path = %path.display(), "database opened");
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Ok(Self::from_connection(open_memory_database()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub fn schema_version(&self) -> Result<i64, StorageError> {
        Ok(current_version(&*self.conn()?))
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

impl Store for SqliteStore {
    fn upsert_patient(&self, patient: &Patient) -> Result<Patient, StorageError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let stored = match find_patient_in(&tx, &patient.key())? {
            Some(mut stored) => {
                stored.name = patient.name.clone();
                stored.job_title = patient.job_title.clone();
                stored.employer = patient.employer.clone();
                stored.updated_at = Timestamp::now();
                tx.execute(
                    "UPDATE patients
                     SET name = ?1, search_name = ?2, job_title = ?3, employer = ?4, updated_at = ?5
                     WHERE id = ?6",
                    params![
                        stored.name,
                        search_key(&stored.name),
                        stored.job_title,
                        stored.employer,
                        stored.updated_at.as_microsecond(),
                        stored.id.to_string(),
                    ],
                )?;
                stored
            }
            None => {
                tx.execute(
                    &format!(
                        "INSERT INTO patients ({PATIENT_COLUMNS}, search_name)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
                    ),
                    params![
                        patient.id.to_string(),
                        patient.name,
                        patient.document_kind.as_str(),
                        patient.document_number,
                        patient.job_title,
                        patient.employer,
                        patient.created_at.as_microsecond(),
                        patient.updated_at.as_microsecond(),
                        search_key(&patient.name),
                    ],
                )
                .map_err(constraint)?;
                patient.clone()
            }
        };

        tx.commit()?;
        tracing::debug!(key = %stored.key(), "patient stored");
        Ok(stored)
    }

    fn find_patient(&self, key: &PatientKey) -> Result<Option<Patient>, StorageError> {
        find_patient_in(&*self.conn()?, key)
    }

    fn search_patients(&self, query: &str, limit: usize) -> Result<Vec<Patient>, StorageError> {
        let conn = self.conn()?;
        let query = query.trim();
        if query.is_empty() {
            return query_patients(
                &conn,
                &format!(
                    "SELECT {PATIENT_COLUMNS} FROM patients
                     ORDER BY created_at DESC, rowid DESC LIMIT ?1"
                ),
                params![sql_limit(limit)],
            );
        }
        query_patients(
            &conn,
            &format!(
                r"SELECT {PATIENT_COLUMNS} FROM patients
                  WHERE search_name LIKE ?1 ESCAPE '\' OR document_number LIKE ?1 ESCAPE '\'
                     OR (?2 <> '' AND document_number LIKE ?2 ESCAPE '\')
                  ORDER BY search_name, rowid LIMIT ?3"
            ),
            params![like_pattern(&search_key(query)), digits_pattern(query), sql_limit(limit)],
        )
    }

    fn list_patients(&self) -> Result<Vec<Patient>, StorageError> {
        query_patients(
            &*self.conn()?,
            &format!("SELECT {PATIENT_COLUMNS} FROM patients ORDER BY rowid"),
            [],
        )
    }

    fn upsert_doctor(&self, doctor: &Doctor) -> Result<Doctor, StorageError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let stored = match find_doctor_in(&tx, &doctor.key())? {
            Some(mut stored) => {
                stored.name = doctor.name.clone();
                stored.registry_uf = doctor.registry_uf.clone();
                stored.updated_at = Timestamp::now();
                tx.execute(
                    "UPDATE doctors
                     SET name = ?1, search_name = ?2, registry_uf = ?3, updated_at = ?4
                     WHERE id = ?5",
                    params![
                        stored.name,
                        search_key(&stored.name),
                        stored.registry_uf,
                        stored.updated_at.as_microsecond(),
                        stored.id.to_string(),
                    ],
                )?;
                stored
            }
            None => {
                tx.execute(
                    &format!(
                        "INSERT INTO doctors ({DOCTOR_COLUMNS}, search_name)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
                    ),
                    params![
                        doctor.id.to_string(),
                        doctor.name,
                        doctor.registry_kind.as_str(),
                        doctor.registry_number,
                        doctor.registry_uf,
                        doctor.created_at.as_microsecond(),
                        doctor.updated_at.as_microsecond(),
                        search_key(&doctor.name),
                    ],
                )
                .map_err(constraint)?;
                doctor.clone()
            }
        };

        tx.commit()?;
        tracing::debug!(key = %stored.key(), "doctor stored");
        Ok(stored)
    }

    fn find_doctor(&self, key: &DoctorKey) -> Result<Option<Doctor>, StorageError> {
        find_doctor_in(&*self.conn()?, key)
    }

    fn search_doctors(&self, query: &str, limit: usize) -> Result<Vec<Doctor>, StorageError> {
        let conn = self.conn()?;
        let query = query.trim();
        if query.is_empty() {
            return query_doctors(
                &conn,
                &format!(
                    "SELECT {DOCTOR_COLUMNS} FROM doctors
                     ORDER BY created_at DESC, rowid DESC LIMIT ?1"
                ),
                params![sql_limit(limit)],
            );
        }
        query_doctors(
            &conn,
            &format!(
                r"SELECT {DOCTOR_COLUMNS} FROM doctors
                  WHERE search_name LIKE ?1 ESCAPE '\' OR registry_number LIKE ?1 ESCAPE '\'
                     OR (?2 <> '' AND registry_number LIKE ?2 ESCAPE '\')
                  ORDER BY search_name, rowid LIMIT ?3"
            ),
            params![like_pattern(&search_key(query)), digits_pattern(query), sql_limit(limit)],
        )
    }

    fn list_doctors(&self) -> Result<Vec<Doctor>, StorageError> {
        query_doctors(
            &*self.conn()?,
            &format!("SELECT {DOCTOR_COLUMNS} FROM doctors ORDER BY rowid"),
            [],
        )
    }

    fn insert_certificate(&self, certificate: &Certificate) -> Result<(), StorageError> {
        let conn = self.conn()?;

        let exists = |table: &str, id: Uuid| -> Result<bool, StorageError> {
            let count: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM {table} WHERE id = ?1"),
                params![id.to_string()],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        };
        if !exists("patients", certificate.patient_id)? {
            return Err(StorageError::NotFound {
                entity: "patient",
                key: certificate.patient_id.to_string(),
            });
        }
        if !exists("doctors", certificate.doctor_id)? {
            return Err(StorageError::NotFound {
                entity: "doctor",
                key: certificate.doctor_id.to_string(),
            });
        }

        conn.execute(
            &format!(
                "INSERT INTO certificates ({CERTIFICATE_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
            ),
            params![
                certificate.id.to_string(),
                certificate.patient_id.to_string(),
                certificate.doctor_id.to_string(),
                certificate.issued_on.to_string(),
                certificate.days_of_leave,
                certificate.cid_code,
                certificate.homologated_on.to_string(),
                certificate.created_at.as_microsecond(),
            ],
        )
        .map_err(constraint)?;
        Ok(())
    }

    fn list_certificates(&self) -> Result<Vec<Certificate>, StorageError> {
        query_certificates(
            &*self.conn()?,
            &format!(
                "SELECT {CERTIFICATE_COLUMNS} FROM certificates
                 ORDER BY created_at DESC, rowid DESC"
            ),
            [],
        )
    }

    fn certificates_for_patient(&self, patient_id: Uuid) -> Result<Vec<Certificate>, StorageError> {
        query_certificates(
            &*self.conn()?,
            &format!(
                "SELECT {CERTIFICATE_COLUMNS} FROM certificates WHERE patient_id = ?1
                 ORDER BY created_at DESC, rowid DESC"
            ),
            params![patient_id.to_string()],
        )
    }

    fn stats(&self) -> Result<StoreStats, StorageError> {
        let conn = self.conn()?;
        let count = |table: &str| -> Result<usize, StorageError> {
            let n: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
            Ok(usize::try_from(n).unwrap_or_default())
        };
        Ok(StoreStats {
            patients: count("patients")?,
            doctors: count("doctors")?,
            certificates: count("certificates")?,
        })
    }
}

fn find_patient_in(conn: &Connection, key: &PatientKey) -> Result<Option<Patient>, StorageError> {
    let result = conn.query_row(
        &format!(
            "SELECT {PATIENT_COLUMNS} FROM patients
             WHERE document_kind = ?1 AND document_number = ?2"
        ),
        params![key.document_kind.as_str(), key.document_number],
        PatientRow::read,
    );
    match result {
        Ok(row) => Ok(Some(row.into_model()?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn find_doctor_in(conn: &Connection, key: &DoctorKey) -> Result<Option<Doctor>, StorageError> {
    let result = conn.query_row(
        &format!(
            "SELECT {DOCTOR_COLUMNS} FROM doctors
             WHERE registry_kind = ?1 AND registry_number = ?2"
        ),
        params![key.registry_kind.as_str(), key.registry_number],
        DoctorRow::read,
    );
    match result {
        Ok(row) => Ok(Some(row.into_model()?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn query_patients(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Patient>, StorageError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, PatientRow::read)?;
    rows.map(|r| r?.into_model()).collect()
}

fn query_doctors(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Doctor>, StorageError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, DoctorRow::read)?;
    rows.map(|r| r?.into_model()).collect()
}

fn query_certificates(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Certificate>, StorageError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, CertificateRow::read)?;
    rows.map(|r| r?.into_model()).collect()
}

/// Raw column values; conversion errors are reported as [`StorageError`]
/// rather than squeezed into `rusqlite::Error`.
struct PatientRow {
    id: String,
    name: String,
    document_kind: String,
    document_number: String,
    job_title: String,
    employer: String,
    created_at: i64,
    updated_at: i64,
}

impl PatientRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            document_kind: row.get(2)?,
            document_number: row.get(3)?,
            job_title: row.get(4)?,
            employer: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn into_model(self) -> Result<Patient, StorageError> {
        let document_kind = self.document_kind.parse().map_err(|_| StorageError::InvalidRow {
            field: "document_kind",
            value: self.document_kind.clone(),
        })?;
        Ok(Patient {
            id: uuid(&self.id)?,
            name: self.name,
            document_kind,
            document_number: self.document_number,
            job_title: self.job_title,
            employer: self.employer,
            created_at: timestamp(self.created_at)?,
            updated_at: timestamp(self.updated_at)?,
        })
    }
}

struct DoctorRow {
    id: String,
    name: String,
    registry_kind: String,
    registry_number: String,
    registry_uf: String,
    created_at: i64,
    updated_at: i64,
}

impl DoctorRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            registry_kind: row.get(2)?,
            registry_number: row.get(3)?,
            registry_uf: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    fn into_model(self) -> Result<Doctor, StorageError> {
        let registry_kind = self.registry_kind.parse().map_err(|_| StorageError::InvalidRow {
            field: "registry_kind",
            value: self.registry_kind.clone(),
        })?;
        Ok(Doctor {
            id: uuid(&self.id)?,
            name: self.name,
            registry_kind,
            registry_number: self.registry_number,
            registry_uf: self.registry_uf,
            created_at: timestamp(self.created_at)?,
            updated_at: timestamp(self.updated_at)?,
        })
    }
}

struct CertificateRow {
    id: String,
    patient_id: String,
    doctor_id: String,
    issued_on: String,
    days_of_leave: u32,
    cid_code: Option<String>,
    homologated_on: String,
    created_at: i64,
}

impl CertificateRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            patient_id: row.get(1)?,
            doctor_id: row.get(2)?,
            issued_on: row.get(3)?,
            days_of_leave: row.get(4)?,
            cid_code: row.get(5)?,
            homologated_on: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    fn into_model(self) -> Result<Certificate, StorageError> {
        Ok(Certificate {
            id: uuid(&self.id)?,
            patient_id: uuid(&self.patient_id)?,
            doctor_id: uuid(&self.doctor_id)?,
            issued_on: date("issued_on", &self.issued_on)?,
            days_of_leave: self.days_of_leave,
            cid_code: self.cid_code,
            homologated_on: date("homologated_on", &self.homologated_on)?,
            created_at: timestamp(self.created_at)?,
        })
    }
}

fn uuid(value: &str) -> Result<Uuid, StorageError> {
    Uuid::parse_str(value).map_err(|_| StorageError::InvalidRow {
        field: "id",
        value: value.to_string(),
    })
}

fn timestamp(micros: i64) -> Result<Timestamp, StorageError> {
    Timestamp::from_microsecond(micros).map_err(|_| StorageError::InvalidRow {
        field: "timestamp",
        value: micros.to_string(),
    })
}

fn date(field: &'static str, value: &str) -> Result<Date, StorageError> {
    value.parse().map_err(|_| StorageError::InvalidRow {
        field,
        value: value.to_string(),
    })
}

fn constraint(e: rusqlite::Error) -> StorageError {
    match &e {
        rusqlite::Error::SqliteFailure(err, message)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StorageError::ConstraintViolation(message.clone().unwrap_or_else(|| err.to_string()))
        }
        _ => StorageError::Sqlite(e),
    }
}

/// `%query%` with LIKE wildcards in the query escaped.
fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn digits_pattern(query: &str) -> String {
    let digits = only_digits(query);
    if digits.is_empty() {
        String::new()
    } else {
        format!("%{digits}%")
    }
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}
