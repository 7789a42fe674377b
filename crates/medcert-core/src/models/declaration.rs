use jiff::civil::Date;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::fields::{self, field};
use crate::models::certificate::Certificate;
use crate::models::doctor::{Doctor, RegistryKind};
use crate::models::patient::{DocumentKind, Patient};
use crate::validate;

/// Patient section of an intake form, as typed by the operator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientDetails {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "tipo_documento")]
    pub document_kind: String,
    #[serde(rename = "numero_documento")]
    pub document_number: String,
    #[serde(rename = "cargo", default)]
    pub job_title: String,
    #[serde(rename = "empresa", default)]
    pub employer: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CertificateDetails {
    #[serde(rename = "data_atestado")]
    pub issued_on: String,
    #[serde(rename = "dias_afastamento", default)]
    pub days_of_leave: u32,
    #[serde(rename = "cid", default)]
    pub cid: String,
    #[serde(rename = "cid_nao_informado", default)]
    pub cid_not_informed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DoctorDetails {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "tipo_registro")]
    pub registry_kind: String,
    #[serde(rename = "numero_registro")]
    pub registry_number: String,
    #[serde(rename = "uf_registro")]
    pub registry_uf: String,
}

/// Everything needed to produce one homologation declaration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Declaration {
    #[serde(rename = "paciente")]
    pub patient: PatientDetails,
    #[serde(rename = "atestado")]
    pub certificate: CertificateDetails,
    #[serde(rename = "medico")]
    pub doctor: DoctorDetails,
}

/// A declaration whose every field passed validation.
#[derive(Debug, Clone)]
pub struct CheckedDeclaration {
    pub patient: Patient,
    pub doctor: Doctor,
    pub issued_on: Date,
    pub days_of_leave: u32,
    pub cid_code: Option<String>,
}

impl Declaration {
    /// Apply [`validate::sanitize_input`] to every free-text field.
    pub fn sanitized(&self) -> Self {
        let s = validate::sanitize_input;
        Self {
            patient: PatientDetails {
                name: s(&self.patient.name),
                document_kind: s(&self.patient.document_kind),
                document_number: s(&self.patient.document_number),
                job_title: s(&self.patient.job_title),
                employer: s(&self.patient.employer),
            },
            certificate: CertificateDetails {
                issued_on: s(&self.certificate.issued_on),
                days_of_leave: self.certificate.days_of_leave,
                cid: s(&self.certificate.cid),
                cid_not_informed: self.certificate.cid_not_informed,
            },
            doctor: DoctorDetails {
                name: s(&self.doctor.name),
                registry_kind: s(&self.doctor.registry_kind),
                registry_number: s(&self.doctor.registry_number),
                registry_uf: s(&self.doctor.registry_uf),
            },
        }
    }

    /// Validate the whole record. The first failing field is reported; the
    /// presence checks run before any format check so a blank form always
    /// reports the first missing field.
    pub fn validate(&self) -> Result<CheckedDeclaration, CoreError> {
        self.check_required()?;

        let p = &self.patient;
        let c = &self.certificate;
        let d = &self.doctor;

        let document_kind: DocumentKind = p.document_kind.parse()?;
        let document_number = match document_kind {
            DocumentKind::Cpf if !validate::is_valid_cpf(&p.document_number) => {
                return Err(CoreError::invalid(
                    field::PATIENT_DOC_NUMBER,
                    "CPF must have 11 digits with valid check digits",
                ));
            }
            DocumentKind::Rg if !validate::is_valid_rg(&p.document_number) => {
                return Err(CoreError::invalid(
                    field::PATIENT_DOC_NUMBER,
                    "RG must have between 5 and 15 digits",
                ));
            }
            _ => validate::only_digits(&p.document_number),
        };

        check_length(field::PATIENT_NAME, &p.name, fields::MAX_NAME_LENGTH)?;
        if !validate::is_valid_person_name(&p.name) {
            return Err(CoreError::invalid(
                field::PATIENT_NAME,
                "full name with at least two words, letters only",
            ));
        }
        check_length(field::PATIENT_JOB_TITLE, &p.job_title, fields::MAX_JOB_TITLE_LENGTH)?;
        check_length(field::PATIENT_EMPLOYER, &p.employer, fields::MAX_EMPLOYER_LENGTH)?;
        check_length(field::DOCTOR_NAME, &d.name, fields::MAX_NAME_LENGTH)?;

        let issued_on = validate::parse_date(&c.issued_on).ok_or_else(|| {
            CoreError::invalid(field::CERTIFICATE_DATE, format!("not a date: {}", c.issued_on))
        })?;

        if !(fields::MIN_LEAVE_DAYS..=fields::MAX_LEAVE_DAYS).contains(&c.days_of_leave) {
            return Err(CoreError::invalid(
                field::LEAVE_DAYS,
                format!(
                    "must be between {} and {}",
                    fields::MIN_LEAVE_DAYS,
                    fields::MAX_LEAVE_DAYS
                ),
            ));
        }

        let cid_code = if c.cid_not_informed {
            None
        } else {
            let cid = c.cid.trim().to_uppercase();
            check_length(field::CID_CODE, &cid, fields::MAX_CID_LENGTH)?;
            if !validate::is_valid_cid(&cid) {
                return Err(CoreError::invalid(
                    field::CID_CODE,
                    format!("not an ICD-10 code: {cid}"),
                ));
            }
            Some(cid)
        };

        let registry_kind: RegistryKind = d.registry_kind.parse()?;
        if !validate::is_valid_uf(&d.registry_uf) {
            return Err(CoreError::invalid(
                field::DOCTOR_REGISTRY_UF,
                format!("unknown state: {}", d.registry_uf),
            ));
        }

        let patient = Patient::new(validate::normalize_name(&p.name), document_kind, document_number)
            .with_job(p.job_title.trim(), p.employer.trim());
        let doctor = Doctor::new(
            d.name.trim(),
            registry_kind,
            d.registry_number.trim(),
            d.registry_uf.trim().to_ascii_uppercase(),
        );

        Ok(CheckedDeclaration {
            patient,
            doctor,
            issued_on,
            days_of_leave: c.days_of_leave,
            cid_code,
        })
    }

    fn check_required(&self) -> Result<(), CoreError> {
        let p = &self.patient;
        let c = &self.certificate;
        let d = &self.doctor;

        let present = [
            (field::PATIENT_NAME, !p.name.trim().is_empty()),
            (field::PATIENT_DOC_KIND, !p.document_kind.trim().is_empty()),
            (field::PATIENT_DOC_NUMBER, !p.document_number.trim().is_empty()),
            (field::CERTIFICATE_DATE, !c.issued_on.trim().is_empty()),
            (field::LEAVE_DAYS, c.days_of_leave != 0),
            (field::CID_CODE, c.cid_not_informed || !c.cid.trim().is_empty()),
            (field::DOCTOR_NAME, !d.name.trim().is_empty()),
            (field::DOCTOR_REGISTRY_KIND, !d.registry_kind.trim().is_empty()),
            (field::DOCTOR_REGISTRY_NUMBER, !d.registry_number.trim().is_empty()),
            (field::DOCTOR_REGISTRY_UF, !d.registry_uf.trim().is_empty()),
        ];
        debug_assert_eq!(present.len(), fields::REQUIRED.len());

        match present.iter().find(|(_, ok)| !ok) {
            Some((name, _)) => Err(CoreError::MissingField((*name).to_string())),
            None => Ok(()),
        }
    }
}

impl CheckedDeclaration {
    /// Text printed for the diagnosis code.
    pub fn cid_display(&self) -> &str {
        self.cid_code.as_deref().unwrap_or(fields::CID_NOT_INFORMED)
    }

    /// Build the certificate record once patient and doctor are persisted.
    pub fn certificate(&self, patient_id: Uuid, doctor_id: Uuid, homologated_on: Date) -> Certificate {
        Certificate {
            id: Uuid::new_v4(),
            patient_id,
            doctor_id,
            issued_on: self.issued_on,
            days_of_leave: self.days_of_leave,
            cid_code: self.cid_code.clone(),
            homologated_on,
            created_at: jiff::Timestamp::now(),
        }
    }
}

fn check_length(name: &str, value: &str, max: usize) -> Result<(), CoreError> {
    if value.trim().chars().count() > max {
        return Err(CoreError::invalid(name, format!("longer than {max} characters")));
    }
    Ok(())
}
