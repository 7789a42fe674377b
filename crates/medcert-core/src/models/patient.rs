use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::fields::field;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentKind {
    #[serde(rename = "CPF")]
    Cpf,
    #[serde(rename = "RG")]
    Rg,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Cpf => "CPF",
            DocumentKind::Rg => "RG",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CPF" => Ok(DocumentKind::Cpf),
            "RG" => Ok(DocumentKind::Rg),
            _ => Err(CoreError::InvalidKind {
                field: field::PATIENT_DOC_KIND.to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Natural key of a patient: one record per identity document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatientKey {
    pub document_kind: DocumentKind,
    pub document_number: String,
}

impl fmt::Display for PatientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.document_kind, self.document_number)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub document_kind: DocumentKind,
    pub document_number: String,
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub employer: String,
    pub created_at: jiff::Timestamp,
    pub updated_at: jiff::Timestamp,
}

impl Patient {
    pub fn new(
        name: impl Into<String>,
        document_kind: DocumentKind,
        document_number: impl Into<String>,
    ) -> Self {
        let now = jiff::Timestamp::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            document_kind,
            document_number: document_number.into(),
            job_title: String::new(),
            employer: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_job(mut self, job_title: impl Into<String>, employer: impl Into<String>) -> Self {
        self.job_title = job_title.into();
        self.employer = employer.into();
        self
    }

    pub fn key(&self) -> PatientKey {
        PatientKey {
            document_kind: self.document_kind,
            document_number: self.document_number.clone(),
        }
    }
}
