use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::fields::field;

/// Professional council a health professional is registered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistryKind {
    #[serde(rename = "CRM")]
    Crm,
    #[serde(rename = "CRO")]
    Cro,
    #[serde(rename = "CRN")]
    Crn,
    #[serde(rename = "RMs", alias = "RMS")]
    Rms,
}

impl RegistryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistryKind::Crm => "CRM",
            RegistryKind::Cro => "CRO",
            RegistryKind::Crn => "CRN",
            RegistryKind::Rms => "RMs",
        }
    }
}

impl fmt::Display for RegistryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistryKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CRM" => Ok(RegistryKind::Crm),
            "CRO" => Ok(RegistryKind::Cro),
            "CRN" => Ok(RegistryKind::Crn),
            "RMS" => Ok(RegistryKind::Rms),
            _ => Err(CoreError::InvalidKind {
                field: field::DOCTOR_REGISTRY_KIND.to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Natural key of a doctor: one record per council registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DoctorKey {
    pub registry_kind: RegistryKind,
    pub registry_number: String,
}

impl fmt::Display for DoctorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.registry_kind, self.registry_number)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    pub registry_kind: RegistryKind,
    pub registry_number: String,
    pub registry_uf: String,
    pub created_at: jiff::Timestamp,
    pub updated_at: jiff::Timestamp,
}

impl Doctor {
    pub fn new(
        name: impl Into<String>,
        registry_kind: RegistryKind,
        registry_number: impl Into<String>,
        registry_uf: impl Into<String>,
    ) -> Self {
        let now = jiff::Timestamp::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            registry_kind,
            registry_number: registry_number.into(),
            registry_uf: registry_uf.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> DoctorKey {
        DoctorKey {
            registry_kind: self.registry_kind,
            registry_number: self.registry_number.clone(),
        }
    }
}
