//! Declaration field names and limits.
//!
//! The field names double as the placeholder names used by the templates
//! (`{nome_paciente}` etc.) and as the names reported by validation errors.

pub mod field {
    pub const PATIENT_NAME: &str = "nome_paciente";
    pub const PATIENT_DOC_KIND: &str = "tipo_doc_paciente";
    pub const PATIENT_DOC_NUMBER: &str = "numero_doc_paciente";
    pub const PATIENT_JOB_TITLE: &str = "cargo_paciente";
    pub const PATIENT_EMPLOYER: &str = "empresa_paciente";
    pub const CERTIFICATE_DATE: &str = "data_atestado";
    pub const LEAVE_DAYS: &str = "qtd_dias_atestado";
    pub const CID_CODE: &str = "codigo_cid";
    pub const DOCTOR_NAME: &str = "nome_medico";
    pub const DOCTOR_REGISTRY_KIND: &str = "tipo_registro_medico";
    pub const DOCTOR_REGISTRY_NUMBER: &str = "crm_medico";
    pub const DOCTOR_REGISTRY_UF: &str = "uf_crm_medico";
}

/// Fields that must be present and non-blank before any document is generated.
pub const REQUIRED: [&str; 10] = [
    field::PATIENT_NAME,
    field::PATIENT_DOC_KIND,
    field::PATIENT_DOC_NUMBER,
    field::CERTIFICATE_DATE,
    field::LEAVE_DAYS,
    field::CID_CODE,
    field::DOCTOR_NAME,
    field::DOCTOR_REGISTRY_KIND,
    field::DOCTOR_REGISTRY_NUMBER,
    field::DOCTOR_REGISTRY_UF,
];

pub const MIN_LEAVE_DAYS: u32 = 1;
pub const MAX_LEAVE_DAYS: u32 = 365;
pub const MIN_NAME_LENGTH: usize = 3;
pub const MAX_NAME_LENGTH: usize = 200;
pub const MAX_JOB_TITLE_LENGTH: usize = 150;
pub const MAX_EMPLOYER_LENGTH: usize = 200;
pub const MAX_CID_LENGTH: usize = 20;
pub const CPF_LENGTH: usize = 11;
pub const RG_MIN_LENGTH: usize = 5;
pub const RG_MAX_LENGTH: usize = 15;

/// Lowercase connectives kept lowercase inside normalised names.
pub const NAME_PARTICLES: [&str; 6] = ["da", "de", "do", "das", "dos", "e"];

/// Text written in place of the CID when the certificate does not disclose it.
pub const CID_NOT_INFORMED: &str = "Não Informado";

pub const UFS: [&str; 27] = [
    "AC", "AL", "AP", "AM", "BA", "CE", "DF", "ES", "GO", "MA", "MT", "MS", "MG", "PA", "PB", "PR",
    "PE", "PI", "RJ", "RN", "RS", "RO", "RR", "SC", "SP", "SE", "TO",
];
