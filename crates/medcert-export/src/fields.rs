//! Replacement map for a validated declaration.

use jiff::civil::Date;

use medcert_core::models::declaration::CheckedDeclaration;
use medcert_core::models::patient::DocumentKind;
use medcert_core::validate::{format_cpf, format_date_br, strip_honorifics};

use crate::clinic::ClinicProfile;
use crate::placeholder::Replacements;

/// Placeholder tokens understood by the templates.
///
/// Word templates written by the clinic use a couple of spellings that
/// differ from the HTML template (`{código_cid}`, `{crm__medico}`); both
/// are always filled.
pub mod token {
    pub const PATIENT_NAME: &str = "{nome_paciente}";
    pub const PATIENT_DOCUMENT: &str = "{documento_paciente_formatado}";
    pub const PATIENT_JOB_TITLE: &str = "{cargo_paciente}";
    pub const PATIENT_EMPLOYER: &str = "{empresa_paciente}";
    pub const CERTIFICATE_DATE: &str = "{data_atestado}";
    pub const LEAVE_DAYS: &str = "{qtd_dias_atestado}";
    pub const CID_CODE: &str = "{codigo_cid}";
    pub const CID_CODE_ACCENTED: &str = "{código_cid}";
    pub const DOCTOR_NAME: &str = "{nome_medico}";
    pub const DOCTOR_REGISTRY: &str = "{crm_medico}";
    pub const DOCTOR_REGISTRY_DOUBLE: &str = "{crm__medico}";
    pub const DOCTOR_REGISTRY_KIND: &str = "{tipo_registro_medico}";
    pub const DOCTOR_REGISTRY_UF: &str = "{uf_crm_medico}";
    pub const DOCTOR_SIGNATURE: &str = "{nome_medico}{crm__medico}-{uf_crm_medico}";
    pub const TODAY: &str = "{data_atual}";
    pub const TODAY_BLANK: &str = "___/___/____";
    pub const LOGO: &str = "{logo_base64}";

    pub const CLINIC_NAME: &str = "{clinica_nome}";
    pub const CLINIC_TAGLINE: &str = "{clinica_slogan}";
    pub const CLINIC_SERVICES: &str = "{clinica_servicos}";
    pub const CLINIC_LEGAL_NAME: &str = "{clinica_razao_social}";
    pub const CLINIC_ADDRESS: &str = "{clinica_endereco}";
    pub const CLINIC_CITY: &str = "{clinica_cidade}";
}

/// `CPF nº: 123.456.789-09` / `RG nº: 1234567`.
pub fn formatted_document(kind: DocumentKind, number: &str) -> String {
    let number = match kind {
        DocumentKind::Cpf => format_cpf(number),
        DocumentKind::Rg => number.to_string(),
    };
    format!("{kind} nº: {number}")
}

/// Build every token's value. `today` fills the generation-date tokens.
pub fn declaration_replacements(
    declaration: &CheckedDeclaration,
    clinic: &ClinicProfile,
    today: Date,
) -> Replacements {
    let patient = &declaration.patient;
    let doctor = &declaration.doctor;

    let doctor_name = strip_honorifics(&doctor.name);
    let registry = format!("{} {}", doctor.registry_kind, doctor.registry_number);
    let today = format_date_br(today);

    let mut map = Replacements::new();
    map.insert(token::PATIENT_NAME, patient.name.trim());
    map.insert(
        token::PATIENT_DOCUMENT,
        formatted_document(patient.document_kind, &patient.document_number),
    );
    map.insert(token::PATIENT_JOB_TITLE, patient.job_title.trim());
    map.insert(token::PATIENT_EMPLOYER, patient.employer.trim());
    map.insert(token::CERTIFICATE_DATE, format_date_br(declaration.issued_on));
    map.insert(token::LEAVE_DAYS, declaration.days_of_leave.to_string());
    map.insert(token::CID_CODE, declaration.cid_display());
    map.insert(token::CID_CODE_ACCENTED, declaration.cid_display());
    map.insert(
        token::DOCTOR_SIGNATURE,
        format!("{doctor_name} {registry}-{}", doctor.registry_uf),
    );
    map.insert(token::DOCTOR_NAME, doctor_name);
    map.insert(token::DOCTOR_REGISTRY, registry.clone());
    map.insert(token::DOCTOR_REGISTRY_DOUBLE, registry);
    map.insert(token::DOCTOR_REGISTRY_KIND, doctor.registry_kind.as_str());
    map.insert(token::DOCTOR_REGISTRY_UF, doctor.registry_uf.as_str());
    map.insert(token::TODAY, today.clone());
    map.insert(token::TODAY_BLANK, today);

    map.insert(token::CLINIC_NAME, clinic.name.as_str());
    map.insert(token::CLINIC_TAGLINE, clinic.tagline.as_str());
    map.insert(token::CLINIC_SERVICES, clinic.services.as_str());
    map.insert(token::CLINIC_LEGAL_NAME, clinic.legal_name.as_str());
    map.insert(token::CLINIC_ADDRESS, clinic.address.as_str());
    map.insert(token::CLINIC_CITY, clinic.city.as_str());
    map
}
