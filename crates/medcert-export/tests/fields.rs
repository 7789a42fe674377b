mod common;

use jiff::civil::date;
use medcert_core::models::patient::DocumentKind;
use medcert_export::clinic::ClinicProfile;
use medcert_export::fields::{declaration_replacements, formatted_document, token};

#[test]
fn every_token_is_filled_from_the_declaration() {
    let map = declaration_replacements(&common::checked(), &ClinicProfile::default(), date(2025, 11, 10));

    assert_eq!(map.get(token::PATIENT_NAME), Some("João Silva Santos"));
    assert_eq!(map.get(token::PATIENT_DOCUMENT), Some("CPF nº: 123.456.789-09"));
    assert_eq!(map.get(token::CERTIFICATE_DATE), Some("09/11/2025"));
    assert_eq!(map.get(token::LEAVE_DAYS), Some("3"));
    assert_eq!(map.get(token::CID_CODE), Some("Z76.5"));
    assert_eq!(map.get(token::CID_CODE_ACCENTED), Some("Z76.5"));
    assert_eq!(map.get(token::PATIENT_JOB_TITLE), Some("Analista de Sistemas"));
    assert_eq!(map.get(token::PATIENT_EMPLOYER), Some("Tech Solutions LTDA"));
    assert_eq!(map.get(token::TODAY), Some("10/11/2025"));
    assert_eq!(map.get(token::TODAY_BLANK), Some("10/11/2025"));
    assert_eq!(map.get(token::CLINIC_CITY), Some("Brasília"));
}

#[test]
fn doctor_tokens_drop_honorifics() {
    let map = declaration_replacements(&common::checked(), &ClinicProfile::default(), date(2025, 11, 10));

    assert_eq!(map.get(token::DOCTOR_NAME), Some("Maria Santos"));
    assert_eq!(map.get(token::DOCTOR_REGISTRY), Some("CRM 12345"));
    assert_eq!(map.get(token::DOCTOR_REGISTRY_DOUBLE), Some("CRM 12345"));
    assert_eq!(map.get(token::DOCTOR_REGISTRY_KIND), Some("CRM"));
    assert_eq!(map.get(token::DOCTOR_REGISTRY_UF), Some("DF"));
    assert_eq!(map.get(token::DOCTOR_SIGNATURE), Some("Maria Santos CRM 12345-DF"));
}

#[test]
fn undisclosed_cid_is_written_out() {
    let mut decl = common::declaration();
    decl.certificate.cid = String::new();
    decl.certificate.cid_not_informed = true;
    let map = declaration_replacements(&decl.validate().unwrap(), &ClinicProfile::default(), date(2025, 11, 10));

    assert_eq!(map.get(token::CID_CODE), Some("Não Informado"));
    assert_eq!(map.get(token::CID_CODE_ACCENTED), Some("Não Informado"));
}

#[test]
fn documents_are_formatted_by_kind() {
    assert_eq!(formatted_document(DocumentKind::Cpf, "12345678909"), "CPF nº: 123.456.789-09");
    assert_eq!(formatted_document(DocumentKind::Rg, "1234567"), "RG nº: 1234567");
}
