#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use medcert_core::models::declaration::{
    CertificateDetails, CheckedDeclaration, Declaration, DoctorDetails, PatientDetails,
};
use medcert_export::pdf::{BackendError, BoxFuture, PdfBackend, SourceKind};

pub fn declaration() -> Declaration {
    Declaration {
        patient: PatientDetails {
            name: "João Silva Santos".to_string(),
            document_kind: "CPF".to_string(),
            document_number: "123.456.789-09".to_string(),
            job_title: "Analista de Sistemas".to_string(),
            employer: "Tech Solutions LTDA".to_string(),
        },
        certificate: CertificateDetails {
            issued_on: "2025-11-09".to_string(),
            days_of_leave: 3,
            cid: "Z76.5".to_string(),
            cid_not_informed: false,
        },
        doctor: DoctorDetails {
            name: "Dra. Maria Santos".to_string(),
            registry_kind: "CRM".to_string(),
            registry_number: "12345".to_string(),
            registry_uf: "DF".to_string(),
        },
    }
}

pub fn checked() -> CheckedDeclaration {
    declaration().validate().unwrap()
}

#[derive(Debug, Clone, Copy)]
pub enum Outcome {
    Succeed,
    Fail,
    NoOutput,
    EmptyOutput,
}

/// Scripted backend that counts its calls.
pub struct FakeBackend {
    pub name: &'static str,
    pub kind: SourceKind,
    pub outcome: Outcome,
    pub calls: Arc<AtomicUsize>,
}

impl FakeBackend {
    pub fn new(name: &'static str, kind: SourceKind, outcome: Outcome) -> Self {
        Self {
            name,
            kind,
            outcome,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl PdfBackend for FakeBackend {
    fn name(&self) -> &str {
        self.name
    }

    fn source_kind(&self) -> SourceKind {
        self.kind
    }

    fn remedy(&self) -> &str {
        "install the fake"
    }

    fn convert<'a>(
        &'a self,
        source: &'a Path,
        output: &'a Path,
        _timeout: Duration,
    ) -> BoxFuture<'a, Result<(), BackendError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(source.exists(), "source must be on disk while converting");
            match self.outcome {
                Outcome::Succeed => {
                    tokio::fs::write(output, b"%PDF-1.4 fake").await?;
                    Ok(())
                }
                Outcome::Fail => Err(BackendError::Failed {
                    program: self.name.to_string(),
                    status: "exit status: 1".to_string(),
                    stderr: "boom".to_string(),
                }),
                Outcome::NoOutput => Ok(()),
                Outcome::EmptyOutput => {
                    tokio::fs::write(output, b"").await?;
                    Ok(())
                }
            }
        })
    }
}
