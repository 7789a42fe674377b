use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use medcert_core::error::CoreError;

use crate::pdf::SourceKind;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("invalid declaration: {0}")]
    Validation(#[from] CoreError),

    #[error("template not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    #[error("template parse error: {0}")]
    TemplateParse(String),

    #[error("DOCX generation failed: {0}")]
    Docx(String),

    #[error("no PDF backend could convert {source_kind}:\n{}", format_failures(.failures))]
    PdfBackendsExhausted {
        source_kind: SourceKind,
        failures: Vec<BackendFailure>,
    },

    #[error("unknown PDF backend: {0}")]
    UnknownBackend(String),

    #[error("invalid output format '{0}', expected one of: html, pdf, docx, all")]
    InvalidFormat(String),

    #[error("no document was generated")]
    NothingGenerated,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExportError {
    /// True when the caller sent bad data, as opposed to a rendering fault.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::InvalidFormat(_))
    }
}

/// One backend's failed attempt, kept for the aggregated error.
#[derive(Debug, Clone)]
pub struct BackendFailure {
    pub backend: String,
    pub reason: String,
    pub remedy: String,
}

impl fmt::Display for BackendFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} (install: {})", self.backend, self.reason, self.remedy)
    }
}

fn format_failures(failures: &[BackendFailure]) -> String {
    if failures.is_empty() {
        return "- no backend is configured for this source".to_string();
    }
    failures
        .iter()
        .map(|f| format!("- {f}"))
        .collect::<Vec<_>>()
        .join("\n")
}
