use std::path::Path;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use medcert_core::models::declaration::{CheckedDeclaration, Declaration};
use medcert_export::docx::{TemplateReport, inspect_docx_template};
use medcert_export::{GeneratedFiles, OutputFormat};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(flatten)]
    pub declaration: Declaration,
    /// `html`, `pdf`, `docx` or `all`; `docx` when absent.
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Serialize)]
pub struct GeneratedAll {
    pub format: OutputFormat,
    pub files: GeneratedFiles,
}

/// Generate a declaration and send it back as an attachment.
///
/// Patient, doctor and certificate are recorded first; a storage failure is
/// logged and does not stop generation. `format=all` answers with the paths
/// written instead of a file.
pub async fn generate_document(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let format: OutputFormat = request.format.as_deref().unwrap_or("docx").parse()?;
    let checked = request.declaration.sanitized().validate()?;

    record(&state, &checked).await;

    let files = state.generator.generate_checked(&checked, format).await?;

    if format == OutputFormat::All {
        return Ok(Json(GeneratedAll { format, files }).into_response());
    }

    let path = files
        .get(format)
        .ok_or_else(|| ApiError::Internal(format!("no {format} output was written")))?;
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ApiError::Internal(format!("reading {}: {e}", path.display())))?;
    let content_type = format.content_type().unwrap_or("application/octet-stream");

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
            (header::CONTENT_DISPOSITION, attachment(path)?),
        ],
        bytes,
    )
        .into_response())
}

/// Check the configured Word template for placeholders split across runs.
pub async fn inspect_template(
    State(state): State<AppState>,
) -> Result<Json<TemplateReport>, ApiError> {
    let bytes = state.generator.template_bytes().await?;
    Ok(Json(inspect_docx_template(&bytes)?))
}

async fn record(state: &AppState, checked: &CheckedDeclaration) {
    let checked = checked.clone();
    let result = state
        .with_store(move |store| {
            let patient = store.upsert_patient(&checked.patient)?;
            let doctor = store.upsert_doctor(&checked.doctor)?;
            let certificate =
                checked.certificate(patient.id, doctor.id, jiff::Zoned::now().date());
            store.insert_certificate(&certificate)?;
            Ok(certificate.id)
        })
        .await;

    match result {
        Ok(id) => tracing::info!(certificate = %id, "certificate recorded"),
        Err(e) => tracing::warn!(error = %e, "could not record certificate, generating anyway"),
    }
}

/// `attachment` disposition with an ASCII fallback name and the UTF-8 name
/// in `filename*`.
fn attachment(path: &Path) -> Result<HeaderValue, ApiError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "declaracao".to_string());

    let fallback: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_graphic() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let mut encoded = String::with_capacity(name.len());
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }

    HeaderValue::from_str(&format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}"
    ))
    .map_err(|e| ApiError::Internal(format!("invalid Content-Disposition: {e}")))
}
