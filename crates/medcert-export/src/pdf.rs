//! PDF conversion through external programs.
//!
//! Each [`PdfBackend`] turns an HTML or DOCX file into a PDF. Backends are
//! tried in order; the first one that leaves a non-empty file at the output
//! path wins. Every failure is kept so the final error can tell the operator
//! what to install.

use std::ffi::OsString;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::process::Command;

use crate::error::{BackendFailure, ExportError};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Intermediate document a backend reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Html,
    Docx,
}

impl SourceKind {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Docx => "docx",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Html => "HTML",
            Self::Docx => "DOCX",
        })
    }
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("not installed ({0})")]
    NotInstalled(String),

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("reported success but {} is missing or empty", .0.display())]
    MissingOutput(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One way of producing a PDF.
pub trait PdfBackend: Send + Sync {
    /// Stable name, used in logs, errors and configuration.
    fn name(&self) -> &str;

    /// The intermediate format this backend reads.
    fn source_kind(&self) -> SourceKind;

    /// What to install when the backend is unavailable.
    fn remedy(&self) -> &str;

    /// Convert `source` into a PDF at `output`.
    fn convert<'a>(
        &'a self,
        source: &'a Path,
        output: &'a Path,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<(), BackendError>>;
}

/// How a backend's command line is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Invocation {
    /// `<program> <source> <output>`
    SourceOutput,
    /// wkhtmltopdf: page options, then `<source> <output>`.
    Wkhtmltopdf,
    /// Chromium: `--print-to-pdf=<output> <source>`.
    Chromium,
    /// LibreOffice: writes `<outdir>/<source stem>.pdf`.
    LibreOffice,
}

/// A backend that shells out to the first installed program among its
/// candidates.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    name: &'static str,
    source_kind: SourceKind,
    programs: Vec<String>,
    invocation: Invocation,
    remedy: &'static str,
}

impl CommandBackend {
    pub fn weasyprint() -> Self {
        Self {
            name: "weasyprint",
            source_kind: SourceKind::Html,
            programs: vec!["weasyprint".into()],
            invocation: Invocation::SourceOutput,
            remedy: "pip install weasyprint",
        }
    }

    pub fn wkhtmltopdf() -> Self {
        Self {
            name: "wkhtmltopdf",
            source_kind: SourceKind::Html,
            programs: vec!["wkhtmltopdf".into()],
            invocation: Invocation::Wkhtmltopdf,
            remedy: "apt-get install wkhtmltopdf, or https://wkhtmltopdf.org/downloads.html",
        }
    }

    pub fn chromium() -> Self {
        Self {
            name: "chromium",
            source_kind: SourceKind::Html,
            programs: vec![
                "chromium".into(),
                "chromium-browser".into(),
                "google-chrome".into(),
            ],
            invocation: Invocation::Chromium,
            remedy: "apt-get install chromium",
        }
    }

    pub fn docx2pdf() -> Self {
        Self {
            name: "docx2pdf",
            source_kind: SourceKind::Docx,
            programs: vec!["docx2pdf".into()],
            invocation: Invocation::SourceOutput,
            remedy: "pip install docx2pdf (needs Microsoft Word)",
        }
    }

    pub fn libreoffice() -> Self {
        Self {
            name: "libreoffice",
            source_kind: SourceKind::Docx,
            programs: vec![
                "libreoffice".into(),
                "soffice".into(),
                r"C:\Program Files\LibreOffice\program\soffice.exe".into(),
                r"C:\Program Files (x86)\LibreOffice\program\soffice.exe".into(),
            ],
            invocation: Invocation::LibreOffice,
            remedy: "apt-get install libreoffice, or https://www.libreoffice.org/download/",
        }
    }

    /// Replace the candidate executables, e.g. with an absolute path from
    /// configuration.
    pub fn with_programs(mut self, programs: Vec<String>) -> Self {
        self.programs = programs;
        self
    }

    fn args(&self, source: &Path, output: &Path) -> Vec<OsString> {
        match self.invocation {
            Invocation::SourceOutput => vec![source.into(), output.into()],
            Invocation::Wkhtmltopdf => {
                let mut args: Vec<OsString> = [
                    "--page-size",
                    "A4",
                    "--margin-top",
                    "20mm",
                    "--margin-right",
                    "20mm",
                    "--margin-bottom",
                    "20mm",
                    "--margin-left",
                    "20mm",
                    "--encoding",
                    "UTF-8",
                    "--enable-local-file-access",
                    "--quiet",
                ]
                .into_iter()
                .map(OsString::from)
                .collect();
                args.push(source.into());
                args.push(output.into());
                args
            }
            Invocation::Chromium => {
                let mut print_to = OsString::from("--print-to-pdf=");
                print_to.push(output);
                vec![
                    "--headless".into(),
                    "--disable-gpu".into(),
                    "--no-sandbox".into(),
                    "--no-pdf-header-footer".into(),
                    print_to,
                    source.into(),
                ]
            }
            Invocation::LibreOffice => vec![
                "--headless".into(),
                "--convert-to".into(),
                "pdf".into(),
                "--outdir".into(),
                output_dir(output).into(),
                source.into(),
            ],
        }
    }

    async fn run(&self, source: &Path, output: &Path, timeout: Duration) -> Result<(), BackendError> {
        let args = self.args(source, output);
        let mut last = BackendError::NotInstalled(self.programs.join(", "));
        for program in &self.programs {
            match run_command(program, &args, timeout).await {
                Err(BackendError::NotInstalled(_)) => {
                    tracing::debug!(backend = self.name, program, "executable not found");
                }
                Err(e) => {
                    last = e;
                    break;
                }
                Ok(()) => {
                    if self.invocation == Invocation::LibreOffice {
                        move_libreoffice_output(source, output).await?;
                    }
                    return Ok(());
                }
            }
        }
        Err(last)
    }
}

impl PdfBackend for CommandBackend {
    fn name(&self) -> &str {
        self.name
    }

    fn source_kind(&self) -> SourceKind {
        self.source_kind
    }

    fn remedy(&self) -> &str {
        self.remedy
    }

    fn convert<'a>(
        &'a self,
        source: &'a Path,
        output: &'a Path,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<(), BackendError>> {
        Box::pin(self.run(source, output, timeout))
    }
}

/// All built-in backends in default priority order: HTML converters first,
/// then DOCX converters.
pub fn default_backends() -> Vec<Box<dyn PdfBackend>> {
    vec![
        Box::new(CommandBackend::weasyprint()),
        Box::new(CommandBackend::wkhtmltopdf()),
        Box::new(CommandBackend::chromium()),
        Box::new(CommandBackend::docx2pdf()),
        Box::new(CommandBackend::libreoffice()),
    ]
}

pub fn backend_by_name(name: &str) -> Result<Box<dyn PdfBackend>, ExportError> {
    let backend = match name.trim().to_ascii_lowercase().as_str() {
        "weasyprint" => CommandBackend::weasyprint(),
        "wkhtmltopdf" | "pdfkit" => CommandBackend::wkhtmltopdf(),
        "chromium" | "chrome" => CommandBackend::chromium(),
        "docx2pdf" => CommandBackend::docx2pdf(),
        "libreoffice" | "soffice" => CommandBackend::libreoffice(),
        _ => return Err(ExportError::UnknownBackend(name.to_string())),
    };
    Ok(Box::new(backend))
}

/// Backends in the given order. An empty list means [`default_backends`].
pub fn backends_by_name(names: &[String]) -> Result<Vec<Box<dyn PdfBackend>>, ExportError> {
    if names.is_empty() {
        return Ok(default_backends());
    }
    names.iter().map(|name| backend_by_name(name)).collect()
}

/// Convert `source` to `output`, trying every backend that reads `kind` in
/// order. A backend that exits cleanly without leaving a non-empty file is
/// counted as failed.
pub async fn convert_to_pdf(
    backends: &[Box<dyn PdfBackend>],
    kind: SourceKind,
    source: &Path,
    output: &Path,
    timeout: Duration,
) -> Result<PathBuf, ExportError> {
    let mut failures = Vec::new();

    for backend in backends.iter().filter(|b| b.source_kind() == kind) {
        tracing::info!(backend = backend.name(), source = %source.display(), "converting to PDF");
        let result = match backend.convert(source, output, timeout).await {
            Ok(()) => verify_output(output).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                tracing::info!(backend = backend.name(), output = %output.display(), "PDF written");
                return Ok(output.to_path_buf());
            }
            Err(e) => {
                tracing::warn!(backend = backend.name(), error = %e, "PDF backend failed");
                failures.push(BackendFailure {
                    backend: backend.name().to_string(),
                    reason: e.to_string(),
                    remedy: backend.remedy().to_string(),
                });
            }
        }
    }

    // A failed backend may have left a truncated file behind.
    if tokio::fs::try_exists(output).await.unwrap_or(false) {
        let _ = tokio::fs::remove_file(output).await;
    }

    Err(ExportError::PdfBackendsExhausted {
        source_kind: kind,
        failures,
    })
}

async fn verify_output(output: &Path) -> Result<(), BackendError> {
    match tokio::fs::metadata(output).await {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(()),
        _ => Err(BackendError::MissingOutput(output.to_path_buf())),
    }
}

async fn run_command(program: &str, args: &[OsString], timeout: Duration) -> Result<(), BackendError> {
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => BackendError::NotInstalled(program.to_string()),
            _ => BackendError::Io(e),
        })?;

    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| BackendError::Timeout(timeout))??;

    if !output.status.success() {
        return Err(BackendError::Failed {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    tracing::debug!(program, stdout = %String::from_utf8_lossy(&output.stdout).trim(), "command finished");
    Ok(())
}

fn output_dir(output: &Path) -> &Path {
    match output.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

/// LibreOffice names its output after the source; move it to the requested
/// path.
async fn move_libreoffice_output(source: &Path, output: &Path) -> Result<(), BackendError> {
    let Some(stem) = source.file_stem() else {
        return Err(BackendError::MissingOutput(output.to_path_buf()));
    };
    let mut produced = output_dir(output).join(stem);
    produced.set_extension("pdf");
    if produced != output {
        tokio::fs::rename(&produced, output).await?;
    }
    Ok(())
}
