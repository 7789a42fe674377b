//! One entry point for every output format.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use medcert_core::models::declaration::{CheckedDeclaration, Declaration};

use crate::clinic::ClinicProfile;
use crate::docx::{default_template, render_docx_template};
use crate::error::ExportError;
use crate::fields::{declaration_replacements, token};
use crate::html::{logo_data_uri, render_html};
use crate::naming::{DECLARATION_EXTENSIONS, declaration_basename, free_stem};
use crate::pdf::{self, PdfBackend, SourceKind};
use crate::placeholder::Replacements;
use crate::styles::DocumentStyles;

/// Environment variables whose presence marks a hosted deployment, where
/// nothing is ever opened on screen.
const SERVER_ENV_VARS: [&str; 3] = ["RENDER", "VERCEL", "RAILWAY"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Html,
    Pdf,
    Docx,
    All,
}

impl OutputFormat {
    pub const NAMES: [&'static str; 4] = ["html", "pdf", "docx", "all"];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::All => "all",
        }
    }

    /// MIME type of a single-file format.
    pub fn content_type(self) -> Option<&'static str> {
        match self {
            Self::Html => Some("text/html; charset=utf-8"),
            Self::Pdf => Some("application/pdf"),
            Self::Docx => Some(
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            ),
            Self::All => None,
        }
    }

    fn includes(self, other: OutputFormat) -> bool {
        self == other || self == Self::All
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" => Ok(Self::Html),
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            "all" => Ok(Self::All),
            _ => Err(ExportError::InvalidFormat(s.to_string())),
        }
    }
}

/// Export configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorOptions {
    pub output_dir: PathBuf,
    /// Clinic `.docx` template; the built-in one is used when unset.
    pub template: Option<PathBuf>,
    pub logo: Option<PathBuf>,
    pub clinic: ClinicProfile,
    pub styles: DocumentStyles,
    /// Intermediate format handed to the PDF converters.
    pub pdf_source: SourceKind,
    /// Backend names in priority order; empty means the built-in order.
    pub backends: Vec<String>,
    /// Use only this backend.
    pub forced_backend: Option<String>,
    pub timeout_secs: u64,
    /// Open single-format output with the desktop's default application.
    pub open_after: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("data/generated_documents"),
            template: None,
            logo: None,
            clinic: ClinicProfile::default(),
            styles: DocumentStyles::default(),
            pdf_source: SourceKind::Html,
            backends: Vec::new(),
            forced_backend: None,
            timeout_secs: pdf::DEFAULT_TIMEOUT.as_secs(),
            open_after: false,
        }
    }
}

impl GeneratorOptions {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn pdf_backends(&self) -> Result<Vec<Box<dyn PdfBackend>>, ExportError> {
        match &self.forced_backend {
            Some(name) => Ok(vec![pdf::backend_by_name(name)?]),
            None => pdf::backends_by_name(&self.backends),
        }
    }
}

/// Paths written by one generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GeneratedFiles {
    pub html: Option<PathBuf>,
    pub pdf: Option<PathBuf>,
    pub docx: Option<PathBuf>,
}

impl GeneratedFiles {
    pub fn is_empty(&self) -> bool {
        self.html.is_none() && self.pdf.is_none() && self.docx.is_none()
    }

    pub fn get(&self, format: OutputFormat) -> Option<&Path> {
        match format {
            OutputFormat::Html => self.html.as_deref(),
            OutputFormat::Pdf => self.pdf.as_deref(),
            OutputFormat::Docx => self.docx.as_deref(),
            OutputFormat::All => None,
        }
    }
}

pub struct Generator {
    options: GeneratorOptions,
    backends: Vec<Box<dyn PdfBackend>>,
    logo: Option<String>,
}

impl Generator {
    pub fn new(options: GeneratorOptions) -> Result<Self, ExportError> {
        let backends = options.pdf_backends()?;
        let logo = options.logo.as_deref().and_then(logo_data_uri);
        Ok(Self {
            options,
            backends,
            logo,
        })
    }

    /// Replace the PDF backends.
    pub fn with_backends(mut self, backends: Vec<Box<dyn PdfBackend>>) -> Self {
        self.backends = backends;
        self
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    pub fn replacements(&self, declaration: &CheckedDeclaration, today: Date) -> Replacements {
        declaration_replacements(declaration, &self.options.clinic, today)
    }

    pub fn render_html(&self, declaration: &CheckedDeclaration, today: Date) -> String {
        let mut map = self.replacements(declaration, today);
        map.insert(token::LOGO, self.logo.as_deref().unwrap_or_default());
        render_html(&map)
    }

    /// The configured `.docx` template, or the built-in one.
    pub async fn template_bytes(&self) -> Result<Vec<u8>, ExportError> {
        match &self.options.template {
            Some(path) => match tokio::fs::read(path).await {
                Ok(bytes) => Ok(bytes),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    Err(ExportError::TemplateNotFound(path.clone()))
                }
                Err(e) => Err(e.into()),
            },
            None => default_template(&self.options.styles),
        }
    }

    pub async fn render_docx(
        &self,
        declaration: &CheckedDeclaration,
        today: Date,
    ) -> Result<Vec<u8>, ExportError> {
        let template = self.template_bytes().await?;
        render_docx_template(&template, &self.replacements(declaration, today))
    }

    /// Sanitize, validate, then write the requested formats. Nothing is
    /// written when validation fails.
    pub async fn generate(
        &self,
        declaration: &Declaration,
        format: OutputFormat,
    ) -> Result<GeneratedFiles, ExportError> {
        let checked = declaration.sanitized().validate()?;
        self.generate_checked(&checked, format).await
    }

    /// Write the requested formats for an already validated declaration.
    ///
    /// With [`OutputFormat::All`] a failing PDF or DOCX step is logged and
    /// skipped; with a single format the failure is returned.
    pub async fn generate_checked(
        &self,
        declaration: &CheckedDeclaration,
        format: OutputFormat,
    ) -> Result<GeneratedFiles, ExportError> {
        let now = jiff::Zoned::now();
        let today = now.date();
        let dir = &self.options.output_dir;
        tokio::fs::create_dir_all(dir).await?;
        let base = free_stem(
            dir,
            &declaration_basename(
                &declaration.patient.name,
                &now.strftime("%Y%m%d_%H%M%S").to_string(),
            ),
            &DECLARATION_EXTENSIONS,
        );

        tracing::info!(%format, base = %base, "generating declaration");
        let mut files = GeneratedFiles::default();

        let html = self.render_html(declaration, today);
        if format.includes(OutputFormat::Html) {
            let path = dir.join(format!("{base}.html"));
            tokio::fs::write(&path, &html).await?;
            tracing::info!(path = %path.display(), "HTML written");
            files.html = Some(path);
        }

        if format.includes(OutputFormat::Pdf) {
            let path = dir.join(format!("{base}.pdf"));
            match self.write_pdf(declaration, &html, today, &path).await {
                Ok(path) => files.pdf = Some(path),
                Err(e) if format == OutputFormat::All => {
                    tracing::error!(error = %e, "PDF generation failed, continuing");
                }
                Err(e) => return Err(e),
            }
        }

        if format.includes(OutputFormat::Docx) {
            let path = dir.join(format!("{base}.docx"));
            let written = match self.render_docx(declaration, today).await {
                Ok(bytes) => tokio::fs::write(&path, bytes).await.map_err(ExportError::from),
                Err(e) => Err(e),
            };
            match written {
                Ok(()) => {
                    tracing::info!(path = %path.display(), "DOCX written");
                    files.docx = Some(path);
                }
                Err(e) if format == OutputFormat::All => {
                    tracing::error!(error = %e, "DOCX generation failed, continuing");
                }
                Err(e) => return Err(e),
            }
        }

        if files.is_empty() {
            return Err(ExportError::NothingGenerated);
        }

        if self.options.open_after
            && let Some(path) = files.get(format)
        {
            open_in_default_app(path);
        }

        Ok(files)
    }

    async fn write_pdf(
        &self,
        declaration: &CheckedDeclaration,
        html: &str,
        today: Date,
        output: &Path,
    ) -> Result<PathBuf, ExportError> {
        let kind = self.options.pdf_source;
        let dir = output.parent().unwrap_or_else(|| Path::new("."));
        let scratch = tempfile::Builder::new()
            .prefix(".medcert-")
            .suffix(&format!(".{}", kind.extension()))
            .tempfile_in(dir)?;

        match kind {
            SourceKind::Html => tokio::fs::write(scratch.path(), html).await?,
            SourceKind::Docx => {
                let bytes = self.render_docx(declaration, today).await?;
                tokio::fs::write(scratch.path(), bytes).await?;
            }
        }

        pdf::convert_to_pdf(
            &self.backends,
            kind,
            scratch.path(),
            output,
            self.options.timeout(),
        )
        .await
    }
}

/// Show `path` with the platform's default application. Never does anything
/// in hosted deployments.
pub fn open_in_default_app(path: &Path) -> bool {
    if SERVER_ENV_VARS
        .iter()
        .any(|var| std::env::var_os(var).is_some())
    {
        tracing::debug!("server environment, not opening output");
        return false;
    }

    let spawned = if cfg!(target_os = "windows") {
        std::process::Command::new("cmd")
            .args(["/C", "start", ""])
            .arg(path)
            .spawn()
    } else if cfg!(target_os = "macos") {
        std::process::Command::new("open").arg(path).spawn()
    } else {
        std::process::Command::new("xdg-open").arg(path).spawn()
    };

    match spawned {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "could not open output");
            false
        }
    }
}
