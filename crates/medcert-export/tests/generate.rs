mod common;

use std::path::Path;

use common::{FakeBackend, Outcome};
use medcert_export::docx::inspect_docx_template;
use medcert_export::pdf::{PdfBackend, SourceKind};
use medcert_export::{ExportError, Generator, GeneratorOptions, OutputFormat};

fn options(dir: &Path) -> GeneratorOptions {
    GeneratorOptions {
        output_dir: dir.join("out"),
        ..GeneratorOptions::default()
    }
}

fn generator(dir: &Path, backends: Vec<Box<dyn PdfBackend>>) -> Generator {
    Generator::new(options(dir)).unwrap().with_backends(backends)
}

fn files_in(dir: &Path) -> Vec<String> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    }
}

#[test]
fn output_formats_parse_case_insensitively() {
    assert_eq!("PDF".parse::<OutputFormat>().unwrap(), OutputFormat::Pdf);
    assert_eq!(" all ".parse::<OutputFormat>().unwrap(), OutputFormat::All);

    let err = "xls".parse::<OutputFormat>().unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid output format 'xls', expected one of: html, pdf, docx, all"
    );
}

#[tokio::test]
async fn html_only_writes_one_named_file() {
    let dir = tempfile::tempdir().unwrap();
    let files = generator(dir.path(), Vec::new())
        .generate(&common::declaration(), OutputFormat::Html)
        .await
        .unwrap();

    let html = files.html.as_ref().unwrap();
    let name = html.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("Declaracao_João_Silva_Santos_"), "{name}");
    assert!(name.ends_with(".html"));
    assert!(files.pdf.is_none() && files.docx.is_none());

    let content = std::fs::read_to_string(html).unwrap();
    assert!(content.contains("CPF nº: 123.456.789-09"));
    assert!(content.contains("Z76.5"));
    assert_eq!(files_in(&dir.path().join("out")).len(), 1);
}

#[tokio::test]
async fn repeated_generation_never_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let generator = generator(dir.path(), Vec::new());

    let first = generator
        .generate(&common::declaration(), OutputFormat::Html)
        .await
        .unwrap();
    let second = generator
        .generate(&common::declaration(), OutputFormat::Html)
        .await
        .unwrap();

    assert_ne!(first.html, second.html);
    assert!(first.html.as_ref().unwrap().exists());
    assert!(second.html.as_ref().unwrap().exists());
    assert_eq!(files_in(&dir.path().join("out")).len(), 2);
}

#[tokio::test]
async fn invalid_declaration_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut decl = common::declaration();
    decl.doctor.registry_uf = String::new();

    let err = generator(dir.path(), Vec::new())
        .generate(&decl, OutputFormat::All)
        .await
        .unwrap_err();

    match err {
        ExportError::Validation(e) => assert_eq!(e.field(), Some("uf_crm_medico")),
        other => panic!("unexpected error: {other}"),
    }
    assert!(files_in(&dir.path().join("out")).is_empty());
}

#[tokio::test]
async fn docx_uses_the_built_in_template_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let files = generator(dir.path(), Vec::new())
        .generate(&common::declaration(), OutputFormat::Docx)
        .await
        .unwrap();

    let bytes = std::fs::read(files.docx.unwrap()).unwrap();
    let report = inspect_docx_template(&bytes).unwrap();
    assert!(report.placeholders.is_empty());
    assert!(report.blocks.iter().any(|b| b.runs.concat().contains("João Silva Santos")));
}

#[tokio::test]
async fn missing_configured_template_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let options = GeneratorOptions {
        template: Some(dir.path().join("nope.docx")),
        ..options(dir.path())
    };

    let err = Generator::new(options)
        .unwrap()
        .generate(&common::declaration(), OutputFormat::Docx)
        .await
        .unwrap_err();
    assert!(matches!(err, ExportError::TemplateNotFound(_)));
}

#[tokio::test]
async fn pdf_goes_through_the_backend_chain() {
    let dir = tempfile::tempdir().unwrap();
    let backends: Vec<Box<dyn PdfBackend>> = vec![
        Box::new(FakeBackend::new("broken", SourceKind::Html, Outcome::Fail)),
        Box::new(FakeBackend::new("working", SourceKind::Html, Outcome::Succeed)),
    ];

    let files = generator(dir.path(), backends)
        .generate(&common::declaration(), OutputFormat::Pdf)
        .await
        .unwrap();

    let pdf = files.pdf.unwrap();
    assert_eq!(pdf.extension().unwrap(), "pdf");
    assert_eq!(std::fs::read(&pdf).unwrap(), b"%PDF-1.4 fake");
    // The intermediate HTML is scratch only.
    assert_eq!(files_in(&dir.path().join("out")).len(), 1);
}

#[tokio::test]
async fn pdf_can_be_converted_from_docx() {
    let dir = tempfile::tempdir().unwrap();
    let options = GeneratorOptions {
        pdf_source: SourceKind::Docx,
        ..options(dir.path())
    };
    let backends: Vec<Box<dyn PdfBackend>> = vec![
        Box::new(FakeBackend::new("html", SourceKind::Html, Outcome::Fail)),
        Box::new(FakeBackend::new("docx", SourceKind::Docx, Outcome::Succeed)),
    ];

    let files = Generator::new(options)
        .unwrap()
        .with_backends(backends)
        .generate(&common::declaration(), OutputFormat::Pdf)
        .await
        .unwrap();
    assert!(files.pdf.unwrap().exists());
}

#[tokio::test]
async fn single_format_pdf_failure_is_returned() {
    let dir = tempfile::tempdir().unwrap();
    let backends: Vec<Box<dyn PdfBackend>> =
        vec![Box::new(FakeBackend::new("broken", SourceKind::Html, Outcome::Fail))];

    let err = generator(dir.path(), backends)
        .generate(&common::declaration(), OutputFormat::Pdf)
        .await
        .unwrap_err();

    assert!(matches!(err, ExportError::PdfBackendsExhausted { .. }));
    assert!(files_in(&dir.path().join("out")).is_empty());
}

#[tokio::test]
async fn all_formats_skip_a_failing_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let backends: Vec<Box<dyn PdfBackend>> =
        vec![Box::new(FakeBackend::new("broken", SourceKind::Html, Outcome::Fail))];

    let files = generator(dir.path(), backends)
        .generate(&common::declaration(), OutputFormat::All)
        .await
        .unwrap();

    assert!(files.html.unwrap().exists());
    assert!(files.docx.unwrap().exists());
    assert!(files.pdf.is_none());
}

#[test]
fn forced_backend_must_exist() {
    let options = GeneratorOptions {
        forced_backend: Some("typewriter".to_string()),
        ..GeneratorOptions::default()
    };
    assert!(matches!(Generator::new(options), Err(ExportError::UnknownBackend(_))));

    let options = GeneratorOptions {
        forced_backend: Some("libreoffice".to_string()),
        ..GeneratorOptions::default()
    };
    let backends = options.pdf_backends().unwrap();
    assert_eq!(backends.len(), 1);
    assert_eq!(backends[0].name(), "libreoffice");
}
