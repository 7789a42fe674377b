//! medcert-export
//!
//! Homologation declaration rendering: placeholder substitution over Word
//! and HTML templates, and PDF conversion through a chain of external
//! backends.

pub mod clinic;
pub mod docx;
pub mod error;
pub mod fields;
pub mod generate;
pub mod html;
pub mod naming;
pub mod pdf;
pub mod placeholder;
pub mod styles;

pub use crate::error::ExportError;
pub use crate::generate::{GeneratedFiles, Generator, GeneratorOptions, OutputFormat};
pub use crate::placeholder::Replacements;
