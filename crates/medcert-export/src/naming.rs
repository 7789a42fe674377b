//! Output file names.

use std::path::Path;

/// Longest file name segment accepted by [`sanitize_filename`] callers.
pub const MAX_FILENAME_LENGTH: usize = 200;

/// Length of the patient-name segment in generated file names.
pub const PATIENT_SEGMENT_LENGTH: usize = 30;

pub const EMPTY_NAME: &str = "Arquivo_Sem_Nome";
pub const SANITIZED_AWAY: &str = "Arquivo_Sanitizado";

/// Make `name` safe as a file name on every platform: drop `<>:"/\|?*` and
/// control characters, join whitespace runs with `_`, strip leading and
/// trailing dots, then keep at most `max_len` characters.
pub fn sanitize_filename(name: &str, max_len: usize) -> String {
    if name.is_empty() {
        return EMPTY_NAME.to_string();
    }

    let kept: String = name
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .collect();
    let joined = kept.split_whitespace().collect::<Vec<_>>().join("_");
    let truncated: String = joined.trim_matches('.').chars().take(max_len).collect();

    if truncated.is_empty() {
        SANITIZED_AWAY.to_string()
    } else {
        truncated
    }
}

/// `Declaracao_<patient>_<YYYYMMDD_HHMMSS>`, without extension.
pub fn declaration_basename(patient_name: &str, stamp: &str) -> String {
    format!(
        "Declaracao_{}_{stamp}",
        sanitize_filename(patient_name, PATIENT_SEGMENT_LENGTH)
    )
}

/// Extensions a declaration may be written with.
pub const DECLARATION_EXTENSIONS: [&str; 3] = ["html", "pdf", "docx"];

/// First of `stem`, `stem_2`, `stem_3`, ... for which no `stem.<ext>` exists
/// in `dir`, for any of `extensions`.
pub fn free_stem(dir: &Path, stem: &str, extensions: &[&str]) -> String {
    let taken = |candidate: &str| {
        extensions
            .iter()
            .any(|ext| dir.join(format!("{candidate}.{ext}")).exists())
    };
    if !taken(stem) {
        return stem.to_string();
    }
    (2u32..)
        .map(|n| format!("{stem}_{n}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| stem.to_string())
}
