//! HTML rendering of the two-page declaration.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::fields::token;
use crate::placeholder::Replacements;

/// Declaration page followed by the medical-review record page, styled for
/// A4 printing.
pub const DECLARATION_TEMPLATE: &str = include_str!("templates/declaration.html");

/// Render the embedded template.
///
/// Values are HTML-escaped before substitution, except `{logo_base64}`
/// which must stay a usable `data:` URI. A missing logo renders as an empty
/// `src`.
pub fn render_html(replacements: &Replacements) -> String {
    render_html_template(DECLARATION_TEMPLATE, replacements)
}

/// Same as [`render_html`] over a caller-supplied template.
pub fn render_html_template(template: &str, replacements: &Replacements) -> String {
    let mut escaped = replacements.map_values(|key, value| {
        if key == token::LOGO {
            value.to_string()
        } else {
            escape_html(value)
        }
    });
    if escaped.get(token::LOGO).is_none() {
        escaped.insert(token::LOGO, "");
    }
    escaped.apply(template).into_owned()
}

pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

/// Encode an image as a `data:` URI for embedding in the HTML header.
///
/// The MIME type follows the extension; unknown extensions are sent as PNG.
/// A missing or unreadable file yields `None` with a warning.
pub fn logo_data_uri(path: &Path) -> Option<String> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "logo unavailable");
            return None;
        }
    };
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let mime = match extension.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        _ => "image/png",
    };
    Some(format!("data:{mime};base64,{}", STANDARD.encode(bytes)))
}
