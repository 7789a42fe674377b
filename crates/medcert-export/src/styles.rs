use serde::{Deserialize, Serialize};

/// Typography of the built-in Word declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentStyles {
    /// Font for body text (e.g. "Times New Roman", "Calibri").
    pub body_font: String,

    /// Font for the clinic header and titles.
    pub heading_font: String,

    /// Body text font size in points.
    pub body_size: usize,

    /// Document title ("DECLARAÇÃO") font size in points.
    pub title_size: usize,

    /// Section heading font size in points.
    pub heading_size: usize,

    /// Footer and small print font size in points.
    pub small_size: usize,

    /// Page margin in millimetres (applied uniformly).
    pub margin_mm: f64,
}

impl Default for DocumentStyles {
    fn default() -> Self {
        Self {
            body_font: "Times New Roman".to_string(),
            heading_font: "Arial".to_string(),
            body_size: 12,
            title_size: 16,
            heading_size: 13,
            small_size: 9,
            margin_mm: 20.0,
        }
    }
}

impl DocumentStyles {
    /// Uniform page margin in twentieths of a point, as OOXML expects.
    pub fn margin_twips(&self) -> i32 {
        (self.margin_mm / 25.4 * 1440.0).round() as i32
    }
}
