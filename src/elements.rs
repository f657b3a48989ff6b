//! Reading pre-extracted element lists
//!
//! Accepts the JSON produced by PDF extraction services: either an object
//! with an `elements` array or a bare array. Each element looks like
//! `{"Text": "...", "Bounds": [x0, y0, x1, y1], "Page": 0,
//! "Font": {"name": "...", "family_name": "..."}, "TextSize": 11.0}`.

use crate::fragment::{Bounds, TextFragment};
use crate::FormFillError;
use serde::Deserialize;
use std::path::Path;

const DEFAULT_FONT_SIZE: f32 = 12.0;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ElementList {
    Wrapped { elements: Vec<RawElement> },
    Bare(Vec<RawElement>),
}

#[derive(Debug, Default, Deserialize)]
struct RawFont {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    family_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawElement {
    #[serde(rename = "Text", default)]
    text: Option<String>,
    #[serde(rename = "Bounds", default)]
    bounds: Option<Vec<f32>>,
    #[serde(rename = "Page", default)]
    page: Option<u32>,
    #[serde(rename = "Font", default)]
    font: Option<RawFont>,
    #[serde(rename = "TextSize", default)]
    text_size: Option<f32>,
}

impl RawElement {
    fn into_fragment(self, index: usize) -> Result<TextFragment, FormFillError> {
        let bounds = match self.bounds {
            Some(b) if b.len() == 4 => Some(Bounds::new(b[0], b[1], b[2], b[3])),
            Some(b) => {
                return Err(FormFillError::InvalidInput(format!(
                    "element {}: Bounds must have 4 numbers, got {}",
                    index,
                    b.len()
                )))
            }
            None => None,
        };

        let font = self.font.unwrap_or_default();
        let font_name = font.name.or(font.family_name).unwrap_or_default();

        // Elements without position or text (figures, paths) still break lines
        let (text, bounds) = match (self.text, bounds) {
            (Some(text), Some(bounds)) => (text, bounds),
            _ => (String::new(), Bounds::new(0.0, 0.0, 0.0, 0.0)),
        };

        Ok(TextFragment {
            text,
            bounds,
            page: self.page.unwrap_or(0),
            font_name,
            font_size: self
                .text_size
                .filter(|s| s.is_finite() && *s > 0.0)
                .unwrap_or(DEFAULT_FONT_SIZE),
        })
    }
}

/// Parse an element list from JSON
pub fn parse_elements(json: &str) -> Result<Vec<TextFragment>, FormFillError> {
    let list: ElementList = serde_json::from_str(json)
        .map_err(|e| FormFillError::InvalidInput(format!("malformed element list: {}", e)))?;

    let raw = match list {
        ElementList::Wrapped { elements } => elements,
        ElementList::Bare(elements) => elements,
    };

    raw.into_iter()
        .enumerate()
        .map(|(i, element)| element.into_fragment(i))
        .collect()
}

/// Load an element list from a JSON file
pub fn load_elements<P: AsRef<Path>>(path: P) -> Result<Vec<TextFragment>, FormFillError> {
    let json = std::fs::read_to_string(path)?;
    parse_elements(&json)
}
