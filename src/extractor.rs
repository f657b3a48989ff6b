//! Text fragment extraction from PDF using lopdf
//!
//! For callers without a pre-extracted element list: walks each page's
//! content stream and records every shown string as a `TextFragment`.
//! Widths are estimated with the fixed width model since glyph widths are
//! not read.

use crate::fragment::{Bounds, TextFragment};
use crate::positioner::text_width;
use crate::FormFillError;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::BTreeMap;
use std::path::Path;

/// Extract text fragments from a PDF file
pub fn extract_fragments<P: AsRef<Path>>(path: P) -> Result<Vec<TextFragment>, FormFillError> {
    let doc = Document::load(path)?;
    extract_fragments_from_doc(&doc)
}

/// Extract text fragments from a PDF memory buffer
pub fn extract_fragments_mem(buffer: &[u8]) -> Result<Vec<TextFragment>, FormFillError> {
    let doc = Document::load_mem(buffer)?;
    extract_fragments_from_doc(&doc)
}

fn extract_fragments_from_doc(doc: &Document) -> Result<Vec<TextFragment>, FormFillError> {
    let pages = doc.get_pages();
    let mut all = Vec::new();

    for (page_num, &page_id) in pages.iter() {
        // lopdf numbers pages from 1; fragments use 0-based pages
        let fragments = extract_page_fragments(doc, page_id, page_num.saturating_sub(1))?;
        all.extend(fragments);
    }

    log::debug!("extracted {} fragments from {} pages", all.len(), pages.len());
    Ok(all)
}

/// Multiply two 2D transformation matrices
/// Matrix format: [a, b, c, d, e, f] representing:
/// | a  b  0 |
/// | c  d  0 |
/// | e  f  1 |
fn multiply_matrices(m1: &[f32; 6], m2: &[f32; 6]) -> [f32; 6] {
    [
        m1[0] * m2[0] + m1[1] * m2[2],
        m1[0] * m2[1] + m1[1] * m2[3],
        m1[2] * m2[0] + m1[3] * m2[2],
        m1[2] * m2[1] + m1[3] * m2[3],
        m1[4] * m2[0] + m1[5] * m2[2] + m2[4],
        m1[4] * m2[1] + m1[5] * m2[3] + m2[5],
    ]
}

/// Text state while walking a content stream
struct TextState<'a> {
    doc: &'a Document,
    fonts: BTreeMap<Vec<u8>, &'a Dictionary>,
    page: u32,
    ctm: [f32; 6],
    text_matrix: [f32; 6],
    font_resource: String,
    font_name: String,
    font_size: f32,
    fragments: Vec<TextFragment>,
}

impl<'a> TextState<'a> {
    fn set_font(&mut self, resource: &[u8], size: f32) {
        self.font_resource = String::from_utf8_lossy(resource).to_string();
        self.font_name = self
            .fonts
            .get(resource)
            .and_then(|dict| dict.get(b"BaseFont").ok())
            .and_then(|obj| obj.as_name().ok())
            .map(|name| String::from_utf8_lossy(name).to_string())
            .unwrap_or_else(|| self.font_resource.clone());
        self.font_size = size;
    }

    fn decode(&self, obj: &Object) -> Option<String> {
        decode_operand(obj, self.doc, &self.fonts, &self.font_resource)
    }

    fn show(&mut self, text: String) {
        if text.trim().is_empty() {
            return;
        }
        let size = effective_font_size(self.font_size, &self.text_matrix);
        let combined = multiply_matrices(&self.text_matrix, &self.ctm);
        let (x, y) = (combined[4], combined[5]);
        let width = text_width(&text, &self.font_name, size);

        self.fragments.push(TextFragment {
            bounds: Bounds::new(x, y, x + width, y + size),
            text,
            page: self.page,
            font_name: self.font_name.clone(),
            font_size: size,
        });

        // Advance past the shown text so consecutive strings do not stack
        self.text_matrix[4] += width;
    }
}

/// Extract fragments from a single page
fn extract_page_fragments(
    doc: &Document,
    page_id: ObjectId,
    page: u32,
) -> Result<Vec<TextFragment>, FormFillError> {
    use lopdf::content::Content;

    let content_data = doc
        .get_page_content(page_id)
        .map_err(|e| FormFillError::Parse(e.to_string()))?;
    let content = Content::decode(&content_data).map_err(|e| FormFillError::Parse(e.to_string()))?;

    let mut state = TextState {
        doc,
        fonts: doc.get_page_fonts(page_id).unwrap_or_default(),
        page,
        ctm: [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
        text_matrix: [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
        font_resource: String::new(),
        font_name: String::new(),
        font_size: 12.0,
        fragments: Vec::new(),
    };
    let mut ctm_stack: Vec<[f32; 6]> = Vec::new();
    let mut line_matrix = [1.0f32, 0.0, 0.0, 1.0, 0.0, 0.0];
    let mut in_text_block = false;
    // Text leading from TL or TD; None falls back to 1.2x font size
    let mut leading: Option<f32> = None;

    for op in &content.operations {
        match op.operator.as_str() {
            "q" => ctm_stack.push(state.ctm),
            "Q" => {
                if let Some(saved) = ctm_stack.pop() {
                    state.ctm = saved;
                }
            }
            "cm" => {
                if op.operands.len() >= 6 {
                    let m = [
                        get_number(&op.operands[0]).unwrap_or(1.0),
                        get_number(&op.operands[1]).unwrap_or(0.0),
                        get_number(&op.operands[2]).unwrap_or(0.0),
                        get_number(&op.operands[3]).unwrap_or(1.0),
                        get_number(&op.operands[4]).unwrap_or(0.0),
                        get_number(&op.operands[5]).unwrap_or(0.0),
                    ];
                    state.ctm = multiply_matrices(&m, &state.ctm);
                }
            }
            "BT" => {
                in_text_block = true;
                state.text_matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
                line_matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
            }
            "ET" => in_text_block = false,
            "Tf" => {
                if op.operands.len() >= 2 {
                    if let Ok(name) = op.operands[0].as_name() {
                        let size = get_number(&op.operands[1]).unwrap_or(state.font_size);
                        state.set_font(name, size);
                    }
                }
            }
            "Td" | "TD" => {
                if op.operands.len() >= 2 {
                    let ty = get_number(&op.operands[1]).unwrap_or(0.0);
                    line_matrix[4] += get_number(&op.operands[0]).unwrap_or(0.0);
                    line_matrix[5] += ty;
                    state.text_matrix = line_matrix;
                    if op.operator == "TD" {
                        leading = Some(-ty);
                    }
                }
            }
            "TL" => {
                if let Some(value) = op.operands.first().and_then(get_number) {
                    leading = Some(value);
                }
            }
            "Tm" => {
                if op.operands.len() >= 6 {
                    for (i, operand) in op.operands.iter().take(6).enumerate() {
                        state.text_matrix[i] =
                            get_number(operand).unwrap_or(if i == 0 || i == 3 { 1.0 } else { 0.0 });
                    }
                    line_matrix = state.text_matrix;
                }
            }
            "T*" => {
                line_matrix[5] -= leading.unwrap_or(state.font_size * 1.2);
                state.text_matrix = line_matrix;
            }
            "Tj" => {
                if in_text_block && !op.operands.is_empty() {
                    if let Some(text) = state.decode(&op.operands[0]) {
                        state.show(text);
                    }
                }
            }
            "TJ" => {
                if in_text_block && !op.operands.is_empty() {
                    if let Ok(array) = op.operands[0].as_array() {
                        let text: String = array.iter().filter_map(|item| state.decode(item)).collect();
                        state.show(text);
                    }
                }
            }
            "'" | "\"" => {
                // `"` carries word and char spacing ahead of the string
                let operand = if op.operator == "'" {
                    op.operands.first()
                } else {
                    op.operands.get(2)
                };
                if in_text_block {
                    if let Some(operand) = operand {
                        line_matrix[5] -= leading.unwrap_or(state.font_size * 1.2);
                        state.text_matrix = line_matrix;
                        if let Some(text) = state.decode(operand) {
                            state.show(text);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    Ok(state.fragments)
}

/// Helper to get f32 from Object
pub(crate) fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Compute effective font size from base size and text matrix
fn effective_font_size(base_size: f32, text_matrix: &[f32; 6]) -> f32 {
    let scale_x = (text_matrix[0].powi(2) + text_matrix[1].powi(2)).sqrt();
    let scale_y = (text_matrix[2].powi(2) + text_matrix[3].powi(2)).sqrt();
    base_size * scale_x.max(scale_y)
}

/// Decode a string operand using the current font's encoding
fn decode_operand(
    obj: &Object,
    doc: &Document,
    fonts: &BTreeMap<Vec<u8>, &Dictionary>,
    current_font: &str,
) -> Option<String> {
    if let Object::String(bytes, _) = obj {
        if let Some(font_dict) = fonts.get(current_font.as_bytes()) {
            if let Ok(encoding) = font_dict.get_font_encoding(doc) {
                if let Ok(text) = Document::decode_text(&encoding, bytes) {
                    return Some(text);
                }
            }
        }

        // Fallback: UTF-16BE with BOM, then Latin-1
        if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
            let utf16: Vec<u16> = bytes[2..]
                .chunks_exact(2)
                .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
                .collect();
            return Some(String::from_utf16_lossy(&utf16));
        }

        Some(bytes.iter().map(|&b| b as char).collect())
    } else {
        None
    }
}
