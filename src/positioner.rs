//! Character positioning with a fixed width model
//!
//! Real glyph widths are not available for pre-extracted text, so each font
//! family gets a single width factor and a handful of narrow characters get
//! a fraction of the base advance. Good enough to locate a blank run on the
//! page, not typographically exact.

/// Width factors by font family, matched as lowercase substrings.
/// Bold variants come first so they win over the plain family.
const FONT_WIDTH_FACTORS: &[(&str, f32)] = &[
    ("helvetica-bold", 0.58),
    ("helvetica,bold", 0.58),
    ("helvetica", 0.55),
    ("times-bold", 0.51),
    ("timesnewroman,bold", 0.51),
    ("times", 0.48),
    ("courier", 0.60),
    ("arial-bold", 0.56),
    ("arial,bold", 0.56),
    ("arial", 0.53),
];

/// Width factor for font names not in the table
pub const DEFAULT_WIDTH_FACTOR: f32 = 0.53;

/// Look up the width factor for a font name
pub fn width_factor(font_name: &str) -> f32 {
    let lower = font_name.to_lowercase();
    FONT_WIDTH_FACTORS
        .iter()
        .find(|(family, _)| lower.contains(family))
        .map(|(_, factor)| *factor)
        .unwrap_or(DEFAULT_WIDTH_FACTOR)
}

/// Fraction of the base advance a character occupies
fn advance_ratio(ch: char) -> f32 {
    match ch {
        ' ' => 0.3,
        '_' => 0.5,
        '(' | ')' | '[' | ']' => 0.38,
        '.' | ',' | ':' | ';' | '\'' => 0.28,
        '$' => 0.6,
        _ => 1.0,
    }
}

/// Horizontal advance of a single character
pub fn char_advance(ch: char, font_name: &str, font_size: f32) -> f32 {
    font_size * width_factor(font_name) * advance_ratio(ch)
}

/// X coordinate of every character in `text`, starting at `start_x`.
///
/// `positions[0] == start_x` and the sequence is non-decreasing for any
/// non-negative font size.
pub fn char_positions(text: &str, start_x: f32, font_name: &str, font_size: f32) -> Vec<f32> {
    let base = font_size.max(0.0) * width_factor(font_name);
    let mut positions = Vec::with_capacity(text.len());
    let mut x = start_x;

    for ch in text.chars() {
        positions.push(x);
        x += base * advance_ratio(ch);
    }

    positions
}

/// Estimated rendered width of a whole string
pub fn text_width(text: &str, font_name: &str, font_size: f32) -> f32 {
    let base = font_size.max(0.0) * width_factor(font_name);
    text.chars().map(|ch| base * advance_ratio(ch)).sum()
}
