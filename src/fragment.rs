//! Text fragments and line merging
//!
//! Extraction tools split a visual line into many runs. The merger stitches
//! runs that belong together back into one logical line, but only for runs
//! that take part in blank detection; plain prose is dropped from the
//! working set.

use crate::engine::InferenceConfig;
use crate::indicators::has_indicator_chars;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box `[x0, y0, x1, y1]` in page coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Bounds {
    /// Build bounds from two corners in any order
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Smallest box containing both
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }
}

/// One unit of extracted text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    pub text: String,
    pub bounds: Bounds,
    /// Page index (0-based)
    pub page: u32,
    pub font_name: String,
    pub font_size: f32,
}

/// One or more fragments joined into a logical line
#[derive(Debug, Clone, PartialEq)]
pub struct MergedFragment {
    pub text: String,
    pub bounds: Bounds,
    pub page: u32,
    pub font_name: String,
    pub font_size: f32,
    /// Number of source fragments
    pub parts: usize,
}

impl MergedFragment {
    fn start(fragment: &TextFragment) -> Self {
        Self {
            text: fragment.text.clone(),
            bounds: fragment.bounds,
            page: fragment.page,
            font_name: fragment.font_name.clone(),
            font_size: fragment.font_size,
            parts: 1,
        }
    }

    fn accepts(&self, fragment: &TextFragment, config: &InferenceConfig) -> bool {
        if fragment.page != self.page {
            return false;
        }
        let dy = (fragment.bounds.y0 - self.bounds.y0).abs();
        let dx = fragment.bounds.x0 - self.bounds.x1;
        dy < config.merge_line_tolerance && dx >= config.merge_min_gap && dx <= config.merge_max_gap
    }

    fn append(&mut self, fragment: &TextFragment) {
        let needs_space = !self.text.ends_with(char::is_whitespace)
            && !fragment.text.starts_with(char::is_whitespace);
        if needs_space {
            self.text.push(' ');
        }
        self.text.push_str(&fragment.text);
        self.bounds = self.bounds.union(&fragment.bounds);
        self.parts += 1;
    }
}

/// Merge adjacent indicator-bearing fragments into logical lines.
///
/// Fragments are visited in extraction order with at most one open
/// accumulator; anything that cannot be merged flushes it.
pub fn merge_fragments(fragments: &[TextFragment], config: &InferenceConfig) -> Vec<MergedFragment> {
    let mut merged = Vec::new();
    let mut open: Option<MergedFragment> = None;

    for fragment in fragments {
        if fragment.text.trim().is_empty() || !has_indicator_chars(&fragment.text) {
            merged.extend(open.take());
            continue;
        }

        match open.as_mut() {
            Some(acc) if acc.accepts(fragment, config) => acc.append(fragment),
            _ => {
                merged.extend(open.take());
                open = Some(MergedFragment::start(fragment));
            }
        }
    }
    merged.extend(open);

    log::debug!(
        "merged {} fragments into {} candidate lines",
        fragments.len(),
        merged.len()
    );

    merged
}
