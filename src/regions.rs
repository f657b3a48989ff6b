//! Region emission
//!
//! Turns the indicators found in one merged line into page rectangles with a
//! type and a name. Geometry is left unclamped; fitting regions into the page
//! is the materializer's job.

use crate::classifier::{classify, extract_context, FieldContext, FieldType};
use crate::engine::InferenceConfig;
use crate::fragment::MergedFragment;
use crate::indicators::{IndicatorKind, IndicatorSegment};
use crate::naming::field_name;
use crate::positioner::{char_advance, char_positions};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A rectangle to turn into an interactive widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRegion {
    /// 1-based, increasing within one run
    pub id: u32,
    pub name: String,
    /// Page index (0-based)
    pub page: u32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub field_type: FieldType,
    pub font_size: f32,
    pub context: FieldContext,
}

/// Hands out field ids for a single run
#[derive(Debug, Clone)]
pub struct FieldCounter {
    next: u32,
}

impl FieldCounter {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next_id(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Number of ids issued so far
    pub fn issued(&self) -> u32 {
        self.next - 1
    }
}

impl Default for FieldCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-type region counts for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldStats {
    pub total: usize,
    pub by_type: BTreeMap<FieldType, usize>,
}

impl FieldStats {
    pub fn from_regions(regions: &[FieldRegion]) -> Self {
        let mut by_type = BTreeMap::new();
        for region in regions {
            *by_type.entry(region.field_type).or_insert(0) += 1;
        }
        Self {
            total: regions.len(),
            by_type,
        }
    }

    pub fn count(&self, field_type: FieldType) -> usize {
        self.by_type.get(&field_type).copied().unwrap_or(0)
    }
}

/// Emit one region per segment of `fragment`, in segment order
pub fn emit_regions(
    fragment: &MergedFragment,
    segments: &[IndicatorSegment],
    counter: &mut FieldCounter,
    config: &InferenceConfig,
) -> Vec<FieldRegion> {
    let chars: Vec<char> = fragment.text.chars().collect();
    let positions = char_positions(
        &fragment.text,
        fragment.bounds.x0,
        &fragment.font_name,
        fragment.font_size,
    );
    let line_height = fragment.bounds.height();
    let square = fragment.font_size * config.checkbox_scale;

    let mut regions = Vec::with_capacity(segments.len());

    for (i, segment) in segments.iter().enumerate() {
        if segment.end >= chars.len() || segment.start > segment.end {
            log::debug!(
                "skipping segment {}..={} outside {:?}",
                segment.start,
                segment.end,
                fragment.text
            );
            continue;
        }

        let lower = if i > 0 { segments[i - 1].end + 1 } else { 0 };
        let upper = segments.get(i + 1).map_or(chars.len(), |s| s.start);
        let context = extract_context(
            &chars,
            segment.start,
            segment.end,
            lower,
            upper,
            config.context_window,
        );

        let x = positions[segment.start];
        let (field_type, width, height) = match segment.kind {
            IndicatorKind::Checkbox => (FieldType::Checkbox, square, square),
            IndicatorKind::Radio => (FieldType::Radio, square, square),
            IndicatorKind::UnderscoreRun => {
                let right = positions[segment.end]
                    + char_advance(chars[segment.end], &fragment.font_name, fragment.font_size);
                let field_type = classify(&context, &fragment.text, &config.keyword_rules);
                (field_type, (right - x).max(config.min_field_width), line_height)
            }
        };

        if !(width > 0.0 && height > 0.0) {
            log::debug!(
                "skipping degenerate {} region on page {} ({}x{})",
                field_type,
                fragment.page,
                width,
                height
            );
            continue;
        }

        let id = counter.next_id();
        regions.push(FieldRegion {
            id,
            name: field_name(&context, id, field_type, config.name_words),
            page: fragment.page,
            x,
            y: fragment.bounds.y0,
            width,
            height,
            field_type,
            font_size: fragment.font_size,
            context,
        });
    }

    regions
}
