//! Field inference pipeline
//!
//! Runs the stages end to end: merge fragments into lines, find blanks,
//! position, classify, name and emit regions. A run is a pure function of
//! its input; ids start at 1 on every call.

use crate::classifier::{default_keyword_rules, KeywordRule};
use crate::fragment::{merge_fragments, TextFragment};
use crate::indicators::{detect_indicators, RunPolicy};
use crate::regions::{emit_regions, FieldCounter, FieldRegion, FieldStats};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Tunables for field inference.
///
/// The defaults are empirically tuned, not derived from font metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Max vertical distance between fragment tops to count as one line
    pub merge_line_tolerance: f32,
    /// Smallest horizontal gap allowed when merging (negative = overlap)
    pub merge_min_gap: f32,
    /// Largest horizontal gap allowed when merging
    pub merge_max_gap: f32,
    /// Minimum underscores in a blank
    pub min_underscores: usize,
    /// Tolerate single spaces inside underscore runs
    pub allow_spaces_in_runs: bool,
    /// Consecutive spaces that end an underscore run
    pub max_run_gap: usize,
    /// Characters of context taken on each side of a blank
    pub context_window: usize,
    /// Minimum clickable width of a text field
    pub min_field_width: f32,
    /// Checkbox/radio side as a fraction of the font size
    pub checkbox_scale: f32,
    /// Words of preceding text used in field names
    pub name_words: usize,
    /// Classification table, highest priority first
    pub keyword_rules: Vec<KeywordRule>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            merge_line_tolerance: 15.0,
            merge_min_gap: -5.0,
            merge_max_gap: 200.0,
            min_underscores: 2,
            allow_spaces_in_runs: true,
            max_run_gap: 2,
            context_window: 100,
            min_field_width: 30.0,
            checkbox_scale: 0.88,
            name_words: 3,
            keyword_rules: default_keyword_rules(),
        }
    }
}

impl InferenceConfig {
    pub fn run_policy(&self) -> RunPolicy {
        RunPolicy {
            min_underscores: self.min_underscores.max(1),
            allow_spaces: self.allow_spaces_in_runs,
            max_gap: self.max_run_gap.max(1),
        }
    }
}

/// Result of one inference run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDetection {
    pub regions: Vec<FieldRegion>,
    pub stats: FieldStats,
    /// Number of candidate lines after merging
    pub merged_fragments: usize,
}

impl FieldDetection {
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

/// Infer form-field regions from extracted text fragments
pub fn detect_fields(fragments: &[TextFragment], config: &InferenceConfig) -> FieldDetection {
    let merged = merge_fragments(fragments, config);
    let policy = config.run_policy();
    let mut counter = FieldCounter::new();
    let mut regions = Vec::new();

    for fragment in &merged {
        let segments = detect_indicators(&fragment.text, &policy);
        if segments.is_empty() {
            continue;
        }
        regions.extend(emit_regions(fragment, &segments, &mut counter, config));
    }

    let stats = FieldStats::from_regions(&regions);
    log::info!(
        "detected {} fields from {} fragments ({} candidate lines)",
        stats.total,
        fragments.len(),
        merged.len()
    );

    FieldDetection {
        regions,
        stats,
        merged_fragments: merged.len(),
    }
}

/// Run independent documents in parallel; results keep input order
pub fn detect_fields_batch(
    documents: &[Vec<TextFragment>],
    config: &InferenceConfig,
) -> Vec<FieldDetection> {
    documents
        .par_iter()
        .map(|fragments| detect_fields(fragments, config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::FieldType;
    use crate::fragment::Bounds;

    fn frag(text: &str, bounds: [f32; 4], font: &str, size: f32) -> TextFragment {
        TextFragment {
            text: text.into(),
            bounds: Bounds::new(bounds[0], bounds[1], bounds[2], bounds[3]),
            page: 0,
            font_name: font.into(),
            font_size: size,
        }
    }

    #[test]
    fn test_config_default() {
        let config = InferenceConfig::default();
        assert_eq!(config.min_underscores, 2);
        assert_eq!(config.context_window, 100);
        assert_eq!(config.keyword_rules[0].field_type, FieldType::Signature);
    }

    #[test]
    fn test_config_partial_json() {
        let config: InferenceConfig =
            serde_json::from_str(r#"{"min_underscores": 3, "context_window": 40}"#).unwrap();
        assert_eq!(config.min_underscores, 3);
        assert_eq!(config.context_window, 40);
        assert!((config.min_field_width - 30.0).abs() < 0.001);
        assert_eq!(config.keyword_rules.len(), 7);
    }

    #[test]
    fn test_empty_input() {
        let detection = detect_fields(&[], &InferenceConfig::default());
        assert!(detection.is_empty());
        assert_eq!(detection.stats.total, 0);
    }

    #[test]
    fn test_ids_restart_per_run() {
        let fragments = vec![frag("Name: ____", [100.0, 700.0, 250.0, 715.0], "Arial", 12.0)];
        let config = InferenceConfig::default();
        let first = detect_fields(&fragments, &config);
        let second = detect_fields(&fragments, &config);
        assert_eq!(first.regions[0].id, 1);
        assert_eq!(second.regions[0].id, 1);
        assert_eq!(first.regions, second.regions);
    }

    #[test]
    fn test_min_underscores_config() {
        let fragments = vec![frag("Initials __", [100.0, 700.0, 250.0, 715.0], "Arial", 12.0)];
        let config = InferenceConfig {
            min_underscores: 3,
            ..InferenceConfig::default()
        };
        assert!(detect_fields(&fragments, &config).is_empty());
        assert_eq!(
            detect_fields(&fragments, &InferenceConfig::default()).regions.len(),
            1
        );
    }

    #[test]
    fn test_batch_matches_sequential() {
        let docs = vec![
            vec![frag("Date ___", [0.0, 0.0, 50.0, 12.0], "Arial", 10.0)],
            vec![],
            vec![frag("[ ] a ( ) b", [0.0, 0.0, 50.0, 12.0], "Arial", 10.0)],
        ];
        let config = InferenceConfig::default();
        let batch = detect_fields_batch(&docs, &config);
        assert_eq!(batch.len(), 3);
        for (doc, result) in docs.iter().zip(&batch) {
            assert_eq!(detect_fields(doc, &config).regions, result.regions);
        }
    }
}
