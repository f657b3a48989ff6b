//! Blank-entry indicator detection
//!
//! Two independent scans over a line of text: underscore runs (blanks meant
//! to be written on) and checkbox/radio glyphs. Offsets are character
//! offsets, not byte offsets, so they index straight into the positioner's
//! output.

use once_cell::sync::Lazy;
use regex::Regex;

/// Kind of blank-entry indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorKind {
    UnderscoreRun,
    Checkbox,
    Radio,
}

/// A character range inside a merged fragment's text.
///
/// `end` is inclusive: `start <= end < text.chars().count()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorSegment {
    pub kind: IndicatorKind,
    pub start: usize,
    pub end: usize,
    pub length: usize,
}

impl IndicatorSegment {
    fn new(kind: IndicatorKind, start: usize, end: usize) -> Self {
        Self {
            kind,
            start,
            end,
            length: end - start + 1,
        }
    }
}

/// Underscore-run policy knobs
#[derive(Debug, Clone, Copy)]
pub struct RunPolicy {
    /// Minimum number of underscores for a run to count as a blank
    pub min_underscores: usize,
    /// Tolerate spaces between underscores
    pub allow_spaces: bool,
    /// A gap of this many spaces (or more) ends the run
    pub max_gap: usize,
}

impl Default for RunPolicy {
    fn default() -> Self {
        Self {
            min_underscores: 2,
            allow_spaces: true,
            max_gap: 2,
        }
    }
}

/// Checkbox glyphs, bracket pairs and parenthesis pairs
static GLYPH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"☐|□|\[\s*\]|\(\s*\)").expect("valid glyph pattern"));

/// Characters that make a fragment a candidate for blank detection
const INDICATOR_CHARS: &[char] = &['_', '☐', '□', '[', ']', '(', ')'];

/// Whether `text` contains anything that could be a blank-entry indicator
pub fn has_indicator_chars(text: &str) -> bool {
    text.contains(INDICATOR_CHARS)
}

/// Find underscore runs in `text`
pub fn underscore_runs(text: &str, policy: &RunPolicy) -> Vec<IndicatorSegment> {
    let chars: Vec<char> = text.chars().collect();
    let mut segments = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '_' {
            i += 1;
            continue;
        }

        let start = i;
        let mut last_underscore = i;
        let mut count = 0;
        let mut gap = 0;

        while i < chars.len() {
            match chars[i] {
                '_' => {
                    count += 1;
                    gap = 0;
                    last_underscore = i;
                }
                ' ' if policy.allow_spaces => {
                    gap += 1;
                    if gap >= policy.max_gap {
                        break;
                    }
                }
                _ => break,
            }
            i += 1;
        }

        if count >= policy.min_underscores {
            segments.push(IndicatorSegment::new(
                IndicatorKind::UnderscoreRun,
                start,
                last_underscore,
            ));
        }
        i = last_underscore + 1;
    }

    segments
}

/// Find checkbox and radio glyphs in `text`
pub fn glyph_indicators(text: &str) -> Vec<IndicatorSegment> {
    GLYPH_RE
        .find_iter(text)
        .map(|m| {
            let kind = if m.as_str().starts_with('(') {
                IndicatorKind::Radio
            } else {
                IndicatorKind::Checkbox
            };
            let start = text[..m.start()].chars().count();
            let end = start + m.as_str().chars().count() - 1;
            IndicatorSegment::new(kind, start, end)
        })
        .collect()
}

/// All indicators in `text`, ordered by start offset
pub fn detect_indicators(text: &str, policy: &RunPolicy) -> Vec<IndicatorSegment> {
    let mut segments = underscore_runs(text, policy);
    segments.extend(glyph_indicators(text));
    segments.sort_by_key(|s| (s.start, s.end));
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runs(text: &str) -> Vec<(usize, usize)> {
        underscore_runs(text, &RunPolicy::default())
            .iter()
            .map(|s| (s.start, s.end))
            .collect()
    }

    #[test]
    fn test_single_underscore_ignored() {
        assert!(runs("file_name.txt").is_empty());
        assert!(runs("_").is_empty());
    }

    #[test]
    fn test_short_blank_detected() {
        assert_eq!(runs("Initials __"), vec![(9, 10)]);
    }

    #[test]
    fn test_run_offsets() {
        assert_eq!(runs("Name: _____"), vec![(6, 10)]);
    }

    #[test]
    fn test_single_space_inside_run() {
        assert_eq!(runs("_ _ _ _"), vec![(0, 6)]);
    }

    #[test]
    fn test_double_space_breaks_run() {
        assert_eq!(
            runs("Signature: ________  Date: ___"),
            vec![(11, 18), (27, 29)]
        );
    }

    #[test]
    fn test_comma_breaks_run() {
        assert_eq!(runs("___,___"), vec![(0, 2), (4, 6)]);
    }

    #[test]
    fn test_trailing_space_not_in_run() {
        let segs = underscore_runs("___ x", &RunPolicy::default());
        assert_eq!(segs[0].end, 2);
        assert_eq!(segs[0].length, 3);
    }

    #[test]
    fn test_spaces_disallowed() {
        let policy = RunPolicy {
            allow_spaces: false,
            ..RunPolicy::default()
        };
        let segs = underscore_runs("__ __", &policy);
        assert_eq!(segs.len(), 2);
    }

    #[test]
    fn test_runs_are_disjoint_and_ordered() {
        let segs = underscore_runs("a ___ b ____ c __ d _", &RunPolicy::default());
        assert_eq!(segs.len(), 3);
        for pair in segs.windows(2) {
            assert!(pair[0].end < pair[1].start);
        }
    }

    #[test]
    fn test_glyphs() {
        let segs = glyph_indicators("☐ I agree [ ] yes ( ) no [] ()");
        let kinds: Vec<IndicatorKind> = segs.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                IndicatorKind::Checkbox,
                IndicatorKind::Checkbox,
                IndicatorKind::Radio,
                IndicatorKind::Checkbox,
                IndicatorKind::Radio,
            ]
        );
        assert_eq!(segs[0].start, 0);
        assert_eq!(segs[0].end, 0);
        // char offsets, not byte offsets
        assert_eq!(segs[1].start, 10);
        assert_eq!(segs[1].end, 12);
    }

    #[test]
    fn test_parenthesised_text_is_not_radio() {
        assert!(glyph_indicators("(Buyer)").is_empty());
    }

    #[test]
    fn test_detect_indicators_sorted() {
        let segs = detect_indicators("[ ] Yes ____ ( ) No", &RunPolicy::default());
        let starts: Vec<usize> = segs.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![0, 8, 13]);
        assert_eq!(segs[1].kind, IndicatorKind::UnderscoreRun);
    }

    #[test]
    fn test_has_indicator_chars() {
        assert!(has_indicator_chars("Name ___"));
        assert!(has_indicator_chars("☐ yes"));
        assert!(!has_indicator_chars("Plain prose."));
    }
}
