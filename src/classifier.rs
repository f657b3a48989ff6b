//! Context extraction and semantic field classification
//!
//! Each blank is labelled by the text around it. Classification is a
//! top-down walk over an ordered keyword table; the first rule with a
//! matching keyword decides the field type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic type of a detected field
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Date,
    Name,
    Address,
    Phone,
    Email,
    Currency,
    Signature,
    Checkbox,
    Radio,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Date => "date",
            FieldType::Name => "name",
            FieldType::Address => "address",
            FieldType::Phone => "phone",
            FieldType::Email => "email",
            FieldType::Currency => "currency",
            FieldType::Signature => "signature",
            FieldType::Checkbox => "checkbox",
            FieldType::Radio => "radio",
        }
    }

    /// Checkbox and radio fields are typed by their glyph, not by keywords
    pub fn is_toggle(&self) -> bool {
        matches!(self, FieldType::Checkbox | FieldType::Radio)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Text immediately surrounding an indicator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldContext {
    pub before: String,
    pub after: String,
}

/// One row of the classification table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub field_type: FieldType,
    /// Lowercase keywords; any substring hit selects `field_type`
    pub keywords: Vec<String>,
}

impl KeywordRule {
    pub fn new(field_type: FieldType, keywords: &[&str]) -> Self {
        Self {
            field_type,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    fn matches(&self, haystack: &str) -> bool {
        self.keywords.iter().any(|k| haystack.contains(k.as_str()))
    }
}

/// Default classification table, highest priority first.
///
/// Signature blocks routinely carry amounts and dates nearby, so signature
/// must stay ahead of currency and date.
pub fn default_keyword_rules() -> Vec<KeywordRule> {
    vec![
        KeywordRule::new(
            FieldType::Signature,
            &["sign", "signature", "signed by", "initial"],
        ),
        KeywordRule::new(
            FieldType::Currency,
            &["$", "amount", "sum of", "price", "deposit", "earnest money"],
        ),
        KeywordRule::new(FieldType::Date, &["date", "day", "month", "year"]),
        KeywordRule::new(FieldType::Name, &["name"]),
        KeywordRule::new(FieldType::Address, &["address"]),
        KeywordRule::new(FieldType::Phone, &["phone", "tel"]),
        KeywordRule::new(FieldType::Email, &["email", "e-mail"]),
    ]
}

/// Cut the context window around the character range `start..=end`.
///
/// `lower_bound` and `upper_bound` clip the window at neighbouring
/// indicators so one blank's label does not leak into the next.
pub fn extract_context(
    chars: &[char],
    start: usize,
    end: usize,
    lower_bound: usize,
    upper_bound: usize,
    window: usize,
) -> FieldContext {
    let len = chars.len();
    let start = start.min(len);
    let after_start = (end + 1).min(len);

    let before_from = start.saturating_sub(window).max(lower_bound.min(start));
    let after_to = after_start
        .saturating_add(window)
        .min(upper_bound.max(after_start))
        .min(len);

    let before: String = chars[before_from..start].iter().collect();
    let after: String = chars[after_start..after_to].iter().collect();

    FieldContext {
        before: before.trim().to_string(),
        after: after.trim().to_string(),
    }
}

fn match_rules(haystack: &str, rules: &[KeywordRule]) -> Option<FieldType> {
    rules
        .iter()
        .find(|rule| rule.matches(haystack))
        .map(|rule| rule.field_type)
}

/// Classify a blank from its surrounding context, falling back to the
/// whole line.
///
/// `before` and `after` are searched together so table priority decides
/// between them. The full line is only consulted when the context is
/// silent, since it also carries the labels of neighbouring blanks.
pub fn classify(context: &FieldContext, full_text: &str, rules: &[KeywordRule]) -> FieldType {
    let nearby = format!("{} {}", context.before, context.after).to_lowercase();
    match_rules(&nearby, rules)
        .or_else(|| match_rules(&full_text.to_lowercase(), rules))
        .unwrap_or(FieldType::Text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(before: &str, after: &str) -> FieldContext {
        FieldContext {
            before: before.into(),
            after: after.into(),
        }
    }

    #[test]
    fn test_signature_outranks_currency() {
        let rules = default_keyword_rules();
        let context = ctx("Signature of buyer for $100", "");
        assert_eq!(classify(&context, "", &rules), FieldType::Signature);
    }

    #[test]
    fn test_currency_outranks_date() {
        let rules = default_keyword_rules();
        let context = ctx("Deposit due on date", "");
        assert_eq!(classify(&context, "", &rules), FieldType::Currency);
    }

    #[test]
    fn test_simple_types() {
        let rules = default_keyword_rules();
        assert_eq!(classify(&ctx("Date:", ""), "", &rules), FieldType::Date);
        assert_eq!(classify(&ctx("Full Name:", ""), "", &rules), FieldType::Name);
        assert_eq!(
            classify(&ctx("Mailing Address", ""), "", &rules),
            FieldType::Address
        );
        assert_eq!(classify(&ctx("Phone", ""), "", &rules), FieldType::Phone);
        assert_eq!(classify(&ctx("E-Mail", ""), "", &rules), FieldType::Email);
        assert_eq!(classify(&ctx("Notes", ""), "", &rules), FieldType::Text);
    }

    #[test]
    fn test_after_context_counts() {
        let rules = default_keyword_rules();
        assert_eq!(classify(&ctx("", "(Buyer Name)"), "", &rules), FieldType::Name);
    }

    #[test]
    fn test_signature_after_blank_outranks_amount_before() {
        let rules = default_keyword_rules();
        let context = ctx("Deposit of $100", "(Buyer signature)");
        assert_eq!(
            classify(&context, "Deposit of $100 ____ (Buyer signature)", &rules),
            FieldType::Signature
        );
    }

    #[test]
    fn test_before_and_after_share_priority() {
        let rules = default_keyword_rules();
        let context = ctx("Name:", "Date:");
        assert_eq!(classify(&context, "", &rules), FieldType::Date);
    }

    #[test]
    fn test_full_text_fallback() {
        let rules = default_keyword_rules();
        let context = ctx("", "");
        assert_eq!(
            classify(&context, "Purchase price ____", &rules),
            FieldType::Currency
        );
    }

    #[test]
    fn test_context_prefers_nearby_label_over_line() {
        let rules = default_keyword_rules();
        let context = ctx("Date:", "");
        assert_eq!(
            classify(&context, "Signature: ____  Date: ___", &rules),
            FieldType::Date
        );
    }

    #[test]
    fn test_extract_context_window() {
        let chars: Vec<char> = "abcdefghij____klmnop".chars().collect();
        let context = extract_context(&chars, 10, 13, 0, chars.len(), 3);
        assert_eq!(context.before, "hij");
        assert_eq!(context.after, "klm");
    }

    #[test]
    fn test_extract_context_clipped_by_neighbours() {
        let chars: Vec<char> = "Sign: ___  Date: ___".chars().collect();
        // second blank starts at 17, previous blank ends at 8
        let context = extract_context(&chars, 17, 19, 9, chars.len(), 100);
        assert_eq!(context.before, "Date:");
        assert_eq!(context.after, "");
    }

    #[test]
    fn test_extract_context_at_edges() {
        let chars: Vec<char> = "__".chars().collect();
        let context = extract_context(&chars, 0, 1, 0, 2, 100);
        assert_eq!(context, FieldContext::default());
    }

    #[test]
    fn test_field_type_serializes_lowercase() {
        let json = serde_json::to_string(&FieldType::Signature).unwrap();
        assert_eq!(json, "\"signature\"");
    }
}
