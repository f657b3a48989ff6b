//! Field naming

use crate::classifier::{FieldContext, FieldType};

/// Words shorter than this are skipped when building a slug
const MIN_SLUG_WORD_CHARS: usize = 3;

/// Build a field name like `date_3_closing_date`.
///
/// The slug comes from the last `max_words` words of the preceding text.
/// Uniqueness within a run rests on `index` alone.
pub fn field_name(
    context: &FieldContext,
    index: u32,
    field_type: FieldType,
    max_words: usize,
) -> String {
    if field_type.is_toggle() {
        return format!("{}_{}", field_type, index);
    }

    let words: Vec<&str> = context
        .before
        .split_whitespace()
        .filter(|w| w.chars().count() >= MIN_SLUG_WORD_CHARS)
        .collect();
    let tail = &words[words.len().saturating_sub(max_words)..];

    let slug = tail
        .iter()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join("_");

    if slug.is_empty() {
        format!("{}_{}", field_type, index)
    } else {
        format!("{}_{}_{}", field_type, index, slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn before(text: &str) -> FieldContext {
        FieldContext {
            before: text.into(),
            after: String::new(),
        }
    }

    #[test]
    fn test_slug_from_last_words() {
        let name = field_name(&before("Name of the Buyer:"), 1, FieldType::Name, 3);
        assert_eq!(name, "name_1_name_the_buyer");
    }

    #[test]
    fn test_short_words_skipped() {
        let name = field_name(&before("I, a: to"), 2, FieldType::Text, 3);
        assert_eq!(name, "text_2");
    }

    #[test]
    fn test_toggle_has_no_slug() {
        let name = field_name(&before("Do you agree"), 4, FieldType::Checkbox, 3);
        assert_eq!(name, "checkbox_4");
    }

    #[test]
    fn test_deterministic_and_index_unique() {
        let context = before("Closing Date:");
        let a = field_name(&context, 5, FieldType::Date, 3);
        let b = field_name(&context, 5, FieldType::Date, 3);
        let c = field_name(&context, 6, FieldType::Date, 3);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, "date_5_closing_date");
    }

    #[test]
    fn test_punctuation_only_words_dropped() {
        let name = field_name(&before("Amount ($$$):"), 7, FieldType::Currency, 3);
        assert_eq!(name, "currency_7_amount");
    }
}
