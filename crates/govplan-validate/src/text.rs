//! Tautology and distinctness heuristics
//!
//! Deliberately crude: two texts are compared word-by-word at the same
//! position after case-folding and punctuation stripping. The ratio is the
//! number of aligned equal words over the longer text's word count.

use crate::policy::{DEFAULT_BUSINESS_VALUE_THRESHOLD, DEFAULT_TAUTOLOGY_THRESHOLD};

/// Lower-cased words with punctuation removed
#[must_use]
pub fn normalize_words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .filter(|w| !w.is_empty())
        .collect()
}

/// Position-aligned matching words / longer word count, in `[0, 1]`
///
/// Returns `0.0` when either text has no words.
#[must_use]
pub fn aligned_match_ratio(a: &str, b: &str) -> f64 {
    let a = normalize_words(a);
    let b = normalize_words(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let matches = a.iter().zip(b.iter()).filter(|(x, y)| x == y).count();
    let longer = a.len().max(b.len());
    #[allow(clippy::cast_precision_loss)]
    let ratio = matches as f64 / longer as f64;
    ratio
}

/// Whether `child` restates `parent` above `threshold`
#[inline]
#[must_use]
pub fn is_tautological_with(child: &str, parent: &str, threshold: f64) -> bool {
    aligned_match_ratio(child, parent) > threshold
}

/// Whether `child` restates `parent` (default threshold 0.7)
#[inline]
#[must_use]
pub fn is_feature_tautological(child: &str, parent: &str) -> bool {
    is_tautological_with(child, parent, DEFAULT_TAUTOLOGY_THRESHOLD)
}

/// Whether business value adds information beyond both companion texts
#[must_use]
pub fn is_business_value_distinct_with(
    business_value: &str,
    description: &str,
    epic_text: &str,
    threshold: f64,
) -> bool {
    aligned_match_ratio(business_value, description) <= threshold
        && aligned_match_ratio(business_value, epic_text) <= threshold
}

/// [`is_business_value_distinct_with`] at the default threshold (0.6)
#[inline]
#[must_use]
pub fn is_business_value_distinct(business_value: &str, description: &str, epic_text: &str) -> bool {
    is_business_value_distinct_with(
        business_value,
        description,
        epic_text,
        DEFAULT_BUSINESS_VALUE_THRESHOLD,
    )
}
