//! Generic acceptance criterion detection
//!
//! A criterion that only restates "it works" gives a reviewer nothing to
//! check. Each disqualified criterion is echoed verbatim.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static GENERIC_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\bfeature\s+is\s+implemented\b",
        r"(?i)\bsystem\s+supports\b",
        r"(?i)\bworks\s+correctly\b",
        r"(?i)^the\s+[\w\s-]+?\s+(?:works|is\s+implemented|functions)\.?$",
        r"(?i)^(?:test|verify|ensure)\s+(?:that\s+)?the\s+[\w\s-]+?\s+(?:works|is\s+implemented)\.?$",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Outcome of checking a list of acceptance criteria
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriteriaCheck {
    /// True when the list is non-empty and nothing matched
    pub valid: bool,
    /// True when no criteria were given
    pub empty: bool,
    /// Criteria that matched a generic pattern, verbatim
    pub generic_matches: Vec<String>,
}

/// Whether a single criterion is blank or generic
#[must_use]
pub fn is_generic_criterion(criterion: &str) -> bool {
    let trimmed = criterion.trim();
    trimmed.is_empty() || GENERIC_PATTERNS.iter().any(|re| re.is_match(trimmed))
}

/// Check a list of acceptance criteria
#[must_use]
pub fn validate_acceptance_criteria(criteria: &[String]) -> CriteriaCheck {
    let generic_matches: Vec<String> = criteria
        .iter()
        .filter(|c| is_generic_criterion(c))
        .cloned()
        .collect();
    let empty = criteria.is_empty();
    CriteriaCheck {
        valid: !empty && generic_matches.is_empty(),
        empty,
        generic_matches,
    }
}
