//! Summarizer configuration

use serde::{Deserialize, Serialize};

/// Extraction caps and vocabulary for [`crate::SectionSummarizer`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    /// Minimum length (chars) for a bulleted item to count as an obligation
    pub min_item_len: usize,
    /// Maximum obligations kept per section
    pub max_obligations: usize,
    /// Maximum outcomes kept per section
    pub max_outcomes: usize,
    /// Maximum actors kept per section
    pub max_actors: usize,
    /// Maximum constraints kept per section
    pub max_constraints: usize,
    /// Maximum references kept per section
    pub max_references: usize,
    /// Organizational / role nouns recognised as actors (singular form)
    pub actor_vocabulary: Vec<String>,
    /// Capacity of the default summary store
    pub cache_capacity: u64,
}

impl SummarizerConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With actor vocabulary
    #[must_use]
    pub fn with_actor_vocabulary<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actor_vocabulary = terms.into_iter().map(Into::into).collect();
        self
    }

    /// With minimum bulleted item length
    #[inline]
    #[must_use]
    pub fn with_min_item_len(mut self, len: usize) -> Self {
        self.min_item_len = len;
        self
    }
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            min_item_len: 20,
            max_obligations: 8,
            max_outcomes: 5,
            max_actors: 5,
            max_constraints: 5,
            max_references: 5,
            actor_vocabulary: ["agency", "department", "administrator", "personnel", "system"]
                .into_iter()
                .map(String::from)
                .collect(),
            cache_capacity: 10_000,
        }
    }
}
