//! Validation policy
//!
//! The thresholds and bounds below are policy decisions, not physical
//! constraints; every value can be overridden from configuration.

use serde::{Deserialize, Serialize};

/// Position-aligned word overlap above which two texts restate each other
pub const DEFAULT_TAUTOLOGY_THRESHOLD: f64 = 0.7;

/// Overlap above which business value is not distinct from its companion text
pub const DEFAULT_BUSINESS_VALUE_THRESHOLD: f64 = 0.6;

/// Tunable thresholds and cardinality bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationPolicy {
    /// Ratio above which a child restates its parent
    pub tautology_threshold: f64,
    /// Ratio above which business value restates description / epic objective
    pub business_value_threshold: f64,
    /// Minimum top-level features per epic
    pub min_features: usize,
    /// Maximum top-level features per epic
    pub max_features: usize,
    /// Minimum stories per feature (warning only)
    pub min_stories: usize,
    /// Maximum stories per feature (warning only)
    pub max_stories: usize,
    /// Maximum epics per document (warning only)
    pub max_epics: usize,
}

impl ValidationPolicy {
    /// Create default policy
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With feature bounds per epic
    #[inline]
    #[must_use]
    pub fn with_feature_bounds(mut self, min: usize, max: usize) -> Self {
        self.min_features = min;
        self.max_features = max;
        self
    }

    /// With story bounds per feature
    #[inline]
    #[must_use]
    pub fn with_story_bounds(mut self, min: usize, max: usize) -> Self {
        self.min_stories = min;
        self.max_stories = max;
        self
    }

    /// With tautology threshold
    #[inline]
    #[must_use]
    pub fn with_tautology_threshold(mut self, threshold: f64) -> Self {
        self.tautology_threshold = threshold;
        self
    }

    /// With business value threshold
    #[inline]
    #[must_use]
    pub fn with_business_value_threshold(mut self, threshold: f64) -> Self {
        self.business_value_threshold = threshold;
        self
    }

    /// Describe the first inconsistent setting, if any
    #[must_use]
    pub fn check(&self) -> Option<String> {
        let in_unit = |t: f64| t > 0.0 && t <= 1.0;
        if !in_unit(self.tautology_threshold) {
            return Some(format!(
                "tautology_threshold must be in (0, 1], got {}",
                self.tautology_threshold
            ));
        }
        if !in_unit(self.business_value_threshold) {
            return Some(format!(
                "business_value_threshold must be in (0, 1], got {}",
                self.business_value_threshold
            ));
        }
        if self.min_features == 0 || self.min_features > self.max_features {
            return Some(format!(
                "feature bounds [{}, {}] are invalid",
                self.min_features, self.max_features
            ));
        }
        if self.min_stories > self.max_stories || self.max_stories == 0 {
            return Some(format!(
                "story bounds [{}, {}] are invalid",
                self.min_stories, self.max_stories
            ));
        }
        if self.max_epics == 0 {
            return Some("max_epics must be at least 1".to_string());
        }
        None
    }
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            tautology_threshold: DEFAULT_TAUTOLOGY_THRESHOLD,
            business_value_threshold: DEFAULT_BUSINESS_VALUE_THRESHOLD,
            min_features: 1,
            max_features: 5,
            min_stories: 2,
            max_stories: 6,
            max_epics: 12,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_consistent() {
        assert_eq!(ValidationPolicy::default().check(), None);
    }

    #[test]
    fn rejects_inverted_bounds_and_bad_thresholds() {
        assert!(ValidationPolicy::new().with_feature_bounds(3, 2).check().is_some());
        assert!(ValidationPolicy::new().with_story_bounds(4, 1).check().is_some());
        assert!(ValidationPolicy::new().with_tautology_threshold(0.0).check().is_some());
        assert!(ValidationPolicy::new().with_business_value_threshold(1.5).check().is_some());
    }
}
