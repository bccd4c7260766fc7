//! Validation report and rule violations
//!
//! Each violation is a tagged variant naming the rule it breaks and the
//! artifact it concerns, so a report can be filtered per artifact or per rule
//! without parsing messages.

use serde::{Deserialize, Serialize};

/// One broken rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Violation {
    /// No epic was derived
    #[error("candidate set contains no epics")]
    NoEpics,

    /// Epic id has the wrong shape
    #[error("epic id '{epic_id}' does not match epic-<document>[-NN]")]
    InvalidEpicId {
        /// Epic id
        epic_id: String,
    },

    /// Feature id has the wrong shape
    #[error("feature id '{feature_id}' does not match <id>-feature-NN[-subfeature-MM]")]
    InvalidFeatureId {
        /// Feature id
        feature_id: String,
    },

    /// Story id has the wrong shape
    #[error("story id '{story_id}' does not match <id>-story-NN-<slug>")]
    InvalidStoryId {
        /// Story id
        story_id: String,
    },

    /// Same epic id used more than once
    #[error("epic id '{epic_id}' appears {occurrences} times")]
    DuplicateEpicId {
        /// Epic id
        epic_id: String,
        /// Times the id appears
        occurrences: usize,
    },

    /// Same feature id used more than once
    #[error("feature id '{feature_id}' appears {occurrences} times")]
    DuplicateFeatureId {
        /// Feature id
        feature_id: String,
        /// Times the id appears
        occurrences: usize,
    },

    /// Same story id used more than once
    #[error("story id '{story_id}' appears {occurrences} times")]
    DuplicateStoryId {
        /// Story id
        story_id: String,
        /// Times the id appears
        occurrences: usize,
    },

    /// Required text field is blank
    #[error("{artifact_id}: field '{field}' is empty")]
    EmptyField {
        /// Offending artifact
        artifact_id: String,
        /// Field name
        field: String,
    },

    /// More epics than the policy allows
    #[error("{count} epics exceed the policy maximum of {max}")]
    TooManyEpics {
        /// Observed count
        count: usize,
        /// Upper bound
        max: usize,
    },

    /// Epic cites no sections
    #[error("epic '{epic_id}' cites no source sections")]
    EpicWithoutSourceSections {
        /// Epic id
        epic_id: String,
    },

    /// Epic cites a section that was not split from the document
    #[error("epic '{epic_id}' cites unknown section '{section_id}'")]
    UnknownSourceSection {
        /// Epic id
        epic_id: String,
        /// Section id
        section_id: String,
    },

    /// Section no epic cites
    #[error("section '{section_id}' is not covered by any epic")]
    UncoveredSection {
        /// Section id
        section_id: String,
    },

    /// Top-level feature count outside policy bounds
    #[error("epic '{epic_id}' has {count} top-level features, expected {min}..={max}")]
    FeatureCountOutOfRange {
        /// Epic id
        epic_id: String,
        /// Observed count
        count: usize,
        /// Lower bound
        min: usize,
        /// Upper bound
        max: usize,
    },

    /// Epic with exactly one feature
    #[error("epic '{epic_id}' has a single feature")]
    SingleFeatureEpic {
        /// Epic id
        epic_id: String,
    },

    /// Feature owns both sub-features and stories
    #[error("feature '{feature_id}' has both {subfeatures} sub-features and {stories} stories")]
    MixedChildren {
        /// Feature id
        feature_id: String,
        /// Sub-feature count
        subfeatures: usize,
        /// Story count
        stories: usize,
    },

    /// Feature owns neither sub-features nor stories
    #[error("feature '{feature_id}' has neither sub-features nor stories")]
    ChildlessFeature {
        /// Feature id
        feature_id: String,
    },

    /// Sub-feature with no stories
    #[error("sub-feature '{feature_id}' has no stories")]
    SubFeatureWithoutStories {
        /// Feature id
        feature_id: String,
    },

    /// Story count outside policy bounds
    #[error("feature '{feature_id}' has {count} stories, policy expects {min}..={max}")]
    StoryCountOutOfPolicy {
        /// Feature id
        feature_id: String,
        /// Observed count
        count: usize,
        /// Lower bound
        min: usize,
        /// Upper bound
        max: usize,
    },

    /// Top-level feature whose epic is unknown
    #[error("feature '{feature_id}' references unknown epic '{epic_id}'")]
    OrphanFeature {
        /// Feature id
        feature_id: String,
        /// Epic id
        epic_id: String,
    },

    /// Sub-feature whose parent is unknown
    #[error("sub-feature '{feature_id}' references unknown parent '{parent_feature_id}'")]
    OrphanSubFeature {
        /// Feature id
        feature_id: String,
        /// Parent feature id
        parent_feature_id: String,
    },

    /// Story whose feature is unknown
    #[error("story '{story_id}' references unknown feature '{feature_id}'")]
    OrphanStory {
        /// Story id
        story_id: String,
        /// Feature id
        feature_id: String,
    },

    /// Story and its feature disagree on the epic
    #[error("story '{story_id}' claims epic '{actual_epic}' but its feature belongs to '{expected_epic}'")]
    StoryEpicMismatch {
        /// Story id
        story_id: String,
        /// Epic of the story's feature
        expected_epic: String,
        /// Epic the story claims
        actual_epic: String,
    },

    /// Text restates its parent
    #[error("{artifact_id}: {field} restates parent '{parent_id}' (overlap {ratio:.2})")]
    TautologicalArtifact {
        /// Offending artifact
        artifact_id: String,
        /// Field name
        field: String,
        /// Restated parent
        parent_id: String,
        /// Aligned word overlap
        ratio: f64,
    },

    /// Business value restates the description or epic objective
    #[error("feature '{feature_id}': business value is not distinct from its {compared_with} (overlap {ratio:.2})")]
    BusinessValueNotDistinct {
        /// Feature id
        feature_id: String,
        /// Text it was compared with
        compared_with: String,
        /// Aligned word overlap
        ratio: f64,
    },

    /// Feature lacks a business value
    #[error("feature '{feature_id}' has no business value statement")]
    MissingBusinessValue {
        /// Feature id
        feature_id: String,
    },

    /// No acceptance criteria
    #[error("{artifact_id}: acceptance criteria are empty")]
    EmptyAcceptanceCriteria {
        /// Offending artifact
        artifact_id: String,
    },

    /// Acceptance criterion that says nothing testable
    #[error("{artifact_id}: acceptance criterion '{criterion}' is generic")]
    GenericAcceptanceCriterion {
        /// Offending artifact
        artifact_id: String,
        /// Criterion text
        criterion: String,
    },

    /// Artifact cites no source material
    #[error("{artifact_id}: no governance references")]
    MissingGovernanceReferences {
        /// Offending artifact
        artifact_id: String,
    },

    /// Reference with blank fields
    #[error("{artifact_id}: governance reference missing {missing_fields:?}")]
    IncompleteGovernanceReference {
        /// Offending artifact
        artifact_id: String,
        /// Blank field names
        missing_fields: Vec<String>,
    },
}

impl Violation {
    /// Id of the artifact the violation concerns, if any
    #[must_use]
    pub fn artifact_id(&self) -> Option<&str> {
        match self {
            Self::NoEpics | Self::TooManyEpics { .. } => None,
            Self::InvalidEpicId { epic_id }
            | Self::DuplicateEpicId { epic_id, .. }
            | Self::EpicWithoutSourceSections { epic_id }
            | Self::UnknownSourceSection { epic_id, .. }
            | Self::FeatureCountOutOfRange { epic_id, .. }
            | Self::SingleFeatureEpic { epic_id } => Some(epic_id.as_str()),
            Self::UncoveredSection { section_id } => Some(section_id.as_str()),
            Self::InvalidFeatureId { feature_id }
            | Self::DuplicateFeatureId { feature_id, .. }
            | Self::MixedChildren { feature_id, .. }
            | Self::ChildlessFeature { feature_id }
            | Self::SubFeatureWithoutStories { feature_id }
            | Self::StoryCountOutOfPolicy { feature_id, .. }
            | Self::OrphanFeature { feature_id, .. }
            | Self::OrphanSubFeature { feature_id, .. }
            | Self::BusinessValueNotDistinct { feature_id, .. }
            | Self::MissingBusinessValue { feature_id } => Some(feature_id.as_str()),
            Self::InvalidStoryId { story_id }
            | Self::DuplicateStoryId { story_id, .. }
            | Self::OrphanStory { story_id, .. }
            | Self::StoryEpicMismatch { story_id, .. } => Some(story_id.as_str()),
            Self::EmptyField { artifact_id, .. }
            | Self::TautologicalArtifact { artifact_id, .. }
            | Self::EmptyAcceptanceCriteria { artifact_id }
            | Self::GenericAcceptanceCriterion { artifact_id, .. }
            | Self::MissingGovernanceReferences { artifact_id }
            | Self::IncompleteGovernanceReference { artifact_id, .. } => Some(artifact_id.as_str()),
        }
    }

    /// Stable rule name (matches the serialized `rule` tag)
    #[must_use]
    pub fn rule(&self) -> &'static str {
        match self {
            Self::NoEpics => "no_epics",
            Self::InvalidEpicId { .. } => "invalid_epic_id",
            Self::InvalidFeatureId { .. } => "invalid_feature_id",
            Self::InvalidStoryId { .. } => "invalid_story_id",
            Self::DuplicateEpicId { .. } => "duplicate_epic_id",
            Self::DuplicateFeatureId { .. } => "duplicate_feature_id",
            Self::DuplicateStoryId { .. } => "duplicate_story_id",
            Self::EmptyField { .. } => "empty_field",
            Self::TooManyEpics { .. } => "too_many_epics",
            Self::EpicWithoutSourceSections { .. } => "epic_without_source_sections",
            Self::UnknownSourceSection { .. } => "unknown_source_section",
            Self::UncoveredSection { .. } => "uncovered_section",
            Self::FeatureCountOutOfRange { .. } => "feature_count_out_of_range",
            Self::SingleFeatureEpic { .. } => "single_feature_epic",
            Self::MixedChildren { .. } => "mixed_children",
            Self::ChildlessFeature { .. } => "childless_feature",
            Self::SubFeatureWithoutStories { .. } => "sub_feature_without_stories",
            Self::StoryCountOutOfPolicy { .. } => "story_count_out_of_policy",
            Self::OrphanFeature { .. } => "orphan_feature",
            Self::OrphanSubFeature { .. } => "orphan_sub_feature",
            Self::OrphanStory { .. } => "orphan_story",
            Self::StoryEpicMismatch { .. } => "story_epic_mismatch",
            Self::TautologicalArtifact { .. } => "tautological_artifact",
            Self::BusinessValueNotDistinct { .. } => "business_value_not_distinct",
            Self::MissingBusinessValue { .. } => "missing_business_value",
            Self::EmptyAcceptanceCriteria { .. } => "empty_acceptance_criteria",
            Self::GenericAcceptanceCriterion { .. } => "generic_acceptance_criterion",
            Self::MissingGovernanceReferences { .. } => "missing_governance_references",
            Self::IncompleteGovernanceReference { .. } => "incomplete_governance_reference",
        }
    }

    /// Whether this is an orphan violation
    #[inline]
    #[must_use]
    pub fn is_orphan(&self) -> bool {
        matches!(
            self,
            Self::OrphanFeature { .. } | Self::OrphanSubFeature { .. } | Self::OrphanStory { .. }
        )
    }
}

/// Accumulated result of one validation pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// True when `errors` is empty
    pub valid: bool,
    /// Findings that reject the candidate set
    pub errors: Vec<Violation>,
    /// Findings reported without rejecting it
    pub warnings: Vec<Violation>,
}

impl ValidationReport {
    /// Create an empty (valid) report
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Record an error
    pub fn error(&mut self, violation: Violation) {
        self.errors.push(violation);
        self.valid = false;
    }

    /// Record several errors
    pub fn errors_from(&mut self, violations: impl IntoIterator<Item = Violation>) {
        for violation in violations {
            self.error(violation);
        }
    }

    /// Record a warning
    pub fn warn(&mut self, violation: Violation) {
        self.warnings.push(violation);
    }

    /// Fold another report into this one
    pub fn merge(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self.valid = self.errors.is_empty();
    }

    /// Whether no errors were recorded
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Errors concerning one artifact
    pub fn errors_for<'a>(&'a self, artifact_id: &'a str) -> impl Iterator<Item = &'a Violation> + 'a {
        self.errors
            .iter()
            .filter(move |v| v.artifact_id() == Some(artifact_id))
    }

    /// Errors breaking one rule
    pub fn errors_with_rule<'a>(&'a self, rule: &'a str) -> impl Iterator<Item = &'a Violation> + 'a {
        self.errors.iter().filter(move |v| v.rule() == rule)
    }

    /// One message per line, errors first
    #[must_use]
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| format!("error: {e}"))
            .chain(self.warnings.iter().map(|w| format!("warning: {w}")))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}
