//! Hierarchy validation
//!
//! Checks a candidate [`ArtifactSet`] as a whole: id formats, uniqueness,
//! cardinality, orphans, tautology and the shape of acceptance criteria and
//! governance references. Nothing here mutates or repairs the input; every
//! finding is recorded in one [`ValidationReport`].

use std::collections::{HashMap, HashSet};

use govplan_artifact::{ArtifactSet, Epic, Feature, GovernanceReference, Story};
use tracing::debug;

use crate::criteria::validate_acceptance_criteria;
use crate::ids::{
    validate_epic_id_format, validate_story_id_format, validate_subfeature_id_format,
    validate_top_level_feature_id_format,
};
use crate::policy::ValidationPolicy;
use crate::report::{ValidationReport, Violation};
use crate::text::aligned_match_ratio;

/// Validator for a derived artifact hierarchy
#[derive(Debug, Clone, Default)]
pub struct HierarchyValidator {
    policy: ValidationPolicy,
    document_id: Option<String>,
}

impl HierarchyValidator {
    /// Create validator with the given policy
    #[inline]
    #[must_use]
    pub fn new(policy: ValidationPolicy) -> Self {
        Self {
            policy,
            document_id: None,
        }
    }

    /// Pin epic ids to the prefix of one document
    #[inline]
    #[must_use]
    pub fn with_document_id(mut self, document_id: impl Into<String>) -> Self {
        self.document_id = Some(document_id.into());
        self
    }

    /// Active policy
    #[inline]
    #[must_use]
    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    /// Validate a complete candidate set
    #[must_use]
    pub fn validate(&self, set: &ArtifactSet) -> ValidationReport {
        let mut report = ValidationReport::new();

        if set.epics.is_empty() {
            report.error(Violation::NoEpics);
        } else if set.epics.len() > self.policy.max_epics {
            report.warn(Violation::TooManyEpics {
                count: set.epics.len(),
                max: self.policy.max_epics,
            });
        }

        report.errors_from(find_duplicate_epic_ids(&set.epics));
        report.errors_from(find_duplicate_feature_ids(&set.features));
        report.errors_from(find_duplicate_story_ids(&set.stories));
        report.errors_from(find_orphans(set));

        let epics: HashMap<&str, &Epic> = first_by_id(set.epics.iter(), |e| &e.epic_id);
        let features: HashMap<&str, &Feature> =
            first_by_id(set.features.iter(), |f| &f.feature_id);

        for epic in &set.epics {
            report.errors_from(self.validate_epic(epic));
        }
        for feature in &set.features {
            let epic = epics.get(feature.epic_id.as_str()).copied();
            let parent = feature
                .parent_feature_id
                .as_deref()
                .and_then(|p| features.get(p).copied());
            let (errors, warnings) = self.validate_feature(feature, epic, parent);
            report.errors_from(errors);
            for warning in warnings {
                report.warn(warning);
            }
        }
        for story in &set.stories {
            let feature = features.get(story.derived_from_feature.as_str()).copied();
            report.errors_from(self.validate_story(story, feature));
        }

        report.merge(check_cardinality(set, &self.policy));

        debug!(
            epics = set.epics.len(),
            features = set.features.len(),
            stories = set.stories.len(),
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "validated artifact set"
        );
        report
    }

    /// Validate a candidate set and its coverage of `section_ids`
    #[must_use]
    pub fn validate_with_sections(
        &self,
        set: &ArtifactSet,
        section_ids: &[String],
    ) -> ValidationReport {
        let mut report = self.validate(set);
        report.errors_from(
            check_section_coverage(&set.epics, section_ids)
                .into_iter()
                // already reported by validate_epic
                .filter(|v| !matches!(v, Violation::EpicWithoutSourceSections { .. })),
        );
        report
    }

    /// Field-level checks on one epic
    #[must_use]
    pub fn validate_epic(&self, epic: &Epic) -> Vec<Violation> {
        let mut violations = Vec::new();
        if !validate_epic_id_format(&epic.epic_id, self.document_id.as_deref()) {
            violations.push(Violation::InvalidEpicId {
                epic_id: epic.epic_id.clone(),
            });
        }
        push_if_blank(&mut violations, &epic.epic_id, "title", &epic.title);
        push_if_blank(&mut violations, &epic.epic_id, "objective", &epic.objective);
        if epic.source_sections.is_empty() {
            violations.push(Violation::EpicWithoutSourceSections {
                epic_id: epic.epic_id.clone(),
            });
        }
        violations
    }

    /// Field-level checks on one feature, returned as `(errors, warnings)`
    ///
    /// `epic` and `parent` are `None` when they do not resolve; the orphan
    /// itself is reported by [`find_orphans`].
    #[must_use]
    pub fn validate_feature(
        &self,
        feature: &Feature,
        epic: Option<&Epic>,
        parent: Option<&Feature>,
    ) -> (Vec<Violation>, Vec<Violation>) {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let id = &feature.feature_id;

        let id_ok = if feature.is_subfeature() {
            validate_subfeature_id_format(id)
        } else {
            validate_top_level_feature_id_format(id)
        };
        if !id_ok {
            errors.push(Violation::InvalidFeatureId {
                feature_id: id.clone(),
            });
        }
        push_if_blank(&mut errors, id, "title", &feature.title);
        push_if_blank(&mut errors, id, "description", &feature.description);

        if let Some(epic) = epic {
            self.push_if_tautological(&mut errors, id, "title", &feature.title, &epic.epic_id, &epic.title);
            self.push_if_tautological(
                &mut errors,
                id,
                "description",
                &feature.description,
                &epic.epic_id,
                &epic.objective,
            );
        }
        if let Some(parent) = parent {
            self.push_if_tautological(
                &mut errors,
                id,
                "title",
                &feature.title,
                &parent.feature_id,
                &parent.title,
            );
        }

        match feature.business_value.as_deref().map(str::trim) {
            None | Some("") => warnings.push(Violation::MissingBusinessValue {
                feature_id: id.clone(),
            }),
            Some(value) => {
                let threshold = self.policy.business_value_threshold;
                let ratio = aligned_match_ratio(value, &feature.description);
                if ratio > threshold {
                    errors.push(Violation::BusinessValueNotDistinct {
                        feature_id: id.clone(),
                        compared_with: "description".to_string(),
                        ratio,
                    });
                }
                if let Some(epic) = epic {
                    let ratio = aligned_match_ratio(value, &epic.objective);
                    if ratio > threshold {
                        errors.push(Violation::BusinessValueNotDistinct {
                            feature_id: id.clone(),
                            compared_with: "epic objective".to_string(),
                            ratio,
                        });
                    }
                }
            }
        }

        errors.extend(check_acceptance_criteria(id, &feature.acceptance_criteria));
        errors.extend(check_governance_references(id, &feature.governance_references));
        (errors, warnings)
    }

    /// Field-level checks on one story
    #[must_use]
    pub fn validate_story(&self, story: &Story, feature: Option<&Feature>) -> Vec<Violation> {
        let mut violations = Vec::new();
        let id = &story.story_id;

        if !validate_story_id_format(id) {
            violations.push(Violation::InvalidStoryId {
                story_id: id.clone(),
            });
        }
        push_if_blank(&mut violations, id, "title", &story.title);
        push_if_blank(&mut violations, id, "role", &story.role);
        push_if_blank(&mut violations, id, "capability", &story.capability);
        push_if_blank(&mut violations, id, "benefit", &story.benefit);

        if let Some(feature) = feature {
            if story.derived_from_epic != feature.epic_id {
                violations.push(Violation::StoryEpicMismatch {
                    story_id: id.clone(),
                    expected_epic: feature.epic_id.clone(),
                    actual_epic: story.derived_from_epic.clone(),
                });
            }
            self.push_if_tautological(
                &mut violations,
                id,
                "capability",
                &story.capability,
                &feature.feature_id,
                &feature.title,
            );
        }

        violations.extend(check_acceptance_criteria(id, &story.acceptance_criteria));
        violations.extend(check_governance_references(id, &story.governance_references));
        violations
    }

    fn push_if_tautological(
        &self,
        out: &mut Vec<Violation>,
        artifact_id: &str,
        field: &str,
        text: &str,
        parent_id: &str,
        parent_text: &str,
    ) {
        let ratio = aligned_match_ratio(text, parent_text);
        if ratio > self.policy.tautology_threshold {
            out.push(Violation::TautologicalArtifact {
                artifact_id: artifact_id.to_string(),
                field: field.to_string(),
                parent_id: parent_id.to_string(),
                ratio,
            });
        }
    }
}

fn push_if_blank(out: &mut Vec<Violation>, artifact_id: &str, field: &str, value: &str) {
    if value.trim().is_empty() {
        out.push(Violation::EmptyField {
            artifact_id: artifact_id.to_string(),
            field: field.to_string(),
        });
    }
}

fn first_by_id<'a, T, I, F>(items: I, id: F) -> HashMap<&'a str, &'a T>
where
    I: Iterator<Item = &'a T>,
    F: Fn(&'a T) -> &'a String,
{
    let mut map = HashMap::new();
    for item in items {
        map.entry(id(item).as_str()).or_insert(item);
    }
    map
}

/// Ids seen more than once, with their counts, in first-occurrence order
fn duplicates<'a>(ids: impl Iterator<Item = &'a str>) -> Vec<(&'a str, usize)> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for id in ids {
        let count = counts.entry(id).or_insert(0);
        if *count == 0 {
            order.push(id);
        }
        *count += 1;
    }
    order
        .into_iter()
        .filter_map(|id| {
            let n = counts.get(id).copied().unwrap_or(0);
            (n > 1).then_some((id, n))
        })
        .collect()
}

/// Every epic id that appears more than once, reported once each
#[must_use]
pub fn find_duplicate_epic_ids(epics: &[Epic]) -> Vec<Violation> {
    duplicates(epics.iter().map(|e| e.epic_id.as_str()))
        .into_iter()
        .map(|(id, occurrences)| Violation::DuplicateEpicId {
            epic_id: id.to_string(),
            occurrences,
        })
        .collect()
}

/// Every feature id that appears more than once, reported once each
#[must_use]
pub fn find_duplicate_feature_ids(features: &[Feature]) -> Vec<Violation> {
    duplicates(features.iter().map(|f| f.feature_id.as_str()))
        .into_iter()
        .map(|(id, occurrences)| Violation::DuplicateFeatureId {
            feature_id: id.to_string(),
            occurrences,
        })
        .collect()
}

/// Every story id that appears more than once, reported once each
#[must_use]
pub fn find_duplicate_story_ids(stories: &[Story]) -> Vec<Violation> {
    duplicates(stories.iter().map(|s| s.story_id.as_str()))
        .into_iter()
        .map(|(id, occurrences)| Violation::DuplicateStoryId {
            story_id: id.to_string(),
            occurrences,
        })
        .collect()
}

/// Every feature, sub-feature and story whose parent does not resolve
///
/// A top-level feature resolves through its epic, a sub-feature through its
/// parent feature.
#[must_use]
pub fn find_orphans(set: &ArtifactSet) -> Vec<Violation> {
    let epic_ids: HashSet<&str> = set.epics.iter().map(|e| e.epic_id.as_str()).collect();
    let feature_ids: HashSet<&str> = set
        .features
        .iter()
        .map(|f| f.feature_id.as_str())
        .collect();

    let mut orphans = Vec::new();
    for feature in &set.features {
        if feature.parent_feature_id.is_none() && !epic_ids.contains(feature.epic_id.as_str()) {
            orphans.push(Violation::OrphanFeature {
                feature_id: feature.feature_id.clone(),
                epic_id: feature.epic_id.clone(),
            });
        }
        if let Some(parent) = &feature.parent_feature_id {
            if !feature_ids.contains(parent.as_str()) {
                orphans.push(Violation::OrphanSubFeature {
                    feature_id: feature.feature_id.clone(),
                    parent_feature_id: parent.clone(),
                });
            }
        }
    }
    for story in &set.stories {
        if !feature_ids.contains(story.derived_from_feature.as_str()) {
            orphans.push(Violation::OrphanStory {
                story_id: story.story_id.clone(),
                feature_id: story.derived_from_feature.clone(),
            });
        }
    }
    orphans
}

/// Feature-per-epic and children-per-feature bounds
#[must_use]
pub fn check_cardinality(set: &ArtifactSet, policy: &ValidationPolicy) -> ValidationReport {
    let mut report = ValidationReport::new();

    for epic in &set.epics {
        let count = set.features_of(&epic.epic_id).count();
        if count < policy.min_features || count > policy.max_features {
            report.error(Violation::FeatureCountOutOfRange {
                epic_id: epic.epic_id.clone(),
                count,
                min: policy.min_features,
                max: policy.max_features,
            });
        } else if count == 1 {
            report.warn(Violation::SingleFeatureEpic {
                epic_id: epic.epic_id.clone(),
            });
        }
    }

    for feature in &set.features {
        let stories = set.stories_of(&feature.feature_id).count();
        if feature.is_subfeature() {
            if stories == 0 {
                report.error(Violation::SubFeatureWithoutStories {
                    feature_id: feature.feature_id.clone(),
                });
                continue;
            }
        } else {
            let subfeatures = set.subfeatures_of(&feature.feature_id).count();
            match (subfeatures, stories) {
                (0, 0) => {
                    report.error(Violation::ChildlessFeature {
                        feature_id: feature.feature_id.clone(),
                    });
                    continue;
                }
                (s, n) if s > 0 && n > 0 => {
                    report.error(Violation::MixedChildren {
                        feature_id: feature.feature_id.clone(),
                        subfeatures: s,
                        stories: n,
                    });
                    continue;
                }
                (_, 0) => continue,
                _ => {}
            }
        }
        if stories < policy.min_stories || stories > policy.max_stories {
            report.warn(Violation::StoryCountOutOfPolicy {
                feature_id: feature.feature_id.clone(),
                count: stories,
                min: policy.min_stories,
                max: policy.max_stories,
            });
        }
    }
    report
}

/// Sections no epic cites, epics citing nothing or unknown sections
#[must_use]
pub fn check_section_coverage(epics: &[Epic], section_ids: &[String]) -> Vec<Violation> {
    let known: HashSet<&str> = section_ids.iter().map(String::as_str).collect();
    let mut cited: HashSet<&str> = HashSet::new();
    let mut violations = Vec::new();

    for epic in epics {
        if epic.source_sections.is_empty() {
            violations.push(Violation::EpicWithoutSourceSections {
                epic_id: epic.epic_id.clone(),
            });
        }
        for section in &epic.source_sections {
            if known.contains(section.as_str()) {
                cited.insert(section.as_str());
            } else {
                violations.push(Violation::UnknownSourceSection {
                    epic_id: epic.epic_id.clone(),
                    section_id: section.clone(),
                });
            }
        }
    }
    violations.extend(
        section_ids
            .iter()
            .filter(|id| !cited.contains(id.as_str()))
            .map(|id| Violation::UncoveredSection {
                section_id: id.clone(),
            }),
    );
    violations
}

/// Empty and generic acceptance criteria of one artifact
#[must_use]
pub fn check_acceptance_criteria(artifact_id: &str, criteria: &[String]) -> Vec<Violation> {
    let check = validate_acceptance_criteria(criteria);
    if check.empty {
        return vec![Violation::EmptyAcceptanceCriteria {
            artifact_id: artifact_id.to_string(),
        }];
    }
    check
        .generic_matches
        .into_iter()
        .map(|criterion| Violation::GenericAcceptanceCriterion {
            artifact_id: artifact_id.to_string(),
            criterion,
        })
        .collect()
}

/// Missing or incomplete governance references of one artifact
#[must_use]
pub fn check_governance_references(
    artifact_id: &str,
    references: &[GovernanceReference],
) -> Vec<Violation> {
    if references.is_empty() {
        return vec![Violation::MissingGovernanceReferences {
            artifact_id: artifact_id.to_string(),
        }];
    }
    references
        .iter()
        .filter_map(|reference| {
            let mut missing = Vec::new();
            for (name, value) in [
                ("document_id", &reference.document_id),
                ("filename", &reference.filename),
                ("markdown_path", &reference.markdown_path),
            ] {
                if value.trim().is_empty() {
                    missing.push(name.to_string());
                }
            }
            if reference.sections.is_empty() {
                missing.push("sections".to_string());
            }
            (!missing.is_empty()).then(|| Violation::IncompleteGovernanceReference {
                artifact_id: artifact_id.to_string(),
                missing_fields: missing,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const EPIC: &str = "epic-1";

    fn reference() -> GovernanceReference {
        GovernanceReference {
            document_id: "policy".into(),
            filename: "policy.pdf".into(),
            markdown_path: "policy.md".into(),
            sections: vec!["sec-policy-01-aaaaaaaa".into()],
        }
    }

    fn epic(id: &str) -> Epic {
        Epic {
            epic_id: id.into(),
            title: "Strengthen access control".into(),
            objective: "Reduce unauthorised access to agency systems".into(),
            success_criteria: vec!["Quarterly access reviews completed".into()],
            source_sections: vec!["sec-policy-01-aaaaaaaa".into()],
        }
    }

    fn feature(id: &str, epic_id: &str, title: &str) -> Feature {
        Feature {
            feature_id: id.into(),
            epic_id: epic_id.into(),
            title: title.into(),
            description: format!("Deliver {title} for administrators"),
            business_value: Some("Auditors can trace every privileged change".into()),
            risk_of_not_delivering: vec!["Audit finding".into()],
            acceptance_criteria: vec!["Reviews are recorded with reviewer and date".into()],
            governance_references: vec![reference()],
            parent_feature_id: None,
        }
    }

    fn story(n: usize, feature: &Feature) -> Story {
        Story {
            story_id: format!("{}-story-{n:02}-record-review-{n}", feature.feature_id),
            title: format!("Record review {n}"),
            role: "administrator".into(),
            capability: format!("record outcome number {n} of a review"),
            benefit: "evidence exists for auditors".into(),
            derived_from_feature: feature.feature_id.clone(),
            derived_from_epic: feature.epic_id.clone(),
            governance_references: vec![reference()],
            acceptance_criteria: vec!["Outcome is stored with a timestamp".into()],
        }
    }

    fn valid_set() -> ArtifactSet {
        let f1 = feature("proj-epic-1-feature-01", EPIC, "Access review workflow");
        let f2 = feature("proj-epic-1-feature-02", EPIC, "Privileged session logging");
        let stories = vec![story(1, &f1), story(2, &f1), story(1, &f2), story(2, &f2)];
        ArtifactSet {
            epics: vec![epic(EPIC)],
            features: vec![f1, f2],
            stories,
        }
    }

    #[test]
    fn valid_set_passes() {
        let report = HierarchyValidator::default().validate(&valid_set());
        assert!(report.valid, "{}", report.summary());
        assert!(report.warnings.is_empty(), "{}", report.summary());
    }

    #[test]
    fn duplicate_feature_reported_once() {
        let f = feature("proj-epic-1-feature-01", EPIC, "Access review workflow");
        let dupes = find_duplicate_feature_ids(&[f.clone(), f.clone(), f]);
        assert_eq!(
            dupes,
            vec![Violation::DuplicateFeatureId {
                feature_id: "proj-epic-1-feature-01".into(),
                occurrences: 3,
            }]
        );
    }

    #[test]
    fn duplicates_keep_first_occurrence_order() {
        let a = feature("proj-epic-1-feature-02", EPIC, "a");
        let b = feature("proj-epic-1-feature-01", EPIC, "b");
        let dupes = find_duplicate_feature_ids(&[a.clone(), b.clone(), b, a]);
        let ids: Vec<_> = dupes.iter().filter_map(Violation::artifact_id).collect();
        assert_eq!(ids, vec!["proj-epic-1-feature-02", "proj-epic-1-feature-01"]);
    }

    #[test]
    fn all_orphans_reported_together() {
        let mut set = valid_set();
        set.features.push(feature("proj-epic-9-feature-01", "epic-9", "Stray"));
        let mut sub = feature("proj-epic-1-feature-07-subfeature-01", EPIC, "Lost child");
        sub.parent_feature_id = Some("proj-epic-1-feature-07".into());
        set.features.push(sub);
        let mut stray = set.stories[0].clone();
        stray.story_id = "proj-epic-1-feature-08-story-01-stray".into();
        stray.derived_from_feature = "proj-epic-1-feature-08".into();
        set.stories.push(stray);

        let orphans = find_orphans(&set);
        assert_eq!(orphans.len(), 3);
        assert!(orphans.iter().all(Violation::is_orphan));

        let report = HierarchyValidator::default().validate(&set);
        assert!(!report.valid);
        assert_eq!(report.errors.iter().filter(|v| v.is_orphan()).count(), 3);
    }

    #[test]
    fn subfeature_resolves_through_its_parent() {
        let mut set = valid_set();
        let mut sub = feature(
            "proj-epic-1-feature-01-subfeature-01",
            "epic-stale",
            "Reviewer delegation rules",
        );
        sub.parent_feature_id = Some("proj-epic-1-feature-01".into());
        set.features.push(sub);

        assert!(find_orphans(&set).is_empty());
    }

    #[test]
    fn cardinality_rules() {
        let mut set = valid_set();
        // give feature-01 a sub-feature while it still owns stories
        let mut sub = feature(
            "proj-epic-1-feature-01-subfeature-01",
            EPIC,
            "Reviewer delegation rules",
        );
        sub.parent_feature_id = Some("proj-epic-1-feature-01".into());
        set.features.push(sub);
        // strip feature-02 of its stories
        set.stories.retain(|s| s.derived_from_feature != "proj-epic-1-feature-02");

        let report = check_cardinality(&set, &ValidationPolicy::default());
        let rules: Vec<_> = report.errors.iter().map(Violation::rule).collect();
        assert_eq!(
            rules,
            vec!["mixed_children", "childless_feature", "sub_feature_without_stories"]
        );
    }

    #[test]
    fn feature_count_bounds() {
        let mut set = valid_set();
        set.features.truncate(1);
        set.stories.truncate(2);
        let report = check_cardinality(&set, &ValidationPolicy::default());
        assert!(report.valid);
        assert_eq!(report.warnings[0].rule(), "single_feature_epic");

        set.features.clear();
        let report = check_cardinality(&set, &ValidationPolicy::default());
        assert_eq!(report.errors[0].rule(), "feature_count_out_of_range");
    }

    #[test]
    fn story_count_below_policy_is_warning() {
        let mut set = valid_set();
        set.stories.remove(0);
        let report = HierarchyValidator::default().validate(&set);
        assert!(report.valid);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].rule(), "story_count_out_of_policy");
    }

    #[test]
    fn tautological_feature_rejected() {
        let mut set = valid_set();
        set.features[0].title = "Strengthen access control".into();
        let report = HierarchyValidator::default().validate(&set);
        let taut: Vec<_> = report.errors_with_rule("tautological_artifact").collect();
        assert_eq!(taut.len(), 1);
        assert_eq!(taut[0].artifact_id(), Some("proj-epic-1-feature-01"));
    }

    #[test]
    fn business_value_must_be_distinct() {
        let mut set = valid_set();
        set.features[1].business_value = Some(set.features[1].description.clone());
        let report = HierarchyValidator::default().validate(&set);
        assert_eq!(report.errors_with_rule("business_value_not_distinct").count(), 1);

        set.features[1].business_value = None;
        let report = HierarchyValidator::default().validate(&set);
        assert!(report.valid);
        assert_eq!(report.warnings[0].rule(), "missing_business_value");
    }

    #[test]
    fn story_epic_mismatch_is_error() {
        let mut set = valid_set();
        set.stories[0].derived_from_epic = "epic-2".into();
        let report = HierarchyValidator::default().validate(&set);
        assert_eq!(report.errors_with_rule("story_epic_mismatch").count(), 1);
    }

    #[test]
    fn generic_criteria_and_references() {
        let mut set = valid_set();
        set.features[0].acceptance_criteria = vec!["Feature is implemented as described".into()];
        set.stories[0].governance_references[0].sections.clear();
        set.stories[1].governance_references.clear();
        let report = HierarchyValidator::default().validate(&set);
        assert!(matches!(
            report.errors_with_rule("generic_acceptance_criterion").next(),
            Some(Violation::GenericAcceptanceCriterion { criterion, .. })
                if criterion == "Feature is implemented as described"
        ));
        assert_eq!(report.errors_with_rule("incomplete_governance_reference").count(), 1);
        assert_eq!(report.errors_with_rule("missing_governance_references").count(), 1);
    }

    #[test]
    fn invalid_ids_are_reported() {
        let mut set = valid_set();
        set.stories[0].story_id = "Story One".into();
        let report = HierarchyValidator::default()
            .with_document_id("other")
            .validate(&set);
        assert_eq!(report.errors_with_rule("invalid_story_id").count(), 1);
        assert_eq!(report.errors_with_rule("invalid_epic_id").count(), 1);
    }

    #[test]
    fn empty_set_has_no_epics() {
        let report = HierarchyValidator::default().validate(&ArtifactSet::new());
        assert_eq!(report.errors, vec![Violation::NoEpics]);
    }

    #[test]
    fn section_coverage() {
        let epics = vec![epic(EPIC)];
        let sections = vec!["sec-policy-01-aaaaaaaa".to_string(), "sec-policy-02-bbbbbbbb".to_string()];
        let violations = check_section_coverage(&epics, &sections);
        assert_eq!(
            violations,
            vec![Violation::UncoveredSection {
                section_id: "sec-policy-02-bbbbbbbb".into()
            }]
        );
        let report = HierarchyValidator::default().validate_with_sections(&valid_set(), &sections);
        assert!(!report.valid);
    }
}
