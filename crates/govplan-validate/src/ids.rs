//! Identifier format checks
//!
//! Pure regex matches. Failing ids are reported, never renamed.

use govplan_artifact::ids::document_prefix;
use once_cell::sync::Lazy;
use regex::Regex;

const SEGMENTS: &str = r"[a-z0-9]+(?:-[a-z0-9]+)*";

static EPIC_ID: Lazy<Regex> = Lazy::new(|| compile(&format!(r"^epic-{SEGMENTS}$")));

static FEATURE_ID: Lazy<Regex> = Lazy::new(|| compile(&format!(r"^{SEGMENTS}-feature-\d{{2,}}$")));

static SUBFEATURE_ID: Lazy<Regex> =
    Lazy::new(|| compile(&format!(r"^{SEGMENTS}-feature-\d{{2,}}-subfeature-\d{{2,}}$")));

static STORY_ID: Lazy<Regex> =
    Lazy::new(|| compile(&format!(r"^{SEGMENTS}-story-\d{{2,}}-{SEGMENTS}$")));

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid id pattern")
}

/// `epic-<document>[-NN]`, optionally pinned to a document id
#[must_use]
pub fn validate_epic_id_format(epic_id: &str, document_id: Option<&str>) -> bool {
    if !EPIC_ID.is_match(epic_id) {
        return false;
    }
    match document_id {
        Some(doc) => {
            let prefix = format!("epic-{}", document_prefix(doc));
            epic_id == prefix || epic_id.starts_with(&format!("{prefix}-"))
        }
        None => true,
    }
}

/// `<id>-feature-NN` or `<id>-feature-NN-subfeature-MM`
#[must_use]
pub fn validate_feature_id_format(feature_id: &str) -> bool {
    FEATURE_ID.is_match(feature_id) || SUBFEATURE_ID.is_match(feature_id)
}

/// `<id>-feature-NN` only
#[must_use]
pub fn validate_top_level_feature_id_format(feature_id: &str) -> bool {
    FEATURE_ID.is_match(feature_id)
}

/// `<id>-feature-NN-subfeature-MM` only
#[must_use]
pub fn validate_subfeature_id_format(feature_id: &str) -> bool {
    SUBFEATURE_ID.is_match(feature_id)
}

/// `<...>-story-NN-<kebab-case-slug>`
#[must_use]
pub fn validate_story_id_format(story_id: &str) -> bool {
    STORY_ID.is_match(story_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use govplan_artifact::ids;

    #[test]
    fn epic_ids() {
        assert!(validate_epic_id_format("epic-acme", None));
        assert!(validate_epic_id_format("epic-acmepoli-02", Some("acme-policy")));
        assert!(!validate_epic_id_format("epic-other-02", Some("acme-policy")));
        assert!(!validate_epic_id_format("Epic-Acme", None));
        assert!(!validate_epic_id_format("epic-", None));
    }

    #[test]
    fn feature_ids() {
        assert!(validate_feature_id_format("proj-epic-1-feature-01"));
        assert!(validate_feature_id_format("proj-epic-1-feature-01-subfeature-02"));
        assert!(validate_subfeature_id_format("proj-epic-1-feature-01-subfeature-02"));
        assert!(!validate_top_level_feature_id_format("proj-epic-1-feature-01-subfeature-02"));
        assert!(!validate_feature_id_format("proj-epic-1-feature-1"));
        assert!(!validate_feature_id_format("feature-01"));
        assert!(!validate_feature_id_format("proj epic feature-01"));
    }

    #[test]
    fn story_ids() {
        assert!(validate_story_id_format("proj-epic-1-feature-01-story-01-retain-logs"));
        assert!(!validate_story_id_format("proj-epic-1-feature-01-story-01"));
        assert!(!validate_story_id_format("proj-epic-1-feature-01-story-01-Retain_Logs"));
    }

    #[test]
    fn generated_ids_conform() {
        let epic = ids::epic_id("Access Policy 2024", 1, 3);
        assert!(validate_epic_id_format(&epic, Some("Access Policy 2024")));
        let feature = ids::feature_id("My Project", &epic, 4);
        assert!(validate_top_level_feature_id_format(&feature));
        let sub = ids::subfeature_id(&feature, 1);
        assert!(validate_subfeature_id_format(&sub));
        let story = ids::story_id("My Project", &sub, 2, "Rotate keys every 90 days!");
        assert!(validate_story_id_format(&story), "{story}");
    }
}
