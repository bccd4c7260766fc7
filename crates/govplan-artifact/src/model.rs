//! Section, summary and delivery artifact types
//!
//! These are plain data: every type is serde-serializable with snake_case
//! field names so providers can exchange them as JSON.

use serde::{Deserialize, Serialize};

/// Metadata accompanying a document body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    /// Stable document identifier
    pub document_id: String,
    /// Original file name (e.g. `access-policy.pdf`)
    pub filename: String,
    /// Path of the original source file
    pub source_path: String,
    /// Path of the converted markdown body
    pub markdown_path: String,
    /// Optional human title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl DocumentMeta {
    /// Create metadata with every path derived from the document id
    #[must_use]
    pub fn new(document_id: impl Into<String>) -> Self {
        let document_id = document_id.into();
        Self {
            filename: format!("{document_id}.md"),
            source_path: format!("{document_id}.md"),
            markdown_path: format!("{document_id}.md"),
            document_id,
            title: None,
        }
    }

    /// With original file name
    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    /// With source path
    #[must_use]
    pub fn with_source_path(mut self, path: impl Into<String>) -> Self {
        self.source_path = path.into();
        self
    }

    /// With markdown path
    #[must_use]
    pub fn with_markdown_path(mut self, path: impl Into<String>) -> Self {
        self.markdown_path = path.into();
        self
    }

    /// With title
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Human title, falling back to the file stem
    #[must_use]
    pub fn display_title(&self) -> String {
        if let Some(title) = &self.title {
            return title.clone();
        }
        let stem = self
            .filename
            .rsplit_once('.')
            .map_or(self.filename.as_str(), |(stem, _)| stem);
        stem.replace(['-', '_'], " ")
    }

    /// Governance reference citing the given sections of this document
    #[must_use]
    pub fn reference(&self, sections: Vec<String>) -> GovernanceReference {
        GovernanceReference {
            document_id: self.document_id.clone(),
            filename: self.filename.clone(),
            markdown_path: self.markdown_path.clone(),
            sections,
        }
    }
}

/// Addressable unit of a split document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// `sec-<doc8>-<seq2>-<hash8>`
    pub id: String,
    /// Heading text, or `Introduction` for leading content
    pub title: String,
    /// Body text without the heading line
    pub content: String,
    /// Path of the document the section came from
    pub source_path: String,
    /// First line (1-based, inclusive)
    pub start_line: usize,
    /// Last line (1-based, inclusive)
    pub end_line: usize,
}

/// Structured facts extracted from one section
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SectionSummary {
    /// Id of the summarized section
    pub section_id: String,
    /// Section title
    pub title: String,
    /// Modal-verb and bulleted statements
    pub obligations: Vec<String>,
    /// Result-oriented statements
    pub outcomes: Vec<String>,
    /// Organizational or role nouns
    pub actors: Vec<String>,
    /// Compliance or conditional phrases
    pub constraints: Vec<String>,
    /// Citations to standards, sections or URLs
    pub references: Vec<String>,
    /// True when served from the summary cache
    #[serde(default)]
    pub cached: bool,
}

impl SectionSummary {
    /// Whether any fact was extracted
    #[inline]
    #[must_use]
    pub fn has_signal(&self) -> bool {
        !(self.obligations.is_empty()
            && self.outcomes.is_empty()
            && self.actors.is_empty()
            && self.constraints.is_empty()
            && self.references.is_empty())
    }
}

/// Structured citation back to source material
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceReference {
    /// Cited document
    pub document_id: String,
    /// Original file name of the document
    pub filename: String,
    /// Converted markdown the sections were split from
    pub markdown_path: String,
    /// Cited section ids
    pub sections: Vec<String>,
}

/// Top level of the delivery hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Epic {
    /// `epic-<doc8>[-NN]`
    pub epic_id: String,
    /// Short name
    pub title: String,
    /// What delivering the epic achieves
    pub objective: String,
    /// Measurable conditions for calling the epic done
    pub success_criteria: Vec<String>,
    /// Section ids that justify this epic
    pub source_sections: Vec<String>,
}

/// Deliverable slice of an epic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    /// `<project>-<epic_id>-feature-NN`, or `<parent>-subfeature-MM`
    pub feature_id: String,
    /// Owning epic
    pub epic_id: String,
    /// Short name
    pub title: String,
    /// What the feature delivers
    pub description: String,
    /// Why it matters, distinct from the description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_value: Option<String>,
    /// Consequences of skipping it
    #[serde(default)]
    pub risk_of_not_delivering: Vec<String>,
    /// Testable conditions, one story each by default
    pub acceptance_criteria: Vec<String>,
    /// Source sections justifying the feature
    pub governance_references: Vec<GovernanceReference>,
    /// Set for sub-features only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_feature_id: Option<String>,
}

impl Feature {
    /// Whether this is a sub-feature
    #[inline]
    #[must_use]
    pub fn is_subfeature(&self) -> bool {
        self.parent_feature_id.is_some()
    }
}

/// User-facing slice of a feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    /// `<feature_id>-story-NN-<slug>`
    pub story_id: String,
    /// Short name
    pub title: String,
    /// "As a <role>"
    pub role: String,
    /// "I want <capability>"
    pub capability: String,
    /// "so that <benefit>"
    pub benefit: String,
    /// Owning feature
    pub derived_from_feature: String,
    /// Epic of the owning feature
    pub derived_from_epic: String,
    /// Source sections justifying the story
    pub governance_references: Vec<GovernanceReference>,
    /// Testable conditions
    pub acceptance_criteria: Vec<String>,
}

/// Candidate artifact graph for one or more documents
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ArtifactSet {
    /// Epics in derivation order
    pub epics: Vec<Epic>,
    /// Features and sub-features
    pub features: Vec<Feature>,
    /// Stories of leaf features
    pub stories: Vec<Story>,
}

impl ArtifactSet {
    /// Create empty set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append another set
    pub fn extend(&mut self, other: ArtifactSet) {
        self.epics.extend(other.epics);
        self.features.extend(other.features);
        self.stories.extend(other.stories);
    }

    /// Top-level features of an epic
    pub fn features_of<'a>(&'a self, epic_id: &'a str) -> impl Iterator<Item = &'a Feature> + 'a {
        self.features
            .iter()
            .filter(move |f| f.parent_feature_id.is_none() && f.epic_id == epic_id)
    }

    /// Sub-features of a feature
    pub fn subfeatures_of<'a>(
        &'a self,
        feature_id: &'a str,
    ) -> impl Iterator<Item = &'a Feature> + 'a {
        self.features
            .iter()
            .filter(move |f| f.parent_feature_id.as_deref() == Some(feature_id))
    }

    /// Stories derived directly from a feature
    pub fn stories_of<'a>(&'a self, feature_id: &'a str) -> impl Iterator<Item = &'a Story> + 'a {
        self.stories
            .iter()
            .filter(move |s| s.derived_from_feature == feature_id)
    }

    /// Total number of artifacts
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.epics.len() + self.features.len() + self.stories.len()
    }

    /// True when the set holds no artifacts
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(id: &str, epic: &str, parent: Option<&str>) -> Feature {
        Feature {
            feature_id: id.to_string(),
            epic_id: epic.to_string(),
            title: String::new(),
            description: String::new(),
            business_value: None,
            risk_of_not_delivering: Vec::new(),
            acceptance_criteria: Vec::new(),
            governance_references: Vec::new(),
            parent_feature_id: parent.map(str::to_string),
        }
    }

    #[test]
    fn display_title_falls_back_to_file_stem() {
        let meta = DocumentMeta::new("doc-1").with_filename("access_control-policy.pdf");
        assert_eq!(meta.display_title(), "access control policy");
        assert_eq!(meta.with_title("Access Policy").display_title(), "Access Policy");
    }

    #[test]
    fn summary_signal() {
        let mut summary = SectionSummary::default();
        assert!(!summary.has_signal());
        summary.actors.push("agency".to_string());
        assert!(summary.has_signal());
    }

    #[test]
    fn artifact_set_navigation() {
        let set = ArtifactSet {
            epics: Vec::new(),
            features: vec![
                feature("f1", "e1", None),
                feature("f1-sub", "e1", Some("f1")),
                feature("f2", "e2", None),
            ],
            stories: Vec::new(),
        };
        assert_eq!(set.features_of("e1").count(), 1);
        assert_eq!(set.subfeatures_of("f1").count(), 1);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn feature_json_omits_absent_optionals() {
        let json = serde_json::to_value(feature("f1", "e1", None)).unwrap();
        assert!(json.get("parent_feature_id").is_none());
        assert!(json.get("business_value").is_none());

        let parsed: Feature = serde_json::from_value(serde_json::json!({
            "feature_id": "f1",
            "epic_id": "e1",
            "title": "t",
            "description": "d",
            "acceptance_criteria": [],
            "governance_references": []
        }))
        .unwrap();
        assert!(parsed.risk_of_not_delivering.is_empty());
    }
}
