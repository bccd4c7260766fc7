//! Artifact registry
//!
//! A single YAML manifest recording, per document, the committed epics,
//! features and stories with their artifact paths and generation times.
//! Recording is replace-by-id, so re-recording an outcome is idempotent.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::DerivationOutcome;
use crate::error::RegistryError;

/// One committed artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Artifact id
    pub id: String,
    /// Artifact title
    pub title: String,
    /// Where the artifact is stored
    pub path: String,
    /// When it was generated
    pub generated_at: DateTime<Utc>,
}

/// Artifacts committed for one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Source document id
    pub document_id: String,
    /// Original file name
    pub filename: String,
    /// Last time anything was recorded for this document
    pub updated_at: DateTime<Utc>,
    /// Committed epics
    #[serde(default)]
    pub epics: Vec<RegistryEntry>,
    /// Committed features and sub-features
    #[serde(default)]
    pub features: Vec<RegistryEntry>,
    /// Committed stories
    #[serde(default)]
    pub stories: Vec<RegistryEntry>,
}

/// Layout of artifact files under a root directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    root: PathBuf,
}

impl ArtifactPaths {
    /// Create layout rooted at `root`
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<root>/epics/<id>.md`
    #[must_use]
    pub fn epic(&self, id: &str) -> String {
        self.path("epics", id)
    }

    /// `<root>/features/<id>.md`
    #[must_use]
    pub fn feature(&self, id: &str) -> String {
        self.path("features", id)
    }

    /// `<root>/stories/<id>.md`
    #[must_use]
    pub fn story(&self, id: &str) -> String {
        self.path("stories", id)
    }

    fn path(&self, kind: &str, id: &str) -> String {
        self.root
            .join(kind)
            .join(format!("{id}.md"))
            .to_string_lossy()
            .into_owned()
    }
}

/// Manifest of committed artifacts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRegistry {
    /// One record per document
    #[serde(default)]
    pub documents: Vec<DocumentRecord>,
}

impl ArtifactRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a manifest; a missing file is an empty registry
    ///
    /// # Errors
    /// - `RegistryError::Io` on read failure other than not-found
    /// - `RegistryError::Yaml` if the manifest is malformed
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        match tokio::fs::read_to_string(path.as_ref()).await {
            Ok(text) if text.trim().is_empty() => Ok(Self::new()),
            Ok(text) => Ok(serde_yaml::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write the manifest atomically (temp file, then rename)
    ///
    /// # Errors
    /// - `RegistryError::Yaml` if serialization fails
    /// - `RegistryError::Io` on write or rename failure
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), RegistryError> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, yaml).await?;
        tokio::fs::rename(&tmp, path).await?;
        tracing::debug!(path = %path.display(), documents = self.documents.len(), "saved registry");
        Ok(())
    }

    /// Merge a validated outcome, replacing entries with the same id
    ///
    /// # Errors
    /// - `RegistryError::NotValidated` if the outcome's report has errors
    /// - `RegistryError::Partial` if the outcome was cut short
    pub fn record(
        &mut self,
        outcome: &DerivationOutcome,
        filename: &str,
        paths: &ArtifactPaths,
    ) -> Result<(), RegistryError> {
        if !outcome.report.valid {
            return Err(RegistryError::NotValidated {
                document_id: outcome.document_id.clone(),
            });
        }
        if outcome.partial {
            return Err(RegistryError::Partial {
                document_id: outcome.document_id.clone(),
            });
        }

        let now = Utc::now();
        let entry = |id: &str, title: &str, path: String| RegistryEntry {
            id: id.to_string(),
            title: title.to_string(),
            path,
            generated_at: now,
        };

        let idx = match self
            .documents
            .iter()
            .position(|d| d.document_id == outcome.document_id)
        {
            Some(idx) => idx,
            None => {
                self.documents.push(DocumentRecord {
                    document_id: outcome.document_id.clone(),
                    filename: filename.to_string(),
                    updated_at: now,
                    epics: Vec::new(),
                    features: Vec::new(),
                    stories: Vec::new(),
                });
                self.documents.len() - 1
            }
        };
        let record = &mut self.documents[idx];
        record.filename = filename.to_string();
        record.updated_at = now;

        let artifacts = &outcome.artifacts;
        for epic in &artifacts.epics {
            upsert(&mut record.epics, entry(&epic.epic_id, &epic.title, paths.epic(&epic.epic_id)));
        }
        for feature in &artifacts.features {
            upsert(
                &mut record.features,
                entry(&feature.feature_id, &feature.title, paths.feature(&feature.feature_id)),
            );
        }
        for story in &artifacts.stories {
            upsert(
                &mut record.stories,
                entry(&story.story_id, &story.title, paths.story(&story.story_id)),
            );
        }

        tracing::info!(
            document_id = %outcome.document_id,
            epics = record.epics.len(),
            features = record.features.len(),
            stories = record.stories.len(),
            "recorded artifacts"
        );
        Ok(())
    }

    /// Record for one document
    #[must_use]
    pub fn document(&self, document_id: &str) -> Option<&DocumentRecord> {
        self.documents.iter().find(|d| d.document_id == document_id)
    }
}

fn upsert(entries: &mut Vec<RegistryEntry>, entry: RegistryEntry) {
    match entries.iter_mut().find(|e| e.id == entry.id) {
        Some(existing) => *existing = entry,
        None => entries.push(entry),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use govplan_artifact::{ArtifactSet, Epic};
    use govplan_validate::{ValidationReport, Violation};

    fn outcome() -> DerivationOutcome {
        DerivationOutcome {
            document_id: "policy".into(),
            provider: "rule-based".into(),
            sections: Vec::new(),
            summaries: Vec::new(),
            artifacts: ArtifactSet {
                epics: vec![Epic {
                    epic_id: "epic-policy".into(),
                    title: "Access".into(),
                    objective: "Limit access".into(),
                    success_criteria: vec![],
                    source_sections: vec!["s1".into()],
                }],
                features: Vec::new(),
                stories: Vec::new(),
            },
            report: ValidationReport::new(),
            partial: false,
            skipped_epics: Vec::new(),
        }
    }

    #[test]
    fn record_is_replace_by_id() {
        let paths = ArtifactPaths::new("out");
        let mut registry = ArtifactRegistry::new();
        registry.record(&outcome(), "policy.pdf", &paths).unwrap();
        let mut renamed = outcome();
        renamed.artifacts.epics[0].title = "Access control".into();
        registry.record(&renamed, "policy.pdf", &paths).unwrap();

        assert_eq!(registry.documents.len(), 1);
        let record = registry.document("policy").unwrap();
        assert_eq!(record.epics.len(), 1);
        assert_eq!(record.epics[0].title, "Access control");
        assert!(record.epics[0].path.ends_with("epic-policy.md"));
    }

    #[test]
    fn invalid_and_partial_outcomes_rejected() {
        let paths = ArtifactPaths::new("out");
        let mut registry = ArtifactRegistry::new();

        let mut invalid = outcome();
        invalid.report.error(Violation::NoEpics);
        assert!(matches!(
            registry.record(&invalid, "p", &paths),
            Err(RegistryError::NotValidated { .. })
        ));

        let mut partial = outcome();
        partial.partial = true;
        assert!(matches!(
            registry.record(&partial, "p", &paths),
            Err(RegistryError::Partial { .. })
        ));
        assert!(registry.documents.is_empty());
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("registry.yaml");

        let missing = ArtifactRegistry::load(&path).await.unwrap();
        assert!(missing.documents.is_empty());

        let mut registry = ArtifactRegistry::new();
        registry
            .record(&outcome(), "policy.pdf", &ArtifactPaths::new("out"))
            .unwrap();
        registry.save(&path).await.unwrap();

        let loaded = ArtifactRegistry::load(&path).await.unwrap();
        assert_eq!(loaded, registry);
        assert!(!path.with_extension("yaml.tmp").exists());
    }
}
