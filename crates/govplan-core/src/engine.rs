//! Derivation engine
//!
//! Drives one document through the pipeline:
//!
//! ```text
//! Document → sections → summaries → epics ─┬─ epic 1 → features → stories → validate
//!                                          ├─ epic 2 → ...
//!                                          └─ ...        (ordered, bounded concurrency)
//!                                                    ↓
//!                                      document-wide validation → DerivationOutcome
//! ```
//!
//! Each epic's candidate set is validated on its own; an epic that fails
//! validation `max_validation_attempts` times in a row aborts the run.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use govplan_artifact::{ArtifactSet, Epic, Feature, Section, SectionSummary};
use govplan_ingest::{Document, SectionSummarizer, SummaryStore};
use govplan_validate::{
    check_section_coverage, find_duplicate_epic_ids, HierarchyValidator, ValidationReport,
    Violation,
};
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::provider::{select_provider, DerivationContext, DerivationProvider};

/// Cooperative cancellation shared between the caller and the engine
///
/// Checked before each epic starts; epics already in progress finish.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    /// Create an unset flag
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    #[inline]
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of deriving one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivationOutcome {
    /// Source document id
    pub document_id: String,
    /// Name of the provider that was used
    pub provider: String,
    /// Split sections
    pub sections: Vec<Section>,
    /// Per-section facts
    pub summaries: Vec<SectionSummary>,
    /// Accepted artifacts
    pub artifacts: ArtifactSet,
    /// Validation findings (warnings only when `partial` is false)
    pub report: ValidationReport,
    /// True when cancellation skipped some epics
    pub partial: bool,
    /// Epics that were never derived
    pub skipped_epics: Vec<String>,
}

enum EpicResult {
    Derived(ArtifactSet, ValidationReport),
    Skipped(String),
}

/// Pipeline driver
#[derive(Debug)]
pub struct DerivationEngine {
    config: EngineConfig,
    summarizer: SectionSummarizer,
    provider: Arc<dyn DerivationProvider>,
    validator: HierarchyValidator,
}

impl DerivationEngine {
    /// Create engine with the provider chosen by [`select_provider`]
    ///
    /// # Errors
    /// - `EngineError::Config` if the configuration is invalid
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let provider = select_provider(&config);
        Ok(Self::build(config, provider))
    }

    /// Create engine with an explicit provider
    ///
    /// # Errors
    /// - `EngineError::Config` if the configuration is invalid
    pub fn with_provider(
        config: EngineConfig,
        provider: Arc<dyn DerivationProvider>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self::build(config, provider))
    }

    fn build(config: EngineConfig, provider: Arc<dyn DerivationProvider>) -> Self {
        Self {
            summarizer: SectionSummarizer::with_default_store(config.summarizer.clone()),
            validator: HierarchyValidator::new(config.validation.clone()),
            provider,
            config,
        }
    }

    /// Replace the summary store
    #[must_use]
    pub fn with_summary_store(mut self, store: Arc<dyn SummaryStore>) -> Self {
        self.summarizer = SectionSummarizer::new(self.config.summarizer.clone(), store);
        self
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Provider in use
    #[inline]
    #[must_use]
    pub fn provider(&self) -> &Arc<dyn DerivationProvider> {
        &self.provider
    }

    /// Summarizer (and its cache statistics)
    #[inline]
    #[must_use]
    pub fn summarizer(&self) -> &SectionSummarizer {
        &self.summarizer
    }

    /// Derive and validate the full hierarchy for one document
    ///
    /// # Errors
    /// See [`Self::derive_with_cancel`]
    pub async fn derive(&self, document: &Document) -> Result<DerivationOutcome, EngineError> {
        self.derive_with_cancel(document, &CancellationFlag::new())
            .await
    }

    /// Derive with cooperative cancellation between epics
    ///
    /// # Errors
    /// - `EngineError::InsufficientContent` if the document has no sections
    /// - `EngineError::Provider` if derivation fails and no fallback recovers
    /// - `EngineError::ValidationFailed` if epics or any epic's candidate set
    ///   fail validation on every attempt
    /// - `EngineError::Cancelled` if cancelled before epics were derived
    pub async fn derive_with_cancel(
        &self,
        document: &Document,
        cancel: &CancellationFlag,
    ) -> Result<DerivationOutcome, EngineError> {
        let span = tracing::info_span!("derive", document_id = %document.id());
        self.run_pipeline(document, cancel).instrument(span).await
    }

    async fn run_pipeline(
        &self,
        document: &Document,
        cancel: &CancellationFlag,
    ) -> Result<DerivationOutcome, EngineError> {
        let sections = document.sections();
        if sections.is_empty() {
            return Err(EngineError::InsufficientContent {
                document_id: document.id().to_string(),
            });
        }
        let summaries = self.summarizer.summarize_all(&sections);
        let with_signal = summaries.iter().filter(|s| s.has_signal()).count();
        tracing::info!(
            sections = sections.len(),
            with_signal,
            provider = self.provider.name(),
            "summarized document"
        );
        if with_signal == 0 {
            tracing::warn!("no section carries extractable facts, derivation will be thin");
        }

        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let ctx = DerivationContext::new(self.config.project.clone(), document.meta.clone());
        let validator = self.validator.clone().with_document_id(document.id());
        let section_ids: Vec<String> = sections.iter().map(|s| s.id.clone()).collect();
        let epics = self
            .derive_epics(&ctx, &validator, &summaries, &section_ids)
            .await?;
        tracing::info!(epics = epics.len(), "derived epics");

        let by_id: HashMap<&str, &Section> = sections.iter().map(|s| (s.id.as_str(), s)).collect();
        let results: Vec<EpicResult> = stream::iter(epics.iter())
            .map(|epic| {
                let ctx = &ctx;
                let by_id = &by_id;
                let summaries = &summaries;
                let validator = &validator;
                async move {
                    if cancel.is_cancelled() {
                        tracing::info!(epic_id = %epic.epic_id, "cancelled, skipping epic");
                        return Ok(EpicResult::Skipped(epic.epic_id.clone()));
                    }
                    let span = tracing::info_span!("epic", epic_id = %epic.epic_id);
                    self.derive_epic(ctx, validator, epic, summaries, by_id)
                        .instrument(span)
                        .await
                        .map(|(set, report)| EpicResult::Derived(set, report))
                }
            })
            .buffered(self.config.epic_concurrency.max(1))
            .try_collect()
            .await?;

        let mut artifacts = ArtifactSet::new();
        let mut epic_reports = ValidationReport::new();
        let mut skipped_epics = Vec::new();
        for result in results {
            match result {
                EpicResult::Derived(set, report) => {
                    artifacts.extend(set);
                    epic_reports.merge(report);
                }
                EpicResult::Skipped(id) => skipped_epics.push(id),
            }
        }
        let partial = !skipped_epics.is_empty();

        let report = if partial {
            tracing::warn!(skipped = skipped_epics.len(), "derivation cancelled, returning partial outcome");
            epic_reports
        } else {
            let report = validator.validate_with_sections(&artifacts, &section_ids);
            if !report.valid {
                tracing::error!(errors = report.errors.len(), "document-wide validation failed");
                return Err(EngineError::ValidationFailed {
                    scope: "document".to_string(),
                    attempts: 1,
                    report: Box::new(report),
                });
            }
            report
        };

        tracing::info!(
            epics = artifacts.epics.len(),
            features = artifacts.features.len(),
            stories = artifacts.stories.len(),
            warnings = report.warnings.len(),
            partial,
            "derivation complete"
        );

        Ok(DerivationOutcome {
            document_id: document.id().to_string(),
            provider: self.provider.name().to_string(),
            sections,
            summaries,
            artifacts,
            report,
            partial,
            skipped_epics,
        })
    }

    /// Epics that cover every section, with unique well-formed ids
    async fn derive_epics(
        &self,
        ctx: &DerivationContext,
        validator: &HierarchyValidator,
        summaries: &[SectionSummary],
        section_ids: &[String],
    ) -> Result<Vec<Epic>, EngineError> {
        let attempts = self.config.max_validation_attempts;
        let mut last = ValidationReport::new();

        for attempt in 1..=attempts {
            let epics = self.provider.derive_epics(ctx, summaries).await?;

            let mut report = ValidationReport::new();
            if epics.is_empty() {
                report.error(Violation::NoEpics);
            }
            report.errors_from(find_duplicate_epic_ids(&epics));
            report.errors_from(check_section_coverage(&epics, section_ids));
            for epic in &epics {
                report.errors_from(validator.validate_epic(epic));
            }

            if report.valid {
                return Ok(epics);
            }
            tracing::warn!(attempt, errors = report.errors.len(), "epic candidates rejected");
            last = report;
        }

        Err(EngineError::ValidationFailed {
            scope: "epics".to_string(),
            attempts,
            report: Box::new(last),
        })
    }

    /// Features and stories for one epic, validated as a unit
    async fn derive_epic(
        &self,
        ctx: &DerivationContext,
        validator: &HierarchyValidator,
        epic: &Epic,
        summaries: &[SectionSummary],
        sections: &HashMap<&str, &Section>,
    ) -> Result<(ArtifactSet, ValidationReport), EngineError> {
        let epic_summaries: Vec<SectionSummary> = summaries
            .iter()
            .filter(|s| epic.source_sections.contains(&s.section_id))
            .cloned()
            .collect();
        let attempts = self.config.max_validation_attempts;
        let mut last = ValidationReport::new();

        for attempt in 1..=attempts {
            let features = self
                .provider
                .derive_features(ctx, epic, &epic_summaries)
                .await?;

            let mut stories = Vec::new();
            for feature in features.iter().filter(|f| is_leaf(f, &features)) {
                let text = governance_text(feature, epic, sections);
                stories.extend(
                    self.provider
                        .derive_stories(ctx, feature, epic, &text)
                        .await?,
                );
            }

            let set = ArtifactSet {
                epics: vec![epic.clone()],
                features,
                stories,
            };
            let report = validator.validate(&set);
            if report.valid {
                tracing::debug!(
                    attempt,
                    features = set.features.len(),
                    stories = set.stories.len(),
                    "epic accepted"
                );
                return Ok((set, report));
            }
            tracing::warn!(attempt, errors = report.errors.len(), "epic candidates rejected");
            last = report;
        }

        tracing::error!(epic_id = %epic.epic_id, "epic failed validation on every attempt");
        Err(EngineError::ValidationFailed {
            scope: epic.epic_id.clone(),
            attempts,
            report: Box::new(last),
        })
    }
}

/// Features that own stories directly (no sub-features)
fn is_leaf(feature: &Feature, all: &[Feature]) -> bool {
    !all.iter()
        .any(|f| f.parent_feature_id.as_deref() == Some(feature.feature_id.as_str()))
}

/// Source text of the sections a feature cites, falling back to the epic's
fn governance_text(feature: &Feature, epic: &Epic, sections: &HashMap<&str, &Section>) -> String {
    let cited: Vec<&String> = feature
        .governance_references
        .iter()
        .flat_map(|r| r.sections.iter())
        .collect();
    let ids: Vec<&String> = if cited.is_empty() {
        epic.source_sections.iter().collect()
    } else {
        cited
    };
    ids.into_iter()
        .filter_map(|id| sections.get(id.as_str()))
        .map(|s| format!("## {}\n{}", s.title, s.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use govplan_artifact::DocumentMeta;
    use govplan_ingest::MemorySummaryStore;

    const BODY: &str = "\
## Access Control

The agency must review access rights every quarter. Administrators shall revoke unused accounts within 30 days.

## Audit Logging

Systems must retain audit logs for 365 days. Log records shall include user, time and action.

## Incident Response

Incidents must be reported to the security office within 24 hours. The agency should test its response plan annually.
";

    fn document() -> Document {
        Document::from_parts(DocumentMeta::new("sec-policy"), BODY)
    }

    #[tokio::test]
    async fn derives_valid_hierarchy() {
        let engine = DerivationEngine::new(EngineConfig::default()).unwrap();
        let outcome = engine.derive(&document()).await.unwrap();

        assert_eq!(outcome.provider, "rule-based");
        assert_eq!(outcome.sections.len(), 3);
        assert!(!outcome.partial);
        assert!(outcome.report.valid);
        assert_eq!(outcome.artifacts.epics.len(), 1);
        assert_eq!(outcome.artifacts.features.len(), 2);
        assert_eq!(outcome.artifacts.stories.len(), 6);
    }

    #[tokio::test]
    async fn empty_document_is_insufficient() {
        let engine = DerivationEngine::new(EngineConfig::default()).unwrap();
        let doc = Document::from_parts(DocumentMeta::new("empty"), "   \n\n");
        let err = engine.derive(&doc).await.unwrap_err();
        assert!(matches!(err, EngineError::InsufficientContent { .. }));
    }

    #[tokio::test]
    async fn cancelled_before_start() {
        let engine = DerivationEngine::new(EngineConfig::default()).unwrap();
        let cancel = CancellationFlag::new();
        cancel.cancel();
        let err = engine.derive_with_cancel(&document(), &cancel).await.unwrap_err();
        assert!(matches!(err, EngineError::Cancelled));
    }

    #[tokio::test]
    async fn injected_store_is_used() {
        let store = Arc::new(MemorySummaryStore::new());
        let engine = DerivationEngine::new(EngineConfig::default())
            .unwrap()
            .with_summary_store(store.clone());
        engine.derive(&document()).await.unwrap();
        let second = engine.derive(&document()).await.unwrap();

        assert_eq!(store.entry_count(), 3);
        assert!(second.summaries.iter().all(|s| s.cached));
        assert_eq!(engine.summarizer().stats().hits, 3);
    }

    #[test]
    fn invalid_config_rejected() {
        let err = DerivationEngine::new(EngineConfig::default().with_epic_concurrency(0)).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }
}
