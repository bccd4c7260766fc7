//! Testing utilities for govplan workspace
//!
//! Shared fixture documents, artifact builders and a scripted provider.

#![allow(missing_docs)]

use async_trait::async_trait;
use govplan_artifact::{DocumentMeta, Epic, Feature, GovernanceReference, SectionSummary, Story};
use govplan_core::{
    CancellationFlag, DerivationContext, DerivationEngine, DerivationProvider, EngineConfig,
    ProviderError, RuleBasedProvider,
};
use govplan_ingest::Document;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Three sections with two obligations each, behind a front-matter block
pub const THREE_SECTION_DOC: &str = "\
---
document_id: access-policy
filename: access-policy.pdf
source_path: docs/access-policy.pdf
markdown_path: docs/access-policy.md
title: Access Policy
---
## Access Control

The agency must review access rights every quarter. Administrators shall revoke unused accounts within 30 days.

## Audit Logging

Systems must retain audit logs for 365 days. Log records shall include user, time and action.

## Incident Response

Incidents must be reported to the security office within 24 hours. The agency should test its response plan annually.
";

pub fn three_section_document() -> Document {
    Document::parse(THREE_SECTION_DOC).unwrap()
}

pub fn document_from_body(document_id: &str, body: &str) -> Document {
    Document::from_parts(DocumentMeta::new(document_id), body)
}

pub fn test_meta() -> DocumentMeta {
    DocumentMeta::new("test-doc")
}

pub fn reference(sections: &[&str]) -> GovernanceReference {
    test_meta().reference(sections.iter().map(|s| (*s).to_string()).collect())
}

pub fn epic(epic_id: &str, sections: &[&str]) -> Epic {
    Epic {
        epic_id: epic_id.to_string(),
        title: "Access governance".to_string(),
        objective: "Keep access to agency systems limited to current staff".to_string(),
        success_criteria: vec!["Quarterly access reviews are recorded".to_string()],
        source_sections: sections.iter().map(|s| (*s).to_string()).collect(),
    }
}

pub fn feature(feature_id: &str, epic_id: &str, title: &str) -> Feature {
    Feature {
        feature_id: feature_id.to_string(),
        epic_id: epic_id.to_string(),
        title: title.to_string(),
        description: format!("Put {title} in place across agency systems"),
        business_value: Some("Avoids audit findings on stale accounts".to_string()),
        risk_of_not_delivering: vec!["Former staff retain access".to_string()],
        acceptance_criteria: vec!["Unused accounts are revoked within 30 days".to_string()],
        governance_references: vec![reference(&["s1"])],
        parent_feature_id: None,
    }
}

pub fn story(story_id: &str, feature: &Feature) -> Story {
    Story {
        story_id: story_id.to_string(),
        title: "Revoke unused accounts".to_string(),
        role: "administrator".to_string(),
        capability: "to revoke accounts unused for 30 days".to_string(),
        benefit: "former staff cannot sign in".to_string(),
        derived_from_feature: feature.feature_id.clone(),
        derived_from_epic: feature.epic_id.clone(),
        governance_references: feature.governance_references.clone(),
        acceptance_criteria: vec!["Accounts idle for 30 days are disabled".to_string()],
    }
}

pub fn engine_with(config: EngineConfig, provider: Arc<dyn DerivationProvider>) -> DerivationEngine {
    DerivationEngine::with_provider(config, provider).unwrap()
}

/// What a [`ScriptedProvider`] does on top of rule-based derivation
#[derive(Debug, Clone)]
pub enum Script {
    /// Rule-based output unchanged
    PassThrough,
    /// Every call fails with this error
    Fail(ProviderError),
    /// Features carry only a generic acceptance criterion
    GenericCriteria,
    /// Cancel `flag` once `epics` epics have had features derived
    CancelAfter { flag: CancellationFlag, epics: usize },
}

/// Provider that follows a [`Script`] and counts calls
#[derive(Debug)]
pub struct ScriptedProvider {
    inner: RuleBasedProvider,
    script: Script,
    epic_calls: AtomicUsize,
    feature_calls: AtomicUsize,
    story_calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(script: Script) -> Self {
        Self::with_inner(RuleBasedProvider::default(), script)
    }

    pub fn with_inner(inner: RuleBasedProvider, script: Script) -> Self {
        Self {
            inner,
            script,
            epic_calls: AtomicUsize::new(0),
            feature_calls: AtomicUsize::new(0),
            story_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: ProviderError) -> Self {
        Self::new(Script::Fail(error))
    }

    pub fn epic_calls(&self) -> usize {
        self.epic_calls.load(Ordering::SeqCst)
    }

    pub fn feature_calls(&self) -> usize {
        self.feature_calls.load(Ordering::SeqCst)
    }

    pub fn story_calls(&self) -> usize {
        self.story_calls.load(Ordering::SeqCst)
    }

    fn fail(&self) -> Result<(), ProviderError> {
        match &self.script {
            Script::Fail(e) => Err(e.clone()),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl DerivationProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn derive_epics(
        &self,
        ctx: &DerivationContext,
        summaries: &[SectionSummary],
    ) -> Result<Vec<Epic>, ProviderError> {
        self.epic_calls.fetch_add(1, Ordering::SeqCst);
        self.fail()?;
        self.inner.derive_epics(ctx, summaries).await
    }

    async fn derive_features(
        &self,
        ctx: &DerivationContext,
        epic: &Epic,
        summaries: &[SectionSummary],
    ) -> Result<Vec<Feature>, ProviderError> {
        let calls = self.feature_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.fail()?;
        let mut features = self.inner.derive_features(ctx, epic, summaries).await?;
        match &self.script {
            Script::GenericCriteria => {
                for feature in &mut features {
                    feature.acceptance_criteria = vec!["Feature is implemented".to_string()];
                }
            }
            Script::CancelAfter { flag, epics } if calls >= *epics => flag.cancel(),
            _ => {}
        }
        Ok(features)
    }

    async fn derive_stories(
        &self,
        ctx: &DerivationContext,
        feature: &Feature,
        epic: &Epic,
        governance_text: &str,
    ) -> Result<Vec<Story>, ProviderError> {
        self.story_calls.fetch_add(1, Ordering::SeqCst);
        self.fail()?;
        self.inner
            .derive_stories(ctx, feature, epic, governance_text)
            .await
    }
}
