//! Derivation providers
//!
//! A provider turns section facts into candidate epics, an epic into
//! candidate features and a feature into candidate stories. Two strategies
//! exist: [`RemoteProvider`] calls an HTTP service, [`RuleBasedProvider`]
//! derives deterministically from the summaries. [`select_provider`] picks
//! one at construction time.

mod fallback;
mod remote;
mod rule_based;

use std::sync::Arc;

use async_trait::async_trait;
use govplan_artifact::{DocumentMeta, Epic, Feature, GovernanceReference, SectionSummary, Story};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::ProviderError;
use crate::rate_limit::RateLimiter;

pub use fallback::FallbackProvider;
pub use remote::RemoteProvider;
pub use rule_based::RuleBasedProvider;

/// What a provider needs besides the upstream artifacts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivationContext {
    /// Project name used in feature / story ids
    pub project: String,
    /// Source document
    pub document: DocumentMeta,
}

impl DerivationContext {
    /// Create context
    #[inline]
    #[must_use]
    pub fn new(project: impl Into<String>, document: DocumentMeta) -> Self {
        Self {
            project: project.into(),
            document,
        }
    }

    /// Governance reference to `sections` of the source document
    #[inline]
    #[must_use]
    pub fn reference(&self, sections: Vec<String>) -> GovernanceReference {
        self.document.reference(sections)
    }
}

/// Generator of candidate artifacts
#[async_trait]
pub trait DerivationProvider: Send + Sync + std::fmt::Debug {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Epics covering every summarized section
    async fn derive_epics(
        &self,
        ctx: &DerivationContext,
        summaries: &[SectionSummary],
    ) -> Result<Vec<Epic>, ProviderError>;

    /// Features for one epic, from the summaries of its source sections
    async fn derive_features(
        &self,
        ctx: &DerivationContext,
        epic: &Epic,
        summaries: &[SectionSummary],
    ) -> Result<Vec<Feature>, ProviderError>;

    /// Stories for one feature
    async fn derive_stories(
        &self,
        ctx: &DerivationContext,
        feature: &Feature,
        epic: &Epic,
        governance_text: &str,
    ) -> Result<Vec<Story>, ProviderError>;
}

/// Choose the provider strategy for `config`
///
/// Remote (wrapped in a rule-based fallback) when an endpoint and an API key
/// are both available, rule-based alone otherwise.
#[must_use]
pub fn select_provider(config: &EngineConfig) -> Arc<dyn DerivationProvider> {
    let rule_based = RuleBasedProvider::new(config.derivation, config.validation.clone());

    let Some(remote) = &config.remote else {
        tracing::info!(provider = rule_based.name(), "no remote provider configured");
        return Arc::new(rule_based);
    };
    if remote.api_key().is_none() {
        tracing::warn!(
            api_key_env = %remote.api_key_env,
            "remote provider configured without credentials, using rule-based derivation"
        );
        return Arc::new(rule_based);
    }

    match RemoteProvider::new(
        remote.clone(),
        RateLimiter::new(config.rate_limit.max_concurrent),
        config.retry.policy(),
    ) {
        Ok(remote) => {
            tracing::info!(endpoint = %remote.endpoint(), "using remote provider with rule-based fallback");
            Arc::new(FallbackProvider::new(Arc::new(remote), Arc::new(rule_based)))
        }
        Err(e) => {
            tracing::warn!(error = %e, "remote provider unavailable, using rule-based derivation");
            Arc::new(rule_based)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RemoteConfig;

    #[test]
    fn no_remote_selects_rule_based() {
        let provider = select_provider(&EngineConfig::default());
        assert_eq!(provider.name(), "rule-based");
    }

    #[test]
    fn remote_without_key_selects_rule_based() {
        let config = EngineConfig::default().with_remote(
            RemoteConfig::new("http://127.0.0.1:9").with_api_key_env("GOVPLAN_TEST_UNSET_KEY_1"),
        );
        assert_eq!(select_provider(&config).name(), "rule-based");
    }

    #[test]
    fn context_builds_references() {
        let ctx = DerivationContext::new("proj", DocumentMeta::new("policy"));
        let reference = ctx.reference(vec!["sec-policy-01-abcdef12".into()]);
        assert_eq!(reference.document_id, "policy");
        assert_eq!(reference.sections.len(), 1);
    }
}
