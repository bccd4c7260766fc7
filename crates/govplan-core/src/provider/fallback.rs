//! Primary provider with transparent fallback

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use govplan_artifact::{Epic, Feature, SectionSummary, Story};

use super::{DerivationContext, DerivationProvider};
use crate::error::ProviderError;

/// Runs every call on `primary`, re-running it on `fallback` if it fails
#[derive(Debug)]
pub struct FallbackProvider {
    primary: Arc<dyn DerivationProvider>,
    fallback: Arc<dyn DerivationProvider>,
    fallbacks: AtomicUsize,
}

impl FallbackProvider {
    /// Create fallback chain
    #[must_use]
    pub fn new(primary: Arc<dyn DerivationProvider>, fallback: Arc<dyn DerivationProvider>) -> Self {
        Self {
            primary,
            fallback,
            fallbacks: AtomicUsize::new(0),
        }
    }

    /// Calls answered by the fallback so far
    #[must_use]
    pub fn fallback_count(&self) -> usize {
        self.fallbacks.load(Ordering::Relaxed)
    }

    async fn with_fallback<T, P, F>(&self, call: &str, primary: P, fallback: F) -> Result<T, ProviderError>
    where
        P: Future<Output = Result<T, ProviderError>> + Send,
        F: Future<Output = Result<T, ProviderError>> + Send,
    {
        match primary.await {
            Ok(value) => Ok(value),
            Err(e) => {
                self.fallbacks.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    call,
                    primary = self.primary.name(),
                    fallback = self.fallback.name(),
                    error = %e,
                    "primary provider failed, falling back"
                );
                fallback.await
            }
        }
    }
}

#[async_trait]
impl DerivationProvider for FallbackProvider {
    fn name(&self) -> &str {
        self.primary.name()
    }

    async fn derive_epics(
        &self,
        ctx: &DerivationContext,
        summaries: &[SectionSummary],
    ) -> Result<Vec<Epic>, ProviderError> {
        self.with_fallback(
            "derive_epics",
            self.primary.derive_epics(ctx, summaries),
            self.fallback.derive_epics(ctx, summaries),
        )
        .await
    }

    async fn derive_features(
        &self,
        ctx: &DerivationContext,
        epic: &Epic,
        summaries: &[SectionSummary],
    ) -> Result<Vec<Feature>, ProviderError> {
        self.with_fallback(
            "derive_features",
            self.primary.derive_features(ctx, epic, summaries),
            self.fallback.derive_features(ctx, epic, summaries),
        )
        .await
    }

    async fn derive_stories(
        &self,
        ctx: &DerivationContext,
        feature: &Feature,
        epic: &Epic,
        governance_text: &str,
    ) -> Result<Vec<Story>, ProviderError> {
        self.with_fallback(
            "derive_stories",
            self.primary.derive_stories(ctx, feature, epic, governance_text),
            self.fallback.derive_stories(ctx, feature, epic, governance_text),
        )
        .await
    }
}
