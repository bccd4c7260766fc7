//! Govplan Core - derivation engine
//!
//! Drives a governance document through the full pipeline:
//! - Splits it into sections and summarizes each one
//! - Derives epics, features and stories through a [`DerivationProvider`]
//! - Validates every layer and retries derivation on failure
//! - Records committed artifacts in an [`ArtifactRegistry`]
//!
//! # Example
//!
//! ```rust,ignore
//! use govplan_core::{DerivationEngine, EngineConfig};
//! use govplan_ingest::Document;
//!
//! # async fn example(raw: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let engine = DerivationEngine::new(EngineConfig::new().with_project("proj"))?;
//! let outcome = engine.derive(&Document::parse(raw)?).await?;
//!
//! println!("{} epics via {}", outcome.artifacts.epics.len(), outcome.provider);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod engine;
pub mod error;
pub mod provider;
pub mod rate_limit;
pub mod registry;

pub use config::{
    DerivationPolicy, EngineConfig, RateLimitConfig, RemoteConfig, RetryConfig,
    DEFAULT_API_KEY_ENV,
};
pub use engine::{CancellationFlag, DerivationEngine, DerivationOutcome};
pub use error::{ConfigError, EngineError, ProviderError, RegistryError};
pub use provider::{
    select_provider, DerivationContext, DerivationProvider, FallbackProvider, RemoteProvider,
    RuleBasedProvider,
};
pub use rate_limit::{RateLimiter, RatePermit, RetryPolicy, Retryable, DEFAULT_MAX_DELAY};
pub use registry::{ArtifactPaths, ArtifactRegistry, DocumentRecord, RegistryEntry};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving the engine
    pub use crate::{
        CancellationFlag, DerivationEngine, DerivationOutcome, DerivationProvider, EngineConfig,
        EngineError,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
