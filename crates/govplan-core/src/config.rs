//! Engine configuration
//!
//! Every section has defaults, so an empty TOML file is a valid config.
//!
//! ```toml
//! project = "acme"
//! epic_concurrency = 2
//!
//! [remote]
//! endpoint = "https://derive.example.com/v1"
//! api_key_env = "GOVPLAN_API_KEY"
//!
//! [validation]
//! max_features = 5
//! ```

use std::path::Path;
use std::time::Duration;

use govplan_ingest::SummarizerConfig;
use govplan_validate::ValidationPolicy;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::rate_limit::RetryPolicy;

/// Default environment variable holding the remote API key
pub const DEFAULT_API_KEY_ENV: &str = "GOVPLAN_API_KEY";

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Project name used as the feature / story id prefix
    pub project: String,
    /// Epics derived concurrently within one document
    pub epic_concurrency: usize,
    /// Validation attempts per epic before failing hard
    pub max_validation_attempts: usize,
    /// Remote call concurrency
    pub rate_limit: RateLimitConfig,
    /// Remote call retries
    pub retry: RetryConfig,
    /// Remote provider; absent means rule-based only
    pub remote: Option<RemoteConfig>,
    /// Rule-based derivation bounds
    pub derivation: DerivationPolicy,
    /// Validator thresholds and bounds
    pub validation: ValidationPolicy,
    /// Summarizer caps and vocabulary
    pub summarizer: SummarizerConfig,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// - `ConfigError::Parse` on malformed TOML
    /// - `ConfigError::Invalid` if a value fails [`Self::validate`]
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// - `ConfigError::Io` if the file cannot be read
    /// - see [`Self::from_toml_str`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), project = %config.project, "loaded engine config");
        Ok(config)
    }

    /// With project name
    #[inline]
    #[must_use]
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = project.into();
        self
    }

    /// With epic concurrency
    #[inline]
    #[must_use]
    pub fn with_epic_concurrency(mut self, n: usize) -> Self {
        self.epic_concurrency = n;
        self
    }

    /// With remote provider settings
    #[inline]
    #[must_use]
    pub fn with_remote(mut self, remote: RemoteConfig) -> Self {
        self.remote = Some(remote);
        self
    }

    /// With derivation policy
    #[inline]
    #[must_use]
    pub fn with_derivation(mut self, policy: DerivationPolicy) -> Self {
        self.derivation = policy;
        self
    }

    /// With validation policy
    #[inline]
    #[must_use]
    pub fn with_validation(mut self, policy: ValidationPolicy) -> Self {
        self.validation = policy;
        self
    }

    /// With summarizer configuration
    #[inline]
    #[must_use]
    pub fn with_summarizer(mut self, config: SummarizerConfig) -> Self {
        self.summarizer = config;
        self
    }

    /// Check ranges and cross-section consistency
    ///
    /// # Errors
    /// `ConfigError::Invalid` naming the first offending setting
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.project.trim().is_empty() {
            return invalid("project must not be empty".to_string());
        }
        if self.epic_concurrency == 0 {
            return invalid("epic_concurrency must be at least 1".to_string());
        }
        if self.max_validation_attempts == 0 {
            return invalid("max_validation_attempts must be at least 1".to_string());
        }
        if self.rate_limit.max_concurrent == 0 {
            return invalid("rate_limit.max_concurrent must be at least 1".to_string());
        }
        if self.retry.max_attempts == 0 {
            return invalid("retry.max_attempts must be at least 1".to_string());
        }
        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            return invalid("retry.max_delay_ms must not be below retry.base_delay_ms".to_string());
        }
        if let Some(remote) = &self.remote {
            if remote.endpoint.trim().is_empty() {
                return invalid("remote.endpoint must not be empty".to_string());
            }
            if remote.timeout_secs == 0 {
                return invalid("remote.timeout_secs must be at least 1".to_string());
            }
        }
        if let Some(problem) = self.derivation.check() {
            return invalid(format!("derivation: {problem}"));
        }
        if let Some(problem) = self.validation.check() {
            return invalid(format!("validation: {problem}"));
        }
        if self.derivation.max_features > self.validation.max_features {
            return invalid(format!(
                "derivation.max_features ({}) exceeds validation.max_features ({})",
                self.derivation.max_features, self.validation.max_features
            ));
        }
        if self.derivation.max_epics > self.validation.max_epics {
            return invalid(format!(
                "derivation.max_epics ({}) exceeds validation.max_epics ({})",
                self.derivation.max_epics, self.validation.max_epics
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            project: "proj".to_string(),
            epic_concurrency: 1,
            max_validation_attempts: 2,
            rate_limit: RateLimitConfig::default(),
            retry: RetryConfig::default(),
            remote: None,
            derivation: DerivationPolicy::default(),
            validation: ValidationPolicy::default(),
            summarizer: SummarizerConfig::default(),
        }
    }
}

/// Concurrency ceiling for remote calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum in-flight remote calls
    pub max_concurrent: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { max_concurrent: 4 }
    }
}

/// Backoff settings for remote calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first
    pub max_attempts: usize,
    /// Delay before the first retry, in milliseconds
    pub base_delay_ms: u64,
    /// Ceiling on any single wait, `Retry-After` included, in milliseconds
    pub max_delay_ms: u64,
}

impl RetryConfig {
    /// Retry policy for these settings
    #[inline]
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.base_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 60_000,
        }
    }
}

/// Remote derivation service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL; calls go to `<endpoint>/epics`, `/features`, `/stories`
    pub endpoint: String,
    /// Environment variable holding the bearer API key
    pub api_key_env: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Model name forwarded to the service
    pub model: Option<String>,
}

impl RemoteConfig {
    /// Create remote config for an endpoint
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// With API key environment variable
    #[inline]
    #[must_use]
    pub fn with_api_key_env(mut self, name: impl Into<String>) -> Self {
        self.api_key_env = name.into();
        self
    }

    /// With model name
    #[inline]
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// API key from the environment, if set and non-blank
    #[must_use]
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }

    /// Request timeout
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout_secs: 60,
            model: None,
        }
    }
}

/// Bounds for the rule-based provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DerivationPolicy {
    /// Maximum epics per document
    pub max_epics: usize,
    /// Consecutive sections grouped into one epic
    pub sections_per_epic: usize,
    /// Maximum top-level features per epic
    pub max_features: usize,
    /// Maximum stories per feature
    pub max_stories: usize,
    /// Obligations bundled into one feature
    pub obligations_per_feature: usize,
}

impl DerivationPolicy {
    /// Describe the first invalid bound, if any
    #[must_use]
    pub fn check(&self) -> Option<String> {
        [
            ("max_epics", self.max_epics),
            ("sections_per_epic", self.sections_per_epic),
            ("max_features", self.max_features),
            ("max_stories", self.max_stories),
            ("obligations_per_feature", self.obligations_per_feature),
        ]
        .into_iter()
        .find(|(_, v)| *v == 0)
        .map(|(name, _)| format!("{name} must be at least 1"))
    }
}

impl Default for DerivationPolicy {
    fn default() -> Self {
        Self {
            max_epics: 12,
            sections_per_epic: 6,
            max_features: 5,
            max_stories: 6,
            obligations_per_feature: 3,
        }
    }
}
