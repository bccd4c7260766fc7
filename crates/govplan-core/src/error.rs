//! Error types for the derivation engine
//!
//! - Provider failures (retryable or permanent)
//! - Configuration loading and validation
//! - Engine-level failures (no content, validation, cancellation)
//! - Registry persistence

use std::path::PathBuf;
use std::time::Duration;

use govplan_validate::ValidationReport;

use crate::rate_limit::Retryable;

/// Failure of a derivation provider call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// Provider asked the caller to slow down
    #[error("rate limited by provider")]
    RateLimited {
        /// Server-suggested wait, from `Retry-After`
        retry_after: Option<Duration>,
    },

    /// Call exceeded the client timeout
    #[error("provider call timed out after {0:?}")]
    Timeout(Duration),

    /// Credentials were rejected
    #[error("provider rejected credentials (status {status})")]
    Unauthorized {
        /// HTTP status code
        status: u16,
    },

    /// Response could not be decoded into candidates, or held none
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    /// No API key available, nothing was sent
    #[error("missing credentials: environment variable {0} is not set")]
    MissingCredentials(String),

    /// Any other transport or server failure
    #[error("transport error: {0}")]
    Transport(String),
}

impl ProviderError {
    /// Whether the error is transient
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Timeout(_))
    }
}

impl Retryable for ProviderError {
    fn is_retryable(&self) -> bool {
        self.is_transient()
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`crate::EngineConfig`]
    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range or inconsistent
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Derivation engine errors
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Document produced no sections
    #[error("document '{document_id}' has no content to derive from")]
    InsufficientContent {
        /// Document id
        document_id: String,
    },

    /// Provider failed and no fallback could recover
    #[error("provider failed: {0}")]
    Provider(#[from] ProviderError),

    /// Candidate set failed validation on every attempt
    #[error("validation failed for {scope} after {attempts} attempt(s) with {} error(s)", .report.errors.len())]
    ValidationFailed {
        /// Epic id, or `epics` / `document` for set-wide checks
        scope: String,
        /// Attempts made
        attempts: usize,
        /// Report of the last attempt
        report: Box<ValidationReport>,
    },

    /// Invalid engine configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Derivation was cancelled before any epic was derived
    #[error("derivation cancelled")]
    Cancelled,
}

impl EngineError {
    /// Validation report carried by the error, if any
    #[must_use]
    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            Self::ValidationFailed { report, .. } => Some(report.as_ref()),
            _ => None,
        }
    }
}

/// Artifact registry errors
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Manifest could not be read or written
    #[error("registry I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Manifest is not valid YAML
    #[error("registry manifest is invalid: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Outcome carries validation errors
    #[error("outcome for '{document_id}' did not pass validation")]
    NotValidated {
        /// Document id
        document_id: String,
    },

    /// Outcome was cut short by cancellation
    #[error("outcome for '{document_id}' is partial")]
    Partial {
        /// Document id
        document_id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use govplan_validate::Violation;

    #[test]
    fn only_transient_errors_retry() {
        assert!(ProviderError::RateLimited { retry_after: None }.is_retryable());
        assert!(ProviderError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(!ProviderError::MalformedResponse("empty".into()).is_retryable());
        assert!(!ProviderError::MissingCredentials("KEY".into()).is_retryable());
        assert!(!ProviderError::Unauthorized { status: 401 }.is_retryable());
        assert!(!ProviderError::Transport("reset".into()).is_retryable());
    }

    #[test]
    fn retry_after_comes_from_rate_limit() {
        let err = ProviderError::RateLimited {
            retry_after: Some(Duration::from_secs(2)),
        };
        assert_eq!(err.retry_after(), Some(Duration::from_secs(2)));
        assert_eq!(ProviderError::Timeout(Duration::ZERO).retry_after(), None);
    }

    #[test]
    fn validation_failure_exposes_report() {
        let mut report = ValidationReport::new();
        report.error(Violation::NoEpics);
        let err = EngineError::ValidationFailed {
            scope: "epics".into(),
            attempts: 2,
            report: Box::new(report),
        };
        assert!(err.to_string().contains("after 2 attempt(s) with 1 error(s)"));
        assert_eq!(err.report().map(|r| r.errors.len()), Some(1));
    }
}
