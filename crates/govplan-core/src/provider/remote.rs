//! HTTP derivation provider
//!
//! Posts JSON to `<endpoint>/epics`, `/features` and `/stories` with a bearer
//! API key. Every call passes through the [`RateLimiter`] and is retried by
//! the [`RetryPolicy`] when the failure is rate-limit-class.

use std::time::Duration;

use async_trait::async_trait;
use govplan_artifact::{Epic, Feature, SectionSummary, Story};
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{DerivationContext, DerivationProvider};
use crate::config::RemoteConfig;
use crate::error::ProviderError;
use crate::rate_limit::{RateLimiter, RetryPolicy};

/// Provider backed by a remote derivation service
#[derive(Debug, Clone)]
pub struct RemoteProvider {
    config: RemoteConfig,
    api_key: Option<String>,
    client: Client,
    limiter: RateLimiter,
    retry: RetryPolicy,
}

#[derive(Debug, Serialize)]
struct EpicsRequest<'a> {
    model: Option<&'a str>,
    context: &'a DerivationContext,
    summaries: &'a [SectionSummary],
}

#[derive(Debug, Serialize)]
struct FeaturesRequest<'a> {
    model: Option<&'a str>,
    context: &'a DerivationContext,
    epic: &'a Epic,
    summaries: &'a [SectionSummary],
}

#[derive(Debug, Serialize)]
struct StoriesRequest<'a> {
    model: Option<&'a str>,
    context: &'a DerivationContext,
    feature: &'a Feature,
    epic: &'a Epic,
    governance_text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EpicsResponse {
    #[serde(default)]
    epics: Vec<Epic>,
}

#[derive(Debug, Deserialize)]
struct FeaturesResponse {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct StoriesResponse {
    #[serde(default)]
    stories: Vec<Story>,
}

impl RemoteProvider {
    /// Create provider, reading the API key from the configured variable
    ///
    /// A missing key is not an error here; each call reports
    /// `ProviderError::MissingCredentials` without sending anything.
    ///
    /// # Errors
    /// - `ProviderError::Transport` if the HTTP client cannot be built
    pub fn new(
        config: RemoteConfig,
        limiter: RateLimiter,
        retry: RetryPolicy,
    ) -> Result<Self, ProviderError> {
        let api_key = config.api_key();
        Self::with_api_key(config, api_key, limiter, retry)
    }

    /// Create provider with an explicit API key
    ///
    /// # Errors
    /// - `ProviderError::Transport` if the HTTP client cannot be built
    pub fn with_api_key(
        config: RemoteConfig,
        api_key: Option<String>,
        limiter: RateLimiter,
        retry: RetryPolicy,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ProviderError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            config,
            api_key,
            client,
            limiter,
            retry,
        })
    }

    /// Service base URL
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Limiter gating this provider's calls
    #[inline]
    #[must_use]
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, ProviderError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned + Send,
    {
        let Some(key) = self.api_key.as_deref() else {
            return Err(ProviderError::MissingCredentials(self.config.api_key_env.clone()));
        };
        let target = format!("{}/{path}", self.config.endpoint.trim_end_matches('/'));
        let url = target.as_str();

        self.retry
            .run(move || {
                self.limiter.run(async move {
                    tracing::debug!(url, "calling remote provider");
                    let response = self
                        .client
                        .post(url)
                        .bearer_auth(key)
                        .json(body)
                        .send()
                        .await
                        .map_err(|e| self.classify_transport(&e))?;
                    self.handle_response(response).await
                })
            })
            .await
    }

    async fn handle_response<R: DeserializeOwned + Send>(
        &self,
        response: reqwest::Response,
    ) -> Result<R, ProviderError> {
        let status = response.status();
        if status.is_success() {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| self.classify_transport(&e))?;
            return serde_json::from_slice(&bytes)
                .map_err(|e| ProviderError::MalformedResponse(e.to_string()));
        }

        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, retry_after, &body))
    }

    fn classify_transport(&self, error: &reqwest::Error) -> ProviderError {
        if error.is_timeout() {
            ProviderError::Timeout(self.config.timeout())
        } else if error.is_decode() {
            ProviderError::MalformedResponse(error.to_string())
        } else {
            ProviderError::Transport(error.to_string())
        }
    }
}

/// Map a non-success status to a provider error
fn classify_status(status: StatusCode, retry_after: Option<Duration>, body: &str) -> ProviderError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited { retry_after },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Unauthorized {
            status: status.as_u16(),
        },
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            ProviderError::Timeout(Duration::ZERO)
        }
        _ => ProviderError::Transport(format!("{status}: {body}")),
    }
}

/// `Retry-After` in delta-seconds form
fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

fn non_empty<T>(items: Vec<T>, what: &str) -> Result<Vec<T>, ProviderError> {
    if items.is_empty() {
        Err(ProviderError::MalformedResponse(format!("response contained no {what}")))
    } else {
        Ok(items)
    }
}

#[async_trait]
impl DerivationProvider for RemoteProvider {
    fn name(&self) -> &str {
        "remote"
    }

    async fn derive_epics(
        &self,
        ctx: &DerivationContext,
        summaries: &[SectionSummary],
    ) -> Result<Vec<Epic>, ProviderError> {
        let request = EpicsRequest {
            model: self.config.model.as_deref(),
            context: ctx,
            summaries,
        };
        let response: EpicsResponse = self.post("epics", &request).await?;
        non_empty(response.epics, "epics")
    }

    async fn derive_features(
        &self,
        ctx: &DerivationContext,
        epic: &Epic,
        summaries: &[SectionSummary],
    ) -> Result<Vec<Feature>, ProviderError> {
        let request = FeaturesRequest {
            model: self.config.model.as_deref(),
            context: ctx,
            epic,
            summaries,
        };
        let response: FeaturesResponse = self.post("features", &request).await?;
        non_empty(response.features, "features")
    }

    async fn derive_stories(
        &self,
        ctx: &DerivationContext,
        feature: &Feature,
        epic: &Epic,
        governance_text: &str,
    ) -> Result<Vec<Story>, ProviderError> {
        let request = StoriesRequest {
            model: self.config.model.as_deref(),
            context: ctx,
            feature,
            epic,
            governance_text,
        };
        let response: StoriesResponse = self.post("stories", &request).await?;
        non_empty(response.stories, "stories")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use govplan_artifact::DocumentMeta;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve `responses` in order, one per connection, and count requests
    async fn serve(responses: Vec<&'static str>) -> (String, tokio::task::JoinHandle<usize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let mut served = 0;
            for response in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                read_request(&mut socket).await;
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
                served += 1;
            }
            served
        });
        (format!("http://{addr}"), handle)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    return;
                }
            }
        }
    }

    fn provider(endpoint: &str, key: Option<&str>) -> RemoteProvider {
        RemoteProvider::with_api_key(
            RemoteConfig::new(endpoint),
            key.map(String::from),
            RateLimiter::new(1),
            RetryPolicy::new(2, Duration::from_millis(1)),
        )
        .unwrap()
    }

    fn ctx() -> DerivationContext {
        DerivationContext::new("proj", DocumentMeta::new("policy"))
    }

    #[tokio::test]
    async fn missing_key_fails_without_request() {
        let (endpoint, server) = serve(vec![]).await;
        let result = provider(&endpoint, None).derive_epics(&ctx(), &[]).await;
        assert!(matches!(result, Err(ProviderError::MissingCredentials(ref v)) if v == "GOVPLAN_API_KEY"));
        assert_eq!(server.await.unwrap(), 0);
    }

    #[tokio::test]
    async fn rate_limit_is_retried_then_succeeds() {
        let ok = concat!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 128\r\nconnection: close\r\n\r\n",
            r#"{"epics":[{"epic_id":"epic-policy","title":"Access","objective":"Limit access","success_criteria":[],"source_sections":["s1"]}]}"#,
        );
        let (endpoint, server) = serve(vec![
            "HTTP/1.1 429 Too Many Requests\r\nretry-after: 0\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
            ok,
        ])
        .await;

        let epics = provider(&endpoint, Some("k")).derive_epics(&ctx(), &[]).await.unwrap();
        assert_eq!(epics[0].epic_id, "epic-policy");
        assert_eq!(server.await.unwrap(), 2);
    }

    #[tokio::test]
    async fn empty_payload_is_malformed() {
        let (endpoint, _server) = serve(vec![
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 13\r\nconnection: close\r\n\r\n{\"epics\":[]}\n",
        ])
        .await;
        let result = provider(&endpoint, Some("k")).derive_epics(&ctx(), &[]).await;
        assert!(matches!(result, Err(ProviderError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn unauthorized_is_not_retried() {
        let (endpoint, server) = serve(vec![
            "HTTP/1.1 401 Unauthorized\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        ])
        .await;
        let result = provider(&endpoint, Some("bad")).derive_epics(&ctx(), &[]).await;
        assert_eq!(result.unwrap_err(), ProviderError::Unauthorized { status: 401 });
        assert_eq!(server.await.unwrap(), 1);
    }

    #[test]
    fn status_classification() {
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, Some(Duration::from_secs(3)), ""),
            ProviderError::RateLimited {
                retry_after: Some(Duration::from_secs(3))
            }
        );
        assert_eq!(
            classify_status(StatusCode::FORBIDDEN, None, ""),
            ProviderError::Unauthorized { status: 403 }
        );
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, None, "upstream"),
            ProviderError::Transport(ref m) if m.contains("upstream")
        ));
        assert_eq!(parse_retry_after(" 7 "), Some(Duration::from_secs(7)));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }
}
