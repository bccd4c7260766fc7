//! Concurrency gate and retry helper for provider calls
//!
//! [`RateLimiter`] bounds in-flight calls with a FIFO-fair semaphore;
//! [`RetryPolicy`] retries rate-limit-class failures with exponential
//! backoff and propagates everything else immediately.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::ProviderError;

/// Errors that may be worth retrying
pub trait Retryable {
    /// Whether another attempt could succeed
    fn is_retryable(&self) -> bool;

    /// Minimum wait requested by the failing side
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Bounded concurrency gate
///
/// Waiters are served in arrival order; dropping a [`RatePermit`] hands the
/// slot to the next waiter.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
    waiting: Arc<AtomicUsize>,
}

/// Slot held for the duration of one call
#[derive(Debug)]
pub struct RatePermit {
    _permit: OwnedSemaphorePermit,
}

struct WaitGuard<'a>(&'a AtomicUsize);

impl Drop for WaitGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl RateLimiter {
    /// Create limiter admitting `max_concurrent` calls (at least one)
    #[must_use]
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            waiting: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Wait for a free slot
    ///
    /// # Errors
    /// - `ProviderError::Transport` if the limiter has been closed
    pub async fn acquire(&self) -> Result<RatePermit, ProviderError> {
        self.waiting.fetch_add(1, Ordering::SeqCst);
        let _guard = WaitGuard(self.waiting.as_ref());
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| ProviderError::Transport("rate limiter closed".to_string()))?;
        Ok(RatePermit { _permit: permit })
    }

    /// Run `call` while holding a slot
    ///
    /// # Errors
    /// Whatever `call` returns, or a closed-limiter error
    pub async fn run<F, T>(&self, call: F) -> Result<T, ProviderError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        let _permit = self.acquire().await?;
        call.await
    }

    /// Calls currently holding a slot
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.max_concurrent - self.semaphore.available_permits()
    }

    /// Callers waiting for a slot
    #[must_use]
    pub fn queued(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    /// Configured ceiling
    #[inline]
    #[must_use]
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(4)
    }
}

/// Default ceiling on a single retry wait
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(60);

/// Exponential backoff for retryable errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: usize,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Ceiling on any single wait, including server-requested ones
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Create policy
    #[inline]
    #[must_use]
    pub fn new(max_attempts: usize, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }

    /// With a ceiling on any single wait
    #[inline]
    #[must_use]
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Delay after the 0-based `attempt` failed: `base * 2^attempt`
    #[must_use]
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let factor = u32::try_from(attempt)
            .ok()
            .and_then(|a| 1u32.checked_shl(a))
            .unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out
    ///
    /// # Errors
    /// The first non-retryable error, or the last retryable one
    pub async fn run<F, Fut, T, E>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + std::fmt::Display,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt + 1 < self.max_attempts => {
                    let delay = self
                        .delay_for(attempt)
                        .max(e.retry_after().unwrap_or_default())
                        .min(self.max_delay);
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "retrying provider call"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500))
    }
}
