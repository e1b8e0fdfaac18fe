//! Retry policy and executor loop
//!
//! Attempts run strictly one after another. A failure is retried only when it
//! classifies as transient and attempts remain; otherwise it is returned to the
//! caller exactly as the operation produced it.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::classify::Classify;
use crate::config::{RetryConfig, RetryOptions, duration_ms};
use crate::error::ConfigError;
use crate::sleep::{Sleeper, TokioSleeper};

/// Observer invoked with the 1-based attempt number and the failure, once per
/// attempt that is going to be retried.
pub type OnRetry<E> = Arc<dyn Fn(u32, &E) + Send + Sync>;

/// Retry policy: configuration plus the optional retry observer.
///
/// A policy holds no per-call state. The same value can drive any number of
/// concurrent invocations.
pub struct RetryPolicy<E> {
    config: RetryConfig,
    on_retry: Option<OnRetry<E>>,
    sleeper: Arc<dyn Sleeper>,
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            on_retry: self.on_retry.clone(),
            sleeper: Arc::clone(&self.sleeper),
        }
    }
}

impl<E> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("config", &self.config)
            .field("on_retry", &self.on_retry.is_some())
            .field("sleeper", &self.sleeper)
            .finish()
    }
}

impl<E> Default for RetryPolicy<E> {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl<E> RetryPolicy<E> {
    /// Create a policy from a resolved configuration.
    ///
    /// A `max_attempts` of zero is treated as one; use [`RetryConfig::validate`]
    /// or [`RetryPolicy::from_options`] to reject it instead.
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            on_retry: None,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Resolve options against defaults and build a policy.
    pub fn from_options(options: RetryOptions) -> Result<Self, ConfigError> {
        Ok(Self::new(options.resolve()?))
    }

    /// Install the retry observer
    pub fn on_retry<F>(mut self, observer: F) -> Self
    where
        F: Fn(u32, &E) + Send + Sync + 'static,
    {
        self.on_retry = Some(Arc::new(observer));
        self
    }

    /// Install a shared retry observer
    pub fn with_observer(mut self, observer: OnRetry<E>) -> Self {
        self.on_retry = Some(observer);
        self
    }

    /// Replace the delay primitive
    pub fn with_sleeper<S: Sleeper + 'static>(mut self, sleeper: S) -> Self {
        self.sleeper = Arc::new(sleeper);
        self
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Delay after failed attempt `attempt` (1-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.config.delay_for_attempt(attempt)
    }

    /// Execute an operation with retry.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let delay = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt = attempt, "operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => {
                    let class = error.classify();

                    if !self.config.is_retryable(class) {
                        debug!(
                            attempt = attempt,
                            status = ?class.status(),
                            "failure is not retryable"
                        );
                        return Err(error);
                    }

                    if attempt >= max_attempts {
                        debug!(
                            attempt = attempt,
                            max_attempts = max_attempts,
                            status = ?class.status(),
                            "retry attempts exhausted"
                        );
                        return Err(error);
                    }

                    if let Some(observer) = &self.on_retry {
                        observer(attempt, &error);
                    }

                    let delay = self.config.delay_for_attempt(attempt);
                    warn!(
                        attempt = attempt,
                        max_attempts = max_attempts,
                        delay_ms = duration_ms(delay),
                        status = ?class.status(),
                        "transient failure, backing off"
                    );
                    delay
                }
            };

            self.sleeper.sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Retry an operation with the default policy
pub async fn retry<F, Fut, T, E>(operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Classify,
{
    RetryPolicy::default().execute(operation).await
}

/// Retry an operation with an explicit policy
pub async fn retry_with<F, Fut, T, E>(operation: F, policy: &RetryPolicy<E>) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Classify,
{
    policy.execute(operation).await
}
