//! Retry configuration
//!
//! `RetryConfig` is the resolved, immutable value the retry loop works from.
//! `RetryOptions` is the all-optional parameter bag callers hand in (from code,
//! JSON or the environment); it is resolved against explicit defaults before
//! any attempt is made, so no field is ever undefined inside the loop.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

use crate::classify::FailureClass;
use crate::error::ConfigError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(10_000);
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_RETRYABLE_STATUS_CODES: [u16; 6] = [408, 429, 500, 502, 503, 504];

pub const ENV_MAX_ATTEMPTS: &str = "RETRY_MAX_ATTEMPTS";
pub const ENV_INITIAL_DELAY_MS: &str = "RETRY_INITIAL_DELAY_MS";
pub const ENV_MAX_DELAY_MS: &str = "RETRY_MAX_DELAY_MS";
pub const ENV_BACKOFF_MULTIPLIER: &str = "RETRY_BACKOFF_MULTIPLIER";
pub const ENV_STATUS_CODES: &str = "RETRY_STATUS_CODES";

/// Resolved retry configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    /// Ceiling applied to every computed delay
    pub max_delay: Duration,
    /// Growth factor between consecutive delays
    pub backoff_multiplier: f64,
    /// Status codes treated as transient
    pub retryable_status_codes: BTreeSet<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_INITIAL_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            retryable_status_codes: DEFAULT_RETRYABLE_STATUS_CODES.into_iter().collect(),
        }
    }
}

impl RetryConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum attempts
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set initial delay
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set maximum delay
    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set backoff multiplier
    pub const fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Replace the retryable status set
    pub fn with_retryable_status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.retryable_status_codes = codes.into_iter().collect();
        self
    }

    /// Check attempt count, delay bounds and multiplier
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        if self.max_delay < self.initial_delay {
            return Err(ConfigError::DelayRange {
                initial_ms: duration_ms(self.initial_delay),
                max_ms: duration_ms(self.max_delay),
            });
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(ConfigError::InvalidMultiplier(self.backoff_multiplier));
        }
        Ok(())
    }

    /// Whether a failure of the given class should be retried.
    ///
    /// Failures without a status are always transient.
    pub fn is_retryable(&self, class: FailureClass) -> bool {
        match class {
            FailureClass::NoStatus => true,
            FailureClass::Status(code) => self.retryable_status_codes.contains(&code),
        }
    }

    /// Delay to wait after failed attempt `attempt` (1-based) before the next one:
    /// `min(initial_delay * backoff_multiplier^(attempt - 1), max_delay)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if self.initial_delay.is_zero() {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let raw_nanos = self.initial_delay.as_nanos() as f64 * self.backoff_multiplier.powi(exponent);
        if !raw_nanos.is_finite() {
            return self.max_delay;
        }

        let rounded = raw_nanos.round();
        let delay = if rounded < u64::MAX as f64 {
            Duration::from_nanos(rounded as u64)
        } else {
            Duration::try_from_secs_f64(raw_nanos / 1e9).unwrap_or(Duration::MAX)
        };
        delay.min(self.max_delay)
    }
}

/// Whole milliseconds in `d`, saturating at `u64::MAX`
pub(crate) fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// All-optional retry parameters
///
/// Keys are camelCase and delays are milliseconds:
///
/// ```json
/// { "maxAttempts": 5, "initialDelay": 250, "retryableStatusCodes": [429, 503] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct RetryOptions {
    pub max_attempts: Option<u32>,
    pub initial_delay: Option<u64>,
    pub max_delay: Option<u64>,
    pub backoff_multiplier: Option<f64>,
    pub retryable_status_codes: Option<Vec<u16>>,
}

impl RetryOptions {
    /// Create an empty options bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum attempts
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Set initial delay in milliseconds
    pub fn initial_delay_ms(mut self, ms: u64) -> Self {
        self.initial_delay = Some(ms);
        self
    }

    /// Set maximum delay in milliseconds
    pub fn max_delay_ms(mut self, ms: u64) -> Self {
        self.max_delay = Some(ms);
        self
    }

    /// Set backoff multiplier
    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = Some(multiplier);
        self
    }

    /// Set retryable status codes
    pub fn retryable_status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.retryable_status_codes = Some(codes.into_iter().collect());
        self
    }

    /// Parse options from a JSON object
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read options from the process environment (`RETRY_*` variables).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|name| std::env::var(name).ok())
    }

    /// Read options through a variable lookup function.
    pub fn from_env_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |var: &'static str| lookup(var).filter(|v| !v.trim().is_empty());

        Ok(Self {
            max_attempts: read(ENV_MAX_ATTEMPTS)
                .map(|v| parse_env(ENV_MAX_ATTEMPTS, &v))
                .transpose()?,
            initial_delay: read(ENV_INITIAL_DELAY_MS)
                .map(|v| parse_env(ENV_INITIAL_DELAY_MS, &v))
                .transpose()?,
            max_delay: read(ENV_MAX_DELAY_MS)
                .map(|v| parse_env(ENV_MAX_DELAY_MS, &v))
                .transpose()?,
            backoff_multiplier: read(ENV_BACKOFF_MULTIPLIER)
                .map(|v| parse_env(ENV_BACKOFF_MULTIPLIER, &v))
                .transpose()?,
            retryable_status_codes: read(ENV_STATUS_CODES)
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(|s| parse_env(ENV_STATUS_CODES, s))
                        .collect::<Result<Vec<u16>, _>>()
                })
                .transpose()?,
        })
    }

    /// Overlay `other` on top of `self`; fields set in `other` win.
    pub fn merge(self, other: RetryOptions) -> Self {
        Self {
            max_attempts: other.max_attempts.or(self.max_attempts),
            initial_delay: other.initial_delay.or(self.initial_delay),
            max_delay: other.max_delay.or(self.max_delay),
            backoff_multiplier: other.backoff_multiplier.or(self.backoff_multiplier),
            retryable_status_codes: other.retryable_status_codes.or(self.retryable_status_codes),
        }
    }

    /// Fill missing fields with defaults and validate the result.
    pub fn resolve(self) -> Result<RetryConfig, ConfigError> {
        let defaults = RetryConfig::default();
        let config = RetryConfig {
            max_attempts: self.max_attempts.unwrap_or(defaults.max_attempts),
            initial_delay: self
                .initial_delay
                .map_or(defaults.initial_delay, Duration::from_millis),
            max_delay: self
                .max_delay
                .map_or(defaults.max_delay, Duration::from_millis),
            backoff_multiplier: self
                .backoff_multiplier
                .unwrap_or(defaults.backoff_multiplier),
            retryable_status_codes: self
                .retryable_status_codes
                .map_or(defaults.retryable_status_codes, |codes| {
                    codes.into_iter().collect()
                }),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Delays are stored as whole milliseconds, so sub-millisecond parts are truncated.
impl From<&RetryConfig> for RetryOptions {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: Some(config.max_attempts),
            initial_delay: Some(duration_ms(config.initial_delay)),
            max_delay: Some(duration_ms(config.max_delay)),
            backoff_multiplier: Some(config.backoff_multiplier),
            retryable_status_codes: Some(config.retryable_status_codes.iter().copied().collect()),
        }
    }
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var,
        value: value.to_string(),
    })
}
