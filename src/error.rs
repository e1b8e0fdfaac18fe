//! Error types
//!
//! - `ConfigError`: invalid or unparsable retry configuration
//! - `RequestError`: a ready-made failure type for operations run under a policy
//!
//! The retry loop itself never produces an error of its own. Whatever the
//! operation fails with is handed back to the caller unchanged.

use thiserror::Error;

use crate::classify::{Classify, FailureClass};

/// Errors raised while building or loading a retry configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// `max_attempts` must allow at least one attempt
    #[error("max_attempts must be at least 1")]
    ZeroAttempts,

    /// `max_delay` is below `initial_delay`
    #[error("max_delay ({max_ms}ms) must not be less than initial_delay ({initial_ms}ms)")]
    DelayRange { initial_ms: u64, max_ms: u64 },

    /// Multiplier below 1.0, NaN or infinite
    #[error("backoff_multiplier must be a finite number >= 1.0, got {0}")]
    InvalidMultiplier(f64),

    /// An environment variable held a value that could not be parsed
    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },

    /// JSON configuration could not be parsed
    #[error("invalid retry configuration JSON: {0}")]
    Json(String),

    /// Tracing subscriber could not be installed
    #[error("tracing initialization error: {0}")]
    TracingInit(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Failure produced by a request-like operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// No response was received (connection refused, DNS, reset, timeout)
    #[error("network error: {0}")]
    Network(String),

    /// A response arrived carrying an error status
    #[error("API error {code}: {message}")]
    Api { code: u16, message: String },

    /// Any other failure without a status code
    #[error("{0}")]
    Other(String),
}

impl RequestError {
    /// Create a failure without a response
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Create a failure carrying a status code
    pub fn api(code: u16, message: impl Into<String>) -> Self {
        Self::Api {
            code,
            message: message.into(),
        }
    }

    /// Status code carried by this failure, if any
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { code, .. } => Some(*code),
            Self::Network(_) | Self::Other(_) => None,
        }
    }
}

impl Classify for RequestError {
    fn classify(&self) -> FailureClass {
        FailureClass::from(self.status_code())
    }
}

impl From<reqwest::Error> for RequestError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::Api {
                code: status.as_u16(),
                message: err.to_string(),
            },
            None => Self::Network(err.to_string()),
        }
    }
}
