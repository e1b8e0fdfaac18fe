//! Observability
//!
//! Subscriber setup for binaries and tests that embed the retry policy, plus a
//! ready-made retry observer that emits one structured event per retry.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::classify::Classify;
use crate::policy::OnRetry;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

/// Subscriber configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    /// Filter directive used when `RUST_LOG` is unset (e.g. `"info"`, `"retryline=debug"`)
    pub level: String,
    pub format: OutputFormat,
    /// Include event targets in the output
    pub with_target: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: OutputFormat::default(),
            with_target: false,
        }
    }
}

impl TracingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub const fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub const fn with_target(mut self, with_target: bool) -> Self {
        self.with_target = with_target;
        self
    }

    fn env_filter(&self) -> Result<EnvFilter, crate::error::ConfigError> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(&self.level)
                .map_err(|e| crate::error::ConfigError::TracingInit(e.to_string())),
        }
    }
}

/// Install a global subscriber. Fails if one is already installed.
pub fn init_tracing(config: &TracingConfig) -> Result<(), crate::error::ConfigError> {
    let filter = config.env_filter()?;
    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format {
        OutputFormat::Pretty => registry
            .with(fmt::layer().pretty().with_target(config.with_target))
            .try_init(),
        OutputFormat::Compact => registry
            .with(fmt::layer().compact().with_target(config.with_target))
            .try_init(),
        OutputFormat::Json => registry
            .with(fmt::layer().json().with_target(config.with_target))
            .try_init(),
    };

    result.map_err(|e| crate::error::ConfigError::TracingInit(e.to_string()))?;
    info!(level = %config.level, format = ?config.format, "tracing initialized");
    Ok(())
}

/// Observer that logs every retried failure at `warn`.
pub fn log_retries<E>() -> OnRetry<E>
where
    E: Classify + Display + 'static,
{
    Arc::new(|attempt: u32, error: &E| {
        warn!(
            attempt = attempt,
            status = ?error.classify().status(),
            error = %error,
            "operation failed, retrying"
        );
    })
}
