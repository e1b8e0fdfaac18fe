//! retryline
//!
//! Exponential-backoff retry for async operations.
//!
//! A policy runs an operation until it succeeds, fails with a non-transient
//! error, or runs out of attempts. Failures are classified through the
//! [`Classify`](classify::Classify) trait: failures without a status code are
//! always transient, failures with one are transient when the code is in the
//! configured retryable set. The final failure is returned as-is.
//!
//! ```rust,no_run
//! use retryline::prelude::*;
//! use std::time::Duration;
//!
//! # async fn fetch_booking() -> Result<String, RequestError> { Ok("ok".into()) }
//! # async fn example() -> Result<(), RequestError> {
//! // Defaults: 3 attempts, 1s initial delay doubling up to 10s
//! let booking = retry(fetch_booking).await?;
//!
//! let policy = RetryPolicy::new(
//!     RetryConfig::default()
//!         .with_max_attempts(5)
//!         .with_initial_delay(Duration::from_millis(200)),
//! )
//! .on_retry(|attempt, err: &RequestError| eprintln!("attempt {attempt} failed: {err}"));
//!
//! let booking = policy.execute(fetch_booking).await?;
//! # Ok(())
//! # }
//! ```
#![deny(unsafe_code)]

pub mod classify;
pub mod config;
pub mod decorator;
pub mod error;
pub mod http;
pub mod observability;
pub mod policy;
pub mod sleep;

pub use classify::{Classify, FailureClass};
pub use config::{RetryConfig, RetryOptions};
pub use decorator::{Retrying, with_retry};
pub use error::{ConfigError, RequestError};
pub use policy::{OnRetry, RetryPolicy, retry, retry_with};

pub mod prelude {
    pub use crate::classify::{Classify, FailureClass};
    pub use crate::config::{RetryConfig, RetryOptions};
    pub use crate::decorator::{Retrying, with_retry};
    pub use crate::error::{ConfigError, RequestError};
    pub use crate::policy::{OnRetry, RetryPolicy, retry, retry_with};
    pub use crate::sleep::{Sleeper, TokioSleeper};
}
