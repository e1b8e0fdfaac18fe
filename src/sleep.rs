//! Delay primitive used between attempts.

use async_trait::async_trait;
use std::time::Duration;

/// Asynchronous, non-blocking wait used for backoff.
#[async_trait]
pub trait Sleeper: Send + Sync + std::fmt::Debug {
    async fn sleep(&self, delay: Duration);
}

/// Tokio timer based sleeper (default)
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        if delay.is_zero() {
            return;
        }
        tokio::time::sleep(delay).await;
    }
}
