//! Decorator form of the retry policy.
//!
//! `Retrying` wraps an async function so every call runs its own retry loop.
//! Arguments are cloned for each attempt; use a tuple for several arguments.

use std::fmt;
use std::future::Future;

use crate::classify::Classify;
use crate::policy::RetryPolicy;

/// An async function wrapped with a retry policy.
pub struct Retrying<F, E> {
    inner: F,
    policy: RetryPolicy<E>,
}

impl<F: Clone, E> Clone for Retrying<F, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            policy: self.policy.clone(),
        }
    }
}

impl<F, E> fmt::Debug for Retrying<F, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retrying")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl<F, E> Retrying<F, E> {
    pub fn new(inner: F, policy: RetryPolicy<E>) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy<E> {
        &self.policy
    }

    pub fn into_inner(self) -> F {
        self.inner
    }

    /// Call the wrapped function with `args`, retrying per the policy.
    pub async fn call<A, Fut, T>(&self, args: A) -> Result<T, E>
    where
        F: Fn(A) -> Fut,
        A: Clone,
        Fut: Future<Output = Result<T, E>>,
        E: Classify,
    {
        self.policy.execute(|| (self.inner)(args.clone())).await
    }

    /// Call a wrapped zero-argument function, retrying per the policy.
    pub async fn call0<Fut, T>(&self) -> Result<T, E>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify,
    {
        self.policy.execute(|| (self.inner)()).await
    }
}

impl<E> RetryPolicy<E> {
    /// Wrap `f` so every call is retried with this policy.
    pub fn wrap<F>(&self, f: F) -> Retrying<F, E> {
        Retrying::new(f, self.clone())
    }
}

/// Wrap `f` with `policy`.
pub fn with_retry<F, E>(f: F, policy: RetryPolicy<E>) -> Retrying<F, E> {
    Retrying::new(f, policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use crate::error::RequestError;
    use crate::sleep::testing::RecordingSleeper;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn policy(max_attempts: u32) -> RetryPolicy<RequestError> {
        RetryPolicy::new(RetryConfig::default().with_max_attempts(max_attempts))
            .with_sleeper(RecordingSleeper::default())
    }

    #[tokio::test]
    async fn calls_are_independent() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();
        let wrapped = policy(3).wrap(move |id: u32| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            async move { Err::<(), _>(RequestError::api(503, format!("user {id} unavailable"))) }
        });

        let first = wrapped.call(7).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);

        let second = wrapped.call(7).await;
        assert_eq!(counter.load(Ordering::SeqCst), 6);

        assert_eq!(first, second);
        assert_eq!(first, Err(RequestError::api(503, "user 7 unavailable")));
    }

    #[tokio::test]
    async fn arguments_are_passed_on_every_attempt() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let wrapped = with_retry(
            move |(hotel, artist): (String, u32)| {
                let seen = seen_clone.clone();
                async move {
                    let mut seen = seen.lock().unwrap();
                    seen.push(format!("{hotel}/{artist}"));
                    if seen.len() < 2 {
                        Err(RequestError::network("timeout"))
                    } else {
                        Ok(seen.len())
                    }
                }
            },
            policy(3),
        );

        let result = wrapped.call(("grand".to_string(), 42)).await;
        assert_eq!(result, Ok(2));
        assert_eq!(*seen.lock().unwrap(), vec!["grand/42", "grand/42"]);
    }

    #[tokio::test]
    async fn zero_argument_functions() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();
        let wrapped = policy(2).wrap(move || {
            let n = counter_clone.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(RequestError::api(500, "oops"))
                } else {
                    Ok("ok")
                }
            }
        });

        assert_eq!(wrapped.call0().await, Ok("ok"));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_calls_do_not_interfere() {
        let wrapped = RetryPolicy::<RequestError>::new(
            RetryConfig::default()
                .with_max_attempts(3)
                .with_initial_delay(Duration::from_millis(5)),
        )
        .wrap(|(fail_times, attempts): (u32, Arc<AtomicU32>)| async move {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            if n < fail_times {
                Err(RequestError::api(503, "busy"))
            } else {
                Ok(n + 1)
            }
        });

        let quick = Arc::new(AtomicU32::new(0));
        let slow = Arc::new(AtomicU32::new(0));
        let (ra, rb) = tokio::join!(
            wrapped.call((0, quick.clone())),
            wrapped.call((2, slow.clone())),
        );

        assert_eq!(ra, Ok(1));
        assert_eq!(rb, Ok(3));
        assert_eq!(quick.load(Ordering::SeqCst), 1);
        assert_eq!(slow.load(Ordering::SeqCst), 3);
    }
}
