//! Bounded retry with exponential backoff for startup-time dependencies.
//!
//! The attempt count is capped explicitly; the `backoff` crate only bounds
//! elapsed time, which is disabled here.

use backoff::ExponentialBackoffBuilder;
use backoff::future::retry_notify;
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::{info, warn};

/// Configuration for retry behavior.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_backoff: Duration,
    /// Upper bound for any single delay.
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    fn schedule(&self) -> backoff::ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_backoff)
            .with_multiplier(self.backoff_multiplier)
            .with_randomization_factor(0.0)
            .with_max_interval(self.max_backoff)
            .with_max_elapsed_time(None)
            .build()
    }
}

/// Runs `f` until it succeeds or `max_attempts` is exhausted, returning the
/// last error in the latter case.
pub async fn retry_with_backoff<F, Fut, T, E>(
    config: &RetryConfig,
    operation_name: &str,
    mut f: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = config.max_attempts.max(1);
    let attempts = AtomicU32::new(0);

    let result = retry_notify(
        config.schedule(),
        || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            let fut = f();
            async move {
                fut.await.map_err(|err| {
                    if attempt >= max_attempts {
                        backoff::Error::permanent(err)
                    } else {
                        backoff::Error::transient(err)
                    }
                })
            }
        },
        |err: E, delay: Duration| {
            warn!(
                operation = operation_name,
                attempt = attempts.load(Ordering::SeqCst),
                max_attempts,
                error = %err,
                backoff_ms = delay.as_millis() as u64,
                "Operation failed, retrying after backoff"
            );
        },
    )
    .await;

    match &result {
        Ok(_) => {
            let used = attempts.load(Ordering::SeqCst);
            if used > 1 {
                info!(operation = operation_name, attempts = used, "Operation succeeded after retry");
            }
        }
        Err(err) => warn!(
            operation = operation_name,
            attempts = attempts.load(Ordering::SeqCst),
            error = %err,
            "Operation failed after exhausting retries"
        ),
    }

    result
}
