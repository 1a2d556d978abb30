//! Retry with backoff for outbound calls.
//!
//! [`with_retry`] is the general combinator: it takes the operation, a
//! classifier and a delay function as plain values. [`RetryPolicy::run`]
//! wires it to errors implementing [`Classify`] with linear backoff.

use std::future::Future;
use std::time::Duration;

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// How a failure should be treated by the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorClass {
    /// The remote side asked us to slow down.
    RateLimited,
    /// Temporary server or network trouble.
    Transient,
    /// Anything else. Never retried.
    Fatal,
}

impl ErrorClass {
    /// Whether another attempt may succeed.
    pub fn is_retryable(self) -> bool {
        !matches!(self, ErrorClass::Fatal)
    }
}

/// Errors that know their own retry class.
pub trait Classify {
    /// Returns the retry class of this error.
    fn classify(&self) -> ErrorClass;
}

/// Runs `op` until it succeeds, fails fatally, or `max_attempts` is reached.
///
/// After the `n`-th failed attempt (1-based) the loop sleeps
/// `delay(class, n)` before trying again. The last error is returned once
/// attempts run out. `max_attempts` of zero is treated as one.
pub async fn with_retry<T, E, Op, Fut, C, D>(
    max_attempts: u32,
    mut op: Op,
    classify: C,
    delay: D,
) -> Result<T, E>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> ErrorClass,
    D: Fn(ErrorClass, u32) -> Duration,
    E: std::fmt::Display,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(attempt, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => {
                let class = classify(&err);
                if !class.is_retryable() {
                    debug!(attempt, error = %err, "Non-retryable failure");
                    return Err(err);
                }
                if attempt >= max_attempts {
                    warn!(attempt, %class, error = %err, "Retries exhausted");
                    return Err(err);
                }

                let wait = delay(class, attempt);
                warn!(
                    attempt,
                    max_attempts,
                    %class,
                    wait_ms = wait.as_millis() as u64,
                    error = %err,
                    "Retrying after failure"
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
        }
    }
}

/// Attempt limit and per-class base delays.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first call.
    max_attempts: u32,
    /// Base delay after a rate-limit failure, in milliseconds.
    rate_limit_delay_ms: u64,
    /// Base delay after a transient failure, in milliseconds.
    transient_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            rate_limit_delay_ms: 2000,
            transient_delay_ms: 1000,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy.
    pub fn new(max_attempts: u32, rate_limit_delay: Duration, transient_delay: Duration) -> Self {
        Self {
            max_attempts,
            rate_limit_delay_ms: rate_limit_delay.as_millis() as u64,
            transient_delay_ms: transient_delay.as_millis() as u64,
        }
    }

    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before the retry that follows the `attempt`-th failure.
    ///
    /// Linear in the attempt index: `base(class) * attempt`.
    pub fn delay_for(&self, class: ErrorClass, attempt: u32) -> Duration {
        let base = match class {
            ErrorClass::RateLimited => self.rate_limit_delay_ms,
            ErrorClass::Transient => self.transient_delay_ms,
            ErrorClass::Fatal => 0,
        };
        Duration::from_millis(base.saturating_mul(u64::from(attempt)))
    }

    /// Runs `op` under this policy.
    #[instrument(skip(self, op), fields(max_attempts = self.max_attempts))]
    pub async fn run<T, E, Op, Fut>(&self, op: Op) -> Result<T, E>
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify + std::fmt::Display,
    {
        with_retry(
            self.max_attempts,
            op,
            |e: &E| e.classify(),
            |class, attempt| self.delay_for(class, attempt),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_grow_with_attempt_index() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.delay_for(ErrorClass::RateLimited, 1),
            Duration::from_millis(2000)
        );
        assert_eq!(
            policy.delay_for(ErrorClass::RateLimited, 2),
            Duration::from_millis(4000)
        );
        assert_eq!(
            policy.delay_for(ErrorClass::Transient, 3),
            Duration::from_millis(3000)
        );
        assert_eq!(policy.delay_for(ErrorClass::Fatal, 3), Duration::ZERO);
    }

    #[test]
    fn rate_limit_waits_longer_than_transient() {
        let policy = RetryPolicy::default();
        for attempt in 1..5 {
            assert!(
                policy.delay_for(ErrorClass::RateLimited, attempt)
                    > policy.delay_for(ErrorClass::Transient, attempt)
            );
        }
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let policy: RetryPolicy = toml::from_str("max_attempts = 5").unwrap();
        assert_eq!(*policy.max_attempts(), 5);
        assert_eq!(*policy.rate_limit_delay_ms(), 2000);
    }
}
