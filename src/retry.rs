//! Retry with backoff, shared by the search provider, the LLM client and the
//! research path.
//!
//! Each call site supplies its own policy and a classifier that decides, per
//! error, whether to stop, back off, or wait for a specific duration (e.g. a
//! server-provided reset hint).

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Not retryable; return the error immediately.
    Stop,
    /// Retry after the policy's backoff delay.
    Backoff,
    /// Retry after exactly this long.
    After(Duration),
}

/// Outcome of a retry loop that did not succeed.
#[derive(Debug)]
pub enum RetryError<E> {
    /// The classifier refused to retry this error.
    Aborted(E),
    /// Every allowed attempt failed; carries the last error.
    Exhausted { attempts: usize, last: E },
}

impl<E> RetryError<E> {
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Aborted(e) => e,
            RetryError::Exhausted { last, .. } => last,
        }
    }
}

/// Bounded exponential backoff.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: usize,

    /// Delay before the first retry
    pub base_delay: Duration,

    /// Growth factor per retry (1 = constant delay)
    pub multiplier: u32,

    /// Upper bound for any single delay, including server-provided waits
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            multiplier: 2,
            max_delay: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    /// `retries` extra attempts after the first, doubling from `base_delay`.
    pub fn with_retries(retries: usize, base_delay: Duration) -> Self {
        Self {
            max_attempts: retries + 1,
            base_delay,
            ..Default::default()
        }
    }

    /// Single attempt, never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, base: Duration) -> Self {
        self.base_delay = base;
        self
    }

    pub fn with_multiplier(mut self, multiplier: u32) -> Self {
        self.multiplier = multiplier.max(1);
        self
    }

    pub fn with_max_delay(mut self, max: Duration) -> Self {
        self.max_delay = max;
        self
    }

    /// Backoff before retry number `retry` (0-based): base * multiplier^retry.
    pub fn delay_for_retry(&self, retry: usize) -> Duration {
        let factor = self.multiplier.saturating_pow(retry as u32);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Run `op` until it succeeds, the classifier says stop, or attempts run out.
    ///
    /// `op` receives the 0-based attempt number.
    pub async fn run<T, E, F, Fut, C>(&self, label: &str, mut op: F, classify: C) -> Result<T, RetryError<E>>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> RetryDecision,
        E: Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            let error = match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            let delay = match classify(&error) {
                RetryDecision::Stop => return Err(RetryError::Aborted(error)),
                RetryDecision::Backoff => self.delay_for_retry(attempt),
                RetryDecision::After(delay) => delay.min(self.max_delay),
            };

            attempt += 1;
            if attempt >= max_attempts {
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: error,
                });
            }

            warn!(
                operation = label,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Retrying after failure"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
