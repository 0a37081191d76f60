use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use super::{GenerationError, GenerationResult};

/// How much randomness to add to each backoff delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Jitter {
    /// Always wait the full exponential delay
    None,
    /// Wait a uniformly random delay between the base and the exponential delay
    Full,
}

/// Exponential backoff with jitter around a single fallible request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: Jitter,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            base_delay_ms: 1_000,
            max_delay_ms: 60_000,
            jitter: Jitter::Full,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Upper bound of the wait after `failures` failed attempts.
    pub fn delay_ceiling(&self, failures: u32) -> Duration {
        let factor = failures
            .checked_sub(1)
            .and_then(|exp| 1u64.checked_shl(exp))
            .unwrap_or(u64::MAX);
        let ms = self
            .base_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms);
        Duration::from_millis(ms)
    }

    /// Wait before the next attempt after `failures` failed attempts.
    pub fn backoff(&self, failures: u32) -> Duration {
        let ceiling = self.delay_ceiling(failures);
        match self.jitter {
            Jitter::None => ceiling,
            Jitter::Full => {
                let low = self.base_delay_ms.min(self.max_delay_ms);
                let high = u64::try_from(ceiling.as_millis()).unwrap_or(u64::MAX);
                if low >= high {
                    return ceiling;
                }
                Duration::from_millis(rand::rng().random_range(low..=high))
            }
        }
    }

    /// Run `attempt` until it succeeds, fails permanently or the attempt
    /// budget runs out.
    pub async fn run<T, F, Fut>(&self, mut attempt: F) -> GenerationResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = GenerationResult<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut failures = 0;

        loop {
            let err = match attempt().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            failures += 1;

            if !err.is_transient() {
                return Err(err);
            }
            if failures >= max_attempts {
                return Err(GenerationError::RetriesExhausted {
                    attempts: failures,
                    last: Box::new(err),
                });
            }

            let mut delay = self.backoff(failures);
            if let GenerationError::RateLimited {
                retry_after: Some(hint),
            } = &err
            {
                delay = delay.max(*hint).min(Duration::from_millis(self.max_delay_ms));
            }

            tracing::warn!(
                "Generation attempt {}/{} failed: {}; retrying in {:?}",
                failures,
                max_attempts,
                err,
                delay
            );
            tokio::time::sleep(delay).await;
        }
    }
}
