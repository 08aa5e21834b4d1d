use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::common::errors::{ArbError, Result};
use crate::config::types::RetryConfig;

/// Bounded retry with linear backoff and a deadline on every attempt
///
/// After failed attempt `n` the policy waits `base_delay * n` before the
/// next one. Errors that are not transient are returned immediately.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    call_timeout: Duration,
}

impl RetryPolicy {
    /// `max_retries` of zero still makes one attempt
    pub fn new(max_retries: u32, base_delay: Duration, call_timeout: Duration) -> Self {
        Self {
            max_attempts: max_retries.max(1),
            base_delay,
            call_timeout,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_retries, config.base_delay(), config.call_timeout())
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Wait after the given failed attempt (1-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }

    /// Upper bound on the wall time of one `run`
    pub fn worst_case(&self) -> Duration {
        let backoff: Duration = (1..self.max_attempts)
            .map(|attempt| self.delay_for_attempt(attempt))
            .sum();
        self.call_timeout * self.max_attempts + backoff
    }

    /// Run `operation`, retrying transient failures
    ///
    /// `label` names the call in logs and in `ExhaustedRetries`.
    pub async fn run<F, Fut, T>(&self, label: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let outcome = match timeout(self.call_timeout, operation()).await {
                Ok(outcome) => outcome,
                Err(_) => Err(ArbError::Timeout(format!(
                    "{} exceeded {:?}",
                    label, self.call_timeout
                ))),
            };

            match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{} succeeded on attempt {}", label, attempt);
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_transient() => {
                    warn!("{} failed with non-retryable error: {}", label, e);
                    return Err(e);
                }
                Err(e) if attempt >= self.max_attempts => {
                    warn!("{} failed on final attempt {}: {}", label, attempt, e);
                    return Err(ArbError::ExhaustedRetries {
                        operation: label.to_string(),
                        attempts: attempt,
                        source: Box::new(e),
                    });
                }
                Err(e) => {
                    let delay = self.delay_for_attempt(attempt);
                    warn!(
                        "{} attempt {}/{} failed: {} (retrying in {:?})",
                        label, attempt, self.max_attempts, e, delay
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}
