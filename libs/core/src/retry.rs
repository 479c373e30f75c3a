use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

use crate::error::ProviderError;

/// Fixed-count, fixed-delay retry policy shared by the outbound clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Runs `op` until it succeeds, fails permanently, or the attempts run out.
    pub async fn run<F, Fut, T>(&self, label: &str, op: F) -> Result<T, ProviderError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        self.run_when(label, ProviderError::is_retryable, op).await
    }

    /// Like [`RetryPolicy::run`] with a caller-supplied notion of "transient".
    pub async fn run_when<P, F, Fut, T>(
        &self,
        label: &str,
        retryable: P,
        mut op: F,
    ) -> Result<T, ProviderError>
    where
        P: Fn(&ProviderError) -> bool,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if retryable(&err) && attempt < self.max_attempts => {
                    tracing::warn!(
                        target: "relay::retry",
                        operation = label,
                        attempt,
                        error = %err,
                        delay_ms = self.delay.as_millis() as u64,
                        "transient provider failure; retrying"
                    );
                    if !self.delay.is_zero() {
                        sleep(self.delay).await;
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }
}
