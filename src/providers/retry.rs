use std::future::Future;
use std::time::Duration;

use super::traits::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// base, 2*base, 4*base, ...
    Exponential,
    /// base, 2*base, 3*base, ...
    Linear,
}

/// Bounded retry on rate-limit responses. Any other error is returned as is.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            backoff,
        }
    }

    /// Policy for text generation calls.
    pub fn text_default() -> Self {
        Self::new(3, Duration::from_millis(1000), Backoff::Exponential)
    }

    /// Policy for embedding calls.
    pub fn embedding_default() -> Self {
        Self::new(3, Duration::from_millis(1000), Backoff::Linear)
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        match self.backoff {
            Backoff::Exponential => {
                let exponent = (attempt - 1).min(16);
                self.base_delay.saturating_mul(1u32 << exponent)
            }
            Backoff::Linear => self.base_delay.saturating_mul(attempt),
        }
    }

    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_rate_limit() => {
                    if attempt >= self.max_attempts {
                        log::error!("{}: rate limited on final attempt {}/{}", label, attempt, self.max_attempts);
                        return Err(ProviderError::RetriesExhausted { attempts: attempt });
                    }
                    let delay = self.delay_for_attempt(attempt);
                    log::warn!(
                        "{}: rate limited, attempt {}/{}. Waiting {}ms...",
                        label,
                        attempt,
                        self.max_attempts,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
