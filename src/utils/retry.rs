use std::time::Duration;
use tokio::time::sleep;

// ============================================================================
// Retry Policy
// ============================================================================
//
// One policy object drives every retry loop in the service:
// - the realtime subscription (fixed 5s delay, optionally bounded)
// - startup connections (short exponential backoff)
//
// A multiplier of 1.0 yields a fixed delay. `max_attempts = None` retries
// forever; callers that choose this must be cancellable.
//
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of retries after the first failure (None = unbounded)
    pub max_attempts: Option<u32>,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Growth factor applied after every retry
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: Some(3),
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Fixed delay between attempts
    pub fn fixed(delay: Duration, max_attempts: Option<u32>) -> Self {
        Self {
            max_attempts,
            initial_delay: delay,
            max_delay: delay,
            multiplier: 1.0,
        }
    }

    /// Retry policy for the realtime subscription: 5s between attempts
    pub fn realtime() -> Self {
        Self::fixed(Duration::from_secs(5), None)
    }

    /// Create a retry config for startup connections (more retries)
    pub fn aggressive() -> Self {
        Self {
            max_attempts: Some(5),
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::new(self.clone())
    }
}

/// Stateful view over a [`RetryConfig`]
#[derive(Debug, Clone)]
pub struct Backoff {
    config: RetryConfig,
    attempts: u32,
    next: Duration,
}

impl Backoff {
    pub fn new(config: RetryConfig) -> Self {
        let next = config.initial_delay.min(config.max_delay);
        Self { config, attempts: 0, next }
    }

    /// Delay to wait before the next attempt, or None once the budget is spent
    pub fn next_delay(&mut self) -> Option<Duration> {
        if let Some(max) = self.config.max_attempts {
            if self.attempts >= max {
                return None;
            }
        }

        self.attempts += 1;
        let delay = self.next;

        let grown = Duration::from_millis(
            ((self.next.as_millis() as f64) * self.config.multiplier.max(1.0)) as u64,
        );
        self.next = grown.min(self.config.max_delay);

        Some(delay)
    }

    /// Number of retries handed out since the last reset
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
        self.next = self.config.initial_delay.min(self.config.max_delay);
    }
}

/// Result of a retry operation
#[derive(Debug)]
pub enum RetryResult<T, E> {
    /// Operation succeeded
    Success(T),
    /// Operation failed after all retries
    Failed(E),
}

impl<T, E> RetryResult<T, E> {
    pub fn into_result(self) -> Result<T, E> {
        match self {
            RetryResult::Success(value) => Ok(value),
            RetryResult::Failed(error) => Err(error),
        }
    }
}

/// Execute an operation with backoff retry
pub async fn retry_with_backoff<F, Fut, T, E>(
    config: RetryConfig,
    mut operation: F,
) -> RetryResult<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut backoff = config.backoff();
    let mut attempt = 0;

    loop {
        attempt += 1;

        tracing::debug!(
            attempt = attempt,
            max_attempts = ?config.max_attempts,
            "Attempting operation"
        );

        match operation(attempt).await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(
                        attempt = attempt,
                        "Operation succeeded after retry"
                    );
                }
                return RetryResult::Success(result);
            }
            Err(error) => {
                let Some(delay) = backoff.next_delay() else {
                    tracing::error!(
                        attempt = attempt,
                        error = %error,
                        "Operation failed after all retries"
                    );
                    return RetryResult::Failed(error);
                };

                tracing::warn!(
                    attempt = attempt,
                    error = %error,
                    delay_ms = delay.as_millis(),
                    "Operation failed, retrying after delay"
                );

                sleep(delay).await;
            }
        }
    }
}
