//! Caller-side retry with exponential backoff.
//!
//! The core never retries. Wrap a fallible call in [`RetryPolicy::run`] to
//! retry rate limits, server errors and network failures.

use std::future::Future;
use std::time::Duration;

use crate::error::{Result, SnykError};

/// Longest computed wait between attempts.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(300);

const MAX_BACKOFF: f64 = 64.0;

/// Retry schedule: `tries` attempts, waiting `delay` and multiplying it by
/// `backoff` after every failure, up to [`MAX_RETRY_DELAY`]. A
/// `Retry-After` from the server replaces the computed wait.
///
/// ```no_run
/// use std::time::Duration;
/// use snykapi::{ListQuery, RetryPolicy, SnykClient};
///
/// # async fn example(client: SnykClient) -> snykapi::Result<()> {
/// let orgs = client.organizations()?;
/// let policy = RetryPolicy::new(4).with_delay(Duration::from_millis(500));
/// let query = ListQuery::default();
/// let all = policy.run(|| orgs.list(&query)).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    tries: u32,
    delay: Duration,
    backoff: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            tries: 1,
            delay: Duration::from_secs(1),
            backoff: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Policy making at most `tries` attempts (at least one).
    pub fn new(tries: u32) -> Self {
        Self {
            tries: tries.max(1),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Growth factor, clamped to `1.0..=64.0`. NaN means no growth.
    #[must_use]
    pub fn with_backoff(mut self, backoff: f64) -> Self {
        self.backoff = if backoff.is_nan() {
            1.0
        } else {
            backoff.clamp(1.0, MAX_BACKOFF)
        };
        self
    }

    pub fn tries(&self) -> u32 {
        self.tries
    }

    /// Run `op` until it succeeds, fails with a non-retryable error or
    /// runs out of attempts.
    ///
    /// # Errors
    ///
    /// Returns the last error.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut delay = self.delay;
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.tries => {
                    let wait = match &err {
                        SnykError::Api {
                            retry_after_secs: Some(secs),
                            ..
                        } => Duration::from_secs(*secs),
                        _ => delay,
                    };
                    tracing::warn!(
                        attempt,
                        tries = self.tries,
                        wait_ms = wait.as_millis() as u64,
                        error = %err,
                        "retrying failed call"
                    );
                    tokio::time::sleep(wait).await;
                    delay = grow(delay, self.backoff);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn grow(delay: Duration, backoff: f64) -> Duration {
    Duration::try_from_secs_f64(delay.as_secs_f64() * backoff)
        .map_or(MAX_RETRY_DELAY, |next| next.min(MAX_RETRY_DELAY))
}
