//! Bounded retries with exponential backoff

use gasless_primitives::constants::polling;
use std::{future::Future, time::Duration};
use tokio::time;
use tracing::warn;

/// Options for retrying an operation with exponential backoff
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryOpts {
    /// Maximum number of attempts (at least one attempt is always made)
    pub max_attempts: u64,
    /// The first retry is immediately after the first failure, the next one waits this long
    pub min_nonzero_wait: Duration,
    /// Upper bound of the wait between two attempts
    pub max_wait: Duration,
}

impl Default for RetryOpts {
    fn default() -> Self {
        Self {
            max_attempts: polling::MAX_ATTEMPTS,
            min_nonzero_wait: Duration::from_millis(polling::MIN_WAIT_MILLIS),
            max_wait: Duration::from_millis(polling::MAX_WAIT_MILLIS),
        }
    }
}

impl RetryOpts {
    pub fn with_max_attempts(mut self, max_attempts: u64) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    fn next_wait(&self, wait: Duration) -> Duration {
        (2 * wait).clamp(self.min_nonzero_wait, self.max_wait)
    }
}

/// Retries `func` while it fails with an error `should_retry` accepts
///
/// Returns the first success, the first non-retryable error or the last error once the attempts
/// are exhausted.
pub async fn with_retries<Func, Fut, Out, Err, Retry>(
    description: &str,
    func: Func,
    opts: RetryOpts,
    should_retry: Retry,
) -> Result<Out, Err>
where
    Func: Fn() -> Fut,
    Fut: Future<Output = Result<Out, Err>>,
    Retry: Fn(&Err) -> bool,
    Err: std::fmt::Display,
{
    let max_attempts = opts.max_attempts.max(1);
    let mut next_wait = Duration::ZERO;
    let mut attempt_number = 1;
    loop {
        match func().await {
            Ok(out) => return Ok(out),
            Err(error) if attempt_number >= max_attempts || !should_retry(&error) => {
                return Err(error)
            }
            Err(error) => {
                warn!("Failed to {description} (attempt {attempt_number}): {error}");
            }
        }
        time::sleep(next_wait).await;
        next_wait = opts.next_wait(next_wait);
        attempt_number += 1;
    }
}

/// Polls `func` until it yields a value
///
/// `Ok(None)` means the attempts are exhausted without a value. Errors accepted by
/// `should_retry` count as an empty poll.
pub async fn poll<Func, Fut, Out, Err, Retry>(
    description: &str,
    func: Func,
    opts: RetryOpts,
    should_retry: Retry,
) -> Result<Option<Out>, Err>
where
    Func: Fn() -> Fut,
    Fut: Future<Output = Result<Option<Out>, Err>>,
    Retry: Fn(&Err) -> bool,
    Err: std::fmt::Display,
{
    let max_attempts = opts.max_attempts.max(1);
    let mut next_wait = Duration::ZERO;
    for attempt_number in 1..=max_attempts {
        match func().await {
            Ok(Some(out)) => return Ok(Some(out)),
            Ok(None) => {}
            Err(error) if should_retry(&error) && attempt_number < max_attempts => {
                warn!("Failed to {description} (attempt {attempt_number}): {error}");
            }
            Err(error) => return Err(error),
        }
        if attempt_number < max_attempts {
            time::sleep(next_wait).await;
            next_wait = opts.next_wait(next_wait);
        }
    }
    Ok(None)
}
