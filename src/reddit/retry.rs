//! Retrying Reddit calls that failed transiently.
//!
//! Reddit sheds load often: 5xx responses, 429s and `RATELIMIT` errors are
//! routine and usually clear within seconds. Reads are retried with doubling
//! delays; writes are not (see [`RetryPolicy::NoRetry`]).

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::error::RedditApiError;

/// How many times to retry, and how long to wait in between.
///
/// The wait before retry `n` (0-based) is `base * 2^n`, never more than `cap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub retries: u32,
    pub base: Duration,
    pub cap: Duration,
}

impl RetryConfig {
    /// One-off lookups (identity, history pages, titles): waits 2s, 4s, 8s.
    pub const DEFAULT: Self = Self {
        retries: 3,
        base: Duration::from_secs(2),
        cap: Duration::from_secs(16),
    };

    /// The live feed: rides out about a minute of outage before giving up.
    pub const FEED: Self = Self {
        retries: 6,
        base: Duration::from_secs(1),
        cap: Duration::from_secs(60),
    };

    pub const fn new(retries: u32, base: Duration, cap: Duration) -> Self {
        Self { retries, base, cap }
    }

    /// Wait before retry `n` (0-based).
    pub fn delay_before_retry(&self, n: u32) -> Duration {
        2u32.checked_pow(n)
            .and_then(|factor| self.base.checked_mul(factor))
            .map_or(self.cap, |delay| delay.min(self.cap))
    }

    /// Every wait this config can impose, in order.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.retries).map(|n| self.delay_before_retry(n))
    }

    /// Worst-case total time spent waiting.
    pub fn total_max_wait(&self) -> Duration {
        self.delays().sum()
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Whether a call may be repeated at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Retry transient failures per the [`RetryConfig`].
    #[default]
    RetryTransient,

    /// Single attempt. For replies: a post that may have landed must never be
    /// sent again.
    NoRetry,
}

/// Runs `call`, repeating it after transient failures.
///
/// Returns the first success, the first permanent error, or the last
/// transient error once `config.retries` retries are used up.
pub async fn retry_with_backoff<T, F, Fut>(
    config: RetryConfig,
    policy: RetryPolicy,
    mut call: F,
) -> Result<T, RedditApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RedditApiError>>,
{
    let retries = match policy {
        RetryPolicy::RetryTransient => config.retries,
        RetryPolicy::NoRetry => 0,
    };
    let mut retry = 0;
    loop {
        let error = match call().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        if !error.kind.is_retriable() || retry >= retries {
            return Err(error);
        }
        let delay = config.delay_before_retry(retry);
        retry += 1;
        warn!(
            error = %error,
            retry,
            of = retries,
            delay_ms = delay.as_millis() as u64,
            "Reddit call failed, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}
