//! Retry executor with exponential backoff.
//!
//! Re-invokes a fallible async operation until it succeeds or the attempt
//! budget is spent. Only errors classed `Never` stop early. The executor
//! knows nothing about what the operation does; the same instance shape
//! serves every provider.
//!
//! # Example
//!
//! ```rust,ignore
//! use marketcache_market_data::retry::RetryExecutor;
//!
//! let executor = RetryExecutor::default();
//! let quotes = executor
//!     .execute(|| async { provider.fetch_quotes(&ids).await })
//!     .await?;
//! ```

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::errors::{MarketDataError, RetryClass};

/// Default number of attempts (including the first one).
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay before the second attempt.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(1000);

/// Errors that know how they should be retried.
pub trait Retryable {
    fn retry_class(&self) -> RetryClass;
}

impl Retryable for MarketDataError {
    fn retry_class(&self) -> RetryClass {
        MarketDataError::retry_class(self)
    }
}

/// Failure of a retried operation.
#[derive(Error, Debug)]
pub enum RetryError<E> {
    /// Every attempt failed; carries the last observed error.
    #[error("Retries exhausted after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },

    /// The operation was refused without a request and was not retried.
    #[error("{0}")]
    Aborted(E),
}

impl<E> RetryError<E> {
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Exhausted { last, .. } => last,
            RetryError::Aborted(e) => e,
        }
    }

    /// Number of attempts made before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } => *attempts,
            RetryError::Aborted(_) => 1,
        }
    }
}

/// Exponential backoff executor.
///
/// Generic failures wait `initial_delay * 2^attempt`; rate-limit failures wait
/// twice that. Both count toward `max_retries`, which is the total number of
/// attempts, not the number of retries after the first one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryExecutor {
    max_retries: u32,
    initial_delay: Duration,
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_INITIAL_DELAY)
    }
}

impl RetryExecutor {
    /// Create an executor. `max_retries` is clamped to at least one attempt.
    pub fn new(max_retries: u32, initial_delay: Duration) -> Self {
        Self {
            max_retries: max_retries.max(1),
            initial_delay,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Delay to wait after the failed attempt `attempt` (0-based).
    pub fn delay_for(&self, class: RetryClass, attempt: u32) -> Duration {
        let base = self
            .initial_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        match class {
            RetryClass::RateLimited => base.saturating_mul(2),
            RetryClass::WithBackoff | RetryClass::Never => base,
        }
    }

    /// Run `operation` until it succeeds or the attempt budget is spent.
    pub async fn execute<T, E, F, Fut>(&self, mut operation: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + fmt::Display,
    {
        let mut attempt = 0u32;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(attempts = attempt + 1, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => {
                    let class = err.retry_class();
                    attempt += 1;

                    if class == RetryClass::Never {
                        warn!(error = %err, "Operation refused, not retrying");
                        return Err(RetryError::Aborted(err));
                    }

                    if attempt >= self.max_retries {
                        warn!(
                            attempts = attempt,
                            error = %err,
                            "Retry budget exhausted"
                        );
                        return Err(RetryError::Exhausted {
                            attempts: attempt,
                            last: err,
                        });
                    }

                    let delay = self.delay_for(class, attempt - 1);
                    debug!(
                        attempt,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        rate_limited = class == RetryClass::RateLimited,
                        error = %err,
                        "Retrying after backoff"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
