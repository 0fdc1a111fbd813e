//! Error types and retry classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The main error enum for all upstream calls
//! - [`RetryClass`]: Classification for determining retry behavior

mod retry;

pub use retry::RetryClass;

use thiserror::Error;

/// Errors that can occur while calling a market data provider.
///
/// Each variant is classified into a [`RetryClass`] via the [`retry_class`](Self::retry_class)
/// method, which the retry executor uses to pick a delay curve or give up.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The requested symbol was not found by the provider.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// The provider rate limited the request (HTTP 429).
    /// Retried on the steeper rate-limit backoff curve.
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
    },

    /// The request to the provider timed out.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// The provider rejected our credentials.
    #[error("Unauthorized: {provider}")]
    Unauthorized {
        /// The provider that rejected the request
        provider: String,
        /// HTTP status (401 or 403), `None` when the rejection came in the body
        status: Option<u16>,
    },

    /// The provider answered with an unexpected HTTP status.
    #[error("HTTP {status} from {provider}: {message}")]
    Http {
        provider: String,
        status: u16,
        message: String,
    },

    /// A provider-specific error occurred (bad payload, API-level failure flag).
    #[error("Provider error: {provider} - {message}")]
    ProviderError {
        /// The provider that returned the error
        provider: String,
        /// The error message from the provider
        message: String,
    },

    /// The provider does not offer this operation.
    #[error("{provider} does not support '{operation}'")]
    NotSupported { operation: String, provider: String },

    /// Data validation failed.
    #[error("Validation failed: {message}")]
    ValidationFailed {
        /// Description of the validation failure
        message: String,
    },

    /// A network error occurred while communicating with a provider.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl MarketDataError {
    /// Returns the retry classification for this error.
    ///
    /// - [`RetryClass::Never`]: Don't retry, no request went out
    /// - [`RetryClass::WithBackoff`]: Retry with exponential backoff
    /// - [`RetryClass::RateLimited`]: Retry with the doubled rate-limit backoff
    ///
    /// # Examples
    ///
    /// ```
    /// use marketcache_market_data::errors::{MarketDataError, RetryClass};
    ///
    /// let error = MarketDataError::RateLimited { provider: "COINMARKETCAP".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::RateLimited);
    ///
    /// let error = MarketDataError::SymbolNotFound("INVALID".to_string());
    /// assert_eq!(error.retry_class(), RetryClass::WithBackoff);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::RateLimited { .. } => RetryClass::RateLimited,

            // Refused before any request was made.
            Self::NotSupported { .. } => RetryClass::Never,

            Self::SymbolNotFound(_)
            | Self::Timeout { .. }
            | Self::Unauthorized { .. }
            | Self::Http { .. }
            | Self::ProviderError { .. }
            | Self::ValidationFailed { .. }
            | Self::Network(_) => RetryClass::WithBackoff,
        }
    }

    /// HTTP status observed for this failure, when there was a response at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::RateLimited { .. } => Some(429),
            Self::Unauthorized { status, .. } => *status,
            Self::Http { status, .. } => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}
