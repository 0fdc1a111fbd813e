//! Shared HTTP plumbing for provider implementations.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::errors::MarketDataError;

/// Default HTTP request timeout
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) fn build_client() -> Client {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Send a request and map transport and status failures onto [`MarketDataError`].
///
/// Returns the response body on 2xx.
pub(crate) async fn send(
    provider: &str,
    endpoint: &str,
    request: RequestBuilder,
) -> Result<String, MarketDataError> {
    debug!(provider, endpoint, "Upstream request");

    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            MarketDataError::Timeout {
                provider: provider.to_string(),
            }
        } else {
            MarketDataError::Network(e)
        }
    })?;

    let status = response.status();
    debug!(provider, endpoint, status = status.as_u16(), "Upstream response");

    if let Some(err) = status_error(provider, status) {
        let body = response.text().await.unwrap_or_default();
        return Err(match err {
            MarketDataError::Http {
                provider, status, ..
            } => MarketDataError::Http {
                provider,
                status,
                message: truncate(&body, 200),
            },
            other => other,
        });
    }

    response
        .text()
        .await
        .map_err(|e| MarketDataError::ProviderError {
            provider: provider.to_string(),
            message: format!("Failed to read response: {}", e),
        })
}

/// Map a non-success status to the matching error; `None` on 2xx.
pub(crate) fn status_error(provider: &str, status: StatusCode) -> Option<MarketDataError> {
    if status.is_success() {
        return None;
    }

    Some(match status {
        StatusCode::TOO_MANY_REQUESTS => MarketDataError::RateLimited {
            provider: provider.to_string(),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => MarketDataError::Unauthorized {
            provider: provider.to_string(),
            status: Some(status.as_u16()),
        },
        _ => MarketDataError::Http {
            provider: provider.to_string(),
            status: status.as_u16(),
            message: status
                .canonical_reason()
                .unwrap_or("Unexpected status")
                .to_string(),
        },
    })
}

pub(crate) fn parse_json<T: DeserializeOwned>(
    provider: &str,
    body: &str,
) -> Result<T, MarketDataError> {
    serde_json::from_str(body).map_err(|e| MarketDataError::ProviderError {
        provider: provider.to_string(),
        message: format!("Failed to parse response: {}", e),
    })
}

/// Read a JSON number leniently: numeric strings parse, anything else is `None`.
pub(crate) fn lenient_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Join symbols for a comma-separated batch parameter.
pub(crate) fn join_symbols(symbols: &[String]) -> String {
    symbols
        .iter()
        .map(|s| urlencoding::encode(s).into_owned())
        .collect::<Vec<_>>()
        .join(",")
}

fn truncate(body: &str, max_chars: usize) -> String {
    body.chars().take(max_chars).collect()
}
