//! Shared HTTP plumbing for the REST providers.

use std::time::Duration;

use log::debug;
use reqwest::{Client, RequestBuilder, StatusCode};

use crate::errors::MarketDataError;

/// Per-request timeout for provider calls.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub(crate) fn build_client() -> Client {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("pulsefeed/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Send a request and return the body of a successful response.
///
/// When `symbol` is given, a 400 or 404 answer is reported as
/// [`MarketDataError::SymbolNotFound`]; the REST APIs we call use those
/// codes for unknown tickers.
pub(crate) async fn send(
    provider: &str,
    request: RequestBuilder,
    symbol: Option<&str>,
) -> Result<String, MarketDataError> {
    let response = request
        .send()
        .await
        .map_err(|e| MarketDataError::from_transport(provider, e))?;

    let status = response.status();
    debug!("{} responded {}", provider, status);

    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            return Err(MarketDataError::RateLimited {
                provider: provider.to_string(),
            })
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            return Err(MarketDataError::ProviderError {
                provider: provider.to_string(),
                message: "Invalid or missing API key".to_string(),
            })
        }
        _ => {}
    }

    if let Some(symbol) = symbol {
        if matches!(status, StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND) {
            return Err(MarketDataError::SymbolNotFound(symbol.to_string()));
        }
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(MarketDataError::ProviderError {
            provider: provider.to_string(),
            message: format!("HTTP {} - {}", status, truncate(&body, 200)),
        });
    }

    response
        .text()
        .await
        .map_err(|e| MarketDataError::from_transport(provider, e))
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("abc", 10), "abc");
    }
}
