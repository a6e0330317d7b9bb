//! Error types and retry classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The main error enum for all market data operations
//! - [`RetryClass`]: Classification for determining circuit breaker behavior

mod retry;

pub use retry::RetryClass;

use thiserror::Error;

/// Errors that can occur during market data operations.
///
/// None of these escape the router or manager boundary: they are logged and
/// degrade to "no data". Each variant is classified into a [`RetryClass`] via
/// [`retry_class`](Self::retry_class), which decides whether the failure
/// counts against the provider's circuit breaker.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The requested symbol was not found by the provider.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// The provider does not implement the requested operation.
    #[error("Operation '{operation}' not supported by {provider}")]
    NotSupported {
        /// The operation that was requested
        operation: String,
        /// The provider that rejected it
        provider: String,
    },

    /// The provider returned a well-formed but empty result.
    #[error("No data returned by {provider}")]
    NoData {
        /// The provider that returned nothing
        provider: String,
    },

    /// The provider rate limited the request (HTTP 429).
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

    /// A provider-specific error occurred.
    #[error("Provider error: {provider} - {message}")]
    ProviderError {
        /// The provider that returned the error
        provider: String,
        /// The error message from the provider
        message: String,
    },

    /// The provider answered with a payload we could not interpret.
    #[error("Parse error: {provider} - {message}")]
    Parse {
        /// The provider whose payload was malformed
        provider: String,
        /// What went wrong
        message: String,
    },

    /// Invalid or missing provider/route descriptor.
    ///
    /// Raised at registration time and fatal only for that registration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The circuit breaker is open for this provider.
    #[error("Circuit open: {provider}")]
    CircuitOpen {
        /// The provider with an open circuit
        provider: String,
    },

    /// No providers are available to handle the request.
    #[error("No providers available")]
    NoProvidersAvailable,

    /// A network error occurred while communicating with a provider.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl MarketDataError {
    /// Returns the retry classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use pulsefeed_market_data::errors::{MarketDataError, RetryClass};
    ///
    /// let error = MarketDataError::RateLimited { provider: "BINANCE".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::FailoverWithPenalty);
    ///
    /// let error = MarketDataError::SymbolNotFound("INVALID".to_string());
    /// assert_eq!(error.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::SymbolNotFound(_) | Self::Config(_) | Self::NoProvidersAvailable => {
                RetryClass::Never
            }

            // Transient transport failures count against the provider
            Self::RateLimited { .. } | Self::Timeout { .. } | Self::Network(_) => {
                RetryClass::FailoverWithPenalty
            }

            Self::NotSupported { .. }
            | Self::NoData { .. }
            | Self::ProviderError { .. }
            | Self::Parse { .. } => RetryClass::NextProvider,

            Self::CircuitOpen { .. } => RetryClass::CircuitOpen,
        }
    }

    /// Shorthand for a [`MarketDataError::Parse`] from any displayable error.
    pub fn parse(provider: &str, err: impl std::fmt::Display) -> Self {
        Self::Parse {
            provider: provider.to_string(),
            message: err.to_string(),
        }
    }

    /// Map a transport error into the taxonomy, keeping timeouts distinct.
    pub fn from_transport(provider: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                provider: provider.to_string(),
            }
        } else {
            Self::Network(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_not_found_never_retries() {
        let error = MarketDataError::SymbolNotFound("INVALID".to_string());
        assert_eq!(error.retry_class(), RetryClass::Never);
    }

    #[test]
    fn test_config_never_retries() {
        let error = MarketDataError::Config("empty provider id".to_string());
        assert_eq!(error.retry_class(), RetryClass::Never);
    }

    #[test]
    fn test_rate_limited_is_penalized() {
        let error = MarketDataError::RateLimited {
            provider: "BINANCE".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::FailoverWithPenalty);
    }

    #[test]
    fn test_timeout_is_penalized() {
        let error = MarketDataError::Timeout {
            provider: "COINGECKO".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::FailoverWithPenalty);
    }

    #[test]
    fn test_parse_error_moves_on() {
        let error = MarketDataError::parse("YAHOO", "unexpected token");
        assert_eq!(error.retry_class(), RetryClass::NextProvider);
    }

    #[test]
    fn test_not_supported_moves_on() {
        let error = MarketDataError::NotSupported {
            operation: "news".to_string(),
            provider: "BINANCE".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::NextProvider);
    }

    #[test]
    fn test_error_display() {
        let error = MarketDataError::SymbolNotFound("INVALID".to_string());
        assert_eq!(format!("{}", error), "Symbol not found: INVALID");

        let error = MarketDataError::ProviderError {
            provider: "NEWSAPI".to_string(),
            message: "API key invalid".to_string(),
        };
        assert_eq!(
            format!("{}", error),
            "Provider error: NEWSAPI - API key invalid"
        );

        let error = MarketDataError::NotSupported {
            operation: "search_news".to_string(),
            provider: "BINANCE".to_string(),
        };
        assert_eq!(
            format!("{}", error),
            "Operation 'search_news' not supported by BINANCE"
        );
    }
}
