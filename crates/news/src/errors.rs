//! Error types for feed fetching and news aggregation.

use pulsefeed_market_data::MarketDataError;
use thiserror::Error;

/// Errors raised while registering, fetching or parsing news sources.
///
/// Fetch and parse errors are recovered at the fetcher boundary: they mark
/// one source as failed for the current round and never abort a batch.
/// `Config` errors are raised at registration time.
#[derive(Error, Debug)]
pub enum NewsError {
    /// Invalid source descriptor or selection.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The request could not be sent or the body could not be read.
    #[error("Network error for {source_name}: {message}")]
    Network {
        source_name: String,
        message: String,
    },

    /// The request exceeded its timeout.
    #[error("Timeout fetching {source_name}")]
    Timeout { source_name: String },

    /// The endpoint answered with a non-success status.
    #[error("HTTP {status} from {source_name}")]
    Http { source_name: String, status: u16 },

    /// The payload was not a readable feed.
    #[error("Parse error for {source_name}: {message}")]
    Parse {
        source_name: String,
        message: String,
    },

    /// An auxiliary provider failed.
    #[error(transparent)]
    Provider(#[from] MarketDataError),
}

impl NewsError {
    /// Whether the failure happened on the wire (as opposed to bad content
    /// or bad configuration).
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::Timeout { .. } | Self::Http { .. }
        )
    }
}
