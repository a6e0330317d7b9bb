//! Concurrent feed fetching.
//!
//! Sources are fetched through a [`FeedTransport`], parsed with `feed-rs`
//! and cached per feed URL. One failing or slow source never fails the
//! round; it shows up in the [`BatchReport`](crate::pool::BatchReport).

#[allow(clippy::module_inception)]
mod fetcher;
mod parser;
mod transport;

pub use fetcher::{
    ConnectivityReport, FeedFetcher, FetchResult, FetcherConfig, SourceCheck, SourceSelection,
    DEFAULT_REQUEST_TIMEOUT,
};
pub use parser::parse_feed;
pub use transport::{FeedResponse, FeedTransport, HttpTransport};
