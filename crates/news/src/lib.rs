//! PulseFeed News Crate
//!
//! Feed source management, concurrent feed fetching and news aggregation.
//!
//! # Architecture
//!
//! ```text
//! +------------------+     +------------------+
//! |  SourceRegistry  | --> |   FeedFetcher    |  (bounded pool, per-source deadline)
//! +------------------+     +------------------+
//!                                   |  FeedTransport -> feed-rs -> Article
//!                                   v
//! +------------------+     +------------------+
//! |   NewsSource(s)  | --> |  NewsAggregator  |  (normalize, dedup, sort, cache)
//! +------------------+     +------------------+
//! ```
//!
//! Failures of individual sources never fail a request: they are logged and
//! recorded in the [`BatchReport`] returned alongside the articles.

pub mod aggregator;
pub mod dedup;
pub mod errors;
pub mod fetcher;
pub mod models;
pub mod pool;
pub mod sources;

pub use aggregator::{
    AggregatorConfig, NewsAggregator, NewsBatch, NewsRequest, NewsSource, ProviderNewsSource,
};
pub use dedup::{dedup_articles, title_key, Deduplicator};
pub use errors::NewsError;
pub use fetcher::{
    ConnectivityReport, FeedFetcher, FeedResponse, FeedTransport, FetchResult, FetcherConfig,
    HttpTransport, SourceCheck, SourceSelection,
};
pub use models::{sort_newest_first, Article, Category, Provenance, Source};
pub use pool::{BatchReport, TaskOutcome, TaskReport};
pub use sources::SourceRegistry;
