//! News aggregation across feeds and auxiliary sources.

#[allow(clippy::module_inception)]
mod aggregator;
mod source;

pub use aggregator::{AggregatorConfig, NewsAggregator, NewsBatch, NewsRequest, DEFAULT_LIMIT};
pub use source::{NewsSource, ProviderNewsSource};
