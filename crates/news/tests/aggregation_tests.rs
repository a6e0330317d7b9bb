//! End-to-end aggregation tests over in-memory feeds.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pulsefeed_market_data::Cache;
use pulsefeed_news::{
    AggregatorConfig, Category, FeedFetcher, FeedResponse, FeedTransport, FetcherConfig,
    NewsAggregator, NewsError, NewsRequest, Source, SourceRegistry, TaskOutcome,
};

struct InMemoryFeeds {
    feeds: HashMap<String, String>,
}

#[async_trait]
impl FeedTransport for InMemoryFeeds {
    async fn get(&self, url: &str, _timeout: Duration) -> Result<FeedResponse, NewsError> {
        match self.feeds.get(url) {
            Some(body) => Ok(FeedResponse {
                status: 200,
                body: body.clone().into_bytes(),
            }),
            None => Err(NewsError::Network {
                source_name: url.to_string(),
                message: "connection reset by peer".to_string(),
            }),
        }
    }
}

fn rss(items: &[(&str, &str, &str)]) -> String {
    let items: String = items
        .iter()
        .map(|(title, link, published)| {
            format!(
                "<item><title>{}</title><link>{}</link><pubDate>{}</pubDate></item>",
                title, link, published
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0"?><rss version="2.0"><channel><title>Feed</title>{}</channel></rss>"#,
        items
    )
}

fn build(sources: Vec<(Source, Option<String>)>) -> NewsAggregator {
    let registry = SourceRegistry::new();
    let mut feeds = HashMap::new();
    for (source, body) in sources {
        if let Some(body) = body {
            feeds.insert(source.url.clone(), body);
        }
        registry.register(source).unwrap();
    }

    let cache = Arc::new(Cache::new());
    let fetcher = Arc::new(FeedFetcher::new(
        Arc::new(registry),
        cache.clone(),
        Arc::new(InMemoryFeeds { feeds }),
        FetcherConfig::default(),
    ));
    NewsAggregator::new(fetcher, cache, AggregatorConfig::default())
}

#[tokio::test]
async fn partial_failure_still_returns_healthy_sources() {
    let mut sources = Vec::new();
    let desks = [
        ("One", "Retailers report stronger holiday spending"),
        ("Two", "Chipmakers rally after upbeat guidance"),
        ("Three", "Airline stocks slide on fuel costs"),
        ("Four", "Banks brace for stricter capital rules"),
        ("Five", "Automakers weigh tariffs on imported parts"),
    ];
    for (i, (name, headline)) in desks.iter().enumerate() {
        let url = format!("https://{}.test/rss", name.to_lowercase());
        // sources Two and Four are unreachable
        let story = format!("https://{}.test/story", name.to_lowercase());
        let body = (i % 2 == 0)
            .then(|| rss(&[(*headline, story.as_str(), "Tue, 02 Jan 2024 10:00:00 GMT")]));
        sources.push((Source::new(*name, url, Category::Stocks), body));
    }
    let aggregator = build(sources);

    let batch = aggregator
        .get_recent_with_report(&NewsRequest::new(20).feeds_only())
        .await;

    assert_eq!(batch.report.successful(), 3);
    assert_eq!(batch.report.failed(), 2);
    assert_eq!(batch.articles.len(), 3);
    assert!(matches!(
        batch.report.outcome("Two"),
        Some(TaskOutcome::Failed { .. })
    ));
    let names: Vec<_> = batch.report.tasks.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["One", "Two", "Three", "Four", "Five"]);
}

#[tokio::test]
async fn near_duplicate_headlines_keep_first_in_intake_order() {
    let aggregator = build(vec![
        (
            Source::new("A", "https://a.test/rss", Category::Crypto),
            Some(rss(&[(
                "Bitcoin price surges past $50k",
                "https://a/1",
                "Tue, 02 Jan 2024 10:00:00 GMT",
            )])),
        ),
        (
            Source::new("B", "https://b.test/rss", Category::Crypto),
            Some(rss(&[(
                "BTC price surges past $50,000",
                "https://b/2",
                "Tue, 02 Jan 2024 09:00:00 GMT",
            )])),
        ),
    ]);

    let articles = aggregator.get_recent(&NewsRequest::new(10)).await;

    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].url, "https://a/1");
    assert_eq!(articles[0].source, "A");
}

#[tokio::test]
async fn first_seen_wins_even_when_older() {
    let aggregator = build(vec![
        (
            Source::new("A", "https://a.test/rss", Category::Crypto),
            Some(rss(&[(
                "Ethereum staking yields climb again",
                "https://a/eth",
                "Mon, 01 Jan 2024 06:00:00 GMT",
            )])),
        ),
        (
            Source::new("B", "https://b.test/rss", Category::Crypto),
            Some(rss(&[(
                "ETH staking yields climb again",
                "https://b/eth",
                "Tue, 02 Jan 2024 06:00:00 GMT",
            )])),
        ),
    ]);

    let articles = aggregator.get_recent(&NewsRequest::new(10)).await;
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].url, "https://a/eth");
}

#[tokio::test]
async fn category_and_name_selection() {
    let aggregator = build(vec![
        (
            Source::new("Crypto Desk", "https://crypto.test/rss", Category::Crypto),
            Some(rss(&[(
                "Solana network upgrade goes live",
                "https://crypto.test/1",
                "Tue, 02 Jan 2024 10:00:00 GMT",
            )])),
        ),
        (
            Source::new("Forex Desk", "https://forex.test/rss", Category::Forex),
            Some(rss(&[(
                "Dollar slips against the euro",
                "https://forex.test/1",
                "Tue, 02 Jan 2024 11:00:00 GMT",
            )])),
        ),
    ]);

    let crypto = aggregator
        .get_recent(&NewsRequest::new(10).with_categories(vec![Category::Crypto]))
        .await;
    assert_eq!(crypto.len(), 1);
    assert_eq!(crypto[0].category, Category::Crypto);

    let named = aggregator
        .get_recent(&NewsRequest::new(10).with_sources(vec!["forex desk".to_string()]))
        .await;
    assert_eq!(named.len(), 1);
    assert_eq!(named[0].source, "Forex Desk");
}
