use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use pulsefeed_market_data::cache::prefixes;
use pulsefeed_market_data::Cache;
use serde::Serialize;
use tokio::time::timeout;

use super::parser::parse_feed;
use super::transport::FeedTransport;
use crate::dedup::dedup_articles;
use crate::errors::NewsError;
use crate::models::{sort_newest_first, Article, Category, Source};
use crate::pool::{run_bounded, BatchReport, Fetched, DEFAULT_TASK_DEADLINE, DEFAULT_WORKERS};
use crate::sources::SourceRegistry;

/// Default timeout for one HTTP exchange.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct FetcherConfig {
    /// Concurrent source fetches
    pub workers: usize,
    /// Budget for one source, cache lookup and parsing included
    pub task_deadline: Duration,
    pub request_timeout: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            task_deadline: DEFAULT_TASK_DEADLINE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Which sources a fetch round targets.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SourceSelection {
    /// Every active source
    #[default]
    Active,
    /// Named sources, in the given order. Unknown names are skipped.
    Names(Vec<String>),
    /// Active sources in any of these categories
    Categories(Vec<Category>),
}

#[derive(Debug, Default)]
pub struct FetchResult {
    pub articles: Vec<Article>,
    pub report: BatchReport,
}

/// Reachability of one source.
#[derive(Clone, Debug, Serialize)]
pub struct SourceCheck {
    pub name: String,
    pub url: String,
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub latency_ms: u64,
    pub entries: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ConnectivityReport {
    pub checks: Vec<SourceCheck>,
    pub successful: usize,
    pub failed: usize,
}

/// Fetches, parses and caches feed sources concurrently.
pub struct FeedFetcher {
    registry: Arc<SourceRegistry>,
    cache: Arc<Cache>,
    transport: Arc<dyn FeedTransport>,
    config: FetcherConfig,
}

impl FeedFetcher {
    pub fn new(
        registry: Arc<SourceRegistry>,
        cache: Arc<Cache>,
        transport: Arc<dyn FeedTransport>,
        config: FetcherConfig,
    ) -> Self {
        Self {
            registry,
            cache,
            transport,
            config,
        }
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<SourceRegistry> {
        &self.registry
    }

    /// Turn a selection into concrete sources, in configured order.
    pub fn resolve_sources(&self, selection: &SourceSelection) -> Vec<Source> {
        match selection {
            SourceSelection::Active => self.registry.query(None, true),
            SourceSelection::Names(names) => names
                .iter()
                .filter_map(|name| {
                    let source = self.registry.by_name(name);
                    if source.is_none() {
                        warn!("Skipping unknown feed source '{}'", name);
                    }
                    source
                })
                .collect(),
            SourceSelection::Categories(categories) => self
                .registry
                .query(None, true)
                .into_iter()
                .filter(|s| categories.contains(&s.category))
                .collect(),
        }
    }

    /// Fetch one source, serving from the cache when possible.
    pub async fn fetch_source(&self, source: Source) -> Result<Fetched<Article>, NewsError> {
        let params = [("url", source.url.as_str())];
        if let Some(articles) = self.cache.get_json::<Vec<Article>>(prefixes::FEED, &params) {
            debug!("Serving '{}' from cache", source.name);
            return Ok(Fetched::cached(articles));
        }

        let response = self
            .transport
            .get(&source.url, self.config.request_timeout)
            .await
            .map_err(|e| attribute(e, &source.name))?;
        if !response.is_success() {
            return Err(NewsError::Http {
                source_name: source.name.clone(),
                status: response.status,
            });
        }

        let mut articles = parse_feed(&source, &response.body)?;
        articles.truncate(source.max_entries);

        let ttl = match source.refresh {
            Some(refresh) => self.cache.set_json_with_ttl(prefixes::FEED, &articles, &params, refresh),
            None => self.cache.set_json(prefixes::FEED, &articles, &params),
        };
        debug!(
            "Fetched {} articles from '{}' (cached for {:?})",
            articles.len(),
            source.name,
            ttl
        );

        Ok(Fetched::fresh(articles))
    }

    /// Fetch the selected sources concurrently.
    ///
    /// Articles are merged in configured source order, sorted newest first,
    /// deduplicated and cut to `limit`. A failing source only shows up in
    /// the report.
    pub async fn fetch(&self, selection: &SourceSelection, limit: usize) -> FetchResult {
        let sources = self.resolve_sources(selection);
        if sources.is_empty() {
            warn!("No feed sources selected");
            return FetchResult::default();
        }

        let tasks: Vec<_> = sources
            .into_iter()
            .map(|source| (source.name.clone(), self.fetch_source(source)))
            .collect();
        let (mut articles, report) =
            run_bounded(tasks, self.config.workers, self.config.task_deadline).await;

        sort_newest_first(&mut articles);
        let mut articles = dedup_articles(articles);
        articles.truncate(limit);

        info!(
            "Feed round: {} sources ok, {} failed, {} articles",
            report.successful(),
            report.failed(),
            articles.len()
        );
        FetchResult { articles, report }
    }

    /// Probe each selected source without touching the content cache.
    pub async fn test_connectivity(&self, selection: &SourceSelection) -> ConnectivityReport {
        let sources = self.resolve_sources(selection);
        let deadline = self.config.task_deadline;

        let checks: Vec<SourceCheck> = stream::iter(sources)
            .map(|source| async move {
                let started = Instant::now();
                let result = timeout(deadline, self.probe(&source)).await;
                let latency_ms = started.elapsed().as_millis() as u64;

                let mut check = SourceCheck {
                    name: source.name.clone(),
                    url: source.url.clone(),
                    reachable: false,
                    status: None,
                    latency_ms,
                    entries: 0,
                    error: None,
                };
                match result {
                    Ok(Ok((status, entries))) => {
                        check.reachable = true;
                        check.status = Some(status);
                        check.entries = entries;
                    }
                    Ok(Err((status, e))) => {
                        check.status = status;
                        check.error = Some(e.to_string());
                    }
                    Err(_) => {
                        check.error = Some(format!("timed out after {:?}", deadline));
                    }
                }
                check
            })
            .buffered(self.config.workers.max(1))
            .collect()
            .await;

        let successful = checks.iter().filter(|c| c.reachable).count();
        let failed = checks.len() - successful;
        info!(
            "Connectivity check: {} reachable, {} unreachable",
            successful, failed
        );

        ConnectivityReport {
            checks,
            successful,
            failed,
        }
    }

    async fn probe(&self, source: &Source) -> Result<(u16, usize), (Option<u16>, NewsError)> {
        let response = self
            .transport
            .get(&source.url, self.config.request_timeout)
            .await
            .map_err(|e| (None, attribute(e, &source.name)))?;
        if !response.is_success() {
            return Err((
                Some(response.status),
                NewsError::Http {
                    source_name: source.name.clone(),
                    status: response.status,
                },
            ));
        }
        let entries = parse_feed(source, &response.body)
            .map_err(|e| (Some(response.status), e))?
            .len();
        Ok((response.status, entries))
    }
}

/// Re-label a transport error with the source name.
fn attribute(err: NewsError, source_name: &str) -> NewsError {
    let source_name = source_name.to_string();
    match err {
        NewsError::Network { message, .. } => NewsError::Network {
            source_name,
            message,
        },
        NewsError::Timeout { .. } => NewsError::Timeout { source_name },
        NewsError::Http { status, .. } => NewsError::Http {
            source_name,
            status,
        },
        NewsError::Parse { message, .. } => NewsError::Parse {
            source_name,
            message,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::transport::FeedResponse;
    use crate::pool::TaskOutcome;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Reply {
        Body(String),
        Status(u16),
        Down,
        Hang,
    }

    struct MockTransport {
        replies: HashMap<String, Reply>,
        calls: AtomicUsize,
    }

    impl MockTransport {
        fn new(replies: Vec<(&str, Reply)>) -> Self {
            Self {
                replies: replies
                    .into_iter()
                    .map(|(url, reply)| (url.to_string(), reply))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl FeedTransport for MockTransport {
        async fn get(&self, url: &str, _timeout: Duration) -> Result<FeedResponse, NewsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.replies.get(url) {
                Some(Reply::Body(body)) => Ok(FeedResponse {
                    status: 200,
                    body: body.clone().into_bytes(),
                }),
                Some(Reply::Status(status)) => Ok(FeedResponse {
                    status: *status,
                    body: Vec::new(),
                }),
                Some(Reply::Hang) => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Err(NewsError::Timeout {
                        source_name: url.to_string(),
                    })
                }
                Some(Reply::Down) | None => Err(NewsError::Network {
                    source_name: url.to_string(),
                    message: "connection refused".to_string(),
                }),
            }
        }
    }

    fn rss(items: &[(&str, &str, &str)]) -> String {
        let items: String = items
            .iter()
            .map(|(title, link, date)| {
                format!(
                    "<item><title>{}</title><link>{}</link><pubDate>{}</pubDate></item>",
                    title, link, date
                )
            })
            .collect();
        format!(
            r#"<?xml version="1.0"?><rss version="2.0"><channel><title>T</title>{}</channel></rss>"#,
            items
        )
    }

    fn fetcher(sources: Vec<Source>, transport: Arc<MockTransport>) -> FeedFetcher {
        let registry = SourceRegistry::new();
        for source in sources {
            registry.register(source).unwrap();
        }
        FeedFetcher::new(
            Arc::new(registry),
            Arc::new(Cache::new()),
            transport,
            FetcherConfig {
                workers: 3,
                task_deadline: Duration::from_millis(200),
                request_timeout: Duration::from_millis(100),
            },
        )
    }

    #[tokio::test]
    async fn test_fetch_merges_sorts_and_reports() {
        let transport = Arc::new(MockTransport::new(vec![
            (
                "https://a.test/rss",
                Reply::Body(rss(&[
                    ("Older story from alpha source", "https://a.test/1", "Mon, 01 Jan 2024 08:00:00 GMT"),
                    ("Newest story from alpha source", "https://a.test/2", "Tue, 02 Jan 2024 12:00:00 GMT"),
                ])),
            ),
            (
                "https://b.test/rss",
                Reply::Body(rss(&[(
                    "Middle story from bravo source",
                    "https://b.test/1",
                    "Tue, 02 Jan 2024 09:00:00 GMT",
                )])),
            ),
            ("https://c.test/rss", Reply::Down),
            ("https://d.test/rss", Reply::Status(503)),
        ]));
        let fetcher = fetcher(
            vec![
                Source::new("A", "https://a.test/rss", Category::Crypto),
                Source::new("B", "https://b.test/rss", Category::Stocks),
                Source::new("C", "https://c.test/rss", Category::Crypto),
                Source::new("D", "https://d.test/rss", Category::Forex),
            ],
            transport,
        );

        let result = fetcher.fetch(&SourceSelection::Active, 10).await;
        let urls: Vec<_> = result.articles.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.test/2", "https://b.test/1", "https://a.test/1"]);
        assert_eq!(result.report.successful(), 2);
        assert_eq!(result.report.failed(), 2);
        assert!(matches!(
            result.report.outcome("D"),
            Some(TaskOutcome::Failed { message }) if message.contains("503")
        ));
        assert_eq!(result.articles[1].source, "B");
        assert_eq!(result.articles[1].category, Category::Stocks);
    }

    #[tokio::test]
    async fn test_second_fetch_is_served_from_cache() {
        let transport = Arc::new(MockTransport::new(vec![(
            "https://a.test/rss",
            Reply::Body(rss(&[("Cached story about markets", "https://a.test/1", "Mon, 01 Jan 2024 08:00:00 GMT")])),
        )]));
        let fetcher = fetcher(
            vec![Source::new("A", "https://a.test/rss", Category::Crypto)],
            transport.clone(),
        );

        fetcher.fetch(&SourceSelection::Active, 10).await;
        let second = fetcher.fetch(&SourceSelection::Active, 10).await;

        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.articles.len(), 1);
        assert_eq!(
            second.report.outcome("A"),
            Some(&TaskOutcome::Success { count: 1, cached: true })
        );
    }

    #[tokio::test]
    async fn test_slow_source_times_out() {
        let transport = Arc::new(MockTransport::new(vec![
            ("https://a.test/rss", Reply::Hang),
            (
                "https://b.test/rss",
                Reply::Body(rss(&[("Quick story about markets", "https://b.test/1", "Mon, 01 Jan 2024 08:00:00 GMT")])),
            ),
        ]));
        let fetcher = fetcher(
            vec![
                Source::new("A", "https://a.test/rss", Category::Crypto),
                Source::new("B", "https://b.test/rss", Category::Crypto),
            ],
            transport,
        );

        let result = fetcher.fetch(&SourceSelection::Active, 10).await;
        assert_eq!(result.articles.len(), 1);
        assert_eq!(result.report.timed_out(), 1);
        assert_eq!(result.report.outcome("A"), Some(&TaskOutcome::Timeout));
    }

    #[tokio::test]
    async fn test_max_entries_and_selection() {
        let transport = Arc::new(MockTransport::new(vec![(
            "https://a.test/rss",
            Reply::Body(rss(&[
                ("First story in the feed", "https://a.test/1", "Mon, 01 Jan 2024 08:00:00 GMT"),
                ("Second story in the feed", "https://a.test/2", "Mon, 01 Jan 2024 07:00:00 GMT"),
                ("Third story in the feed", "https://a.test/3", "Mon, 01 Jan 2024 06:00:00 GMT"),
            ])),
        )]));
        let fetcher = fetcher(
            vec![
                Source::new("A", "https://a.test/rss", Category::Crypto).with_max_entries(2),
                Source::new("B", "https://b.test/rss", Category::Stocks),
            ],
            transport,
        );

        let selection = SourceSelection::Names(vec!["a".to_string(), "missing".to_string()]);
        let sources = fetcher.resolve_sources(&selection);
        assert_eq!(sources.len(), 1);

        let result = fetcher.fetch(&selection, 10).await;
        assert_eq!(result.articles.len(), 2);

        let by_category = fetcher.resolve_sources(&SourceSelection::Categories(vec![Category::Stocks]));
        assert_eq!(by_category[0].name, "B");
    }

    #[tokio::test]
    async fn test_connectivity_does_not_populate_cache() {
        let transport = Arc::new(MockTransport::new(vec![
            (
                "https://a.test/rss",
                Reply::Body(rss(&[("Reachable story about markets", "https://a.test/1", "Mon, 01 Jan 2024 08:00:00 GMT")])),
            ),
            ("https://b.test/rss", Reply::Status(404)),
        ]));
        let fetcher = fetcher(
            vec![
                Source::new("A", "https://a.test/rss", Category::Crypto),
                Source::new("B", "https://b.test/rss", Category::Crypto),
            ],
            transport,
        );

        let report = fetcher.test_connectivity(&SourceSelection::Active).await;
        assert_eq!(report.successful, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.checks[0].entries, 1);
        assert_eq!(report.checks[1].status, Some(404));
        assert!(fetcher.cache.is_empty());
    }
}
