use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use log::{debug, info, warn};
use pulsefeed_market_data::cache::prefixes;
use pulsefeed_market_data::{Cache, NewsItem};
use serde::{Deserialize, Serialize};

use super::source::NewsSource;
use crate::dedup::dedup_articles;
use crate::errors::NewsError;
use crate::fetcher::{FeedFetcher, SourceSelection};
use crate::models::{sort_newest_first, Article, Category, Provenance};
use crate::pool::{run_bounded, BatchReport, Fetched, DEFAULT_TASK_DEADLINE, DEFAULT_WORKERS};

/// Default number of articles returned.
pub const DEFAULT_LIMIT: usize = 50;

type IntakeTask<'a> = BoxFuture<'a, Result<Fetched<Article>, NewsError>>;

/// What to aggregate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsRequest {
    /// Restrict feeds to these categories; empty means all
    pub categories: Vec<Category>,
    /// Restrict feeds to these source names; takes precedence over categories
    pub sources: Vec<String>,
    pub limit: usize,
    pub include_feeds: bool,
    pub include_auxiliary: bool,
}

impl Default for NewsRequest {
    fn default() -> Self {
        Self {
            categories: Vec::new(),
            sources: Vec::new(),
            limit: DEFAULT_LIMIT,
            include_feeds: true,
            include_auxiliary: true,
        }
    }
}

impl NewsRequest {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            ..Default::default()
        }
    }

    pub fn with_categories(mut self, categories: Vec<Category>) -> Self {
        self.categories = categories;
        self
    }

    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.sources = sources;
        self
    }

    pub fn feeds_only(mut self) -> Self {
        self.include_auxiliary = false;
        self
    }

    pub fn auxiliary_only(mut self) -> Self {
        self.include_feeds = false;
        self
    }

    fn selection(&self) -> SourceSelection {
        if !self.sources.is_empty() {
            SourceSelection::Names(self.sources.clone())
        } else if !self.categories.is_empty() {
            SourceSelection::Categories(self.categories.clone())
        } else {
            SourceSelection::Active
        }
    }

    fn cache_params(&self) -> Vec<(&'static str, String)> {
        let mut categories: Vec<_> = self.categories.iter().map(|c| c.as_str()).collect();
        categories.sort_unstable();
        categories.dedup();

        let mut sources: Vec<_> = self.sources.iter().map(|s| s.trim().to_lowercase()).collect();
        sources.sort_unstable();
        sources.dedup();

        vec![
            ("categories", categories.join(",")),
            ("sources", sources.join(",")),
            ("limit", self.limit.to_string()),
            ("feeds", self.include_feeds.to_string()),
            ("auxiliary", self.include_auxiliary.to_string()),
        ]
    }
}

#[derive(Clone, Debug)]
pub struct AggregatorConfig {
    pub workers: usize,
    pub task_deadline: Duration,
    /// Lifetime of an aggregated result; `None` uses the adaptive news TTL
    pub cache_ttl: Option<Duration>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            task_deadline: DEFAULT_TASK_DEADLINE,
            cache_ttl: None,
        }
    }
}

/// Articles plus how each intake task fared.
#[derive(Debug, Default)]
pub struct NewsBatch {
    pub articles: Vec<Article>,
    pub report: BatchReport,
    /// Served whole from the aggregate cache; the report is then empty
    pub cached: bool,
}

/// Merges feed articles with auxiliary sources into one deduplicated,
/// recency-ordered list.
///
/// Intake order is fixed: feed sources in configured order, then auxiliary
/// sources in registration order. Deduplication keeps the first item seen
/// in that order, before sorting.
pub struct NewsAggregator {
    fetcher: Arc<FeedFetcher>,
    cache: Arc<Cache>,
    sources: Vec<Arc<dyn NewsSource>>,
    config: AggregatorConfig,
}

impl NewsAggregator {
    pub fn new(fetcher: Arc<FeedFetcher>, cache: Arc<Cache>, config: AggregatorConfig) -> Self {
        Self {
            fetcher,
            cache,
            sources: Vec::new(),
            config,
        }
    }

    pub fn add_source(&mut self, source: Arc<dyn NewsSource>) {
        debug!("Added auxiliary news source '{}'", source.name());
        self.sources.push(source);
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    pub fn fetcher(&self) -> &Arc<FeedFetcher> {
        &self.fetcher
    }

    /// Toggle a feed source and drop every aggregated result, so the change
    /// shows up on the next call. Returns `false` for an unknown source.
    pub fn set_source_active(&self, name: &str, active: bool) -> bool {
        if !self.fetcher.registry().set_active(name, active) {
            return false;
        }
        let dropped = self.cache.invalidate(Some(&format!("{}:", prefixes::NEWS)));
        debug!("Dropped {} aggregated results after toggling '{}'", dropped, name);
        true
    }

    pub async fn get_recent(&self, request: &NewsRequest) -> Vec<Article> {
        self.get_recent_with_report(request).await.articles
    }

    pub async fn get_recent_with_report(&self, request: &NewsRequest) -> NewsBatch {
        if request.limit == 0 {
            return NewsBatch::default();
        }

        let owned = request.cache_params();
        let params: Vec<(&str, &str)> = owned.iter().map(|(k, v)| (*k, v.as_str())).collect();
        if let Some(articles) = self.cache.get_json::<Vec<Article>>(prefixes::NEWS, &params) {
            debug!("Serving {} aggregated articles from cache", articles.len());
            return NewsBatch {
                articles,
                report: BatchReport::default(),
                cached: true,
            };
        }

        let tasks = self.intake_tasks(request);
        if tasks.is_empty() {
            warn!("News request selected no sources");
            return NewsBatch::default();
        }

        let (intake, report) =
            run_bounded(tasks, self.config.workers, self.config.task_deadline).await;

        let intake: Vec<Article> = intake.into_iter().filter_map(normalize).collect();
        let mut articles = dedup_articles(intake);
        sort_newest_first(&mut articles);
        articles.truncate(request.limit);

        info!(
            "Aggregated {} articles ({} sources ok, {} failed)",
            articles.len(),
            report.successful(),
            report.failed()
        );

        if report.successful() > 0 {
            match self.config.cache_ttl {
                Some(ttl) => self.cache.set_json_with_ttl(prefixes::NEWS, &articles, &params, ttl),
                None => self.cache.set_json(prefixes::NEWS, &articles, &params),
            };
        }

        NewsBatch {
            articles,
            report,
            cached: false,
        }
    }

    fn intake_tasks(&self, request: &NewsRequest) -> Vec<(String, IntakeTask<'_>)> {
        let mut tasks: Vec<(String, IntakeTask<'_>)> = Vec::new();

        if request.include_feeds {
            for source in self.fetcher.resolve_sources(&request.selection()) {
                let name = source.name.clone();
                tasks.push((name, self.fetcher.fetch_source(source).boxed()));
            }
        }

        if request.include_auxiliary {
            let limit = request.limit;
            for source in &self.sources {
                let source = source.clone();
                let name = source.name().to_string();
                let task = async move {
                    let items = source.fetch_recent(limit).await?;
                    let source_name = source.name();
                    Ok::<_, NewsError>(Fetched::fresh(
                        items
                            .into_iter()
                            .map(|item| from_news_item(source_name, item))
                            .collect(),
                    ))
                }
                .boxed();
                tasks.push((name, task));
            }
        }

        tasks
    }
}

fn from_news_item(source_name: &str, item: NewsItem) -> Article {
    let publisher = if item.source.trim().is_empty() {
        source_name.to_string()
    } else {
        item.source
    };
    let provider = if item.provider.trim().is_empty() {
        source_name.to_string()
    } else {
        item.provider
    };

    let mut article = Article::new(
        item.title,
        item.url,
        publisher,
        Category::General,
        Provenance::Provider(provider),
    );
    article.summary = item.summary;
    article.published_at = item.published_at;
    article.tags = item.tags;
    article.language = item.language;
    article
}

/// Trim title and url; drop items missing either.
fn normalize(mut article: Article) -> Option<Article> {
    article.title = article.title.trim().to_string();
    article.url = article.url.trim().to_string();
    if article.title.is_empty() || article.url.is_empty() {
        return None;
    }
    article.summary = article
        .summary
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    Some(article)
}
