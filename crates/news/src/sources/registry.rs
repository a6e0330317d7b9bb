use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{debug, warn};
use reqwest::Url;

use super::catalog::default_sources;
use crate::errors::NewsError;
use crate::models::{Category, Source};

/// The set of known feed sources, in configured order.
///
/// Descriptors are fixed once registered; only the active flag changes at
/// runtime.
#[derive(Debug, Default)]
pub struct SourceRegistry {
    sources: RwLock<Vec<Source>>,
}

impl SourceRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry seeded with the built-in catalog.
    pub fn with_defaults() -> Self {
        Self {
            sources: RwLock::new(default_sources()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Source>> {
        self.sources.read().unwrap_or_else(|poisoned| {
            warn!("Source registry lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Source>> {
        self.sources.write().unwrap_or_else(|poisoned| {
            warn!("Source registry lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Add a source after validating its descriptor.
    pub fn register(&self, source: Source) -> Result<(), NewsError> {
        let name = source.name.trim();
        if name.is_empty() {
            return Err(NewsError::Config("Source name must not be empty".to_string()));
        }

        let url = Url::parse(source.url.trim())
            .map_err(|e| NewsError::Config(format!("Invalid URL for source '{}': {}", name, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(NewsError::Config(format!(
                "Source '{}' must use http or https, got '{}'",
                name,
                url.scheme()
            )));
        }

        if source.max_entries == 0 {
            return Err(NewsError::Config(format!(
                "Source '{}' must keep at least one entry",
                name
            )));
        }

        let mut sources = self.write();
        if sources.iter().any(|s| s.name.eq_ignore_ascii_case(name)) {
            return Err(NewsError::Config(format!("Duplicate source name '{}'", name)));
        }
        if sources.iter().any(|s| s.url.trim() == source.url.trim()) {
            return Err(NewsError::Config(format!(
                "Duplicate source URL '{}'",
                source.url
            )));
        }

        debug!("Registered feed source '{}' ({})", name, source.category);
        sources.push(Source {
            name: name.to_string(),
            url: source.url.trim().to_string(),
            ..source
        });
        Ok(())
    }

    /// Snapshot of every source.
    pub fn all(&self) -> Vec<Source> {
        self.read().clone()
    }

    /// Sources filtered by category and/or active flag.
    pub fn query(&self, category: Option<Category>, active_only: bool) -> Vec<Source> {
        self.read()
            .iter()
            .filter(|s| category.map_or(true, |c| s.category == c))
            .filter(|s| !active_only || s.active)
            .cloned()
            .collect()
    }

    pub fn by_url(&self, url: &str) -> Option<Source> {
        let url = url.trim();
        self.read().iter().find(|s| s.url == url).cloned()
    }

    /// Case-insensitive lookup by name.
    pub fn by_name(&self, name: &str) -> Option<Source> {
        let name = name.trim();
        self.read()
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    /// Toggle a source. Returns `false` if no source has that name.
    ///
    /// Aggregated results already cached still include the source until
    /// they expire; `NewsAggregator::set_source_active` also drops them.
    pub fn set_active(&self, name: &str, active: bool) -> bool {
        let name = name.trim();
        let mut sources = self.write();
        match sources.iter_mut().find(|s| s.name.eq_ignore_ascii_case(name)) {
            Some(source) => {
                source.active = active;
                debug!("Source '{}' active = {}", source.name, active);
                true
            }
            None => {
                warn!("Cannot toggle unknown source '{}'", name);
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SourceRegistry {
        let registry = SourceRegistry::new();
        registry
            .register(Source::new("Alpha", "https://alpha.test/rss", Category::Crypto))
            .unwrap();
        registry
            .register(Source::new("Beta", "https://beta.test/rss", Category::Stocks).inactive())
            .unwrap();
        registry
    }

    #[test]
    fn test_register_rejects_invalid_descriptors() {
        let registry = registry();

        let cases = vec![
            Source::new("  ", "https://x.test/rss", Category::General),
            Source::new("Gamma", "not a url", Category::General),
            Source::new("Gamma", "ftp://x.test/rss", Category::General),
            Source::new("Gamma", "https://x.test/rss", Category::General).with_max_entries(0),
            Source::new("alpha", "https://x.test/rss", Category::General),
            Source::new("Gamma", "https://alpha.test/rss", Category::General),
        ];
        for source in cases {
            let result = registry.register(source.clone());
            assert!(
                matches!(result, Err(NewsError::Config(_))),
                "accepted {:?}",
                source
            );
        }
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_query_filters() {
        let registry = registry();
        assert_eq!(registry.query(None, false).len(), 2);
        assert_eq!(registry.query(None, true).len(), 1);
        assert_eq!(registry.query(Some(Category::Stocks), false).len(), 1);
        assert!(registry.query(Some(Category::Stocks), true).is_empty());
        assert!(registry.query(Some(Category::Forex), false).is_empty());
    }

    #[test]
    fn test_lookup_and_toggle() {
        let registry = registry();
        assert_eq!(registry.by_name("BETA").unwrap().name, "Beta");
        assert_eq!(registry.by_url("https://alpha.test/rss").unwrap().name, "Alpha");
        assert!(registry.by_url("https://missing.test").is_none());

        assert!(registry.set_active("beta", true));
        assert!(registry.by_name("Beta").unwrap().active);
        assert!(!registry.set_active("missing", true));
    }

    #[test]
    fn test_with_defaults_is_populated() {
        let registry = SourceRegistry::with_defaults();
        assert!(!registry.is_empty());
        assert_eq!(registry.query(None, true).len(), registry.len());
    }
}
