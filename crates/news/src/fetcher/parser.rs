//! Feed document parsing (RSS, Atom and JSON Feed via `feed-rs`).

use feed_rs::model::Entry;
use log::debug;

use crate::errors::NewsError;
use crate::models::{Article, Provenance, Source};

/// Parse a feed body into articles tagged with `source`.
///
/// Entries without a usable title or link are skipped; every other field is
/// optional.
pub fn parse_feed(source: &Source, body: &[u8]) -> Result<Vec<Article>, NewsError> {
    let feed = feed_rs::parser::parse(body).map_err(|e| NewsError::Parse {
        source_name: source.name.clone(),
        message: e.to_string(),
    })?;

    let feed_title = feed
        .title
        .as_ref()
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty());
    let language = feed.language.clone();

    let total = feed.entries.len();
    let articles: Vec<Article> = feed
        .entries
        .iter()
        .filter_map(|entry| entry_to_article(source, entry))
        .map(|mut article| {
            article.feed_title = feed_title.clone();
            if article.language.is_none() {
                article.language = language.clone();
            }
            article
        })
        .collect();

    if articles.len() < total {
        debug!(
            "Skipped {} unusable entries from '{}'",
            total - articles.len(),
            source.name
        );
    }
    Ok(articles)
}

fn entry_to_article(source: &Source, entry: &Entry) -> Option<Article> {
    let title = entry
        .title
        .as_ref()
        .map(|t| strip_html(&t.content))
        .filter(|t| !t.is_empty())?;

    let url = entry
        .links
        .first()
        .map(|l| l.href.trim().to_string())
        .filter(|href| !href.is_empty())
        .or_else(|| {
            let id = entry.id.trim();
            (id.starts_with("http://") || id.starts_with("https://")).then(|| id.to_string())
        })?;

    let mut article = Article::new(title, url, &source.name, source.category, Provenance::Feed);

    article.summary = entry
        .summary
        .as_ref()
        .map(|s| strip_html(&s.content))
        .filter(|s| !s.is_empty());
    article.published_at = entry.published.or(entry.updated);
    article.tags = entry
        .categories
        .iter()
        .map(|c| c.term.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    article.language = entry.language.clone();
    if !source.description.is_empty() {
        article.source_description = Some(source.description.clone());
    }

    Some(article)
}

/// Drop markup and collapse whitespace.
pub(crate) fn strip_html(input: &str) -> String {
    let mut text = String::with_capacity(input.len());
    let mut in_tag = false;
    for c in input.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                text.push(' ');
            }
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }

    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'");

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
