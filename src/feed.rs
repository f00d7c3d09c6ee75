//! Crawled article feed: the JSON document produced by the crawler.
//!
//! ```json
//! {
//!   "crawledAt": "2024-05-01T08:00:00.000Z",
//!   "articles": [
//!     { "title": "…", "author": "…", "pubDate": "…",
//!       "source_domain": "example.com", "url": "https://example.com/2024/report.html" }
//!   ]
//! }
//! ```
//!
//! Fields beyond the five known ones (`content`, `summary`, …) are kept in
//! [`Article::extra`] and handed to the HTML template untouched.

use crate::config::{ArticleSelection, FieldPolicy};
use crate::error::Article2PdfError;
use serde::{Deserialize, Serialize};

/// Directory name used when an article carries no `source_domain`.
pub const UNKNOWN_DOMAIN: &str = "unknown";

/// The top-level feed document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feed {
    /// When the crawler produced this file.
    #[serde(rename = "crawledAt", default)]
    pub crawled_at: Option<String>,

    pub articles: Vec<Article>,
}

/// One crawled news item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Article {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub author: Option<String>,

    #[serde(rename = "pubDate", default)]
    pub pub_date: Option<String>,

    #[serde(default)]
    pub source_domain: Option<String>,

    #[serde(default)]
    pub url: Option<String>,

    /// Every other field of the record.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Feed {
    /// Parse a feed from raw JSON bytes.
    ///
    /// `source_name` only labels errors.
    pub fn from_slice(bytes: &[u8], source_name: &str) -> Result<Self, Article2PdfError> {
        serde_json::from_slice(bytes).map_err(|e| Article2PdfError::MalformedData {
            source_name: source_name.to_string(),
            source: e,
        })
    }

    /// Resolve `selection` against this feed.
    ///
    /// Returns `(0-based index, article)` pairs in feed order.
    ///
    /// # Errors
    /// - [`Article2PdfError::NoArticles`] when the feed is empty
    /// - [`Article2PdfError::SelectionOutOfRange`] when nothing matched
    pub fn select(
        &self,
        selection: &ArticleSelection,
        source_name: &str,
    ) -> Result<Vec<(usize, &Article)>, Article2PdfError> {
        if self.articles.is_empty() {
            return Err(Article2PdfError::NoArticles {
                source_name: source_name.to_string(),
            });
        }

        let indices = selection.to_indices(self.articles.len());
        if indices.is_empty() {
            return Err(Article2PdfError::SelectionOutOfRange {
                index: selection.first_requested(),
                total: self.articles.len(),
            });
        }

        Ok(indices.into_iter().map(|i| (i, &self.articles[i])).collect())
    }
}

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl Article {
    pub fn title(&self) -> Option<&str> {
        non_empty(&self.title)
    }

    pub fn author(&self) -> Option<&str> {
        non_empty(&self.author)
    }

    pub fn pub_date(&self) -> Option<&str> {
        non_empty(&self.pub_date)
    }

    pub fn url(&self) -> Option<&str> {
        non_empty(&self.url)
    }

    /// `source_domain`, or [`UNKNOWN_DOMAIN`] when absent or blank.
    pub fn source_domain(&self) -> &str {
        non_empty(&self.source_domain).unwrap_or(UNKNOWN_DOMAIN)
    }

    /// Check field presence under `policy`.
    ///
    /// `number` is the 1-indexed position in the feed, used in errors.
    pub fn validate(&self, number: usize, policy: FieldPolicy) -> Result<(), Article2PdfError> {
        let missing = |field: &'static str| Article2PdfError::MissingField {
            index: number,
            field,
        };

        if self.title().is_none() {
            return Err(missing("title"));
        }
        if self.url().is_none() {
            return Err(missing("url"));
        }

        if policy == FieldPolicy::Strict {
            if self.author().is_none() {
                return Err(missing("author"));
            }
            if self.pub_date().is_none() {
                return Err(missing("pubDate"));
            }
            if non_empty(&self.source_domain).is_none() {
                return Err(missing("source_domain"));
            }
        }

        Ok(())
    }
}
