//! Result types returned by a render run.

use crate::error::{Article2PdfError, ArticleError};
use crate::feed::Article;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of rendering one article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleOutput {
    /// 1-indexed position in the feed.
    pub article_num: usize,
    pub title: Option<String>,
    pub source_domain: String,
    pub url: Option<String>,
    /// Final PDF path. `None` when the article failed before a path was known.
    pub output_path: Option<PathBuf>,
    /// Size of the PDF on disk; 0 on failure.
    pub bytes: u64,
    /// Characters of generated HTML.
    pub html_len: usize,
    pub render_ms: u64,
    pub error: Option<ArticleError>,
}

impl ArticleOutput {
    pub(crate) fn new(article_num: usize, article: &Article) -> Self {
        Self {
            article_num,
            title: article.title().map(str::to_string),
            source_domain: article.source_domain().to_string(),
            url: article.url().map(str::to_string),
            output_path: None,
            bytes: 0,
            html_len: 0,
            render_ms: 0,
            error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate timing and counts for a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Articles in the feed.
    pub total_articles: usize,
    /// Articles the selection picked.
    pub selected: usize,
    pub rendered: usize,
    pub failed: usize,
    /// Bytes written across all PDFs.
    pub total_bytes: u64,
    /// Time spent starting the browser.
    pub launch_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutput {
    pub crawled_at: Option<String>,
    pub articles: Vec<ArticleOutput>,
    pub stats: RunStats,
}

impl RunOutput {
    /// Successful articles, in feed order.
    pub fn rendered(&self) -> impl Iterator<Item = &ArticleOutput> {
        self.articles.iter().filter(|a| a.is_success())
    }

    /// Treat any failed article as an error.
    pub fn into_result(self) -> Result<Self, Article2PdfError> {
        if self.stats.failed > 0 {
            return Err(Article2PdfError::PartialFailure {
                success: self.stats.rendered,
                failed: self.stats.failed,
                total: self.stats.selected,
            });
        }
        Ok(self)
    }
}
