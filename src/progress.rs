//! Progress-callback trait for per-article render events.
//!
//! Inject an [`Arc<dyn RenderProgressCallback>`] via
//! [`crate::config::RenderConfigBuilder::progress_callback`] to receive
//! events as the run loads the feed and walks each article through the
//! render stages.
//!
//! # Example
//!
//! ```rust
//! use article2pdf::{RenderConfig, RenderProgressCallback, RenderStage};
//! use std::sync::Arc;
//!
//! struct StageLogger;
//!
//! impl RenderProgressCallback for StageLogger {
//!     fn on_stage(&self, article_num: usize, stage: RenderStage) {
//!         eprintln!("article {article_num}: {}", stage.label());
//!     }
//! }
//!
//! let config = RenderConfig::builder()
//!     .progress_callback(Arc::new(StageLogger) as Arc<dyn RenderProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::feed::Article;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// One step of rendering a single article.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStage {
    GenerateHtml,
    /// Emitted once per run, before the first article reaches the browser.
    LaunchBrowser,
    LoadContent,
    Settle,
    PrintPdf,
}

impl RenderStage {
    /// Stages in execution order.
    pub const ALL: [RenderStage; 5] = [
        RenderStage::GenerateHtml,
        RenderStage::LaunchBrowser,
        RenderStage::LoadContent,
        RenderStage::Settle,
        RenderStage::PrintPdf,
    ];

    /// 1-indexed position, for `[n/5]` style output.
    pub fn number(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(0) + 1
    }

    pub fn label(self) -> &'static str {
        match self {
            RenderStage::LaunchBrowser => "Launching browser",
            RenderStage::GenerateHtml => "Generating HTML",
            RenderStage::LoadContent => "Loading HTML into the page",
            RenderStage::Settle => "Waiting for resources",
            RenderStage::PrintPdf => "Printing PDF",
        }
    }
}

/// Called by the render pipeline as it processes the feed.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Articles are processed sequentially, so events for
/// one article never interleave with another.
pub trait RenderProgressCallback: Send + Sync {
    /// Called once after the feed parsed and before any rendering.
    ///
    /// # Arguments
    /// * `total_articles` — articles in the feed
    /// * `selected`       — articles that will be rendered
    /// * `crawled_at`     — the feed's crawl timestamp, if present
    fn on_feed_loaded(&self, total_articles: usize, selected: usize, crawled_at: Option<&str>) {
        let _ = (total_articles, selected, crawled_at);
    }

    /// Called before the first stage of an article.
    ///
    /// `article_num` is 1-indexed within the feed.
    fn on_article_start(&self, article_num: usize, article: &Article) {
        let _ = (article_num, article);
    }

    /// Called as each stage begins.
    fn on_stage(&self, article_num: usize, stage: RenderStage) {
        let _ = (article_num, stage);
    }

    /// Called after the PDF is on disk.
    ///
    /// # Arguments
    /// * `path`  — final PDF path
    /// * `bytes` — size of the file on disk
    fn on_article_complete(&self, article_num: usize, path: &Path, bytes: u64) {
        let _ = (article_num, path, bytes);
    }

    /// Called when an article fails.
    fn on_article_error(&self, article_num: usize, error: &str) {
        let _ = (article_num, error);
    }

    /// Called once after every selected article has been attempted.
    fn on_run_complete(&self, selected: usize, success_count: usize) {
        let _ = (selected, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl RenderProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::RenderConfig`].
pub type ProgressCallback = Arc<dyn RenderProgressCallback>;

/// Forwards stage events for one article to the configured callback.
#[derive(Clone, Copy)]
pub struct StageReporter<'a> {
    callback: Option<&'a ProgressCallback>,
    article_num: usize,
}

impl<'a> StageReporter<'a> {
    pub fn new(callback: Option<&'a ProgressCallback>, article_num: usize) -> Self {
        Self {
            callback,
            article_num,
        }
    }

    /// Reporter that drops every event.
    pub fn silent() -> Self {
        Self::new(None, 0)
    }

    pub fn article_num(&self) -> usize {
        self.article_num
    }

    pub fn report(&self, stage: RenderStage) {
        debug!(
            "Article {}: [{}/{}] {}",
            self.article_num,
            stage.number(),
            RenderStage::ALL.len(),
            stage.label()
        );
        if let Some(cb) = self.callback {
            cb.on_stage(self.article_num, stage);
        }
    }
}
