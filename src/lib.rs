//! # article2pdf
//!
//! Render crawled article records to PDF through a headless Chromium.
//!
//! A crawler drops a JSON feed of articles (`{"crawledAt": …, "articles": [
//! {title, author, pubDate, source_domain, url, …}]}`). This crate turns a
//! selection of those records into printable PDFs, one per article, laid out
//! as `pdfs/<source_domain>/<YYYY-MM-DD>/<name>.pdf`.
//!
//! ## Pipeline Overview
//!
//! ```text
//! feed.json (path or URL)
//!  │
//!  ├─ 1. Input    read local file or download, parse, select articles
//!  ├─ 2. Validate required fields per FieldPolicy (before any browser starts)
//!  ├─ 3. HTML     Tera template → self-contained page
//!  ├─ 4. Browser  locate/launch Chromium once per run (chromiumoxide)
//!  ├─ 5. Print    load content, wait for fonts/images, print to PDF
//!  └─ 6. Output   atomic write, per-article stats
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use article2pdf::{render_articles, RenderConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RenderConfig::builder()
//!         .data_source("data/latest-raw.json")
//!         .output_dir("pdfs")
//!         .build()?;
//!     let output = render_articles(&config).await?;
//!     for article in output.rendered() {
//!         eprintln!("{:?}: {} bytes", article.output_path, article.bytes);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `article2pdf` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! ## Finding a browser
//!
//! The executable is resolved from, in order: the configured path,
//! `CHROME_PATH`, the download cache, well-known system install locations and
//! `PATH`. With `download_browser(true)` a pinned Chrome for Testing build is
//! fetched into the cache when nothing else is found.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod feed;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod template;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ArticleSelection, FieldPolicy, PaperFormat, PrintOptions, RenderConfig, RenderConfigBuilder,
    SettleStrategy,
};
pub use convert::{
    inspect, render_articles, render_articles_sync, render_articles_with, render_first_article,
};
pub use error::{Article2PdfError, ArticleError};
pub use feed::{Article, Feed};
pub use output::{ArticleOutput, RunOutput, RunStats};
pub use pipeline::html::{HtmlGenerator, TemplateHtmlGenerator};
pub use pipeline::render::{ChromeBackend, ChromeRenderer, PdfRenderer, RenderBackend};
pub use progress::{
    NoopProgressCallback, ProgressCallback, RenderProgressCallback, RenderStage, StageReporter,
};
