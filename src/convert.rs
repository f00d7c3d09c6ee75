//! Top-level entry points: feed in, PDFs out.
//!
//! One run loads the feed, resolves the article selection, and then for each
//! selected article generates HTML, prints it through a single shared browser
//! session and writes the PDF. The browser is launched lazily right before
//! the first article needs it, so input-data errors on that article surface
//! without a browser ever starting.
//!
//! With exactly one article selected (the default), any failure is returned
//! as `Err`. With several, per-article failures are recorded in
//! [`ArticleOutput::error`] and the run continues; only a browser that cannot
//! start, or every article failing, aborts the run.

use crate::config::RenderConfig;
use crate::error::{Article2PdfError, ArticleError};
use crate::feed::{Article, Feed};
use crate::output::{ArticleOutput, RunOutput, RunStats};
use crate::pipeline::html::{HtmlGenerator, TemplateHtmlGenerator};
use crate::pipeline::render::{ChromeBackend, PdfRenderer, RenderBackend};
use crate::pipeline::{input, naming, write};
use crate::progress::{RenderStage, StageReporter};
use chrono::NaiveDate;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Render the configured article selection to PDF.
///
/// This is the primary entry point for the library. Uses the built-in (or
/// configured) Tera template and headless Chromium.
///
/// # Errors
/// - input-data errors (missing/malformed feed, no articles, bad selection,
///   invalid record) before any browser is launched
/// - rendering errors (template, browser, print, write) afterwards
pub async fn render_articles(config: &RenderConfig) -> Result<RunOutput, Article2PdfError> {
    let generator = TemplateHtmlGenerator::load(config.template_path.as_deref())?;
    render_articles_with(config, &generator, &ChromeBackend).await
}

/// [`render_articles`] with a caller-supplied HTML generator and browser backend.
pub async fn render_articles_with<G, B>(
    config: &RenderConfig,
    generator: &G,
    backend: &B,
) -> Result<RunOutput, Article2PdfError>
where
    G: HtmlGenerator,
    B: RenderBackend,
{
    let total_start = Instant::now();
    info!("Starting run: {}", config.data_source);

    // ── Step 1: Load feed ────────────────────────────────────────────────
    let feed = input::load_feed(&config.data_source, config.download_timeout_secs).await?;

    // ── Step 2: Resolve selection ────────────────────────────────────────
    let selected = feed.select(&config.selection, &config.data_source)?;
    let single = selected.len() == 1;
    debug!("Selected {} of {} articles", selected.len(), feed.articles.len());

    if let Some(ref cb) = config.progress_callback {
        cb.on_feed_loaded(
            feed.articles.len(),
            selected.len(),
            feed.crawled_at.as_deref(),
        );
    }

    let date = config.effective_date();
    let mut session = Session::<B::Renderer>::default();
    let mut outputs = Vec::with_capacity(selected.len());
    let mut claimed: HashSet<PathBuf> = HashSet::new();
    let mut fatal: Option<Article2PdfError> = None;

    // ── Step 3: Render each article ──────────────────────────────────────
    for &(idx, article) in &selected {
        let article_num = idx + 1;
        if let Some(ref cb) = config.progress_callback {
            cb.on_article_start(article_num, article);
        }

        let stages = StageReporter::new(config.progress_callback.as_ref(), article_num);
        let mut out = ArticleOutput::new(article_num, article);
        let start = Instant::now();

        let result = render_one(
            config,
            generator,
            backend,
            &mut session,
            article,
            date,
            &claimed,
            &stages,
            &mut out,
        )
        .await;
        out.render_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(()) => {
                info!(
                    "Article {} → {} ({} bytes, {}ms)",
                    article_num,
                    out.output_path
                        .as_deref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default(),
                    out.bytes,
                    out.render_ms
                );
                if let Some(ref path) = out.output_path {
                    claimed.insert(path.clone());
                    if let Some(ref cb) = config.progress_callback {
                        cb.on_article_complete(article_num, path, out.bytes);
                    }
                }
            }
            Err(e) => {
                warn!("Article {} failed: {}", article_num, e);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_article_error(article_num, &e.to_string());
                }
                let browser_down = matches!(
                    e,
                    Article2PdfError::BrowserLaunch(_) | Article2PdfError::BrowserUnavailable(_)
                );
                if single || browser_down {
                    fatal = Some(e);
                    break;
                }
                out.error = Some(ArticleError::from_fatal(article_num, &e));
            }
        }
        outputs.push(out);
    }

    // ── Step 4: Close the browser on every path ──────────────────────────
    session.close().await;

    if let Some(e) = fatal {
        return Err(e);
    }

    // ── Step 5: Stats ────────────────────────────────────────────────────
    let rendered = outputs.iter().filter(|o| o.is_success()).count();
    let failed = outputs.len() - rendered;

    if rendered == 0 {
        let first_error = outputs
            .iter()
            .find_map(|o| o.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(Article2PdfError::AllArticlesFailed {
            total: outputs.len(),
            first_error,
        });
    }

    let stats = RunStats {
        total_articles: feed.articles.len(),
        selected: selected.len(),
        rendered,
        failed,
        total_bytes: outputs.iter().map(|o| o.bytes).sum(),
        launch_ms: session.launch_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Run complete: {}/{} articles, {}ms total",
        rendered, stats.selected, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(stats.selected, rendered);
    }

    Ok(RunOutput {
        crawled_at: feed.crawled_at.clone(),
        articles: outputs,
        stats,
    })
}

/// Render the first article of the feed at `data_source` into `output_dir`
/// with default settings, returning its output record.
pub async fn render_first_article(
    data_source: impl Into<String>,
    output_dir: impl Into<PathBuf>,
) -> Result<ArticleOutput, Article2PdfError> {
    let config = RenderConfig::builder()
        .data_source(data_source)
        .output_dir(output_dir)
        .build()?;
    let output = render_articles(&config).await?;
    output
        .articles
        .into_iter()
        .next()
        .ok_or_else(|| Article2PdfError::Internal("run produced no article output".into()))
}

/// Synchronous wrapper around [`render_articles`].
///
/// Creates a temporary tokio runtime internally.
pub fn render_articles_sync(config: &RenderConfig) -> Result<RunOutput, Article2PdfError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Article2PdfError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(render_articles(config))
}

/// Load and parse a feed without rendering anything.
///
/// Does not require a browser.
pub async fn inspect(
    data_source: impl AsRef<str>,
    download_timeout_secs: u64,
) -> Result<Feed, Article2PdfError> {
    input::load_feed(data_source.as_ref(), download_timeout_secs).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Lazily-started renderer shared by every article of a run.
struct Session<R> {
    renderer: Option<R>,
    launch_ms: u64,
}

impl<R> Default for Session<R> {
    fn default() -> Self {
        Self {
            renderer: None,
            launch_ms: 0,
        }
    }
}

impl<R: PdfRenderer> Session<R> {
    async fn renderer<B>(
        &mut self,
        backend: &B,
        config: &RenderConfig,
        stages: &StageReporter<'_>,
    ) -> Result<&R, Article2PdfError>
    where
        B: RenderBackend<Renderer = R>,
    {
        if self.renderer.is_none() {
            stages.report(RenderStage::LaunchBrowser);
            let start = Instant::now();
            self.renderer = Some(backend.launch(config).await?);
            self.launch_ms = start.elapsed().as_millis() as u64;
        }
        self.renderer
            .as_ref()
            .ok_or_else(|| Article2PdfError::Internal("renderer not started".into()))
    }

    async fn close(&mut self) {
        if let Some(renderer) = self.renderer.take() {
            renderer.close().await;
        }
    }
}

/// Validate, name, generate, print and write one article.
#[allow(clippy::too_many_arguments)]
async fn render_one<G, B>(
    config: &RenderConfig,
    generator: &G,
    backend: &B,
    session: &mut Session<B::Renderer>,
    article: &Article,
    date: NaiveDate,
    claimed: &HashSet<PathBuf>,
    stages: &StageReporter<'_>,
    out: &mut ArticleOutput,
) -> Result<(), Article2PdfError>
where
    G: HtmlGenerator,
    B: RenderBackend,
{
    let article_num = stages.article_num();
    article.validate(article_num, config.field_policy)?;

    let url = article.url().ok_or(Article2PdfError::MissingField {
        index: article_num,
        field: "url",
    })?;
    let stem = naming::derive_filename(url, article_num)?;
    let path = naming::unclaimed_path(
        naming::output_path(&config.output_dir, article.source_domain(), date, &stem),
        article_num,
        claimed,
    );
    debug!("Article {} → {}", article_num, path.display());
    out.output_path = Some(path.clone());

    stages.report(RenderStage::GenerateHtml);
    let html = generator.generate(article)?;
    out.html_len = html.chars().count();

    let renderer = session.renderer(backend, config, stages).await?;
    let bytes = renderer.render_pdf(&html, stages).await?;

    out.bytes = write::write_pdf_atomic(&path, bytes).await?;
    Ok(())
}
