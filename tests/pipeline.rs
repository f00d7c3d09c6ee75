//! Integration tests for the render run, using an in-process fake browser.
//!
//! The fake backend returns a small PDF-shaped buffer for every page and can
//! be told to fail on launch or on pages whose HTML contains a marker. This
//! exercises feed loading, selection, validation, naming, HTML generation,
//! browser lifecycle and atomic output without a real Chromium.

use article2pdf::{
    render_articles_with, Article2PdfError, ArticleError, ArticleSelection, FieldPolicy,
    PdfRenderer, RenderBackend, RenderConfig, RenderProgressCallback, RenderStage,
    StageReporter, TemplateHtmlGenerator,
};
use chrono::NaiveDate;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// ── Fake browser ─────────────────────────────────────────────────────────────

const FAIL_MARKER: &str = "FAIL-ME";

#[derive(Clone, Default)]
struct FakeBackend {
    launches: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
    pages: Arc<AtomicUsize>,
    fail_launch: bool,
}

struct FakeRenderer {
    closes: Arc<AtomicUsize>,
    pages: Arc<AtomicUsize>,
}

impl PdfRenderer for FakeRenderer {
    async fn render_pdf(
        &self,
        html: &str,
        stages: &StageReporter<'_>,
    ) -> Result<Vec<u8>, Article2PdfError> {
        self.pages.fetch_add(1, Ordering::SeqCst);
        stages.report(RenderStage::LoadContent);
        stages.report(RenderStage::Settle);
        stages.report(RenderStage::PrintPdf);
        if html.contains(FAIL_MARKER) {
            return Err(Article2PdfError::PdfRender("printToPDF failed".into()));
        }
        Ok(format!("%PDF-1.7\n% {} chars of html\n%%EOF\n", html.len()).into_bytes())
    }

    async fn close(self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

impl RenderBackend for FakeBackend {
    type Renderer = FakeRenderer;

    async fn launch(&self, _config: &RenderConfig) -> Result<FakeRenderer, Article2PdfError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        if self.fail_launch {
            return Err(Article2PdfError::BrowserLaunch("no usable display".into()));
        }
        Ok(FakeRenderer {
            closes: self.closes.clone(),
            pages: self.pages.clone(),
        })
    }
}

impl FakeBackend {
    fn failing_launch() -> Self {
        Self {
            fail_launch: true,
            ..Default::default()
        }
    }

    fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

// ── Test helpers ─────────────────────────────────────────────────────────────

fn render_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
}

fn article(title: &str, url: &str) -> serde_json::Value {
    json!({
        "title": title,
        "author": "Jane Doe",
        "pubDate": "2024-04-30",
        "source_domain": "example.com",
        "url": url,
    })
}

/// Write `feed` to `<tmp>/latest-raw.json` and return a config pointing at it.
fn setup(feed: &serde_json::Value) -> (TempDir, RenderConfig) {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("latest-raw.json");
    std::fs::write(&data, serde_json::to_vec(feed).unwrap()).unwrap();

    let config = RenderConfig::builder()
        .data_source(data.to_string_lossy())
        .output_dir(dir.path().join("pdfs"))
        .render_date(render_date())
        .build()
        .unwrap();
    (dir, config)
}

fn pdf_path(dir: &TempDir, domain: &str, stem: &str) -> PathBuf {
    dir.path()
        .join("pdfs")
        .join(domain)
        .join("2024-05-01")
        .join(format!("{stem}.pdf"))
}

fn count_files(root: &Path) -> usize {
    if !root.exists() {
        return 0;
    }
    let mut n = 0;
    for entry in std::fs::read_dir(root).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            n += count_files(&path);
        } else {
            n += 1;
        }
    }
    n
}

async fn run(
    config: &RenderConfig,
    backend: &FakeBackend,
) -> Result<article2pdf::RunOutput, Article2PdfError> {
    let generator = TemplateHtmlGenerator::new().unwrap();
    render_articles_with(config, &generator, backend).await
}

// ── Single-article runs ──────────────────────────────────────────────────────

#[tokio::test]
async fn first_article_is_written_under_domain_and_date() {
    let feed = json!({
        "crawledAt": "2024-05-01T08:00:00.000Z",
        "articles": [
            article("Quarterly report", "https://example.com/2024/report.html"),
            article("Second", "https://example.com/2024/second"),
        ]
    });
    let (dir, config) = setup(&feed);
    let backend = FakeBackend::default();

    let output = run(&config, &backend).await.unwrap();

    let expected = pdf_path(&dir, "example.com", "report_html");
    assert!(expected.exists(), "missing {}", expected.display());
    assert_eq!(output.articles.len(), 1);

    let a = &output.articles[0];
    assert_eq!(a.article_num, 1);
    assert_eq!(a.output_path.as_deref(), Some(expected.as_path()));
    assert_eq!(a.bytes, std::fs::metadata(&expected).unwrap().len());
    assert!(a.html_len > 0);
    assert!(std::fs::read(&expected).unwrap().starts_with(b"%PDF"));

    assert_eq!(output.crawled_at.as_deref(), Some("2024-05-01T08:00:00.000Z"));
    assert_eq!(output.stats.total_articles, 2);
    assert_eq!(output.stats.rendered, 1);
    assert_eq!(backend.launches(), 1);
    assert_eq!(backend.closes(), 1);
}

#[tokio::test]
async fn render_failure_leaves_no_file_and_closes_browser() {
    let feed = json!({
        "articles": [article(FAIL_MARKER, "https://example.com/2024/report.html")]
    });
    let (dir, config) = setup(&feed);
    let backend = FakeBackend::default();

    let err = run(&config, &backend).await.unwrap_err();

    assert!(matches!(err, Article2PdfError::PdfRender(_)), "got {err:?}");
    assert!(!err.is_input_error());
    assert!(!pdf_path(&dir, "example.com", "report_html").exists());
    assert_eq!(count_files(&dir.path().join("pdfs")), 0);
    assert_eq!(backend.launches(), 1);
    assert_eq!(backend.closes(), 1);
}

#[tokio::test]
async fn empty_article_list_fails_before_launch() {
    let (_dir, config) = setup(&json!({ "crawledAt": "x", "articles": [] }));
    let backend = FakeBackend::default();

    let err = run(&config, &backend).await.unwrap_err();

    assert!(matches!(err, Article2PdfError::NoArticles { .. }));
    assert!(err.is_input_error());
    assert_eq!(backend.launches(), 0);
}

#[tokio::test]
async fn malformed_json_fails_before_launch() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("latest-raw.json");
    std::fs::write(&data, b"{ \"articles\": [ { \"title\": ").unwrap();
    let config = RenderConfig::builder()
        .data_source(data.to_string_lossy())
        .output_dir(dir.path().join("pdfs"))
        .build()
        .unwrap();
    let backend = FakeBackend::default();

    let err = run(&config, &backend).await.unwrap_err();

    assert!(matches!(err, Article2PdfError::MalformedData { .. }));
    assert_eq!(backend.launches(), 0);
}

#[tokio::test]
async fn missing_data_file_is_input_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = RenderConfig::builder()
        .data_source(dir.path().join("nope.json").to_string_lossy())
        .output_dir(dir.path().join("pdfs"))
        .build()
        .unwrap();
    let backend = FakeBackend::default();

    let err = run(&config, &backend).await.unwrap_err();

    assert!(matches!(err, Article2PdfError::DataFileNotFound { .. }));
    assert_eq!(backend.launches(), 0);
}

#[tokio::test]
async fn missing_title_fails_before_launch() {
    let feed = json!({
        "articles": [{ "url": "https://example.com/a", "source_domain": "example.com" }]
    });
    let (_dir, config) = setup(&feed);
    let backend = FakeBackend::default();

    let err = run(&config, &backend).await.unwrap_err();

    assert!(matches!(
        err,
        Article2PdfError::MissingField {
            index: 1,
            field: "title"
        }
    ));
    assert_eq!(backend.launches(), 0);
}

#[tokio::test]
async fn lenient_policy_files_domainless_article_under_unknown() {
    let feed = json!({
        "articles": [{ "title": "No domain", "url": "https://example.org/posts/" }]
    });
    let (dir, config) = setup(&feed);
    let backend = FakeBackend::default();

    run(&config, &backend).await.unwrap();

    assert!(pdf_path(&dir, "unknown", "page").exists());
}

#[tokio::test]
async fn strict_policy_requires_every_field() {
    let feed = json!({
        "articles": [{
            "title": "No author",
            "pubDate": "2024-04-30",
            "source_domain": "example.com",
            "url": "https://example.com/a"
        }]
    });
    let (_dir, mut config) = setup(&feed);
    config.field_policy = FieldPolicy::Strict;
    let backend = FakeBackend::default();

    let err = run(&config, &backend).await.unwrap_err();

    assert!(matches!(
        err,
        Article2PdfError::MissingField {
            field: "author",
            ..
        }
    ));
    assert_eq!(backend.launches(), 0);
}

#[tokio::test]
async fn selection_beyond_feed_is_out_of_range() {
    let feed = json!({ "articles": [article("Only", "https://example.com/only")] });
    let (_dir, mut config) = setup(&feed);
    config.selection = ArticleSelection::Single(4);
    let backend = FakeBackend::default();

    let err = run(&config, &backend).await.unwrap_err();

    assert!(matches!(
        err,
        Article2PdfError::SelectionOutOfRange { index: 4, total: 1 }
    ));
}

#[tokio::test]
async fn launch_failure_is_fatal_and_writes_nothing() {
    let feed = json!({
        "articles": [
            article("One", "https://example.com/one"),
            article("Two", "https://example.com/two"),
        ]
    });
    let (dir, mut config) = setup(&feed);
    config.selection = ArticleSelection::All;
    let backend = FakeBackend::failing_launch();

    let err = run(&config, &backend).await.unwrap_err();

    assert!(matches!(err, Article2PdfError::BrowserLaunch(_)));
    assert_eq!(backend.launches(), 1, "no relaunch per article");
    assert_eq!(backend.closes(), 0);
    assert_eq!(count_files(&dir.path().join("pdfs")), 0);
}

#[tokio::test]
async fn existing_pdf_is_replaced() {
    let feed = json!({ "articles": [article("One", "https://example.com/one")] });
    let (dir, config) = setup(&feed);
    let target = pdf_path(&dir, "example.com", "one");
    std::fs::create_dir_all(target.parent().unwrap()).unwrap();
    std::fs::write(&target, b"stale").unwrap();

    run(&config, &FakeBackend::default()).await.unwrap();

    assert!(std::fs::read(&target).unwrap().starts_with(b"%PDF"));
}

// ── Multi-article runs ───────────────────────────────────────────────────────

#[tokio::test]
async fn batch_records_per_article_failures_and_shares_one_browser() {
    let feed = json!({
        "articles": [
            article("One", "https://example.com/one"),
            article(FAIL_MARKER, "https://example.com/two"),
            { "url": "https://example.com/three" },
            article("Four", "https://example.com/four.html"),
        ]
    });
    let (dir, mut config) = setup(&feed);
    config.selection = ArticleSelection::All;
    let backend = FakeBackend::default();

    let output = run(&config, &backend).await.unwrap();

    assert_eq!(output.stats.selected, 4);
    assert_eq!(output.stats.rendered, 2);
    assert_eq!(output.stats.failed, 2);
    assert!(matches!(
        output.articles[1].error,
        Some(ArticleError::Render { index: 2, .. })
    ));
    assert!(matches!(
        output.articles[2].error,
        Some(ArticleError::Invalid { index: 3, .. })
    ));
    assert!(pdf_path(&dir, "example.com", "one").exists());
    assert!(!pdf_path(&dir, "example.com", "two").exists());
    assert!(pdf_path(&dir, "example.com", "four_html").exists());

    assert_eq!(backend.launches(), 1);
    assert_eq!(backend.closes(), 1);
    assert!(output.clone().into_result().is_err());
}

#[tokio::test]
async fn batch_articles_sharing_a_filename_each_get_their_own_pdf() {
    let feed = json!({
        "articles": [
            article("Front", "https://example.com/news/1/"),
            article("Sports", "https://example.com/news/2/"),
            article("Weather", "https://example.com/news/3/"),
        ]
    });
    let (dir, mut config) = setup(&feed);
    config.selection = ArticleSelection::All;
    let backend = FakeBackend::default();

    let output = run(&config, &backend).await.unwrap();

    assert_eq!(output.stats.rendered, 3);
    assert_eq!(count_files(&dir.path().join("pdfs")), output.stats.rendered);
    assert_eq!(
        output.articles[0].output_path.as_deref(),
        Some(pdf_path(&dir, "example.com", "page").as_path())
    );
    assert_eq!(
        output.articles[1].output_path.as_deref(),
        Some(pdf_path(&dir, "example.com", "page-2").as_path())
    );
    assert!(pdf_path(&dir, "example.com", "page-3").exists());
}

#[tokio::test]
async fn batch_where_every_article_fails_is_an_error() {
    let feed = json!({
        "articles": [
            article(FAIL_MARKER, "https://example.com/one"),
            article(FAIL_MARKER, "https://example.com/two"),
        ]
    });
    let (_dir, mut config) = setup(&feed);
    config.selection = ArticleSelection::Range(1, 2);
    let backend = FakeBackend::default();

    let err = run(&config, &backend).await.unwrap_err();

    assert!(matches!(
        err,
        Article2PdfError::AllArticlesFailed { total: 2, .. }
    ));
    assert_eq!(backend.closes(), 1);
}

#[tokio::test]
async fn batch_of_invalid_records_never_launches() {
    let feed = json!({
        "articles": [
            { "url": "https://example.com/one" },
            { "title": "No url" },
        ]
    });
    let (_dir, mut config) = setup(&feed);
    config.selection = ArticleSelection::All;
    let backend = FakeBackend::default();

    let err = run(&config, &backend).await.unwrap_err();

    assert!(matches!(err, Article2PdfError::AllArticlesFailed { .. }));
    assert_eq!(backend.launches(), 0);
}

// ── Progress events ──────────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    fn push(&self, e: String) {
        self.events.lock().unwrap().push(e);
    }
}

impl RenderProgressCallback for Recorder {
    fn on_feed_loaded(&self, total: usize, selected: usize, crawled_at: Option<&str>) {
        self.push(format!("feed {total} {selected} {}", crawled_at.unwrap_or("-")));
    }

    fn on_article_start(&self, article_num: usize, _article: &article2pdf::Article) {
        self.push(format!("start {article_num}"));
    }

    fn on_stage(&self, article_num: usize, stage: RenderStage) {
        self.push(format!("stage {article_num} {}", stage.number()));
    }

    fn on_article_complete(&self, article_num: usize, _path: &Path, _bytes: u64) {
        self.push(format!("done {article_num}"));
    }

    fn on_article_error(&self, article_num: usize, _error: &str) {
        self.push(format!("error {article_num}"));
    }

    fn on_run_complete(&self, selected: usize, success_count: usize) {
        self.push(format!("complete {selected} {success_count}"));
    }
}

#[tokio::test]
async fn progress_events_follow_stage_order_and_launch_once() {
    let feed = json!({
        "crawledAt": "t0",
        "articles": [
            article("One", "https://example.com/one"),
            article("Two", "https://example.com/two"),
        ]
    });
    let (_dir, mut config) = setup(&feed);
    let recorder = Arc::new(Recorder::default());
    config.selection = ArticleSelection::All;
    config.progress_callback = Some(recorder.clone());

    run(&config, &FakeBackend::default()).await.unwrap();

    let events = recorder.events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            "feed 2 2 t0",
            "start 1",
            "stage 1 1",
            "stage 1 2",
            "stage 1 3",
            "stage 1 4",
            "stage 1 5",
            "done 1",
            "start 2",
            "stage 2 1",
            "stage 2 3",
            "stage 2 4",
            "stage 2 5",
            "done 2",
            "complete 2 2",
        ]
    );
}

#[tokio::test]
async fn progress_reports_error_for_failed_article() {
    let feed = json!({ "articles": [article(FAIL_MARKER, "https://example.com/x")] });
    let (_dir, mut config) = setup(&feed);
    let recorder = Arc::new(Recorder::default());
    config.progress_callback = Some(recorder.clone());

    run(&config, &FakeBackend::default()).await.unwrap_err();

    let events = recorder.events.lock().unwrap().clone();
    assert_eq!(events.last().map(String::as_str), Some("error 1"));
    assert!(!events.iter().any(|e| e.starts_with("complete")));
}

#[tokio::test]
async fn custom_template_reaches_the_renderer() {
    let feed = json!({ "articles": [article("Hello", "https://example.com/hello")] });
    let (dir, config) = setup(&feed);
    let generator =
        TemplateHtmlGenerator::from_source("inline", "<h1>{{ article.title }}</h1>").unwrap();

    let output = render_articles_with(&config, &generator, &FakeBackend::default())
        .await
        .unwrap();

    assert_eq!(output.articles[0].html_len, "<h1>Hello</h1>".len());
    assert!(pdf_path(&dir, "example.com", "hello").exists());
}
