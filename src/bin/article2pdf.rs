//! CLI binary for article2pdf.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `RenderConfig` and prints results.

use anyhow::{Context, Result};
use article2pdf::{
    inspect, render_articles, Article, Article2PdfError, ArticleSelection, FieldPolicy,
    PaperFormat, RenderConfig, RenderProgressCallback, RenderStage,
    SettleStrategy,
};
use chrono::NaiveDate;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

fn rule() -> String {
    "=".repeat(50)
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner for the stage in flight plus
/// permanent log lines for the feed, each article and each stage.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Per-article wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading feed…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn elapsed_secs(&self, article_num: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&article_num))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl RenderProgressCallback for CliProgressCallback {
    fn on_feed_loaded(&self, total_articles: usize, selected: usize, crawled_at: Option<&str>) {
        self.bar.println(format!(
            "{} {}",
            cyan("📖"),
            bold(&format!("Found {total_articles} articles ({selected} selected)"))
        ));
        self.bar.println(format!(
            "{} Crawled at: {}",
            cyan("📅"),
            crawled_at.unwrap_or("unknown")
        ));
    }

    fn on_article_start(&self, article_num: usize, article: &Article) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(article_num, Instant::now());
        }
        let field = |v: Option<&str>| v.unwrap_or("-").to_string();
        self.bar.println(String::new());
        self.bar
            .println(format!("{} {}", cyan("📰"), bold(&format!("Article {article_num}"))));
        self.bar.println(format!("   Title:     {}", field(article.title())));
        self.bar.println(format!("   Author:    {}", field(article.author())));
        self.bar
            .println(format!("   Published: {}", field(article.pub_date())));
        self.bar
            .println(format!("   Domain:    {}", article.source_domain()));
        self.bar.set_prefix(format!("Article {article_num}"));
    }

    fn on_stage(&self, _article_num: usize, stage: RenderStage) {
        self.bar.println(format!(
            "   {} {}…",
            dim(&format!("[{}/{}]", stage.number(), RenderStage::ALL.len())),
            stage.label()
        ));
        self.bar.set_message(stage.label());
    }

    fn on_article_complete(&self, article_num: usize, path: &Path, bytes: u64) {
        let secs = self.elapsed_secs(article_num);
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.bar.println(format!("   {} PDF generated", green("✅")));
        self.bar.println(format!("   📄 File:    {}", bold(&filename)));
        self.bar
            .println(format!("   📁 Path:    {}", path.display()));
        self.bar.println(format!(
            "   📊 Size:    {:.1} KB",
            bytes as f64 / 1024.0
        ));
        self.bar
            .println(format!("   ⏱  Elapsed: {}", dim(&format!("{secs:.1}s"))));
    }

    fn on_article_error(&self, article_num: usize, error: &str) {
        let secs = self.elapsed_secs(article_num);
        // Truncate very long error messages to keep output tidy.
        let msg = if error.chars().count() > 100 {
            let cut: String = error.chars().take(99).collect();
            format!("{cut}\u{2026}")
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "   {} {}  {}",
            red("✗"),
            red(&msg),
            dim(&format!("{secs:.1}s"))
        ));
    }

    fn on_run_complete(&self, selected: usize, success_count: usize) {
        let failed = selected.saturating_sub(success_count);
        self.bar.finish_and_clear();

        eprintln!();
        eprintln!("{}", rule());
        if failed == 0 {
            eprintln!(
                "{} {} PDF(s) generated",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} PDF(s) generated  ({} failed)",
                if failed == selected {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                selected,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Render the first article of data/latest-raw.json into pdfs/
  article2pdf

  # A different feed and output root
  article2pdf --data crawl/today.json --output-dir out

  # The third article, or a batch
  article2pdf --articles 3
  article2pdf --articles 2-5
  article2pdf --all

  # Feed served over HTTP
  article2pdf --data https://crawler.internal/latest-raw.json

  # Letter paper, landscape, old fixed 2s wait
  article2pdf --paper letter --landscape --settle fixed --settle-ms 2000

  # Custom Tera template
  article2pdf --template my-article.html

  # List the feed without rendering (no browser needed)
  article2pdf --inspect-only

  # Machine-readable run summary
  article2pdf --all --json > run.json

OUTPUT LAYOUT:
  <output-dir>/<source_domain>/<YYYY-MM-DD>/<name>.pdf

  <name> is the last segment of the article URL path with every character
  outside [A-Za-z0-9_-] replaced by "_" ("report.html" → "report_html");
  "page" when the path is empty. The date is today's UTC date unless --date
  is given.

ENVIRONMENT VARIABLES:
  CHROME_PATH             Browser executable (Chrome / Chromium / headless shell)
  CHROME_AUTO_CACHE_DIR   Override the downloaded-browser cache directory
  RUST_LOG                Override log filtering (e.g. article2pdf=debug)
  ARTICLE2PDF_*           Every flag below also reads its ARTICLE2PDF_ variable

BROWSER:
  An installed Chrome/Chromium is used when found. With --download-browser a
  pinned chrome-headless-shell build is downloaded once and cached.
  In containers running as root, add --no-sandbox.
"#;

/// Render crawled articles to PDF through a headless browser.
#[derive(Parser, Debug)]
#[command(
    name = "article2pdf",
    version,
    about = "Render crawled articles to PDF through a headless browser",
    long_about = "Read a crawler's JSON feed (local file or URL), render the selected articles \
through an HTML template and print each one to PDF with headless Chromium. PDFs are written \
as <output-dir>/<source_domain>/<YYYY-MM-DD>/<name>.pdf.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Feed file path or HTTP/HTTPS URL.
    #[arg(short, long, env = "ARTICLE2PDF_DATA", default_value = article2pdf::config::DEFAULT_DATA_PATH)]
    data: String,

    /// Root directory for generated PDFs.
    #[arg(short, long, env = "ARTICLE2PDF_OUTPUT_DIR", default_value = article2pdf::config::DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Article selection (1-indexed): 3, 2-5, 1,3,7 or all. Default: the first article.
    #[arg(short, long, env = "ARTICLE2PDF_ARTICLES", conflicts_with = "all")]
    articles: Option<String>,

    /// Render every article in the feed.
    #[arg(long, env = "ARTICLE2PDF_ALL")]
    all: bool,

    /// Require title, author, pubDate, source_domain and url on every article.
    #[arg(long, env = "ARTICLE2PDF_STRICT")]
    strict: bool,

    /// How to decide the page is ready to print.
    #[arg(long, env = "ARTICLE2PDF_SETTLE", value_enum, default_value = "resources")]
    settle: SettleArg,

    /// Fixed wait in milliseconds (with --settle fixed).
    #[arg(long, env = "ARTICLE2PDF_SETTLE_MS", default_value_t = 2000)]
    settle_ms: u64,

    /// Upper bound in seconds on waiting for fonts and images (with --settle resources).
    #[arg(long, env = "ARTICLE2PDF_SETTLE_TIMEOUT", default_value_t = 10)]
    settle_timeout: u64,

    /// Paper size.
    #[arg(long, env = "ARTICLE2PDF_PAPER", value_enum, default_value = "a4")]
    paper: PaperArg,

    /// Landscape orientation.
    #[arg(long, env = "ARTICLE2PDF_LANDSCAPE")]
    landscape: bool,

    /// Do not print CSS backgrounds.
    #[arg(long, env = "ARTICLE2PDF_NO_BACKGROUND")]
    no_background: bool,

    /// Page margin in inches (0–2).
    #[arg(long, env = "ARTICLE2PDF_MARGIN", default_value_t = 0.4)]
    margin: f64,

    /// Render scale (0.1–2.0).
    #[arg(long, env = "ARTICLE2PDF_SCALE", default_value_t = 1.0)]
    scale: f64,

    /// Tera template file used instead of the built-in layout.
    #[arg(long, env = "ARTICLE2PDF_TEMPLATE")]
    template: Option<PathBuf>,

    /// Browser executable.
    #[arg(long, env = "CHROME_PATH")]
    chrome: Option<PathBuf>,

    /// Download a headless Chromium build when none is installed.
    #[arg(long, env = "ARTICLE2PDF_DOWNLOAD_BROWSER")]
    download_browser: bool,

    /// Show the browser window.
    #[arg(long, env = "ARTICLE2PDF_HEADFUL")]
    headful: bool,

    /// Launch the browser with --no-sandbox.
    #[arg(long, env = "ARTICLE2PDF_NO_SANDBOX")]
    no_sandbox: bool,

    /// Date for the output directory (YYYY-MM-DD). Default: today (UTC).
    #[arg(long, env = "ARTICLE2PDF_DATE")]
    date: Option<NaiveDate>,

    /// Per-request browser timeout in seconds.
    #[arg(long, env = "ARTICLE2PDF_REQUEST_TIMEOUT", default_value_t = 30)]
    request_timeout: u64,

    /// HTTP download timeout in seconds for URL feeds.
    #[arg(long, env = "ARTICLE2PDF_DOWNLOAD_TIMEOUT", default_value_t = 30)]
    download_timeout: u64,

    /// Output the run summary (RunOutput) as JSON on stdout.
    #[arg(long, env = "ARTICLE2PDF_JSON")]
    json: bool,

    /// Disable the progress display.
    #[arg(long, env = "ARTICLE2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// List the feed only, no rendering.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "ARTICLE2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "ARTICLE2PDF_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum SettleArg {
    /// Wait for the load event, web fonts and images.
    Resources,
    /// Sleep a fixed delay.
    Fixed,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PaperArg {
    A3,
    A4,
    A5,
    Letter,
    Legal,
    Tabloid,
}

impl From<PaperArg> for PaperFormat {
    fn from(v: PaperArg) -> Self {
        match v {
            PaperArg::A3 => PaperFormat::A3,
            PaperArg::A4 => PaperFormat::A4,
            PaperArg::A5 => PaperFormat::A5,
            PaperArg::Letter => PaperFormat::Letter,
            PaperArg::Legal => PaperFormat::Legal,
            PaperArg::Tabloid => PaperFormat::Tabloid,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress display already covers INFO-level events.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let started = Instant::now();
    match run(&cli, show_progress).await {
        Ok(true) => {
            if !cli.quiet && !cli.json {
                eprintln!(
                    "{} Finished in {:.1}s",
                    green("🎉"),
                    started.elapsed().as_secs_f64()
                );
            }
        }
        Ok(false) => std::process::exit(1),
        Err(e) => {
            report_error(&e);
            std::process::exit(1);
        }
    }
}

/// Input and usage errors get one line; rendering errors also get the full chain.
fn report_error(err: &anyhow::Error) {
    let input_error = err.downcast_ref::<Article2PdfError>().is_some_and(|e| {
        e.is_input_error() || matches!(e, Article2PdfError::InvalidConfig(_))
    });

    if input_error {
        eprintln!("{} {:#}", red("❌"), err);
    } else {
        eprintln!("{} {}", red("❌ PDF generation failed:"), err);
        eprintln!("{} {:?}", dim("Details:"), err);
    }
}

/// Returns `Ok(false)` when some articles failed but the run itself completed.
async fn run(cli: &Cli, show_progress: bool) -> Result<bool> {
    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let feed = inspect(&cli.data, cli.download_timeout).await?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&feed).context("Failed to serialise feed")?
            );
        } else {
            println!("Feed:        {}", cli.data);
            println!(
                "Crawled at:  {}",
                feed.crawled_at.as_deref().unwrap_or("unknown")
            );
            println!("Articles:    {}", feed.articles.len());
            for (i, article) in feed.articles.iter().enumerate() {
                println!(
                    "  {:>3}. {}  {}  {}",
                    i + 1,
                    article.title().unwrap_or("(untitled)"),
                    dim(article.source_domain()),
                    dim(article.url().unwrap_or("-")),
                );
            }
        }
        return Ok(true);
    }

    if !cli.quiet && !cli.json {
        eprintln!("{}", bold("article2pdf"));
        eprintln!("{}", rule());
    }

    let mut config = build_config(cli)?;

    let cli_progress = show_progress.then(CliProgressCallback::new);
    config.progress_callback = cli_progress
        .clone()
        .map(|cb| cb as Arc<dyn RenderProgressCallback>);

    let result = render_articles(&config).await;
    // A fatal error skips `on_run_complete`; stop the spinner before reporting.
    if let Some(ref cb) = cli_progress {
        cb.bar.finish_and_clear();
    }
    let output = result?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet && !show_progress {
        // The progress callback already printed per-article lines.
        for article in &output.articles {
            match (&article.error, &article.output_path) {
                (None, Some(path)) => eprintln!(
                    "{} {}  {:.1} KB  {:.1}s",
                    green("✔"),
                    path.display(),
                    article.bytes as f64 / 1024.0,
                    article.render_ms as f64 / 1000.0
                ),
                (Some(err), _) => eprintln!("{} {}", red("✘"), err),
                (None, None) => {}
            }
        }
        eprintln!(
            "Rendered {}/{} articles in {}ms",
            output.stats.rendered, output.stats.selected, output.stats.total_duration_ms
        );
    }

    Ok(output.stats.failed == 0)
}

/// Map CLI args to `RenderConfig`.
fn build_config(cli: &Cli) -> Result<RenderConfig> {
    let selection = if cli.all {
        ArticleSelection::All
    } else {
        match cli.articles {
            Some(ref s) => parse_articles(s)?,
            None => ArticleSelection::First,
        }
    };

    let settle = match cli.settle {
        SettleArg::Resources => SettleStrategy::ResourcesLoaded {
            timeout: Duration::from_secs(cli.settle_timeout),
        },
        SettleArg::Fixed => SettleStrategy::FixedDelay(Duration::from_millis(cli.settle_ms)),
    };

    let mut builder = RenderConfig::builder()
        .data_source(cli.data.clone())
        .output_dir(cli.output_dir.clone())
        .selection(selection)
        .field_policy(if cli.strict {
            FieldPolicy::Strict
        } else {
            FieldPolicy::Lenient
        })
        .settle(settle)
        .paper(cli.paper.into())
        .landscape(cli.landscape)
        .print_background(!cli.no_background)
        .margin_inches(cli.margin)
        .scale(cli.scale)
        .download_browser(cli.download_browser)
        .headless(!cli.headful)
        .no_sandbox(cli.no_sandbox)
        .request_timeout_secs(cli.request_timeout)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref path) = cli.template {
        builder = builder.template_path(path.clone());
    }
    if let Some(ref path) = cli.chrome {
        builder = builder.chrome_executable(path.clone());
    }
    if let Some(date) = cli.date {
        builder = builder.render_date(date);
    }

    Ok(builder.build()?)
}

/// Parse `--articles` into an `ArticleSelection`.
fn parse_articles(s: &str) -> Result<ArticleSelection, Article2PdfError> {
    let invalid = |reason: String| Article2PdfError::InvalidSelection {
        input: s.to_string(),
        reason,
    };
    let number = |part: &str| {
        let part = part.trim();
        match part.parse::<usize>() {
            Ok(0) => Err(invalid("articles are 1-indexed, minimum is 1".into())),
            Ok(n) => Ok(n),
            Err(_) => Err(invalid(format!("'{part}' is not an article number"))),
        }
    };

    let norm = s.trim().to_lowercase();

    if norm == "all" {
        return Ok(ArticleSelection::All);
    }

    // Range: "2-5"
    if let Some((start, end)) = norm.split_once('-') {
        let (start, end) = (number(start)?, number(end)?);
        if start > end {
            return Err(invalid("range start must be <= end".into()));
        }
        return Ok(ArticleSelection::Range(start, end));
    }

    // Set: "1,3,7"
    if norm.contains(',') {
        let items = norm.split(',').map(number).collect::<Result<Vec<_>, _>>()?;
        return Ok(ArticleSelection::Set(items));
    }

    // Single: "3"
    Ok(ArticleSelection::Single(number(&norm)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_articles_forms() {
        assert_eq!(parse_articles("all").unwrap(), ArticleSelection::All);
        assert_eq!(parse_articles("3").unwrap(), ArticleSelection::Single(3));
        assert_eq!(parse_articles("2-5").unwrap(), ArticleSelection::Range(2, 5));
        assert_eq!(
            parse_articles("1, 3,7").unwrap(),
            ArticleSelection::Set(vec![1, 3, 7])
        );
    }

    #[test]
    fn parse_articles_rejects_zero_and_backwards_ranges() {
        for bad in ["0", "5-2", "0,1", "abc", "1-x"] {
            let err = parse_articles(bad).unwrap_err();
            assert!(
                matches!(err, Article2PdfError::InvalidSelection { .. }),
                "{bad}: {err:?}"
            );
            assert!(err.is_input_error(), "{bad} should report as an input error");
        }
    }

    #[test]
    fn bad_selection_surfaces_from_build_config_as_input_error() {
        let cli = Cli::try_parse_from(["article2pdf", "--articles", "0"]).unwrap();
        let err = build_config(&cli).unwrap_err();
        let inner = err.downcast_ref::<Article2PdfError>().unwrap();
        assert!(inner.is_input_error());
        assert!(!format!("{err:#}").contains('\n'));
    }

    #[test]
    fn download_flag_defers_browser_to_library() {
        let cli = Cli::try_parse_from(["article2pdf", "--download-browser"]).unwrap();
        let config = build_config(&cli).unwrap();
        assert!(config.download_browser);
        assert!(config.chrome_executable.is_none());
    }

    #[test]
    fn cli_defaults_match_library_defaults() {
        let cli = Cli::try_parse_from(["article2pdf"]).unwrap();
        let config = build_config(&cli).unwrap();
        assert_eq!(config.data_source, article2pdf::config::DEFAULT_DATA_PATH);
        assert_eq!(config.selection, ArticleSelection::First);
        assert_eq!(config.field_policy, FieldPolicy::Lenient);
        assert!(matches!(config.settle, SettleStrategy::ResourcesLoaded { .. }));
        assert!(config.print.print_background);
    }

    #[test]
    fn cli_fixed_settle_and_date() {
        let cli = Cli::try_parse_from([
            "article2pdf",
            "--settle",
            "fixed",
            "--settle-ms",
            "1500",
            "--date",
            "2024-05-01",
            "--all",
        ])
        .unwrap();
        let config = build_config(&cli).unwrap();
        assert_eq!(
            config.settle,
            SettleStrategy::FixedDelay(Duration::from_millis(1500))
        );
        assert_eq!(config.render_date, NaiveDate::from_ymd_opt(2024, 5, 1));
        assert_eq!(config.selection, ArticleSelection::All);
    }
}
