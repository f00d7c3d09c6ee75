//! Configuration types for article-to-PDF rendering.
//!
//! All run behaviour is controlled through [`RenderConfig`], built via its
//! [`RenderConfigBuilder`]. Defaults reproduce the classic smoke test: read
//! `data/latest-raw.json`, render the first article, write under `pdfs/`.

use crate::error::Article2PdfError;
use crate::progress::ProgressCallback;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default feed location, relative to the working directory.
pub const DEFAULT_DATA_PATH: &str = "data/latest-raw.json";

/// Default output root, relative to the working directory.
pub const DEFAULT_OUTPUT_DIR: &str = "pdfs";

/// Configuration for a render run.
///
/// Built via [`RenderConfig::builder()`] or using [`RenderConfig::default()`].
///
/// # Example
/// ```rust
/// use article2pdf::{ArticleSelection, RenderConfig};
///
/// let config = RenderConfig::builder()
///     .data_source("data/latest-raw.json")
///     .output_dir("pdfs")
///     .selection(ArticleSelection::Single(2))
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct RenderConfig {
    /// Feed location: a local path or an HTTP/HTTPS URL.
    pub data_source: String,

    /// Root directory for generated PDFs. Default: `pdfs`.
    pub output_dir: PathBuf,

    /// Which articles of the feed to render. Default: the first one.
    pub selection: ArticleSelection,

    /// How absent article fields are treated. Default: [`FieldPolicy::Lenient`].
    pub field_policy: FieldPolicy,

    /// How to decide the page is ready to print.
    pub settle: SettleStrategy,

    /// Print options handed to the browser.
    pub print: PrintOptions,

    /// Custom Tera template file. If None, uses the built-in template.
    pub template_path: Option<PathBuf>,

    /// Browser executable. If None, resolved through `chrome-auto`.
    pub chrome_executable: Option<PathBuf>,

    /// Download `chrome-headless-shell` when no browser is installed. Default: false.
    pub download_browser: bool,

    /// Run the browser without a window. Default: true.
    pub headless: bool,

    /// Pass `--no-sandbox` to the browser (needed as root in containers). Default: false.
    pub no_sandbox: bool,

    /// Per-DevTools-request timeout in seconds. Default: 30.
    pub request_timeout_secs: u64,

    /// Download timeout for URL feeds in seconds. Default: 30.
    pub download_timeout_secs: u64,

    /// Date used for the `<YYYY-MM-DD>` directory. If None, today's UTC date.
    pub render_date: Option<NaiveDate>,

    /// Receives per-stage progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            data_source: DEFAULT_DATA_PATH.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            selection: ArticleSelection::default(),
            field_policy: FieldPolicy::default(),
            settle: SettleStrategy::default(),
            print: PrintOptions::default(),
            template_path: None,
            chrome_executable: None,
            download_browser: false,
            headless: true,
            no_sandbox: false,
            request_timeout_secs: 30,
            download_timeout_secs: 30,
            render_date: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for RenderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderConfig")
            .field("data_source", &self.data_source)
            .field("output_dir", &self.output_dir)
            .field("selection", &self.selection)
            .field("field_policy", &self.field_policy)
            .field("settle", &self.settle)
            .field("print", &self.print)
            .field("template_path", &self.template_path)
            .field("chrome_executable", &self.chrome_executable)
            .field("download_browser", &self.download_browser)
            .field("headless", &self.headless)
            .field("no_sandbox", &self.no_sandbox)
            .field("render_date", &self.render_date)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn RenderProgressCallback>"),
            )
            .finish()
    }
}

impl RenderConfig {
    /// Create a new builder for `RenderConfig`.
    pub fn builder() -> RenderConfigBuilder {
        RenderConfigBuilder {
            config: Self::default(),
        }
    }

    /// The date that names the output directory for this run.
    pub fn effective_date(&self) -> NaiveDate {
        self.render_date
            .unwrap_or_else(|| chrono::Utc::now().date_naive())
    }
}

/// Builder for [`RenderConfig`].
#[derive(Debug)]
pub struct RenderConfigBuilder {
    config: RenderConfig,
}

impl RenderConfigBuilder {
    pub fn data_source(mut self, source: impl Into<String>) -> Self {
        self.config.data_source = source.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn selection(mut self, selection: ArticleSelection) -> Self {
        self.config.selection = selection;
        self
    }

    pub fn field_policy(mut self, policy: FieldPolicy) -> Self {
        self.config.field_policy = policy;
        self
    }

    pub fn settle(mut self, settle: SettleStrategy) -> Self {
        self.config.settle = settle;
        self
    }

    pub fn paper(mut self, paper: PaperFormat) -> Self {
        self.config.print.paper = paper;
        self
    }

    pub fn landscape(mut self, v: bool) -> Self {
        self.config.print.landscape = v;
        self
    }

    pub fn print_background(mut self, v: bool) -> Self {
        self.config.print.print_background = v;
        self
    }

    pub fn margin_inches(mut self, margin: f64) -> Self {
        self.config.print.margin_inches = margin;
        self
    }

    pub fn scale(mut self, scale: f64) -> Self {
        self.config.print.scale = scale;
        self
    }

    pub fn template_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.template_path = Some(path.into());
        self
    }

    pub fn chrome_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.chrome_executable = Some(path.into());
        self
    }

    pub fn download_browser(mut self, v: bool) -> Self {
        self.config.download_browser = v;
        self
    }

    pub fn headless(mut self, v: bool) -> Self {
        self.config.headless = v;
        self
    }

    pub fn no_sandbox(mut self, v: bool) -> Self {
        self.config.no_sandbox = v;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn render_date(mut self, date: NaiveDate) -> Self {
        self.config.render_date = Some(date);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RenderConfig, Article2PdfError> {
        let c = &self.config;
        if c.data_source.trim().is_empty() {
            return Err(Article2PdfError::InvalidConfig(
                "data source must not be empty".into(),
            ));
        }
        if c.output_dir.as_os_str().is_empty() {
            return Err(Article2PdfError::InvalidConfig(
                "output directory must not be empty".into(),
            ));
        }
        if !(0.1..=2.0).contains(&c.print.scale) {
            return Err(Article2PdfError::InvalidConfig(format!(
                "scale must be 0.1–2.0, got {}",
                c.print.scale
            )));
        }
        if c.print.margin_inches < 0.0 || c.print.margin_inches > 2.0 {
            return Err(Article2PdfError::InvalidConfig(format!(
                "margin must be 0–2 inches, got {}",
                c.print.margin_inches
            )));
        }
        if c.request_timeout_secs == 0 {
            return Err(Article2PdfError::InvalidConfig(
                "request timeout must be ≥ 1 second".into(),
            ));
        }
        if let SettleStrategy::ResourcesLoaded { timeout } = c.settle {
            if timeout.is_zero() {
                return Err(Article2PdfError::InvalidConfig(
                    "settle timeout must be > 0".into(),
                ));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Specifies which articles of the feed to render.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArticleSelection {
    /// Only the first article (default).
    #[default]
    First,
    /// A single article (1-indexed).
    Single(usize),
    /// A contiguous range of articles (1-indexed, inclusive).
    Range(usize, usize),
    /// Specific articles (1-indexed, deduplicated).
    Set(Vec<usize>),
    /// Every article in the feed.
    All,
}

impl ArticleSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed positions.
    pub fn to_indices(&self, total: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            ArticleSelection::First => (0..total.min(1)).collect(),
            ArticleSelection::All => (0..total).collect(),
            ArticleSelection::Single(n) => {
                if *n >= 1 && *n <= total {
                    vec![n - 1]
                } else {
                    vec![]
                }
            }
            ArticleSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total);
                (s..e).collect()
            }
            ArticleSelection::Set(items) => items
                .iter()
                .filter(|&&n| n >= 1 && n <= total)
                .map(|n| n - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// The 1-indexed article number to blame when nothing matched.
    pub fn first_requested(&self) -> usize {
        match self {
            ArticleSelection::First | ArticleSelection::All => 1,
            ArticleSelection::Single(n) => *n,
            ArticleSelection::Range(start, _) => *start,
            ArticleSelection::Set(items) => items.first().copied().unwrap_or(1),
        }
    }
}

/// How absent or empty article fields are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FieldPolicy {
    /// `title` and `url` are required; `author` and `pubDate` are omitted
    /// from the page when absent; `source_domain` falls back to `unknown`.
    #[default]
    Lenient,
    /// All five fields must be present and non-empty.
    Strict,
}

/// How to decide the page has finished loading before printing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettleStrategy {
    /// Wait in-page for `readyState == "complete"`, web fonts and every
    /// `<img>`, up to `timeout`. Printing proceeds when the timeout expires.
    ResourcesLoaded { timeout: Duration },
    /// Sleep unconditionally after setting the content.
    FixedDelay(Duration),
}

impl Default for SettleStrategy {
    fn default() -> Self {
        SettleStrategy::ResourcesLoaded {
            timeout: Duration::from_secs(10),
        }
    }
}

/// Paper sizes understood by the print call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaperFormat {
    #[default]
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Tabloid,
}

impl PaperFormat {
    /// `(width, height)` in inches, portrait orientation.
    pub fn dimensions_inches(self) -> (f64, f64) {
        match self {
            PaperFormat::A4 => (8.27, 11.69),
            PaperFormat::A3 => (11.69, 16.54),
            PaperFormat::A5 => (5.83, 8.27),
            PaperFormat::Letter => (8.5, 11.0),
            PaperFormat::Legal => (8.5, 14.0),
            PaperFormat::Tabloid => (11.0, 17.0),
        }
    }
}

/// Options for the browser's print-to-PDF call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintOptions {
    pub paper: PaperFormat,
    pub landscape: bool,
    /// Include CSS backgrounds. Default: true.
    pub print_background: bool,
    /// Uniform page margin. Default: 0.4 in.
    pub margin_inches: f64,
    /// Render scale. Default: 1.0.
    pub scale: f64,
    /// Let a CSS `@page size` override `paper`. Default: false.
    pub prefer_css_page_size: bool,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            paper: PaperFormat::A4,
            landscape: false,
            print_background: true,
            margin_inches: 0.4,
            scale: 1.0,
            prefer_css_page_size: false,
        }
    }
}
