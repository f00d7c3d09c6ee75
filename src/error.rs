//! Error types for the article2pdf library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Article2PdfError`] — **Fatal**: the run cannot proceed at all
//!   (feed missing or malformed, no articles, browser unavailable, output
//!   directory not writable). Returned as `Err(Article2PdfError)` from the
//!   top-level `render*` functions.
//!
//! * [`ArticleError`] — **Non-fatal**: one article of a multi-article run
//!   failed (template error, print failure) while the rest rendered. Stored
//!   inside [`crate::output::ArticleOutput`].
//!
//! Fatal errors further split into two classes, told apart by
//! [`Article2PdfError::is_input_error`]: input-data errors are raised before
//! a browser is ever launched, everything else happens during rendering.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the article2pdf library.
#[derive(Debug, Error)]
pub enum Article2PdfError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Feed file was not found at the given path.
    #[error("Data file not found: '{path}'\nRun the crawler first or pass --data <PATH>.")]
    DataFileNotFound { path: PathBuf },

    /// Process does not have read permission on the feed file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The feed file exists but reading it failed.
    #[error("Failed to read data file '{path}': {source}")]
    DataFileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// HTTP URL was syntactically valid but the download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The feed body is not valid JSON or does not match the feed shape.
    #[error("Data file '{source_name}' is not a valid article feed: {source}")]
    MalformedData {
        source_name: String,
        #[source]
        source: serde_json::Error,
    },

    /// The feed parsed but its `articles` array is empty.
    #[error("No articles found in '{source_name}'")]
    NoArticles { source_name: String },

    /// The article selection matched nothing in the feed.
    #[error("Article {index} is out of range (feed has {total} articles)")]
    SelectionOutOfRange { index: usize, total: usize },

    /// The `--articles` selection string could not be parsed.
    #[error("Invalid article selection '{input}': {reason}")]
    InvalidSelection { input: String, reason: String },

    /// A required article field is absent or empty.
    #[error("Article {index} is missing required field '{field}'")]
    MissingField { index: usize, field: &'static str },

    /// The article URL could not be parsed.
    #[error("Article {index} has an invalid URL '{url}': {reason}")]
    InvalidArticleUrl {
        index: usize,
        url: String,
        reason: String,
    },

    // ── Template errors ───────────────────────────────────────────────────
    /// A custom template could not be loaded or compiled.
    #[error("Failed to load HTML template '{name}': {detail}")]
    TemplateLoad { name: String, detail: String },

    /// Rendering the template for an article failed.
    #[error("HTML generation failed: {0}")]
    HtmlGeneration(String),

    // ── Browser errors ────────────────────────────────────────────────────
    /// No browser executable could be found or downloaded.
    #[error("Headless browser unavailable: {0}")]
    BrowserUnavailable(#[from] chrome_auto::ChromeAutoError),

    /// The browser process failed to start or the DevTools connection failed.
    #[error("Failed to launch browser: {0}")]
    BrowserLaunch(String),

    /// Loading the generated HTML into the page failed.
    #[error("Failed to load HTML into the browser page: {0}")]
    ContentLoad(String),

    /// The print-to-PDF call failed.
    #[error("PDF rendering failed: {0}")]
    PdfRender(String),

    /// The browser returned a zero-length PDF.
    #[error("Browser returned an empty PDF")]
    EmptyPdf,

    // ── Aggregate errors ──────────────────────────────────────────────────
    /// Every selected article failed; nothing was written.
    #[error("All {total} selected articles failed.\nFirst error: {first_error}")]
    AllArticlesFailed { total: usize, first_error: String },

    /// Some articles rendered but at least one failed.
    ///
    /// Returned by [`crate::output::RunOutput::into_result`] when the
    /// caller wants to treat any article failure as an error.
    #[error("{failed}/{total} articles failed to render")]
    PartialFailure {
        success: usize,
        failed: usize,
        total: usize,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create the output directory or write the PDF.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Article2PdfError {
    /// `true` for failures detected while reading and validating the feed,
    /// before any HTML is generated or any browser is launched.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Article2PdfError::DataFileNotFound { .. }
                | Article2PdfError::PermissionDenied { .. }
                | Article2PdfError::DataFileUnreadable { .. }
                | Article2PdfError::DownloadFailed { .. }
                | Article2PdfError::DownloadTimeout { .. }
                | Article2PdfError::MalformedData { .. }
                | Article2PdfError::NoArticles { .. }
                | Article2PdfError::SelectionOutOfRange { .. }
                | Article2PdfError::InvalidSelection { .. }
                | Article2PdfError::MissingField { .. }
                | Article2PdfError::InvalidArticleUrl { .. }
        )
    }
}

/// A non-fatal error for a single article of a multi-article run.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ArticleError {
    /// The article failed validation (missing field, bad URL).
    #[error("Article {index}: invalid record: {detail}")]
    Invalid { index: usize, detail: String },

    /// Template rendering failed.
    #[error("Article {index}: HTML generation failed: {detail}")]
    Html { index: usize, detail: String },

    /// The browser could not print the page.
    #[error("Article {index}: PDF rendering failed: {detail}")]
    Render { index: usize, detail: String },

    /// Writing the PDF to disk failed.
    #[error("Article {index}: write failed: {detail}")]
    Write { index: usize, detail: String },
}

impl ArticleError {
    /// Classify a fatal error raised while processing article `index`.
    pub fn from_fatal(index: usize, err: &Article2PdfError) -> Self {
        let detail = err.to_string();
        match err {
            Article2PdfError::MissingField { .. } | Article2PdfError::InvalidArticleUrl { .. } => {
                ArticleError::Invalid { index, detail }
            }
            Article2PdfError::HtmlGeneration(_) | Article2PdfError::TemplateLoad { .. } => {
                ArticleError::Html { index, detail }
            }
            Article2PdfError::OutputWriteFailed { .. } => ArticleError::Write { index, detail },
            _ => ArticleError::Render { index, detail },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_failure_display() {
        let e = Article2PdfError::PartialFailure {
            success: 9,
            failed: 1,
            total: 10,
        };
        let msg = e.to_string();
        assert!(msg.contains("1/10"), "got: {msg}");
    }

    #[test]
    fn no_articles_is_input_error() {
        let e = Article2PdfError::NoArticles {
            source_name: "data/latest-raw.json".into(),
        };
        assert!(e.is_input_error());
        assert!(e.to_string().contains("latest-raw.json"));
    }

    #[test]
    fn render_errors_are_not_input_errors() {
        assert!(!Article2PdfError::PdfRender("boom".into()).is_input_error());
        assert!(!Article2PdfError::EmptyPdf.is_input_error());
        assert!(!Article2PdfError::BrowserLaunch("no chrome".into()).is_input_error());
    }

    #[test]
    fn missing_field_display() {
        let e = Article2PdfError::MissingField {
            index: 1,
            field: "url",
        };
        assert_eq!(e.to_string(), "Article 1 is missing required field 'url'");
    }

    #[test]
    fn article_error_classification() {
        let e = ArticleError::from_fatal(2, &Article2PdfError::HtmlGeneration("bad".into()));
        assert!(matches!(e, ArticleError::Html { index: 2, .. }));

        let e = ArticleError::from_fatal(3, &Article2PdfError::EmptyPdf);
        assert!(matches!(e, ArticleError::Render { index: 3, .. }));
        assert!(e.to_string().contains("Article 3"));
    }
}
