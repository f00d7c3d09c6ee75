//! HTML generation: turn one [`Article`] into a self-contained HTML page.
//!
//! The pipeline only depends on the [`HtmlGenerator`] trait, so callers can
//! plug in their own formatter. [`TemplateHtmlGenerator`] is the default and
//! renders a Tera template (built-in or loaded from a file).

use crate::error::Article2PdfError;
use crate::feed::Article;
use crate::template::{DEFAULT_TEMPLATE, TEMPLATE_NAME};
use serde::Serialize;
use std::path::Path;
use tera::{Context, Tera};
use tracing::debug;

/// Produces the HTML handed to the browser for one article.
pub trait HtmlGenerator: Send + Sync {
    fn generate(&self, article: &Article) -> Result<String, Article2PdfError>;
}

/// Tera-backed [`HtmlGenerator`].
#[derive(Debug)]
pub struct TemplateHtmlGenerator {
    tera: Tera,
}

/// Template-facing view of an article.
#[derive(Debug, Serialize)]
struct ArticleView<'a> {
    title: &'a str,
    author: Option<&'a str>,
    pub_date: Option<&'a str>,
    source_domain: &'a str,
    url: &'a str,
    content: Option<&'a str>,
    summary: Option<&'a str>,
    extra: &'a serde_json::Map<String, serde_json::Value>,
}

impl<'a> ArticleView<'a> {
    fn new(article: &'a Article) -> Self {
        let extra_str = |key: &str| {
            article
                .extra
                .get(key)
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
        };

        Self {
            title: article.title().unwrap_or_default(),
            author: article.author(),
            pub_date: article.pub_date(),
            source_domain: article.source_domain(),
            url: article.url().unwrap_or_default(),
            content: extra_str("content"),
            summary: extra_str("summary").or_else(|| extra_str("description")),
            extra: &article.extra,
        }
    }
}

impl TemplateHtmlGenerator {
    /// Generator using the built-in template.
    pub fn new() -> Result<Self, Article2PdfError> {
        Self::from_source(TEMPLATE_NAME, DEFAULT_TEMPLATE)
    }

    /// Generator compiled from template text.
    ///
    /// `label` only names the template in errors.
    pub fn from_source(label: &str, source: &str) -> Result<Self, Article2PdfError> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, source)
            .map_err(|e| Article2PdfError::TemplateLoad {
                name: label.to_string(),
                detail: error_chain(&e),
            })?;
        Ok(Self { tera })
    }

    /// Generator compiled from a template file.
    pub fn from_file(path: &Path) -> Result<Self, Article2PdfError> {
        let source = std::fs::read_to_string(path).map_err(|e| Article2PdfError::TemplateLoad {
            name: path.display().to_string(),
            detail: e.to_string(),
        })?;
        Self::from_source(&path.display().to_string(), &source)
    }

    /// Built-in template, or the file at `path` when given.
    pub fn load(path: Option<&Path>) -> Result<Self, Article2PdfError> {
        match path {
            Some(p) => Self::from_file(p),
            None => Self::new(),
        }
    }
}

impl HtmlGenerator for TemplateHtmlGenerator {
    fn generate(&self, article: &Article) -> Result<String, Article2PdfError> {
        let mut context = Context::new();
        context.insert("article", &ArticleView::new(article));
        context.insert("generated_at", &chrono::Utc::now().to_rfc3339());

        let html = self
            .tera
            .render(TEMPLATE_NAME, &context)
            .map_err(|e| Article2PdfError::HtmlGeneration(error_chain(&e)))?;
        debug!("Generated {} chars of HTML", html.chars().count());
        Ok(html)
    }
}

/// Tera puts the useful part of a message in the source chain.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        msg.push_str(": ");
        msg.push_str(&inner.to_string());
        source = inner.source();
    }
    msg
}
