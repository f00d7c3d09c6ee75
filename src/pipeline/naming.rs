//! Output naming: derive the PDF filename and its dated, domain-scoped path.
//!
//! ```text
//! <output_dir>/<source_domain>/<YYYY-MM-DD>/<sanitized-filename>.pdf
//! ```
//!
//! The filename is the last segment of the article URL's path with every
//! character outside `[A-Za-z0-9_-]` replaced by `_`. Percent-encoded octets
//! are sanitised as-is, so `%20` becomes `_20`.

use crate::error::Article2PdfError;
use crate::feed::UNKNOWN_DOMAIN;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use url::Url;

/// Filename used when the URL path ends in `/`.
pub const FALLBACK_FILENAME: &str = "page";

static RE_DISALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_\-]").unwrap());

/// Replace every character outside `[A-Za-z0-9_-]` with `_`.
pub fn sanitize_component(raw: &str) -> String {
    RE_DISALLOWED.replace_all(raw, "_").into_owned()
}

/// Derive the sanitised PDF stem from an article URL.
///
/// `article_num` is the 1-indexed feed position, used in errors.
pub fn derive_filename(url: &str, article_num: usize) -> Result<String, Article2PdfError> {
    let parsed = Url::parse(url).map_err(|e| Article2PdfError::InvalidArticleUrl {
        index: article_num,
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let last = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty())
        .unwrap_or(FALLBACK_FILENAME);

    Ok(sanitize_component(last))
}

/// Directory name for a source domain.
///
/// Hostnames pass through unchanged. Anything that could escape the output
/// root (path separators, `.`/`..`, drive prefixes) is neutralised.
pub fn domain_dir(domain: &str) -> String {
    let trimmed = domain.trim();
    if trimmed.is_empty() {
        return UNKNOWN_DOMAIN.to_string();
    }
    let cleaned: String = trimmed
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if cleaned.chars().all(|c| c == '.') {
        return UNKNOWN_DOMAIN.to_string();
    }
    cleaned
}

/// Directory holding all PDFs for `domain` rendered on `date`.
pub fn output_dir_for(output_root: &Path, domain: &str, date: NaiveDate) -> PathBuf {
    output_root
        .join(domain_dir(domain))
        .join(date.format("%Y-%m-%d").to_string())
}

/// Full PDF path for one article.
pub fn output_path(output_root: &Path, domain: &str, date: NaiveDate, stem: &str) -> PathBuf {
    output_dir_for(output_root, domain, date).join(format!("{stem}.pdf"))
}

/// Return `path`, or a sibling suffixed with `-<article_num>` when another
/// article in the same run already wrote to it.
pub fn unclaimed_path(
    path: PathBuf,
    article_num: usize,
    claimed: &HashSet<PathBuf>,
) -> PathBuf {
    if !claimed.contains(&path) {
        return path;
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| FALLBACK_FILENAME.to_string());
    let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

    let mut candidate = dir.join(format!("{stem}-{article_num}.pdf"));
    let mut n = 2;
    while claimed.contains(&candidate) {
        candidate = dir.join(format!("{stem}-{article_num}-{n}.pdf"));
        n += 1;
    }
    candidate
}
