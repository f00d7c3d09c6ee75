//! Pipeline stages for article-to-PDF rendering.
//!
//! Each submodule implements exactly one step.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ naming ──▶ html ──▶ render ──▶ write
//! (feed)    (path)     (tera)   (chrome)   (atomic)
//! ```
//!
//! 1. [`input`]  — read the crawler's JSON from disk or over HTTP
//! 2. [`naming`] — derive `<domain>/<date>/<stem>.pdf` from the article
//! 3. [`html`]   — format the article as a printable HTML page
//! 4. [`render`] — load the HTML into headless Chromium, wait for it to
//!    settle, print to PDF
//! 5. [`write`]  — write the PDF via temp file + rename

pub mod html;
pub mod input;
pub mod naming;
pub mod render;
pub mod write;
