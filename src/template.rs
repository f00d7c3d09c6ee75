//! Built-in HTML template for article pages.
//!
//! Callers can override it via [`crate::config::RenderConfig::template_path`];
//! the constant here is used only when no override is provided. Templates are
//! Tera (Jinja2 syntax) and are registered under [`TEMPLATE_NAME`], whose
//! `.html` suffix turns on auto-escaping for every interpolated value.
//!
//! Variables available to a template:
//!
//! | Name | Type | Notes |
//! |------|------|-------|
//! | `article.title` | string | always present |
//! | `article.author` | string or null | |
//! | `article.pub_date` | string or null | |
//! | `article.source_domain` | string | `unknown` when absent |
//! | `article.url` | string | always present |
//! | `article.content` | string or null | crawled body HTML, render with `| safe` |
//! | `article.summary` | string or null | `summary` or `description` field |
//! | `article.extra` | object | every other field of the record |
//! | `generated_at` | string | RFC 3339 UTC timestamp |

/// Name under which the template is registered.
pub const TEMPLATE_NAME: &str = "article.html";

/// Default A4 print layout.
pub const DEFAULT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{{ article.title }}</title>
<style>
  @page { size: A4; margin: 18mm 16mm; }
  html { -webkit-print-color-adjust: exact; print-color-adjust: exact; }
  body {
    font-family: "Noto Serif", "Source Han Serif SC", Georgia, serif;
    font-size: 11.5pt;
    line-height: 1.6;
    color: #1a1a1a;
    margin: 0;
  }
  header { border-bottom: 2px solid #1a1a1a; padding-bottom: 8pt; margin-bottom: 14pt; }
  h1 { font-size: 22pt; line-height: 1.25; margin: 0 0 6pt 0; }
  .meta { font-family: "Noto Sans", Helvetica, Arial, sans-serif; font-size: 9pt; color: #555; }
  .meta span + span::before { content: " · "; }
  .summary { font-style: italic; color: #333; margin-bottom: 12pt; }
  article img { max-width: 100%; height: auto; page-break-inside: avoid; }
  article pre { white-space: pre-wrap; font-size: 9.5pt; }
  article table { border-collapse: collapse; max-width: 100%; }
  article td, article th { border: 1px solid #bbb; padding: 3pt 5pt; }
  footer { margin-top: 18pt; padding-top: 6pt; border-top: 1px solid #ccc;
           font-family: "Noto Sans", Helvetica, Arial, sans-serif; font-size: 8pt; color: #777;
           word-break: break-all; }
</style>
</head>
<body>
<header>
  <h1>{{ article.title }}</h1>
  <div class="meta">
    {% if article.author %}<span class="author">{{ article.author }}</span>{% endif %}
    {% if article.pub_date %}<span class="date">{{ article.pub_date }}</span>{% endif %}
    <span class="domain">{{ article.source_domain }}</span>
  </div>
</header>
{% if article.summary %}<p class="summary">{{ article.summary }}</p>{% endif %}
<article>
{% if article.content %}{{ article.content | safe }}{% else %}<p><a href="{{ article.url }}">{{ article.url }}</a></p>{% endif %}
</article>
<footer>
  Source: <a href="{{ article.url }}">{{ article.url }}</a><br>
  Generated {{ generated_at }}
</footer>
</body>
</html>
"#;
