//! PDF rendering: load generated HTML into headless Chromium and print it.
//!
//! The browser is driven over the DevTools protocol by `chromiumoxide`. Its
//! event handler must be polled for any command to complete, so
//! [`ChromeRenderer::launch`] spawns it onto a tokio task that lives until
//! [`PdfRenderer::close`].
//!
//! Orchestration code depends only on [`RenderBackend`] and [`PdfRenderer`];
//! [`ChromeBackend`] is the production implementation.

use crate::config::{PrintOptions, RenderConfig, SettleStrategy};
use crate::error::Article2PdfError;
use crate::progress::{RenderStage, StageReporter};
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::future::Future;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Resolves once the document, its web fonts and every `<img>` have finished
/// loading. Images that fail still count as finished.
const SETTLE_SCRIPT: &str = r#"(async () => {
  if (document.readyState !== "complete") {
    await new Promise((resolve) => window.addEventListener("load", resolve, { once: true }));
  }
  if (document.fonts && document.fonts.ready) {
    await document.fonts.ready;
  }
  const pending = Array.from(document.images).filter((img) => !img.complete);
  await Promise.all(pending.map((img) => new Promise((resolve) => {
    img.addEventListener("load", resolve, { once: true });
    img.addEventListener("error", resolve, { once: true });
  })));
  return pending.length;
})()"#;

/// How long to wait for the DevTools handler task after the browser closed.
const HANDLER_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Prints HTML to PDF bytes.
pub trait PdfRenderer: Send + Sync {
    /// Render one HTML document. Reports `LoadContent`, `Settle` and
    /// `PrintPdf` through `stages` as it goes.
    fn render_pdf(
        &self,
        html: &str,
        stages: &StageReporter<'_>,
    ) -> impl Future<Output = Result<Vec<u8>, Article2PdfError>> + Send;

    /// Release the renderer. Called on success and failure paths alike.
    fn close(self) -> impl Future<Output = ()> + Send
    where
        Self: Sized;
}

/// Starts a [`PdfRenderer`]; called lazily, at most once per run.
pub trait RenderBackend: Send + Sync {
    type Renderer: PdfRenderer;

    fn launch(
        &self,
        config: &RenderConfig,
    ) -> impl Future<Output = Result<Self::Renderer, Article2PdfError>> + Send;
}

/// Headless Chromium backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChromeBackend;

impl RenderBackend for ChromeBackend {
    type Renderer = ChromeRenderer;

    async fn launch(&self, config: &RenderConfig) -> Result<ChromeRenderer, Article2PdfError> {
        ChromeRenderer::launch(config).await
    }
}

/// A running browser plus its DevTools handler task.
pub struct ChromeRenderer {
    browser: Browser,
    handler_task: JoinHandle<()>,
    settle: SettleStrategy,
    print: PrintOptions,
}

impl ChromeRenderer {
    /// Find the executable and start the browser.
    pub async fn launch(config: &RenderConfig) -> Result<Self, Article2PdfError> {
        let start = Instant::now();
        let executable = resolve_executable(config).await?;
        info!("Launching browser: {}", executable.display());

        let mut builder = BrowserConfig::builder()
            .chrome_executable(executable)
            .request_timeout(Duration::from_secs(config.request_timeout_secs))
            .window_size(1280, 1800);
        if !config.headless {
            builder = builder.with_head();
        }
        if config.no_sandbox {
            builder = builder.no_sandbox();
        }
        let browser_config = builder.build().map_err(Article2PdfError::BrowserLaunch)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| Article2PdfError::BrowserLaunch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("DevTools handler error: {}", e);
                }
            }
        });

        debug!("Browser ready in {}ms", start.elapsed().as_millis());

        Ok(Self {
            browser,
            handler_task,
            settle: config.settle,
            print: config.print.clone(),
        })
    }

    async fn render_on(
        &self,
        page: &Page,
        html: &str,
        stages: &StageReporter<'_>,
    ) -> Result<Vec<u8>, Article2PdfError> {
        stages.report(RenderStage::LoadContent);
        page.set_content(html)
            .await
            .map_err(|e| Article2PdfError::ContentLoad(e.to_string()))?;

        stages.report(RenderStage::Settle);
        settle(page, self.settle).await?;

        stages.report(RenderStage::PrintPdf);
        let start = Instant::now();
        let bytes = page
            .pdf(print_params(&self.print))
            .await
            .map_err(|e| Article2PdfError::PdfRender(e.to_string()))?;
        debug!(
            "Printed {} bytes in {}ms",
            bytes.len(),
            start.elapsed().as_millis()
        );

        if bytes.is_empty() {
            return Err(Article2PdfError::EmptyPdf);
        }
        Ok(bytes)
    }
}

impl PdfRenderer for ChromeRenderer {
    async fn render_pdf(
        &self,
        html: &str,
        stages: &StageReporter<'_>,
    ) -> Result<Vec<u8>, Article2PdfError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| Article2PdfError::ContentLoad(format!("new page: {e}")))?;

        let result = self.render_on(&page, html, stages).await;

        if let Err(e) = page.close().await {
            debug!("Failed to close page: {}", e);
        }
        result
    }

    async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser cleanly: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            debug!("Waiting for browser exit failed: {}", e);
        }
        if tokio::time::timeout(HANDLER_SHUTDOWN_GRACE, &mut self.handler_task)
            .await
            .is_err()
        {
            debug!("DevTools handler still running after close; aborting");
            self.handler_task.abort();
        }
        info!("Browser closed");
    }
}

/// Explicit path, `CHROME_PATH`, cache, system install, `PATH`; download
/// last when allowed.
async fn resolve_executable(config: &RenderConfig) -> Result<PathBuf, Article2PdfError> {
    let explicit = config.chrome_executable.clone();
    let download = config.download_browser;

    let found = tokio::task::spawn_blocking(move || {
        if download {
            chrome_auto::ensure_chrome(explicit.as_deref(), None).map(Some)
        } else {
            chrome_auto::locate_chrome(explicit.as_deref())
        }
    })
    .await
    .map_err(|e| Article2PdfError::Internal(format!("Browser lookup task panicked: {}", e)))??;

    found.ok_or(Article2PdfError::BrowserUnavailable(
        chrome_auto::ChromeAutoError::NotFound,
    ))
}

/// Apply the settle strategy. Never fails on timeout; only logs.
async fn settle(page: &Page, strategy: SettleStrategy) -> Result<(), Article2PdfError> {
    match strategy {
        SettleStrategy::FixedDelay(delay) => {
            debug!("Sleeping {}ms before printing", delay.as_millis());
            tokio::time::sleep(delay).await;
        }
        SettleStrategy::ResourcesLoaded { timeout } => {
            let params = EvaluateParams::builder()
                .expression(SETTLE_SCRIPT)
                .await_promise(true)
                .return_by_value(true)
                .build()
                .map_err(Article2PdfError::ContentLoad)?;

            let start = Instant::now();
            match tokio::time::timeout(timeout, page.evaluate_expression(params)).await {
                Ok(Ok(result)) => {
                    let waited_for = result.into_value::<u64>().unwrap_or(0);
                    debug!(
                        "Page settled in {}ms ({} images were pending)",
                        start.elapsed().as_millis(),
                        waited_for
                    );
                }
                Ok(Err(e)) => warn!("Settle check failed, printing anyway: {}", e),
                Err(_) => warn!(
                    "Page resources still loading after {}ms, printing anyway",
                    timeout.as_millis()
                ),
            }
        }
    }
    Ok(())
}

/// Map [`PrintOptions`] to the DevTools print parameters.
fn print_params(opts: &PrintOptions) -> PrintToPdfParams {
    let (width, height) = opts.paper.dimensions_inches();
    let margin = opts.margin_inches;
    PrintToPdfParams {
        landscape: Some(opts.landscape),
        print_background: Some(opts.print_background),
        scale: Some(opts.scale),
        paper_width: Some(width),
        paper_height: Some(height),
        margin_top: Some(margin),
        margin_bottom: Some(margin),
        margin_left: Some(margin),
        margin_right: Some(margin),
        prefer_css_page_size: Some(opts.prefer_css_page_size),
        ..Default::default()
    }
}
