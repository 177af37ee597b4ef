use std::fmt;
use std::pin::pin;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::error::CdpError;
use futures::{Stream, StreamExt};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::settings::Settings;

const SCROLL_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight)";

#[derive(Debug, Error)]
pub enum RenderError {
    /// The browser itself could not start. Nothing else will work either.
    #[error("failed to launch browser: {0}")]
    Launch(String),
    #[error("navigation to {url} failed: {source}")]
    Navigation {
        url: String,
        #[source]
        source: CdpError,
    },
    #[error("timed out after {timeout:?} loading {url}")]
    Timeout { url: String, timeout: Duration },
    #[error("script evaluation on {url} failed: {source}")]
    Script {
        url: String,
        #[source]
        source: CdpError,
    },
}

impl RenderError {
    /// Per-page failures are skipped; launch failures end the run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RenderError::Launch(_))
    }
}

/// DOM snapshot of a fully scrolled page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub url: String,
    pub html: String,
}

#[async_trait(?Send)]
pub trait Renderer {
    /// Load `url`, scroll to the bottom `scrolls` times, and snapshot the DOM.
    async fn render(&self, url: &str, scrolls: usize) -> Result<RenderedPage, RenderError>;
}

/// Headless Chromium, one browser process per render call.
pub struct ChromeRenderer {
    nav_timeout: Duration,
    settle: Duration,
    scroll_pause: Duration,
}

impl ChromeRenderer {
    pub fn new(settings: &Settings) -> Self {
        Self {
            nav_timeout: settings.nav_timeout(),
            settle: settings.settle(),
            scroll_pause: settings.scroll_pause(),
        }
    }

    async fn load(
        &self,
        browser: &Browser,
        url: &str,
        scrolls: usize,
    ) -> Result<RenderedPage, RenderError> {
        let navigation = async {
            let page = browser.new_page(url).await?;
            page.wait_for_navigation().await?;
            Ok::<_, CdpError>(page)
        };
        let page = tokio::time::timeout(self.nav_timeout, navigation)
            .await
            .map_err(|_| RenderError::Timeout {
                url: url.to_string(),
                timeout: self.nav_timeout,
            })?
            .map_err(|source| RenderError::Navigation {
                url: url.to_string(),
                source,
            })?;

        tokio::time::sleep(self.settle).await;

        // Infinite-scroll calendars only load more events once scrolled.
        for _ in 0..scrolls {
            page.evaluate(SCROLL_SCRIPT)
                .await
                .map_err(|source| RenderError::Script {
                    url: url.to_string(),
                    source,
                })?;
            tokio::time::sleep(self.scroll_pause).await;
        }

        let html = page.content().await.map_err(|source| RenderError::Script {
            url: url.to_string(),
            source,
        })?;
        debug!("Snapshot of {} is {} bytes", url, html.len());

        Ok(RenderedPage {
            url: url.to_string(),
            html,
        })
    }
}

#[async_trait(?Send)]
impl Renderer for ChromeRenderer {
    async fn render(&self, url: &str, scrolls: usize) -> Result<RenderedPage, RenderError> {
        let config = BrowserConfig::builder()
            .request_timeout(self.nav_timeout)
            .build()
            .map_err(RenderError::Launch)?;

        let (mut browser, handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            drain_handler(handler).await;
        });

        info!("Loading {}...", url);
        let result = self.load(&browser, url, scrolls).await;

        // Always tear the browser down, whatever happened above.
        if let Err(e) = browser.close().await {
            warn!("Failed to close browser cleanly: {}", e);
        }
        if let Err(e) = browser.wait().await {
            warn!("Failed to reap browser process: {}", e);
        }
        handler_task.abort();

        result
    }
}

/// Poll the CDP event stream until it ends, returning how many events failed.
///
/// Undecodable messages surface as errors but leave the session usable, so
/// polling carries on past them.
async fn drain_handler<S, T, E>(events: S) -> usize
where
    S: Stream<Item = Result<T, E>>,
    E: fmt::Display,
{
    let mut events = pin!(events);
    let mut failed = 0;
    while let Some(event) = events.next().await {
        if let Err(e) = event {
            debug!("CDP handler error: {}", e);
            failed += 1;
        }
    }
    failed
}
