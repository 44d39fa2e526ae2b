//! chromiumoxide CDP backend.
//!
//! Drives a real Chrome/Chromium over the DevTools protocol. Each Browserlink
//! context owns one dedicated page, matching how the rest of the stack treats
//! a context: a single current page per session.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::{Browser, Page};
use chrono::Utc;
use futures::StreamExt;
use serde_json::Value;
use tracing::{debug, warn};

use browserlink_core::action::Action;
use browserlink_core::config::BrowserConfig;
use browserlink_core::state::{BrowserState, TabInfo};
use browserlink_core::surface::BrowserSurface;

use crate::{BrowserContext, BrowserEngine};

/// Engine backed by one launched Chrome/Chromium instance.
pub struct CdpEngine {
    browser: Browser,
    timeout: Duration,
    handler_task: tokio::task::JoinHandle<()>,
}

impl CdpEngine {
    /// Launch the browser process and start its event handler.
    pub async fn launch(config: &BrowserConfig) -> anyhow::Result<Self> {
        let mut builder = chromiumoxide::BrowserConfig::builder();
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &config.chrome_path {
            builder = builder.chrome_executable(path.clone());
        }
        let browser_config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(browser_config).await?;

        // The handler stream must be polled for the browser to function.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(%e, "CDP handler event error");
                }
            }
        });

        debug!("Browser launched");
        Ok(Self {
            browser,
            timeout: Duration::from_millis(config.timeout_ms),
            handler_task,
        })
    }

    /// Close the browser process.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!(%e, "Browser close failed");
        }
        self.handler_task.abort();
    }
}

#[async_trait]
impl BrowserEngine for CdpEngine {
    async fn new_context(&self) -> anyhow::Result<Box<dyn BrowserContext>> {
        let page = self.browser.new_page("about:blank").await?;
        Ok(Box::new(CdpContext {
            page,
            timeout: self.timeout,
            closed: false,
        }))
    }
}

/// One CDP-backed context with its dedicated page.
pub struct CdpContext {
    page: Page,
    timeout: Duration,
    closed: bool,
}

impl CdpContext {
    fn ensure_open(&self) -> anyhow::Result<()> {
        if self.closed {
            anyhow::bail!("context is closed");
        }
        Ok(())
    }

    async fn eval_string(&self, expression: &str) -> anyhow::Result<String> {
        let value: Option<String> = self
            .page
            .evaluate(expression)
            .await?
            .into_value()
            .unwrap_or_default();
        Ok(value.unwrap_or_default())
    }
}

#[async_trait]
impl BrowserSurface for CdpContext {
    async fn navigate(&mut self, url: &str) -> anyhow::Result<()> {
        self.ensure_open()?;
        tokio::time::timeout(self.timeout, self.page.goto(url))
            .await
            .map_err(|_| anyhow::anyhow!("navigation to {url} timed out"))??;
        debug!(url, "CDP navigate");
        Ok(())
    }

    async fn browser_state(&mut self) -> anyhow::Result<BrowserState> {
        self.ensure_open()?;
        let title = self.eval_string("document.title").await?;
        let url = self.eval_string("window.location.href").await?;
        let screenshot = self
            .page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .build(),
            )
            .await
            .ok()
            .map(|bytes| base64::engine::general_purpose::STANDARD.encode(&bytes));
        Ok(BrowserState {
            tabs: vec![TabInfo {
                url: url.clone(),
                title: title.clone(),
                active: true,
            }],
            url,
            title,
            screenshot,
            captured_at: Utc::now(),
        })
    }

    async fn execute_action(&mut self, action: Action) -> anyhow::Result<Option<Value>> {
        self.ensure_open()?;
        match action {
            Action::Click { selector } => {
                let element = self.page.find_element(&selector).await?;
                element.click().await?;
                Ok(None)
            }
            Action::TypeText { selector, text } => {
                let element = self.page.find_element(&selector).await?;
                element.click().await?;
                element.type_str(&text).await?;
                Ok(None)
            }
            Action::ExtractText { selector } => {
                let quoted = serde_json::to_string(&selector)?;
                let text: Option<String> = self
                    .page
                    .evaluate(format!("document.querySelector({quoted})?.textContent"))
                    .await?
                    .into_value()
                    .unwrap_or_default();
                Ok(text.map(Value::String))
            }
            Action::Evaluate { expression } => {
                let value: Value = self.page.evaluate(expression).await?.into_value()?;
                Ok(Some(value))
            }
            Action::WaitFor {
                selector,
                timeout_ms,
            } => {
                let deadline = tokio::time::Instant::now()
                    + timeout_ms.map_or(self.timeout, Duration::from_millis);
                while self.page.find_element(&selector).await.is_err() {
                    if tokio::time::Instant::now() >= deadline {
                        anyhow::bail!("timed out waiting for {selector}");
                    }
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
                Ok(None)
            }
            Action::Screenshot => {
                let bytes = self
                    .page
                    .screenshot(
                        ScreenshotParams::builder()
                            .format(CaptureScreenshotFormat::Png)
                            .build(),
                    )
                    .await?;
                Ok(Some(Value::String(
                    base64::engine::general_purpose::STANDARD.encode(&bytes),
                )))
            }
        }
    }

    async fn page_content(&mut self) -> anyhow::Result<String> {
        self.ensure_open()?;
        Ok(self.page.content().await?)
    }
}

#[async_trait]
impl BrowserContext for CdpContext {
    async fn close(&mut self) -> anyhow::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.page.clone().close().await?;
        debug!("CDP context closed");
        Ok(())
    }

    fn as_surface(&mut self) -> &mut dyn BrowserSurface {
        self
    }
}
