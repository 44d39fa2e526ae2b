//! In-memory browser engine.
//!
//! Stands in for a real browser wherever one is unavailable: unit and
//! integration tests, and builds without the `cdp` feature. Contexts keep
//! their state in plain fields and synthesize page markup on navigation.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use base64::Engine as _;
use chrono::Utc;
use serde_json::{Value, json};
use tracing::debug;

use browserlink_core::action::Action;
use browserlink_core::state::{BrowserState, TabInfo};
use browserlink_core::surface::BrowserSurface;

use crate::{BrowserContext, BrowserEngine};

/// Engine whose contexts live entirely in memory.
pub struct StubEngine {
    contexts_created: AtomicU64,
    refuse_contexts: bool,
}

impl StubEngine {
    pub fn new() -> Self {
        Self {
            contexts_created: AtomicU64::new(0),
            refuse_contexts: false,
        }
    }

    /// An engine that fails every `new_context` call, for exercising the
    /// session-setup failure path.
    pub fn refusing() -> Self {
        Self {
            contexts_created: AtomicU64::new(0),
            refuse_contexts: true,
        }
    }

    /// How many contexts this engine has handed out.
    pub fn contexts_created(&self) -> u64 {
        self.contexts_created.load(Ordering::SeqCst)
    }
}

impl Default for StubEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrowserEngine for StubEngine {
    async fn new_context(&self) -> anyhow::Result<Box<dyn BrowserContext>> {
        if self.refuse_contexts {
            anyhow::bail!("engine refused to create a context");
        }
        let id = self.contexts_created.fetch_add(1, Ordering::SeqCst);
        debug!(context_id = id, "Stub context created");
        Ok(Box::new(StubContext {
            id,
            url: None,
            title: None,
            content: None,
            closed: false,
        }))
    }
}

/// An in-memory browsing context. Navigation synthesizes a small HTML page
/// for the target URL so content and state stay self-consistent.
pub struct StubContext {
    id: u64,
    url: Option<String>,
    title: Option<String>,
    content: Option<String>,
    closed: bool,
}

impl StubContext {
    fn ensure_open(&self) -> anyhow::Result<()> {
        if self.closed {
            anyhow::bail!("context is closed");
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserSurface for StubContext {
    async fn navigate(&mut self, url: &str) -> anyhow::Result<()> {
        self.ensure_open()?;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            anyhow::bail!("unsupported url: {url}");
        }
        let title = format!("Stub page for {url}");
        self.content = Some(format!(
            "<html><head><title>{title}</title></head><body><h1>{url}</h1></body></html>"
        ));
        self.title = Some(title);
        self.url = Some(url.to_string());
        debug!(context_id = self.id, url, "Stub navigate");
        Ok(())
    }

    async fn browser_state(&mut self) -> anyhow::Result<BrowserState> {
        self.ensure_open()?;
        let url = self.url.clone().unwrap_or_else(|| "about:blank".into());
        let title = self.title.clone().unwrap_or_default();
        Ok(BrowserState {
            tabs: vec![TabInfo {
                url: url.clone(),
                title: title.clone(),
                active: true,
            }],
            url,
            title,
            screenshot: None,
            captured_at: Utc::now(),
        })
    }

    async fn execute_action(&mut self, action: Action) -> anyhow::Result<Option<Value>> {
        self.ensure_open()?;
        match action {
            Action::Click { selector } => {
                debug!(context_id = self.id, %selector, "Stub click");
                Ok(None)
            }
            Action::TypeText { selector, text } => {
                debug!(context_id = self.id, %selector, len = text.len(), "Stub type");
                Ok(None)
            }
            Action::ExtractText { selector } => {
                let title = self
                    .title
                    .as_ref()
                    .ok_or_else(|| anyhow::anyhow!("no page loaded"))?;
                Ok(Some(json!({ "selector": selector, "text": title })))
            }
            Action::Evaluate { .. } => {
                anyhow::bail!("evaluate is not supported by the in-memory engine")
            }
            Action::WaitFor { .. } => Ok(None),
            Action::Screenshot => {
                let png = base64::engine::general_purpose::STANDARD.encode(b"stub-png");
                Ok(Some(Value::String(png)))
            }
        }
    }

    async fn page_content(&mut self) -> anyhow::Result<String> {
        self.ensure_open()?;
        Ok(self
            .content
            .clone()
            .unwrap_or_else(|| "<html><head></head><body></body></html>".into()))
    }
}

#[async_trait]
impl BrowserContext for StubContext {
    async fn close(&mut self) -> anyhow::Result<()> {
        if !self.closed {
            debug!(context_id = self.id, "Stub context closed");
            self.closed = true;
        }
        Ok(())
    }

    fn as_surface(&mut self) -> &mut dyn BrowserSurface {
        self
    }
}
