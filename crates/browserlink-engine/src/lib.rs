//! Browser engine boundary.
//!
//! The server talks to browsers exclusively through [`BrowserEngine`] and
//! [`BrowserContext`]. Two backends ship here: an in-memory engine used by
//! tests and CDP-less builds, and a chromiumoxide backend behind the `cdp`
//! feature flag (requires Chrome/Chromium installed).

pub mod stub;

#[cfg(feature = "cdp")]
pub mod cdp;

use async_trait::async_trait;

use browserlink_core::surface::BrowserSurface;

pub use stub::StubEngine;

#[cfg(feature = "cdp")]
pub use cdp::CdpEngine;

/// Launches isolated browsing contexts.
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    /// Create a fresh, isolated context (own cookies, pages, history).
    async fn new_context(&self) -> anyhow::Result<Box<dyn BrowserContext>>;
}

/// One isolated browsing context, owned by exactly one session at a time.
///
/// Everything a decision loop needs lives on the [`BrowserSurface`]
/// supertrait; `close` exists so the session registry can release engine
/// resources deterministically.
#[async_trait]
pub trait BrowserContext: BrowserSurface {
    /// Release the context. Idempotent; operations after close fail.
    async fn close(&mut self) -> anyhow::Result<()>;

    /// Upcast for driving a decision loop against this context.
    fn as_surface(&mut self) -> &mut dyn BrowserSurface;
}
