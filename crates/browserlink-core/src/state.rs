//! Structured page snapshot returned by `get_state`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of a browser context's current page.
///
/// Produced by the engine, consumed opaquely by the protocol layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserState {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub tabs: Vec<TabInfo>,
    /// Base64-encoded PNG of the viewport, when the engine captures one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    pub captured_at: DateTime<Utc>,
}

/// One open tab within a context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabInfo {
    pub url: String,
    pub title: String,
    pub active: bool,
}
