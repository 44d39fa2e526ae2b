//! Traits shared by the client facade and the server-side engine.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::action::Action;
use crate::state::BrowserState;

/// The browser operations a decision loop drives, independent of whether
/// they execute in-process or across the wire.
///
/// Implemented by engine contexts on the server and by the remote facade on
/// the client, so the same loop runs against either.
#[async_trait]
pub trait BrowserSurface: Send {
    async fn navigate(&mut self, url: &str) -> anyhow::Result<()>;

    async fn browser_state(&mut self) -> anyhow::Result<BrowserState>;

    /// Returns the action's result payload, or `None` when the action has
    /// no return value.
    async fn execute_action(&mut self, action: Action) -> anyhow::Result<Option<Value>>;

    async fn page_content(&mut self) -> anyhow::Result<String>;
}

/// The external reasoning component that chooses which browser operations
/// to issue to accomplish a task.
#[async_trait]
pub trait DecisionLoop: Send + Sync {
    async fn run(
        &self,
        browser: &mut dyn BrowserSurface,
        task: &str,
        max_steps: u32,
    ) -> anyhow::Result<AgentRunOutcome>;
}

/// Result of one agent run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentRunOutcome {
    pub final_result: Option<String>,
    pub is_done: bool,
    #[serde(default)]
    pub errors: Vec<String>,
}
