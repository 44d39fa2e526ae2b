//! Run-scoped agent driving a remote browser.

use tracing::info;

use browserlink_core::surface::{AgentRunOutcome, DecisionLoop};

use crate::client::RemoteBrowser;
use crate::error::{ClientError, Result};

/// Drives a [`DecisionLoop`] against a remote browser.
///
/// The connection is acquired when the run starts and released when it
/// ends, success or failure — connection lifetime is scoped to the run,
/// not to individual calls.
pub struct RemoteAgent<D> {
    task: String,
    browser: RemoteBrowser,
    decision: D,
}

impl<D: DecisionLoop> RemoteAgent<D> {
    pub fn new(task: impl Into<String>, browser: RemoteBrowser, decision: D) -> Self {
        Self {
            task: task.into(),
            browser,
            decision,
        }
    }

    /// Run the decision loop to completion or `max_steps`.
    pub async fn run(&mut self, max_steps: u32) -> Result<AgentRunOutcome> {
        self.browser.connect().await?;
        info!(task = %self.task, max_steps, "Agent run started");

        let result = self
            .decision
            .run(&mut self.browser, &self.task, max_steps)
            .await;

        self.browser.close().await;

        match result {
            Ok(outcome) => {
                info!(is_done = outcome.is_done, "Agent run finished");
                Ok(outcome)
            }
            Err(e) => Err(ClientError::AgentRun(e.to_string())),
        }
    }

    /// The underlying facade, for issuing calls outside a run.
    pub fn browser_mut(&mut self) -> &mut RemoteBrowser {
        &mut self.browser
    }
}
