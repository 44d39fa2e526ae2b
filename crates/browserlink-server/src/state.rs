//! Shared server state.

use std::sync::Arc;

use tokio::sync::RwLock;

use browserlink_core::config::Config;
use browserlink_core::surface::DecisionLoop;
use browserlink_engine::BrowserEngine;

use crate::registry::SessionRegistry;

/// State shared by every connection task and the HTTP surface. The registry
/// is the only synchronized structure; browser contexts themselves are never
/// reached from more than one task.
pub struct ServerState {
    pub config: Config,
    pub registry: SessionRegistry,
    pub agent: Option<HostedAgent>,
}

/// A server-hosted decision loop, bound to a task description that
/// `run_agent` commands may override.
pub struct HostedAgent {
    pub decision: Arc<dyn DecisionLoop>,
    pub task: RwLock<Option<String>>,
}

impl ServerState {
    pub fn new(config: Config, engine: Arc<dyn BrowserEngine>) -> Self {
        Self {
            registry: SessionRegistry::new(engine),
            config,
            agent: None,
        }
    }

    /// Host a decision loop, making `run_agent` answerable. The initial
    /// bound task comes from config.
    pub fn with_agent(mut self, decision: Arc<dyn DecisionLoop>) -> Self {
        let task = RwLock::new(self.config.agent.task.clone());
        self.agent = Some(HostedAgent { decision, task });
        self
    }
}
