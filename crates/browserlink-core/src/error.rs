//! Error taxonomy for command execution.

use thiserror::Error;

use crate::protocol::Response;

/// A per-command failure. Every variant converts to an error [`Response`]
/// through [`CommandError::into_response`]; none of them terminate the
/// connection.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Unknown command")]
    UnknownCommand,

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("State capture failed: {0}")]
    StateCapture(String),

    #[error("Content fetch failed: {0}")]
    ContentFetch(String),

    #[error("Action failed: {0}")]
    ActionExecution(String),

    #[error("Agent run failed: {0}")]
    AgentRun(String),
}

impl CommandError {
    /// The single error-to-response mapping used by the dispatcher.
    pub fn into_response(self) -> Response {
        Response::error(self.to_string())
    }
}

/// Browser context creation failed during connection setup. Fatal to the
/// connection attempt: the handshake is aborted before the command loop.
#[derive(Debug, Error)]
#[error("failed to create browser context: {0}")]
pub struct SessionCreateError(pub String);
