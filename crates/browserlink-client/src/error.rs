//! Client-side failure taxonomy.

use thiserror::Error;

use browserlink_core::protocol::DecodeError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Protocol violation: {0}")]
    Protocol(String),

    /// The server answered with `status: error`.
    #[error("Remote error: {message}")]
    Remote { message: String },

    #[error("Agent run failed: {0}")]
    AgentRun(String),
}

impl From<DecodeError> for ClientError {
    fn from(e: DecodeError) -> Self {
        ClientError::Protocol(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
