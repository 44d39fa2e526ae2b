//! Remote browser facade.
//!
//! Presents the remote session's browser as local async calls. The
//! underlying WebSocket opens lazily on first use and is closed explicitly
//! by the owning run; every call sends exactly one command and awaits
//! exactly one response on the same connection.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;

use browserlink_core::action::Action;
use browserlink_core::protocol::{self, Command, Response, ResponseBody};
use browserlink_core::state::BrowserState;
use browserlink_core::surface::{AgentRunOutcome, BrowserSurface};

use crate::error::{ClientError, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Drives a browser hosted by a Browserlink server. One facade owns one
/// connection, and therefore one server-side session.
pub struct RemoteBrowser {
    server_url: String,
    stream: Option<WsStream>,
}

impl RemoteBrowser {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            stream: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Open the connection if it is not already open.
    pub async fn connect(&mut self) -> Result<()> {
        if self.stream.is_none() {
            let (stream, _) = connect_async(&self.server_url)
                .await
                .map_err(|e| ClientError::Connect(e.to_string()))?;
            debug!(url = %self.server_url, "Connected to browser server");
            self.stream = Some(stream);
        }
        Ok(())
    }

    /// Close the connection. Safe to call when not connected; the next call
    /// through the facade reconnects on demand.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.close(None).await;
            debug!("Connection closed");
        }
    }

    /// One command out, one response in, same connection. A transport
    /// failure invalidates the connection so later calls reconnect.
    async fn send_command(&mut self, command: &Command) -> Result<Response> {
        self.connect().await?;
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| ClientError::Connect("not connected".into()))?;

        let result = exchange(stream, command).await;
        if matches!(result, Err(ClientError::Transport(_))) {
            self.stream = None;
        }
        result
    }

    /// Navigate the remote page to `url`.
    pub async fn navigate(&mut self, url: &str) -> Result<()> {
        let response = self
            .send_command(&Command::Goto { url: url.into() })
            .await?;
        expect_success(response)?;
        Ok(())
    }

    /// Capture a structured snapshot of the remote page.
    pub async fn browser_state(&mut self) -> Result<BrowserState> {
        let response = self.send_command(&Command::GetState).await?;
        match expect_success(response)? {
            ResponseBody::State { state } => Ok(state),
            other => Err(ClientError::Protocol(format!(
                "unexpected get_state payload: {other:?}"
            ))),
        }
    }

    /// Run one structured action on the remote browser. `None` means the
    /// action had no return value.
    pub async fn execute_action(&mut self, action: &Action) -> Result<Option<Value>> {
        let raw = serde_json::to_value(action).map_err(|e| ClientError::Protocol(e.to_string()))?;
        let response = self
            .send_command(&Command::ExecuteAction { action: Some(raw) })
            .await?;
        match expect_success(response)? {
            ResponseBody::ActionResult {
                result: Value::Null,
            } => Ok(None),
            ResponseBody::ActionResult { result } => Ok(Some(result)),
            other => Err(ClientError::Protocol(format!(
                "unexpected execute_action payload: {other:?}"
            ))),
        }
    }

    /// Fetch the remote page's raw markup.
    pub async fn page_content(&mut self) -> Result<String> {
        let response = self.send_command(&Command::GetPageContent).await?;
        match expect_success(response)? {
            ResponseBody::PageContent { content } => Ok(content),
            other => Err(ClientError::Protocol(format!(
                "unexpected get_page_content payload: {other:?}"
            ))),
        }
    }

    /// Ask a hosting server to run its decision loop. One command on the
    /// wire, however many browser operations the server performs inside.
    pub async fn run_agent(
        &mut self,
        task: Option<&str>,
        max_steps: Option<u32>,
    ) -> Result<AgentRunOutcome> {
        let response = self
            .send_command(&Command::RunAgent {
                task: task.map(Into::into),
                max_steps,
            })
            .await?;
        match expect_success(response)? {
            ResponseBody::AgentRun {
                result,
                is_done,
                errors,
            } => Ok(AgentRunOutcome {
                final_result: result,
                is_done,
                errors,
            }),
            other => Err(ClientError::Protocol(format!(
                "unexpected run_agent payload: {other:?}"
            ))),
        }
    }
}

async fn exchange(stream: &mut WsStream, command: &Command) -> Result<Response> {
    let frame =
        protocol::encode_command(command).map_err(|e| ClientError::Protocol(e.to_string()))?;
    stream
        .send(Message::Text(frame.into()))
        .await
        .map_err(|e| ClientError::Transport(e.to_string()))?;

    while let Some(message) = stream.next().await {
        let message = message.map_err(|e| ClientError::Transport(e.to_string()))?;
        match message {
            Message::Text(text) => return Ok(protocol::decode_response(text.as_str())?),
            Message::Close(_) => {
                return Err(ClientError::Transport("closed by server".into()));
            }
            _ => continue,
        }
    }
    Err(ClientError::Transport(
        "connection dropped before response".into(),
    ))
}

fn expect_success(response: Response) -> Result<ResponseBody> {
    match response {
        Response::Success(body) => Ok(body),
        Response::Error { message } => Err(ClientError::Remote { message }),
    }
}

/// The facade is itself a [`BrowserSurface`], so a decision loop runs
/// against a remote browser exactly as it would against a local context.
#[async_trait]
impl BrowserSurface for RemoteBrowser {
    async fn navigate(&mut self, url: &str) -> anyhow::Result<()> {
        Ok(RemoteBrowser::navigate(self, url).await?)
    }

    async fn browser_state(&mut self) -> anyhow::Result<BrowserState> {
        Ok(RemoteBrowser::browser_state(self).await?)
    }

    async fn execute_action(&mut self, action: Action) -> anyhow::Result<Option<Value>> {
        Ok(RemoteBrowser::execute_action(self, &action).await?)
    }

    async fn page_content(&mut self) -> anyhow::Result<String> {
        Ok(RemoteBrowser::page_content(self).await?)
    }
}
