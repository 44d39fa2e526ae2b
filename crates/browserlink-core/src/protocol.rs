//! Browserlink wire protocol.
//!
//! All traffic is JSON-over-WebSocket: one text frame carries one [`Command`]
//! (client -> server) or one [`Response`] (server -> client). A connection
//! exchanges them strictly in lockstep — exactly one response per command,
//! in command order.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::state::BrowserState;

/// Command kinds the protocol knows. Anything else decodes to
/// [`Command::Unknown`] so the dispatcher can answer with an error response
/// instead of killing the connection.
const KNOWN_COMMANDS: &[&str] = &[
    "goto",
    "get_state",
    "execute_action",
    "get_page_content",
    "run_agent",
];

/// A client -> server command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Navigate the session's current page to `url`.
    Goto { url: String },

    /// Capture a structured snapshot of the current page.
    GetState,

    /// Run one structured browser action. The payload stays raw here; the
    /// dispatcher validates it so a bad action is recoverable.
    ExecuteAction {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        action: Option<Value>,
    },

    /// Fetch the current page's raw markup.
    GetPageContent,

    /// Run the server-hosted decision loop to completion or `max_steps`.
    RunAgent {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_steps: Option<u32>,
    },

    /// A well-formed frame whose `type` this protocol does not know.
    /// Never serialized; constructed only by [`decode_command`].
    #[serde(skip)]
    Unknown { kind: String },
}

/// A server -> client response. The success body merges into the frame
/// beside the `status` tag, so a bare success is just `{"status":"success"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Success(ResponseBody),
    Error { message: String },
}

/// Command-specific success payload, merged into the response frame.
///
/// Untagged: variants are tried in declaration order during deserialization,
/// so the more field-rich shapes come first and `Empty` stays last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseBody {
    /// `run_agent` outcome.
    AgentRun {
        result: Option<String>,
        is_done: bool,
        errors: Vec<String>,
    },
    /// `get_state` snapshot.
    State { state: BrowserState },
    /// `get_page_content` markup.
    PageContent { content: String },
    /// `execute_action` result. The key is always present (`null` when the
    /// action produced no value) so the shape stays distinguishable from
    /// `Empty`.
    ActionResult { result: Value },
    /// `goto` and anything else with nothing to report beyond status.
    Empty {},
}

impl Response {
    pub fn success(body: ResponseBody) -> Self {
        Response::Success(body)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Response::Error {
            message: message.into(),
        }
    }
}

/// Decode failure. Connection-fatal: the frame cannot be attributed to any
/// command, so no response can be paired with it.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed frame: {0}")]
    Malformed(String),
}

/// Decode one wire frame into a [`Command`].
///
/// Unknown-but-well-formed `type` values succeed as [`Command::Unknown`];
/// a known `type` with an ill-formed payload is malformed.
pub fn decode_command(text: &str) -> Result<Command, DecodeError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| DecodeError::Malformed(e.to_string()))?;
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| DecodeError::Malformed("missing `type` field".into()))?;
    if !KNOWN_COMMANDS.contains(&kind) {
        return Ok(Command::Unknown {
            kind: kind.to_string(),
        });
    }
    serde_json::from_value(value).map_err(|e| DecodeError::Malformed(e.to_string()))
}

pub fn encode_command(command: &Command) -> Result<String, serde_json::Error> {
    serde_json::to_string(command)
}

pub fn decode_response(text: &str) -> Result<Response, DecodeError> {
    serde_json::from_str(text).map_err(|e| DecodeError::Malformed(e.to_string()))
}

/// Encode a response for the wire. Never fails: a payload that cannot be
/// serialized degrades to an error frame describing the failure instead of
/// propagating across the wire boundary.
pub fn encode_response(response: &Response) -> String {
    match serde_json::to_string(response) {
        Ok(text) => text,
        Err(e) => {
            let fallback = Response::error(format!("unserializable response payload: {e}"));
            serde_json::to_string(&fallback).unwrap_or_else(|_| {
                r#"{"status":"error","message":"unserializable response payload"}"#.to_string()
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn roundtrip(command: Command) {
        let encoded = encode_command(&command).unwrap();
        let decoded = decode_command(&encoded).unwrap();
        assert_eq!(decoded, command);
    }

    #[test]
    fn test_command_roundtrip_all_kinds() {
        roundtrip(Command::Goto {
            url: "https://example.com".into(),
        });
        roundtrip(Command::GetState);
        roundtrip(Command::ExecuteAction {
            action: Some(json!({"kind": "click", "selector": "#submit"})),
        });
        roundtrip(Command::ExecuteAction { action: None });
        roundtrip(Command::GetPageContent);
        roundtrip(Command::RunAgent {
            task: Some("find the pricing page".into()),
            max_steps: Some(25),
        });
        roundtrip(Command::RunAgent {
            task: None,
            max_steps: None,
        });
    }

    #[test]
    fn test_command_wire_shape() {
        let encoded = encode_command(&Command::Goto {
            url: "https://example.com".into(),
        })
        .unwrap();
        let value: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value["type"], "goto");
        assert_eq!(value["url"], "https://example.com");
    }

    #[test]
    fn test_decode_unknown_type_is_not_fatal() {
        let decoded = decode_command(r#"{"type": "foo", "whatever": 1}"#).unwrap();
        assert_eq!(
            decoded,
            Command::Unknown {
                kind: "foo".into()
            }
        );
    }

    #[test]
    fn test_decode_malformed_json() {
        assert!(decode_command("{not json").is_err());
    }

    #[test]
    fn test_decode_missing_type() {
        assert!(decode_command(r#"{"url": "https://example.com"}"#).is_err());
        assert!(decode_command("42").is_err());
    }

    #[test]
    fn test_decode_known_type_bad_payload_is_malformed() {
        // `goto` without a url cannot become a command
        assert!(decode_command(r#"{"type": "goto"}"#).is_err());
    }

    #[test]
    fn test_response_empty_success_shape() {
        let text = encode_response(&Response::success(ResponseBody::Empty {}));
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, json!({"status": "success"}));
    }

    #[test]
    fn test_response_error_shape() {
        let text = encode_response(&Response::error("Unknown command"));
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["message"], "Unknown command");
    }

    #[test]
    fn test_response_body_roundtrips() {
        for body in [
            ResponseBody::Empty {},
            ResponseBody::PageContent {
                content: "<html></html>".into(),
            },
            ResponseBody::ActionResult {
                result: Value::Null,
            },
            ResponseBody::ActionResult {
                result: json!({"clicked": true}),
            },
            ResponseBody::AgentRun {
                result: Some("done".into()),
                is_done: true,
                errors: vec![],
            },
        ] {
            let response = Response::success(body);
            let text = encode_response(&response);
            assert_eq!(decode_response(&text).unwrap(), response);
        }
    }

    #[test]
    fn test_response_state_roundtrip() {
        let state = crate::state::BrowserState {
            url: "https://example.com".into(),
            title: "Example".into(),
            tabs: vec![crate::state::TabInfo {
                url: "https://example.com".into(),
                title: "Example".into(),
                active: true,
            }],
            screenshot: None,
            captured_at: chrono::Utc::now(),
        };
        let response = Response::success(ResponseBody::State { state });
        let text = encode_response(&response);
        assert_eq!(decode_response(&text).unwrap(), response);
    }
}
