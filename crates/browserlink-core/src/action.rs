//! Structured browser actions carried by `execute_action`.

use serde::{Deserialize, Serialize};

/// One browser action, executed against a session's context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    /// Click the first element matching `selector`.
    Click { selector: String },

    /// Type text into the element matching `selector`.
    TypeText { selector: String, text: String },

    /// Extract the text content of the element matching `selector`.
    ExtractText { selector: String },

    /// Evaluate a JavaScript expression and return its JSON result.
    Evaluate { expression: String },

    /// Wait until `selector` matches, up to `timeout_ms`.
    WaitFor {
        selector: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },

    /// Capture the current viewport as a base64 PNG.
    Screenshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_wire_shape() {
        let action = Action::Click {
            selector: "#submit".into(),
        };
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value["kind"], "click");
        assert_eq!(value["selector"], "#submit");
    }

    #[test]
    fn test_action_missing_fields_rejected() {
        // a click with no selector must not parse
        assert!(serde_json::from_str::<Action>(r#"{"kind": "click"}"#).is_err());
        assert!(serde_json::from_str::<Action>(r#"{}"#).is_err());
    }

    #[test]
    fn test_wait_for_optional_timeout() {
        let action: Action =
            serde_json::from_str(r#"{"kind": "wait_for", "selector": ".loaded"}"#).unwrap();
        assert_eq!(
            action,
            Action::WaitFor {
                selector: ".loaded".into(),
                timeout_ms: None,
            }
        );
    }
}
