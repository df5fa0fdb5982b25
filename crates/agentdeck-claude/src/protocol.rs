//! Stream-json wire shapes exchanged with the `claude` process.
//!
//! Every line on stdout is one JSON object. Lines whose `type` is a control
//! message drive the permission protocol; everything else is an agent message
//! forwarded to the caller untouched.

use agentdeck_core::{AgentMessage, PermissionResult};
use serde::Deserialize;
use serde_json::{Value, json};

/// Control request subtype asking whether a tool may run.
pub const CAN_USE_TOOL: &str = "can_use_tool";

/// Body of an inbound `control_request`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ControlRequestBody {
    /// Request kind.
    pub subtype: String,
    /// Tool name, for `can_use_tool`.
    #[serde(default)]
    pub tool_name: Option<String>,
    /// Proposed tool input, for `can_use_tool`.
    #[serde(default)]
    pub input: Option<Value>,
}

/// One parsed stdout line.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// The process asks us something.
    ControlRequest {
        /// Correlation id for the reply.
        request_id: String,
        /// What is asked.
        request: ControlRequestBody,
    },
    /// The process withdrew an earlier control request.
    ControlCancel {
        /// Id of the withdrawn request.
        request_id: String,
    },
    /// Reply to one of our control requests.
    ControlResponse(Value),
    /// Anything else.
    Message(AgentMessage),
}

#[derive(Deserialize)]
struct RawControlRequest {
    request_id: String,
    request: ControlRequestBody,
}

#[derive(Deserialize)]
struct RawCancel {
    request_id: String,
}

/// Parse one stdout line. Blank lines yield `None`.
///
/// # Errors
///
/// Returns an error if the line is not a JSON object or a control message is
/// malformed.
pub fn parse_line(line: &str) -> Result<Option<Inbound>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(line)?;
    if !value.is_object() {
        return Err(serde::de::Error::custom("expected a JSON object"));
    }

    let inbound = match value.get("type").and_then(Value::as_str) {
        Some("control_request") => {
            let raw: RawControlRequest = serde_json::from_value(value)?;
            Inbound::ControlRequest {
                request_id: raw.request_id,
                request: raw.request,
            }
        },
        Some("control_cancel_request") => {
            let raw: RawCancel = serde_json::from_value(value)?;
            Inbound::ControlCancel {
                request_id: raw.request_id,
            }
        },
        Some("control_response") => Inbound::ControlResponse(value),
        _ => Inbound::Message(AgentMessage::new(value)),
    };
    Ok(Some(inbound))
}

fn control_request(request_id: &str, request: Value) -> Value {
    json!({
        "type": "control_request",
        "request_id": request_id,
        "request": request,
    })
}

/// Handshake sent before the prompt.
#[must_use]
pub fn initialize_request(request_id: &str) -> Value {
    control_request(request_id, json!({ "subtype": "initialize", "hooks": null }))
}

/// Ask the process to stop the current turn.
#[must_use]
pub fn interrupt_request(request_id: &str) -> Value {
    control_request(request_id, json!({ "subtype": "interrupt" }))
}

/// The prompt, as a streamed user message.
#[must_use]
pub fn user_message(prompt: &str) -> Value {
    json!({
        "type": "user",
        "session_id": "",
        "parent_tool_use_id": null,
        "message": {
            "role": "user",
            "content": prompt,
        },
    })
}

/// Successful reply carrying a permission verdict.
#[must_use]
pub fn permission_response(request_id: &str, result: &PermissionResult) -> Value {
    json!({
        "type": "control_response",
        "response": {
            "subtype": "success",
            "request_id": request_id,
            "response": result,
        },
    })
}

/// Error reply for a control request we cannot serve.
#[must_use]
pub fn error_response(request_id: &str, error: &str) -> Value {
    json!({
        "type": "control_response",
        "response": {
            "subtype": "error",
            "request_id": request_id,
            "error": error,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_can_use_tool() {
        let line = r#"{"type":"control_request","request_id":"c1","request":{"subtype":"can_use_tool","tool_name":"Bash","input":{"command":"ls"},"permission_suggestions":[{"type":"addRules"}]}}"#;
        let Some(Inbound::ControlRequest { request_id, request }) = parse_line(line).unwrap() else {
            panic!("expected control request");
        };
        assert_eq!(request_id, "c1");
        assert_eq!(request.subtype, CAN_USE_TOOL);
        assert_eq!(request.tool_name.as_deref(), Some("Bash"));
        assert_eq!(request.input, Some(json!({"command": "ls"})));
    }

    #[test]
    fn test_parse_other_kinds() {
        assert_eq!(
            parse_line(r#"{"type":"control_cancel_request","request_id":"c1"}"#).unwrap(),
            Some(Inbound::ControlCancel {
                request_id: "c1".into()
            })
        );
        assert!(matches!(
            parse_line(r#"{"type":"control_response","response":{}}"#).unwrap(),
            Some(Inbound::ControlResponse(_))
        ));
        let Some(Inbound::Message(message)) =
            parse_line(r#"{"type":"system","session_id":"s1"}"#).unwrap()
        else {
            panic!("expected message");
        };
        assert_eq!(message.session_id(), Some("s1"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_line("   ").unwrap(), None);
        assert!(parse_line("not json").is_err());
        assert!(parse_line("[1,2]").is_err());
        assert!(parse_line(r#"{"type":"control_request"}"#).is_err());
    }

    #[test]
    fn test_permission_response_shape() {
        let allow = permission_response("c1", &PermissionResult::allow(json!({"a": 1})));
        assert_eq!(allow["response"]["request_id"], "c1");
        assert_eq!(allow["response"]["response"]["behavior"], "allow");
        assert_eq!(allow["response"]["response"]["updatedInput"]["a"], 1);

        let deny = permission_response("c2", &PermissionResult::deny("nope"));
        assert_eq!(deny["response"]["response"]["behavior"], "deny");
        assert_eq!(deny["response"]["response"]["message"], "nope");
    }

    #[test]
    fn test_outbound_requests() {
        assert_eq!(initialize_request("i")["request"]["subtype"], "initialize");
        assert_eq!(interrupt_request("x")["request"]["subtype"], "interrupt");
        assert_eq!(user_message("hi")["message"]["content"], "hi");
        assert_eq!(error_response("e", "bad")["response"]["subtype"], "error");
    }
}
