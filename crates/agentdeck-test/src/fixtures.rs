//! Test fixtures for runtime messages and attachments.

use agentdeck_core::AgentMessage;
use serde_json::json;

/// Base64 of a 1x1 transparent PNG.
pub const PNG_PIXEL_BASE64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

/// A valid `data:image/png;base64,...` URI.
#[must_use]
pub fn png_data_uri() -> String {
    format!("data:image/png;base64,{PNG_PIXEL_BASE64}")
}

/// The `system/init` message a runtime sends first.
#[must_use]
pub fn system_message(session_id: &str) -> AgentMessage {
    AgentMessage::new(json!({
        "type": "system",
        "subtype": "init",
        "session_id": session_id,
        "model": "claude-sonnet-4",
        "tools": ["Read", "Write", "Bash"],
    }))
}

/// An assistant text message.
#[must_use]
pub fn assistant_message(session_id: &str, text: &str) -> AgentMessage {
    AgentMessage::new(json!({
        "type": "assistant",
        "session_id": session_id,
        "parent_tool_use_id": null,
        "message": {
            "role": "assistant",
            "content": [{"type": "text", "text": text}],
        },
    }))
}

/// A successful `result` message with one model's per-call usage.
#[must_use]
pub fn result_message(session_id: &str, input_tokens: u64, output_tokens: u64) -> AgentMessage {
    AgentMessage::new(json!({
        "type": "result",
        "subtype": "success",
        "session_id": session_id,
        "is_error": false,
        "num_turns": 1,
        "modelUsage": {
            "claude-sonnet-4": {
                "inputTokens": input_tokens,
                "outputTokens": output_tokens,
                "cacheReadInputTokens": 0,
                "cacheCreationInputTokens": 0,
            }
        },
    }))
}
