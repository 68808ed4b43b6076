use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::tool_call::ToolCallStatus;

/// Role of a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    ToolResult,
}

/// Lifecycle status of a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Draft,
    Final,
}

/// One block within a message's ordered `message_json` content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageBlock {
    Text { text: String },
    Markdown { text: String },
    ToolCall {
        tool_id: String,
        tool_name: String,
        args: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        collapsed: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        status: ToolCallStatus,
    },
    WaitingUserPrompt {
        prompt_id: String,
        question: String,
        #[serde(default)]
        options: Vec<String>,
    },
}

/// An append-only transcript row.
///
/// `row_id` is assigned by the store and is strictly increasing per
/// endpoint (I2); it is the client's pagination cursor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub row_id: i64,
    pub message_id: String,
    pub role: MessageRole,
    pub status: MessageStatus,
    pub created_at_ms: i64,
    pub text_content: String,
    pub blocks: Vec<MessageBlock>,
}

/// Cap on persisted `message_json` payload size, per §6.
pub const MESSAGE_JSON_TRUNCATION_RUNES: usize = 6_000;

/// Validate a caller-supplied `message_id`, per §3: `[A-Za-z0-9_-]{1..128}`.
pub fn is_valid_message_id(candidate: &str) -> bool {
    let len = candidate.chars().count();
    if len == 0 || len > 128 {
        return false;
    }
    candidate
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_id_validation() {
        assert!(is_valid_message_id("abc_123-XYZ"));
        assert!(!is_valid_message_id(""));
        assert!(!is_valid_message_id(&"a".repeat(129)));
        assert!(!is_valid_message_id("has space"));
        assert!(!is_valid_message_id("has/slash"));
    }

    #[test]
    fn block_serializes_with_kind_tag() {
        let block = MessageBlock::Text {
            text: "hello".to_string(),
        };
        let v = serde_json::to_value(&block).unwrap();
        assert_eq!(v["kind"], "text");
        assert_eq!(v["text"], "hello");
    }
}
