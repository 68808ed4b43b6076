//! Transforms transcript [`Message`] rows into provider-facing
//! [`ProviderMessage`] entries for the next turn's request (§4.2 step 3c, i).

use runloop_protocol::Message;
use runloop_protocol::MessageBlock;
use runloop_protocol::MessageRole;
use runloop_provider_api::ProviderMessage;
use runloop_provider_api::ProviderMessageRole;
use runloop_provider_api::ProviderToolCall;

fn role_for(role: MessageRole) -> ProviderMessageRole {
    match role {
        MessageRole::User => ProviderMessageRole::User,
        MessageRole::Assistant => ProviderMessageRole::Assistant,
        MessageRole::ToolResult => ProviderMessageRole::Tool,
    }
}

/// Flatten one transcript message's blocks into provider wire shape.
///
/// An assistant message with tool calls becomes one `ProviderMessage` with
/// `tool_calls` populated; a tool-result message becomes one `ProviderMessage`
/// per `ToolCall` block, each carrying `tool_call_id`.
pub fn to_provider_messages(history: &[Message]) -> Vec<ProviderMessage> {
    let mut out = Vec::new();
    for message in history {
        match message.role {
            MessageRole::ToolResult => {
                for block in &message.blocks {
                    if let MessageBlock::ToolCall { tool_id, result, .. } = block {
                        out.push(ProviderMessage {
                            role: ProviderMessageRole::Tool,
                            content: result.as_ref().map(|v| v.to_string()).unwrap_or_default(),
                            tool_calls: Vec::new(),
                            tool_call_id: Some(tool_id.clone()),
                        });
                    }
                }
            }
            _ => {
                let mut tool_calls = Vec::new();
                for block in &message.blocks {
                    if let MessageBlock::ToolCall { tool_id, tool_name, args, .. } = block {
                        tool_calls.push(ProviderToolCall {
                            id: tool_id.clone(),
                            name: tool_name.clone(),
                            arguments: args.clone(),
                        });
                    }
                }
                if !message.text_content.is_empty() || !tool_calls.is_empty() {
                    out.push(ProviderMessage {
                        role: role_for(message.role),
                        content: message.text_content.clone(),
                        tool_calls,
                        tool_call_id: None,
                    });
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use runloop_protocol::MessageStatus;
    use runloop_protocol::ToolCallStatus;
    use serde_json::json;

    fn message(role: MessageRole, text: &str, blocks: Vec<MessageBlock>) -> Message {
        Message {
            row_id: 1,
            message_id: "m1".to_string(),
            role,
            status: MessageStatus::Final,
            created_at_ms: 0,
            text_content: text.to_string(),
            blocks,
        }
    }

    #[test]
    fn assistant_message_carries_tool_calls() {
        let history = vec![message(
            MessageRole::Assistant,
            "",
            vec![MessageBlock::ToolCall {
                tool_id: "tc1".to_string(),
                tool_name: "fs_read".to_string(),
                args: json!({"path": "a.txt"}),
                collapsed: None,
                result: None,
                status: ToolCallStatus::Pending,
            }],
        )];
        let messages = to_provider_messages(&history);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].tool_calls[0].name, "fs_read");
    }

    #[test]
    fn tool_result_message_becomes_tool_role_entry() {
        let history = vec![message(
            MessageRole::ToolResult,
            "",
            vec![MessageBlock::ToolCall {
                tool_id: "tc1".to_string(),
                tool_name: "fs_read".to_string(),
                args: json!({}),
                collapsed: None,
                result: Some(json!({"content": "hi"})),
                status: ToolCallStatus::Success,
            }],
        )];
        let messages = to_provider_messages(&history);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, ProviderMessageRole::Tool);
        assert_eq!(messages[0].tool_call_id.as_deref(), Some("tc1"));
    }

    #[test]
    fn empty_text_without_tool_calls_is_skipped() {
        let history = vec![message(MessageRole::User, "", vec![])];
        assert!(to_provider_messages(&history).is_empty());
    }
}
