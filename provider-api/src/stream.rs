use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// Token usage reported at the end of a turn.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// One event in a provider's uniform streaming contract (C1). Every
/// adapter — OpenAI Responses/Chat, Anthropic Messages, Moonshot Chat —
/// normalizes its wire protocol down to this sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderStreamEvent {
    TextDelta { delta: String },
    ToolCallDelta { call_id: String, delta: String },
    ToolCallComplete { call_id: String, name: String, arguments: Value },
    TurnComplete { usage: TokenUsage, stop_reason: StopReason },
    Error { message: String, retryable: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    Error,
}

/// The fully assembled result of one turn, built by folding a
/// [`ProviderStreamEvent`] sequence (used by adapters that buffer rather
/// than stream, and by tests).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnResult {
    pub text: String,
    pub tool_calls: Vec<crate::request::ProviderToolCall>,
    pub usage: TokenUsage,
    pub stop_reason: Option<StopReason>,
}

impl TurnResult {
    pub fn fold(events: &[ProviderStreamEvent]) -> Self {
        let mut result = TurnResult::default();
        for event in events {
            match event {
                ProviderStreamEvent::TextDelta { delta } => result.text.push_str(delta),
                ProviderStreamEvent::ToolCallDelta { .. } => {}
                ProviderStreamEvent::ToolCallComplete { call_id, name, arguments } => {
                    result.tool_calls.push(crate::request::ProviderToolCall {
                        id: call_id.clone(),
                        name: name.clone(),
                        arguments: arguments.clone(),
                    });
                }
                ProviderStreamEvent::TurnComplete { usage, stop_reason } => {
                    result.usage = *usage;
                    result.stop_reason = Some(*stop_reason);
                }
                ProviderStreamEvent::Error { .. } => {}
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_accumulates_text_and_tool_calls() {
        let events = vec![
            ProviderStreamEvent::TextDelta { delta: "Hel".to_string() },
            ProviderStreamEvent::TextDelta { delta: "lo".to_string() },
            ProviderStreamEvent::ToolCallComplete {
                call_id: "c1".to_string(),
                name: "fs_read".to_string(),
                arguments: serde_json::json!({"path": "a.txt"}),
            },
            ProviderStreamEvent::TurnComplete {
                usage: TokenUsage {
                    input_tokens: 10,
                    output_tokens: 5,
                },
                stop_reason: StopReason::ToolUse,
            },
        ];
        let result = TurnResult::fold(&events);
        assert_eq!(result.text, "Hello");
        assert_eq!(result.tool_calls.len(), 1);
        assert_eq!(result.stop_reason, Some(StopReason::ToolUse));
    }
}
