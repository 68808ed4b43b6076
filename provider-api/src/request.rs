use crate::tools::ToolChoice;
use crate::tools::ToolDefinition;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// One entry in the conversation passed to the provider for this turn.
/// Uses `role`/`content` rather than the workspace's richer [`Message`]
/// type so each adapter controls its own wire shape independently of the
/// transcript representation.
///
/// [`Message`]: runloop_protocol::Message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderMessage {
    pub role: ProviderMessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ProviderToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderMessageRole {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// One streaming turn request (§4.2 step 3c).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    pub model_id: String,
    pub system_prompt: String,
    pub messages: Vec<ProviderMessage>,
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
    #[serde(default)]
    pub tool_choice: ToolChoice,
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
}
