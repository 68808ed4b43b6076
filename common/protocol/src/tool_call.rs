use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// Status of a tool call as tracked in the transcript and event store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    Pending,
    Running,
    Success,
    Error,
}

/// Machine-readable tool runtime error codes (§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolErrorCode {
    InvalidArgs,
    InvalidPath,
    OutsideWorkspace,
    NotFound,
    PermissionDenied,
    Timeout,
    Internal,
}

impl ToolErrorCode {
    /// Whether the recovery decision function should treat this as a hint
    /// that normalized retry / workspace probing may help (§4.2.1).
    pub fn is_recoverable_hint(self) -> bool {
        matches!(
            self,
            ToolErrorCode::NotFound | ToolErrorCode::InvalidPath | ToolErrorCode::OutsideWorkspace
        )
    }
}

/// Error detail attached to a failed [`ToolResult`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResultError {
    pub code: ToolErrorCode,
    pub message: String,
    pub retryable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalized_args: Option<Value>,
}

/// Uniform result shape returned by every tool handler (§4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_id: String,
    pub tool_name: String,
    pub status: ToolCallStatus,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolResultError>,
    #[serde(default)]
    pub truncated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_ref: Option<String>,
}

impl ToolResult {
    pub fn success(tool_id: impl Into<String>, tool_name: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            tool_id: tool_id.into(),
            tool_name: tool_name.into(),
            status: ToolCallStatus::Success,
            summary: summary.into(),
            details: None,
            data: None,
            error: None,
            truncated: false,
            content_ref: None,
        }
    }

    pub fn failure(
        tool_id: impl Into<String>,
        tool_name: impl Into<String>,
        code: ToolErrorCode,
        message: impl Into<String>,
    ) -> Self {
        let message = message.into();
        Self {
            tool_id: tool_id.into(),
            tool_name: tool_name.into(),
            status: ToolCallStatus::Error,
            summary: message.clone(),
            details: None,
            data: None,
            error: Some(ToolResultError {
                code,
                message,
                retryable: matches!(code, ToolErrorCode::Timeout) || code.is_recoverable_hint(),
                recovery_action: None,
                normalized_args: None,
            }),
            truncated: false,
            content_ref: None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.status, ToolCallStatus::Error)
    }

    /// The `(tool|code|normalized_message|args_digest)` signature used by
    /// the recovery decision function to detect a repeated failure (§4.2.1).
    pub fn failure_signature(&self, args_digest: &str) -> Option<String> {
        let error = self.error.as_ref()?;
        let normalized_message = error.message.trim().to_lowercase();
        Some(format!(
            "{}|{:?}|{}|{}",
            self.tool_name, error.code, normalized_message, args_digest
        ))
    }
}

/// Persisted row recording a single tool invocation within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub run_id: String,
    pub tool_id: String,
    pub tool_name: String,
    pub status: ToolCallStatus,
    pub args_json: Value,
    pub result_json: Option<Value>,
}
