//! Wire types for the RPC/Subscription Surface (C11, §6).
//!
//! One request enum, one response enum, each JSON-tagged on `"op"`/`"op"`
//! respectively so a single `serde_json::from_str`/`to_string` handles
//! dispatch. Individual payload structs mirror the RPC table's request and
//! response columns field for field; optional fields use
//! `skip_serializing_if = "Option::is_none"` so an older client that omits
//! a field it doesn't know about still parses.

use runloop_protocol::RealtimeEvent;
use runloop_protocol::RunMode;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// `send_user_turn` request payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendUserTurnRequest {
    pub request_id: String,
    pub thread_id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub model: Option<String>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachment_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_message_id: Option<String>,
    #[serde(default)]
    pub mode: RunMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_no_tool_rounds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_run_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_waiting_prompt_id: Option<String>,
}

/// `send_user_turn` response payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendUserTurnResponse {
    pub request_id: String,
    pub run_id: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumed_waiting_prompt_id: Option<String>,
}

/// `run_cancel` request payload. Exactly one of `run_id`/`thread_id` is
/// expected per §6; the handler resolves `thread_id` to the thread's
/// current active run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunCancelRequest {
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

/// `tool_approval` request payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolApprovalRequest {
    pub request_id: String,
    pub run_id: String,
    pub tool_id: String,
    pub approved: bool,
}

/// `subscribe_summary` request payload (empty body, per §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeSummaryRequest {
    pub request_id: String,
}

/// `subscribe_summary` response: one entry per thread with a non-terminal
/// active run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeSummaryResponse {
    pub request_id: String,
    pub active_runs: Vec<ActiveRunSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveRunSummary {
    pub thread_id: String,
    pub run_id: String,
}

/// `subscribe_thread` request payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeThreadRequest {
    pub request_id: String,
    pub thread_id: String,
}

/// `subscribe_thread` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeThreadResponse {
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
}

/// `list_messages` request payload. `limit` is clamped to `[1, 500]`
/// (default 200) by the handler, per B1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListMessagesRequest {
    pub request_id: String,
    pub thread_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_row_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tail: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

/// One transcript row as returned by `list_messages`, carrying the
/// already-serialized `message_json` the client renders directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRow {
    pub row_id: i64,
    pub message_json: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListMessagesResponse {
    pub request_id: String,
    pub messages: Vec<MessageRow>,
    pub next_after_row_id: i64,
    pub has_more: bool,
}

/// `active_run_snapshot` request payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveRunSnapshotRequest {
    pub request_id: String,
    pub thread_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveRunSnapshotResponse {
    pub request_id: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_json: Option<Value>,
}

/// `set_tool_collapsed` request payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetToolCollapsedRequest {
    pub request_id: String,
    pub thread_id: String,
    pub message_id: String,
    pub tool_id: String,
    pub collapsed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkResponse {
    pub request_id: String,
    pub ok: bool,
}

/// Generic error envelope for any failed request, plus the `event_notify`
/// server push which has no matching request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// HTTP-style status named in §6's per-op error column (400/403/404/409/503).
    pub code: u16,
    pub error: String,
}

/// Client-to-server request envelope. Each variant serializes as a JSON
/// object tagged `"op": "<variant_name>"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ClientRequest {
    SendUserTurn(SendUserTurnRequest),
    RunCancel(RunCancelRequest),
    ToolApproval(ToolApprovalRequest),
    SubscribeSummary(SubscribeSummaryRequest),
    SubscribeThread(SubscribeThreadRequest),
    ListMessages(ListMessagesRequest),
    ActiveRunSnapshot(ActiveRunSnapshotRequest),
    SetToolCollapsed(SetToolCollapsedRequest),
}

/// Server-to-client response envelope. Each variant serializes as a JSON
/// object tagged `"op": "<variant_name>"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ServerResponse {
    SendUserTurn(SendUserTurnResponse),
    RunCancel(OkResponse),
    ToolApproval(OkResponse),
    SubscribeSummary(SubscribeSummaryResponse),
    SubscribeThread(SubscribeThreadResponse),
    ListMessages(ListMessagesResponse),
    ActiveRunSnapshot(ActiveRunSnapshotResponse),
    SetToolCollapsed(OkResponse),
    /// Server push carrying a realtime event for a subscribed stream
    /// (§4.6, §6's `event_notify`). Never sent in reply to a request, so
    /// it carries no `request_id`.
    EventNotify(RealtimeEvent),
    Error(ErrorResponse),
}

/// `list_messages`' `limit` clamp (B1): `[1, 500]`, default 200.
pub fn clamp_list_messages_limit(requested: Option<usize>) -> usize {
    requested.unwrap_or(200).clamp(1, 500)
}
