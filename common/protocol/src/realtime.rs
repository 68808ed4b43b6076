use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// Which logical stream a realtime event belongs to (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Assistant,
    Tool,
    Lifecycle,
}

/// Position of an event within its stream's lifecycle (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventPhase {
    Start,
    StateChange,
    End,
    Error,
}

/// Concrete event types carried in the `type` tag of a [`RealtimeEvent`]
/// (§6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RealtimeEventType {
    MessageDelta,
    MessageComplete,
    ToolCallStarted,
    ToolCallCompleted,
    RunStateChanged,
    TodoUpdated,
    CheckpointCreated,
    /// A provider stream went silent past its stall timeout (§10.5).
    StreamStallDetected,
    /// The executor switched to a configured fallback model for the rest
    /// of the run (§10.5).
    ModelFallbackStarted,
    /// Todos were closed out ahead of a `waiting_user` transition (§4.3),
    /// carrying before/after open counts and the closeout's retry count.
    #[serde(rename = "todos.closeout.waiting_user")]
    TodosCloseoutWaitingUser,
}

/// Priority tier used by the broadcaster's outbound queue; higher-priority
/// events may overtake buffered deltas when a subscriber is slow (§C7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventPriority {
    Delta,
    Lifecycle,
    Control,
}

/// Envelope broadcast to every subscriber of a thread's realtime stream
/// (§6). `seq` is the monotonic row id assigned when the underlying event
/// was appended to the durable store (C3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeEvent {
    pub seq: u64,
    pub thread_id: String,
    pub run_id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: RealtimeEventType,
    pub stream: StreamKind,
    pub phase: EventPhase,
    pub priority: EventPriority,
    pub payload: Value,
    pub created_at_ms: i64,
}

impl RealtimeEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, EventPhase::End | EventPhase::Error)
    }
}
