//! Shared data model and wire types for the per-thread run orchestrator.
//!
//! This crate has no behavior of its own — it defines the types that every
//! other crate in the workspace passes across its boundaries: the
//! persistent data model (§3 of the design), the realtime event envelope
//! and RPC request/response shapes (§6), and the small enums (mode,
//! intent, reason codes) that the classifier, executor, and ask-user
//! policy agree on.

mod ask_user;
mod capability;
mod checkpoint;
mod classify;
mod fallback;
mod loop_config;
mod message;
mod mode;
mod realtime;
mod run;
mod thread;
mod todo;
mod tool_call;

pub use ask_user::AskUserReasonCode;
pub use ask_user::AskUserSignal;
pub use capability::CapabilityContract;
pub use capability::ToolCapabilityFlags;
pub use checkpoint::CheckpointBackend;
pub use checkpoint::CheckpointKind;
pub use checkpoint::WorkspaceCheckpoint;
pub use classify::Complexity;
pub use classify::ClassifierResult;
pub use classify::ClassifierSource;
pub use classify::Intent;
pub use classify::ObjectiveMode;
pub use classify::TodoPolicy;
pub use fallback::FallbackAttempt;
pub use fallback::FallbackConfig;
pub use fallback::FallbackState;
pub use fallback::StallRecovery;
pub use loop_config::LoopConfig;
pub use message::Message;
pub use message::MessageBlock;
pub use message::MessageRole;
pub use message::MessageStatus;
pub use mode::RunMode;
pub use realtime::EventPhase;
pub use realtime::EventPriority;
pub use realtime::RealtimeEvent;
pub use realtime::RealtimeEventType;
pub use realtime::StreamKind;
pub use run::IllegalTransition;
pub use run::Run;
pub use run::RunState;
pub use thread::Thread;
pub use todo::BLOCKED_WAITING_USER_PREFIX;
pub use todo::TodoItem;
pub use todo::TodoSnapshot;
pub use todo::TodoStatus;
pub use todo::VersionConflict;
pub use tool_call::ToolCallRecord;
pub use tool_call::ToolCallStatus;
pub use tool_call::ToolErrorCode;
pub use tool_call::ToolResult;
pub use tool_call::ToolResultError;

/// Current wall-clock time in epoch milliseconds.
///
/// Centralized so tests can stub it out uniformly rather than each crate
/// calling `chrono::Utc::now()` directly.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
