//! Errors surfaced by `runloop-session`'s `SendUserTurn` contract (§4.1) and
//! the other thread-actor operations built on top of it.

use runloop_error::ErrorExt;
use runloop_error::ErrorKind;
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module)]
pub enum SessionError {
    #[snafu(display("thread {thread_id} has no provider/model configured"))]
    NotConfigured { thread_id: String },

    #[snafu(display("thread {thread_id} already has an active run {active_run_id}"))]
    ThreadBusy { thread_id: String, active_run_id: String },

    #[snafu(display("caller's expected run {expected} does not match the thread's latest run {actual}"))]
    RunChanged { expected: String, actual: String },

    #[snafu(display("reply targets waiting prompt {expected}, but the pending prompt is {actual}"))]
    WaitingPromptChanged { expected: String, actual: String },

    #[snafu(display("thread {thread_id} is locked to a model; switching models requires an explicit restart"))]
    ModelSwitchRequiresExplicitRestart { thread_id: String },

    #[snafu(display("thread {thread_id} is locked to model {locked_model_id}, refusing requested model {requested_model_id}"))]
    ModelLockViolation {
        thread_id: String,
        locked_model_id: String,
        requested_model_id: String,
    },

    #[snafu(display("permission denied: {message}"))]
    PermissionDenied { message: String },

    #[snafu(display("invalid message_id {message_id:?}"))]
    InvalidMessageId { message_id: String },

    #[snafu(display("no such thread {thread_id}"))]
    UnknownThread { thread_id: String },

    #[snafu(display("no such run {run_id} on thread {thread_id}"))]
    UnknownRun { thread_id: String, run_id: String },

    #[snafu(display("no waiting-user prompt pending on thread {thread_id}"))]
    NoPendingPrompt { thread_id: String },

    #[snafu(display("message {message_id} has no tool call {tool_id}"))]
    UnknownToolCall { message_id: String, tool_id: String },

    #[snafu(display("illegal run transition: {source}"))]
    IllegalRunTransition { source: runloop_protocol::IllegalTransition },

    #[snafu(display("todo snapshot conflict: {source}"))]
    TodoVersionConflict { source: runloop_protocol::VersionConflict },

    #[snafu(display("persisting run state failed: {source}"))]
    Store { source: runloop_store::StoreError },

    #[snafu(display("workspace checkpoint failed: {source}"))]
    Checkpoint { source: runloop_checkpoint::error::CheckpointError },
}

pub type Result<T> = std::result::Result<T, SessionError>;

impl ErrorExt for SessionError {
    fn kind(&self) -> ErrorKind {
        match self {
            SessionError::NotConfigured { .. }
            | SessionError::ModelSwitchRequiresExplicitRestart { .. }
            | SessionError::ModelLockViolation { .. } => ErrorKind::Config,
            SessionError::ThreadBusy { .. }
            | SessionError::RunChanged { .. }
            | SessionError::WaitingPromptChanged { .. }
            | SessionError::IllegalRunTransition { .. }
            | SessionError::TodoVersionConflict { .. } => ErrorKind::Concurrency,
            SessionError::PermissionDenied { .. } => ErrorKind::Permission,
            SessionError::InvalidMessageId { .. }
            | SessionError::UnknownThread { .. }
            | SessionError::UnknownRun { .. }
            | SessionError::NoPendingPrompt { .. }
            | SessionError::UnknownToolCall { .. } => ErrorKind::Lifecycle,
            SessionError::Store { .. } | SessionError::Checkpoint { .. } => ErrorKind::Lifecycle,
        }
    }
}
