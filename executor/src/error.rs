use runloop_error::ErrorExt;
use runloop_error::ErrorKind;
use snafu::Snafu;
use std::time::Duration;

/// Errors raised by the Run Executor (C8/C9) itself, as distinct from the
/// per-tool/provider errors it consumes and folds into decision outcomes.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module)]
pub enum ExecutorError {
    #[snafu(display("run {run_id} exceeded its todo write retry budget: {source}"))]
    TodoVersionConflict {
        run_id: String,
        source: runloop_protocol::VersionConflict,
    },

    #[snafu(display("thread {thread_id} has no todo snapshot available"))]
    TodoStoreUnavailable { thread_id: String },

    #[snafu(display("provider call failed during step loop: {source}"))]
    Provider { source: runloop_provider_api::ProviderError },

    #[snafu(display("provider stream stalled for {timeout:?} with no recovery configured to continue"))]
    Stalled { timeout: Duration },

    #[snafu(display("persisting run state failed: {source}"))]
    Store { source: runloop_store::StoreError },

    #[snafu(display("workspace checkpoint failed: {source}"))]
    Checkpoint { source: runloop_checkpoint::error::CheckpointError },
}

pub type Result<T> = std::result::Result<T, ExecutorError>;

impl ErrorExt for ExecutorError {
    fn kind(&self) -> ErrorKind {
        match self {
            ExecutorError::TodoVersionConflict { .. } | ExecutorError::TodoStoreUnavailable { .. } => ErrorKind::Policy,
            ExecutorError::Provider { .. } | ExecutorError::Stalled { .. } => ErrorKind::Provider,
            ExecutorError::Store { .. } | ExecutorError::Checkpoint { .. } => ErrorKind::Lifecycle,
        }
    }
}
