//! Run Executor (C8, §4.2) and its supporting decision functions (§4.2.1),
//! ask-user policy (C9, §4.3), and waiting-user todo closeout (I4).

mod approval;
mod attempt;
pub mod decisions;
mod error;
mod executor;
mod realtime;
mod responder;
mod result;
mod state;

pub use approval::ApprovalGate;
pub use approval::AutoApprove;
pub use approval::AutoDeny;
pub use attempt::AttemptSummary;
pub use attempt::LastFailure;
pub use attempt::text_implies_tool_use;
pub use error::ExecutorError;
pub use executor::RunExecutor;
pub use executor::RunExecutorBuilder;
pub use executor::RunRequest;
pub use realtime::NullRealtimeSink;
pub use realtime::RealtimeSink;
pub use result::RunOutcome;
pub use state::RuntimeState;
