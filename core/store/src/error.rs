use runloop_error::ErrorExt;
use runloop_error::ErrorKind;
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module)]
pub enum StoreError {
    #[snafu(display("endpoint {endpoint:?} has no such thread {thread_id:?}"))]
    UnknownThread { endpoint: String, thread_id: String },

    #[snafu(display("endpoint {endpoint:?} already has an active run for thread {thread_id:?}"))]
    ThreadBusy { endpoint: String, thread_id: String },

    #[snafu(display("no such run {run_id:?}"))]
    UnknownRun { run_id: String },

    #[snafu(display("requested cursor {after_row_id} is beyond the stored range"))]
    CursorOutOfRange { after_row_id: i64 },

    #[snafu(display("endpoint {endpoint:?} thread {thread_id:?} has no such message {message_id:?}"))]
    UnknownMessage {
        endpoint: String,
        thread_id: String,
        message_id: String,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl ErrorExt for StoreError {
    fn kind(&self) -> ErrorKind {
        match self {
            StoreError::ThreadBusy { .. } => ErrorKind::Concurrency,
            StoreError::UnknownThread { .. }
            | StoreError::UnknownRun { .. }
            | StoreError::CursorOutOfRange { .. }
            | StoreError::UnknownMessage { .. } => ErrorKind::Lifecycle,
        }
    }
}
