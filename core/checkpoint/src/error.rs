use runloop_error::ErrorExt;
use runloop_error::ErrorKind;
use snafu::Snafu;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module)]
pub enum CheckpointError {
    #[snafu(display("git command {args:?} failed in {workdir:?}: {message}"))]
    GitCommand {
        workdir: PathBuf,
        args: Vec<String>,
        message: String,
    },

    #[snafu(display("io error snapshotting {path:?}: {source}"))]
    Io { path: PathBuf, source: std::io::Error },

    #[snafu(display("no checkpoint found with id {checkpoint_id:?}"))]
    NotFound { checkpoint_id: String },

    #[snafu(display("checkpoint {checkpoint_id:?} backend does not match its declared kind"))]
    BackendMismatch { checkpoint_id: String },
}

pub type Result<T> = std::result::Result<T, CheckpointError>;

impl ErrorExt for CheckpointError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Lifecycle
    }
}
