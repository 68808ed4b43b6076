use runloop_error::ErrorExt;
use runloop_error::ErrorKind;
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module)]
pub enum ProviderError {
    #[snafu(display("transport error calling provider {provider}: {message}"))]
    Transport { provider: String, message: String, retryable: bool },

    #[snafu(display("failed to parse stream from provider {provider}: {message}"))]
    StreamParse { provider: String, message: String },

    #[snafu(display("provider {provider} returned an empty turn"))]
    EmptyOutput { provider: String },

    #[snafu(display("no provider registered with name {name:?}"))]
    UnknownProvider { name: String },
}

pub type Result<T> = std::result::Result<T, ProviderError>;

impl ErrorExt for ProviderError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Provider
    }

    fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Transport { retryable, .. } => *retryable,
            ProviderError::StreamParse { .. } | ProviderError::EmptyOutput { .. } => true,
            ProviderError::UnknownProvider { .. } => false,
        }
    }
}
