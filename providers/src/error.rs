use runloop_error::ErrorExt;
use runloop_error::ErrorKind;
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module)]
pub enum AdapterError {
    #[snafu(display("missing API key for provider {provider}: set {env_var}"))]
    MissingApiKey { provider: String, env_var: String },
}

pub type Result<T> = std::result::Result<T, AdapterError>;

impl ErrorExt for AdapterError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Config
    }
}
