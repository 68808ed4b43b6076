use runloop_error::ErrorExt;
use runloop_error::ErrorKind;
use snafu::Snafu;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module)]
pub enum ConfigError {
    #[snafu(display("failed to read config file {path:?}: {source}"))]
    Read { path: PathBuf, source: std::io::Error },

    #[snafu(display("failed to parse config file {path:?}: {source}"))]
    Parse { path: PathBuf, source: toml::de::Error },

    #[snafu(display("config references unknown model id {model_id:?} for provider {provider_id:?}"))]
    UnknownModel { provider_id: String, model_id: String },

    #[snafu(display("config declares no providers"))]
    NoProviders,

    #[snafu(display("duplicate provider id {provider_id:?}"))]
    DuplicateProvider { provider_id: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

impl ErrorExt for ConfigError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Config
    }
}
