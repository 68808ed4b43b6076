//! Layered configuration: a `config.toml` file under the runloop home
//! directory, overridden by `RUNLOOP_*` environment variables, resolved
//! into the values the rest of the workspace needs (§10.3).

pub mod error;
mod env_overrides;
mod loader;
mod resolver;
mod types;

pub use env_overrides::apply_env_overrides;
pub use error::ConfigError;
pub use loader::default_config_dir;
pub use loader::find_runloop_home;
pub use loader::load_from_dir;
pub use resolver::ResolvedModel;
pub use resolver::resolve_default_model;
pub use types::AppConfig;
pub use types::ExecutionPolicy;
pub use types::ModelConfig;
pub use types::ProviderConfig;
pub use types::ProviderType;
pub use types::Timeouts;

/// Load configuration the way the `app-server` binary does at startup:
/// find the home directory, read `config.toml` if present, then apply
/// environment overrides.
pub fn load_runtime_config() -> Result<AppConfig, ConfigError> {
    let home = find_runloop_home();
    let mut config = load_from_dir(&home)?;
    apply_env_overrides(&mut config);
    Ok(config)
}
