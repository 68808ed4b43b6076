//! Configuration file loading and home-directory resolution.
//!
//! An environment variable takes precedence, a platform default otherwise.

use crate::error::ConfigError;
use crate::error::config_error::ParseSnafu;
use crate::error::config_error::ReadSnafu;
use crate::types::AppConfig;
use snafu::ResultExt;
use std::path::Path;
use std::path::PathBuf;
use tracing::debug;

pub const DEFAULT_CONFIG_DIR: &str = ".runloop";
pub const CONFIG_FILE: &str = "config.toml";
pub const HOME_ENV: &str = "RUNLOOP_HOME";

pub fn default_config_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(DEFAULT_CONFIG_DIR)
}

pub fn find_runloop_home() -> PathBuf {
    if let Ok(custom_home) = std::env::var(HOME_ENV) {
        let path = PathBuf::from(&custom_home);
        if path.is_absolute() {
            return path;
        }
        return std::env::current_dir()
            .map(|cwd| cwd.join(&custom_home))
            .unwrap_or_else(|_| PathBuf::from(custom_home));
    }
    default_config_dir()
}

/// Load `config.toml` from `dir`. Returns the built-in default when the
/// file does not exist (§10.3: "missing file falls back to built-in
/// defaults").
pub fn load_from_dir(dir: &Path) -> Result<AppConfig, ConfigError> {
    let path = dir.join(CONFIG_FILE);
    if !path.exists() {
        debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }
    let raw = std::fs::read_to_string(&path).context(ReadSnafu { path: path.clone() })?;
    let parsed: AppConfig = toml::from_str(&raw).context(ParseSnafu { path })?;
    Ok(parsed)
}
