//! Environment variable overrides applied on top of a loaded [`AppConfig`].
//!
//! A short, explicit list of `RUNLOOP_*` variables, each overriding
//! exactly one field when present.

use crate::types::AppConfig;

pub const MODEL_ID_ENV: &str = "RUNLOOP_MODEL_ID";
pub const BIND_ADDR_ENV: &str = "RUNLOOP_BIND_ADDR";
pub const STORE_PATH_ENV: &str = "RUNLOOP_STORE_PATH";

/// Apply `RUNLOOP_*` environment overrides to `config` in place.
pub fn apply_env_overrides(config: &mut AppConfig) {
    if let Ok(model_id) = std::env::var(MODEL_ID_ENV) {
        config.current_model_id = Some(model_id);
    }
    if let Ok(bind_addr) = std::env::var(BIND_ADDR_ENV) {
        config.bind_addr = Some(bind_addr);
    }
    if let Ok(store_path) = std::env::var(STORE_PATH_ENV) {
        config.store_path = Some(store_path);
    }
}
