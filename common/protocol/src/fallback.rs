//! Model fallback (SPEC_FULL.md §10.5, teacher: `core/loop/src/fallback.rs`
//! and `core/loop/src/driver.rs`'s `stream_with_tools`): when a provider
//! call goes stale or fails with a retryable signature, the executor may
//! switch to a configured secondary model for the rest of the run.

use serde::Deserialize;
use serde::Serialize;

/// Recovery action taken when a provider stream goes stall-timed-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StallRecovery {
    /// Retry the same model, up to `FallbackConfig::max_retries` times.
    #[default]
    Retry,
    /// Fail the run immediately.
    Abort,
    /// Switch to the next configured fallback model and retry.
    Fallback,
}

/// Ordered fallback models and retry budget for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub enabled: bool,
    pub fallback_models: Vec<String>,
    pub max_retries: u32,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            fallback_models: Vec::new(),
            max_retries: 2,
        }
    }
}

/// One recorded fallback transition, carried in the `ModelFallbackStarted`
/// lifecycle event's payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackAttempt {
    pub from_model: String,
    pub to_model: String,
    pub reason: String,
}

/// Tracks the model currently in use and how many times this run has
/// already fallen back. One instance per run — a `RunExecutor` is shared
/// across every run on a thread, so this cannot live on it directly.
#[derive(Debug, Clone)]
pub struct FallbackState {
    pub current_model: String,
    pub attempts: u32,
    pub history: Vec<FallbackAttempt>,
}

impl FallbackState {
    pub fn new(primary_model: impl Into<String>) -> Self {
        Self {
            current_model: primary_model.into(),
            attempts: 0,
            history: Vec::new(),
        }
    }

    pub fn should_fallback(&self, config: &FallbackConfig) -> bool {
        config.enabled && self.attempts < config.max_retries && !config.fallback_models.is_empty()
    }

    /// The next fallback model to try, in configured order. `None` once
    /// every option has been exhausted.
    pub fn next_model(&self, config: &FallbackConfig) -> Option<String> {
        if !config.enabled {
            return None;
        }
        config.fallback_models.get(self.attempts as usize).cloned()
    }

    pub fn record_fallback(&mut self, to: impl Into<String>, reason: impl Into<String>) {
        let to = to.into();
        self.history.push(FallbackAttempt {
            from_model: self.current_model.clone(),
            to_model: to.clone(),
            reason: reason.into(),
        });
        self.current_model = to;
        self.attempts += 1;
    }
}
