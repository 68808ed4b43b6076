use runloop_protocol::LoopConfig;
use runloop_protocol::RunMode;
use serde::Deserialize;
use serde::Serialize;
use std::time::Duration;

/// One configured provider and the models it exposes (§6 "AI section").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub provider_type: ProviderType,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub models: Vec<ModelConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    Openai,
    OpenaiCompatible,
    Anthropic,
    Moonshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub context_window: Option<u32>,
    #[serde(default)]
    pub supports_tools: bool,
}

/// Guardrails applied uniformly to tool execution regardless of run mode
/// (§4.7, §10.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionPolicy {
    pub require_user_approval: bool,
    pub enforce_plan_mode_guard: bool,
    pub block_dangerous_commands: bool,
}

impl Default for ExecutionPolicy {
    fn default() -> Self {
        Self {
            require_user_approval: false,
            enforce_plan_mode_guard: true,
            block_dangerous_commands: true,
        }
    }
}

/// Wall-clock and idle timeouts at the thread/run level, distinct from the
/// per-step timeouts in [`LoopConfig`] (§10.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    #[serde(with = "humantime_secs")]
    pub run_max_wall_time: Duration,
    #[serde(with = "humantime_secs")]
    pub run_idle_timeout: Duration,
    #[serde(with = "humantime_secs")]
    pub tool_approval_timeout: Duration,
    #[serde(with = "humantime_secs")]
    pub persist_op_timeout: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            run_max_wall_time: Duration::from_secs(3600),
            run_idle_timeout: Duration::from_secs(600),
            tool_approval_timeout: Duration::from_secs(300),
            persist_op_timeout: Duration::from_secs(10),
        }
    }
}

mod humantime_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// The on-disk/TOML shape read from `config.toml` before environment
/// overrides and defaulting are applied (§10.3).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub providers: Vec<ProviderConfig>,
    pub current_model_id: Option<String>,
    pub default_mode: Option<RunMode>,
    pub execution_policy: ExecutionPolicy,
    pub timeouts: Timeouts,
    pub loop_config: LoopConfig,
    pub bind_addr: Option<String>,
    pub store_path: Option<String>,
}
