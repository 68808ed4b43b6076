use serde::Deserialize;
use serde::Serialize;
use std::time::Duration;

use crate::fallback::FallbackConfig;
use crate::fallback::StallRecovery;
use crate::mode::RunMode;

/// Static bounds and timeouts that govern one orchestrator loop, resolved
/// once per run from thread settings and defaults (§4.1, §4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    pub mode: RunMode,
    /// Hard ceiling on provider round-trips before the loop-guard forces
    /// completion (§4.2.1).
    pub max_steps: u32,
    /// Consecutive assistant turns with no tool call before the loop-guard
    /// treats the run as stalled (§4.2.1).
    pub max_no_tool_rounds: u32,
    /// Repeated identical tool-failure signatures before the recovery
    /// decision function escalates to `ask_user` (§4.2.1).
    pub max_repeated_failures: u32,
    #[serde(with = "duration_ms")]
    pub provider_timeout: Duration,
    #[serde(with = "duration_ms")]
    pub tool_timeout: Duration,
    #[serde(with = "duration_ms")]
    pub stall_timeout: Duration,
    pub enforce_plan_mode_guard: bool,
    /// How long one provider stream read may go silent before it is
    /// considered stalled (§10.5). Independent of `stall_timeout`, which
    /// governs the whole-run idle watchdog between steps rather than reads
    /// within a single step's stream.
    #[serde(with = "duration_ms")]
    pub stream_stall_timeout: Duration,
    pub stall_recovery: StallRecovery,
    pub fallback: FallbackConfig,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::Act,
            max_steps: 64,
            max_no_tool_rounds: 3,
            max_repeated_failures: 2,
            provider_timeout: Duration::from_secs(120),
            tool_timeout: Duration::from_secs(60),
            stall_timeout: Duration::from_secs(300),
            enforce_plan_mode_guard: true,
            stream_stall_timeout: Duration::from_secs(30),
            stall_recovery: StallRecovery::default(),
            fallback: FallbackConfig::default(),
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
