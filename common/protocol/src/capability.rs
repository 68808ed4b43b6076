use serde::Deserialize;
use serde::Serialize;

use crate::mode::RunMode;

/// Per-tool capability flags used by the [`ModeToolFilter`]-equivalent in
/// `runloop-tools` (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ToolCapabilityFlags {
    pub mutating: bool,
    pub requires_approval: bool,
    pub parallel_safe: bool,
}

/// The derived set of allowed tools and signals for a given run, computed
/// from mode × user-interaction × subagent depth (§4.7, glossary).
#[derive(Debug, Clone, Default)]
pub struct CapabilityContract {
    pub mode: RunMode,
    /// `true` for subagent runs and any run that must not block on a human.
    pub no_user_interaction: bool,
    pub subagent_depth: u32,
    /// Explicit allowlist; when non-empty, only these tool names pass.
    pub allowlist: Option<Vec<String>>,
}

impl CapabilityContract {
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode,
            no_user_interaction: false,
            subagent_depth: 0,
            allowlist: None,
        }
    }

    /// Whether the `ask_user` signal is available under this contract.
    pub fn allows_ask_user(&self) -> bool {
        if self.no_user_interaction {
            return false;
        }
        self.tool_allowed("ask_user")
    }

    /// Whether a tool with the given name and flags is permitted.
    ///
    /// Plan mode blocks mutating tools unless the caller explicitly
    /// disables the guard (see `enforce_plan_mode_guard` in execution
    /// policy, applied by the executor before calling this).
    pub fn tool_allowed(&self, name: &str) -> bool {
        if let Some(list) = &self.allowlist {
            if !list.iter().any(|n| n == name) {
                return false;
            }
        }
        if name == "ask_user" && self.no_user_interaction {
            return false;
        }
        true
    }

    pub fn mode_blocks_mutating(&self, flags: ToolCapabilityFlags, enforce_plan_mode_guard: bool) -> bool {
        self.mode.is_plan() && enforce_plan_mode_guard && flags.mutating
    }
}
