use crate::error::ToolError;
use crate::error::tool_error::UnknownToolSnafu;
use crate::tool::Tool;
use runloop_protocol::CapabilityContract;
use runloop_provider_api::ToolDefinition;
use snafu::OptionExt;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock;
use tracing::debug;

/// Registry of every tool the runtime knows about, keyed by name. Per-run
/// availability is narrowed by [`ToolRegistry::definitions_for`] against a
/// [`CapabilityContract`] (§4.7).
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        debug!(tool = %name, "registering tool");
        let mut tools = self.tools.write().expect("tool registry lock poisoned");
        tools.insert(name, tool);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Tool>, ToolError> {
        let tools = self.tools.read().expect("tool registry lock poisoned");
        tools.get(name).cloned().context(UnknownToolSnafu { name })
    }

    /// Tools permitted under `capability`, in registration order, as
    /// provider-facing definitions. `ask_user` and `task_complete` are
    /// signals, not tools proper, and are filtered the same way as any
    /// other entry: by name through `capability.tool_allowed`.
    pub fn definitions_for(&self, capability: &CapabilityContract, enforce_plan_mode_guard: bool) -> Vec<ToolDefinition> {
        let tools = self.tools.read().expect("tool registry lock poisoned");
        tools
            .values()
            .filter(|tool| capability.tool_allowed(tool.name()))
            .filter(|tool| !capability.mode_blocks_mutating(tool.capability_flags(), enforce_plan_mode_guard))
            .map(|tool| tool.to_definition())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.read().expect("tool registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ToolContext;
    use async_trait::async_trait;
    use runloop_protocol::RunMode;
    use runloop_protocol::ToolCapabilityFlags;
    use runloop_protocol::ToolResult;
    use serde_json::Value;
    use serde_json::json;

    struct StubTool {
        name: &'static str,
        mutating: bool,
    }

    #[async_trait]
    impl Tool for StubTool {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "stub"
        }

        fn input_schema(&self) -> Value {
            json!({"type": "object"})
        }

        fn capability_flags(&self) -> ToolCapabilityFlags {
            ToolCapabilityFlags {
                mutating: self.mutating,
                requires_approval: false,
                parallel_safe: true,
            }
        }

        async fn execute(&self, tool_id: &str, _args: Value, _ctx: &mut ToolContext) -> Result<ToolResult, ToolError> {
            Ok(ToolResult::success(tool_id, self.name, "ok"))
        }
    }

    #[test]
    fn register_and_get_round_trips() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(StubTool { name: "fs_read", mutating: false }));
        assert!(registry.get("fs_read").is_ok());
        assert!(registry.get("missing").is_err());
    }

    #[test]
    fn plan_mode_filters_out_mutating_tools() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(StubTool { name: "fs_read", mutating: false }));
        registry.register(Arc::new(StubTool { name: "fs_write", mutating: true }));
        let capability = CapabilityContract::new(RunMode::Plan);
        let defs = registry.definitions_for(&capability, true);
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "fs_read");
    }

    #[test]
    fn allowlist_narrows_definitions() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(StubTool { name: "fs_read", mutating: false }));
        registry.register(Arc::new(StubTool { name: "ask_user", mutating: false }));
        let mut capability = CapabilityContract::new(RunMode::Act);
        capability.allowlist = Some(vec!["fs_read".to_string()]);
        let defs = registry.definitions_for(&capability, true);
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "fs_read");
    }
}
