//! `fs_write`: writes a UTF-8 file into the workspace, creating parent
//! directories as needed.

use async_trait::async_trait;
use runloop_protocol::ToolCapabilityFlags;
use runloop_protocol::ToolErrorCode;
use runloop_protocol::ToolResult;
use runloop_tools_api::Tool;
use runloop_tools_api::ToolContext;
use runloop_tools_api::ToolError;
use serde_json::Value;
use serde_json::json;

pub struct FsWriteTool;

impl FsWriteTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FsWriteTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for FsWriteTool {
    fn name(&self) -> &str {
        "fs_write"
    }

    fn description(&self) -> &str {
        "Write a text file into the workspace, creating parent directories as needed."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Path relative to the workspace root" },
                "content": { "type": "string", "description": "File contents" }
            },
            "required": ["path", "content"]
        })
    }

    fn capability_flags(&self) -> ToolCapabilityFlags {
        ToolCapabilityFlags {
            mutating: true,
            requires_approval: true,
            parallel_safe: false,
        }
    }

    async fn execute(&self, tool_id: &str, args: Value, ctx: &mut ToolContext) -> Result<ToolResult, ToolError> {
        let relative = args.get("path").and_then(Value::as_str).ok_or_else(|| ToolError::InvalidArgs {
            tool_name: self.name().to_string(),
            message: "path must be a string".to_string(),
        })?;
        let content = args.get("content").and_then(Value::as_str).ok_or_else(|| ToolError::InvalidArgs {
            tool_name: self.name().to_string(),
            message: "content must be a string".to_string(),
        })?;

        let resolved = ctx.resolve_in_workspace(relative).map_err(|message| ToolError::Runtime {
            tool_name: self.name().to_string(),
            code: ToolErrorCode::OutsideWorkspace,
            message,
        })?;

        if let Some(parent) = resolved.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|err| ToolError::Runtime {
                tool_name: self.name().to_string(),
                code: ToolErrorCode::Internal,
                message: err.to_string(),
            })?;
        }

        tokio::fs::write(&resolved, content).await.map_err(|err| ToolError::Runtime {
            tool_name: self.name().to_string(),
            code: ToolErrorCode::Internal,
            message: err.to_string(),
        })?;

        let mut result = ToolResult::success(tool_id, self.name(), format!("wrote {} bytes to {relative}", content.len()));
        result.data = Some(json!({ "path": relative, "bytes_written": content.len() }));
        Ok(result)
    }
}
