//! `fs_read`: reads a UTF-8 file from the workspace.

use async_trait::async_trait;
use runloop_protocol::ToolCapabilityFlags;
use runloop_protocol::ToolErrorCode;
use runloop_protocol::ToolResult;
use runloop_tools_api::Tool;
use runloop_tools_api::ToolContext;
use runloop_tools_api::ToolError;
use serde_json::Value;
use serde_json::json;

const MAX_READ_BYTES: usize = 100_000;

pub struct FsReadTool;

impl FsReadTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FsReadTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for FsReadTool {
    fn name(&self) -> &str {
        "fs_read"
    }

    fn description(&self) -> &str {
        "Read a text file from the workspace."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Path relative to the workspace root" }
            },
            "required": ["path"]
        })
    }

    fn capability_flags(&self) -> ToolCapabilityFlags {
        ToolCapabilityFlags {
            mutating: false,
            requires_approval: false,
            parallel_safe: true,
        }
    }

    async fn execute(&self, tool_id: &str, args: Value, ctx: &mut ToolContext) -> Result<ToolResult, ToolError> {
        let relative = args.get("path").and_then(Value::as_str).ok_or_else(|| ToolError::InvalidArgs {
            tool_name: self.name().to_string(),
            message: "path must be a string".to_string(),
        })?;

        let resolved = ctx.resolve_in_workspace(relative).map_err(|message| ToolError::Runtime {
            tool_name: self.name().to_string(),
            code: ToolErrorCode::OutsideWorkspace,
            message,
        })?;

        let contents = match tokio::fs::read(&resolved).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ToolResult::failure(tool_id, self.name(), ToolErrorCode::NotFound, format!("{relative} not found")));
            }
            Err(err) => {
                return Err(ToolError::Runtime {
                    tool_name: self.name().to_string(),
                    code: ToolErrorCode::Internal,
                    message: err.to_string(),
                });
            }
        };

        let text = String::from_utf8_lossy(&contents).into_owned();
        let truncated = text.len() > MAX_READ_BYTES;
        let mut cut = MAX_READ_BYTES.min(text.len());
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        let text = if truncated { text[..cut].to_string() } else { text };

        let mut result = ToolResult::success(tool_id, self.name(), text.clone());
        result.data = Some(json!({ "path": relative, "content": text }));
        result.truncated = truncated;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runloop_protocol::CapabilityContract;
    use runloop_protocol::RunMode;
    use std::path::PathBuf;

    fn ctx(root: PathBuf) -> ToolContext {
        ToolContext::new("t1", "r1", root, CapabilityContract::new(RunMode::Act))
    }

    #[tokio::test]
    async fn reads_an_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "hi").unwrap();
        let mut ctx = ctx(dir.path().to_path_buf());
        let result = FsReadTool::new().execute("tc1", json!({"path": "a.txt"}), &mut ctx).await.unwrap();
        assert!(!result.is_error());
        assert_eq!(result.data.unwrap()["content"], "hi");
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = ctx(dir.path().to_path_buf());
        let result = FsReadTool::new().execute("tc2", json!({"path": "missing.txt"}), &mut ctx).await.unwrap();
        assert!(result.is_error());
        assert_eq!(result.error.unwrap().code, ToolErrorCode::NotFound);
    }

    #[tokio::test]
    async fn traversal_outside_workspace_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = ctx(dir.path().to_path_buf());
        let err = FsReadTool::new().execute("tc3", json!({"path": "../../etc/passwd"}), &mut ctx).await.unwrap_err();
        assert_eq!(err.code(), ToolErrorCode::OutsideWorkspace);
    }
}
