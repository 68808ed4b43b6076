//! `terminal_exec`: runs a shell command inside the run's workspace.

use async_trait::async_trait;
use runloop_protocol::ToolCapabilityFlags;
use runloop_protocol::ToolErrorCode;
use runloop_protocol::ToolResult;
use runloop_tools_api::Tool;
use runloop_tools_api::ToolContext;
use runloop_tools_api::ToolError;
use serde_json::Value;
use serde_json::json;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

const DEFAULT_TIMEOUT_SECS: u64 = 120;
const MAX_TIMEOUT_SECS: u64 = 600;
const MAX_OUTPUT_BYTES: usize = 30_000;

pub struct TerminalExecTool;

impl TerminalExecTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TerminalExecTool {
    fn default() -> Self {
        Self::new()
    }
}

fn truncate(output: String) -> (String, bool) {
    if output.len() <= MAX_OUTPUT_BYTES {
        return (output, false);
    }
    let mut cut = MAX_OUTPUT_BYTES;
    while !output.is_char_boundary(cut) {
        cut -= 1;
    }
    (output[..cut].to_string(), true)
}

#[async_trait]
impl Tool for TerminalExecTool {
    fn name(&self) -> &str {
        "terminal_exec"
    }

    fn description(&self) -> &str {
        "Run a shell command inside the workspace and capture its output."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": { "type": "string", "description": "The command to execute" },
                "cwd": { "type": "string", "description": "Working directory relative to the workspace root" },
                "timeout_ms": { "type": "integer", "description": "Timeout in milliseconds (max 600000)" }
            },
            "required": ["command"]
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
        let command = args
            .get("command")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArgs {
                tool_name: self.name().to_string(),
                message: "command must be a string".to_string(),
            })?;

        let workdir = match args.get("cwd").and_then(Value::as_str) {
            Some(relative) => ctx.resolve_in_workspace(relative).map_err(|message| ToolError::Runtime {
                tool_name: self.name().to_string(),
                code: ToolErrorCode::OutsideWorkspace,
                message,
            })?,
            None => ctx.workspace_root.clone(),
        };

        let timeout_secs = args
            .get("timeout_ms")
            .and_then(Value::as_u64)
            .map(|ms| (ms / 1000).clamp(1, MAX_TIMEOUT_SECS))
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let mut child = Command::new("/bin/sh")
            .arg("-c")
            .arg(command)
            .current_dir(&workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| ToolError::Runtime {
                tool_name: self.name().to_string(),
                code: ToolErrorCode::Internal,
                message: format!("failed to spawn command: {err}"),
            })?;

        let output = tokio::select! {
            result = child.wait_with_output() => result.map_err(|err| ToolError::Runtime {
                tool_name: self.name().to_string(),
                code: ToolErrorCode::Internal,
                message: format!("failed to wait for command: {err}"),
            })?,
            () = tokio::time::sleep(Duration::from_secs(timeout_secs)) => {
                return Ok(ToolResult::failure(
                    tool_id,
                    self.name(),
                    ToolErrorCode::Timeout,
                    format!("command timed out after {timeout_secs}s"),
                ));
            }
            () = ctx.cancellation.cancelled() => {
                return Ok(ToolResult::failure(tool_id, self.name(), ToolErrorCode::Internal, "cancelled"));
            }
        };

        let (stdout, stdout_truncated) = truncate(String::from_utf8_lossy(&output.stdout).into_owned());
        let (stderr, stderr_truncated) = truncate(String::from_utf8_lossy(&output.stderr).into_owned());
        let exit_code = output.status.code().unwrap_or(-1);

        let mut result = if exit_code == 0 {
            ToolResult::success(tool_id, self.name(), if stdout.is_empty() { "(no output)".to_string() } else { stdout.clone() })
        } else {
            ToolResult::failure(
                tool_id,
                self.name(),
                ToolErrorCode::Internal,
                format!("command exited with code {exit_code}"),
            )
        };
        result.data = Some(json!({ "exit_code": exit_code, "stdout": stdout, "stderr": stderr }));
        result.truncated = stdout_truncated || stderr_truncated;
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
    async fn runs_a_simple_command() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = ctx(dir.path().to_path_buf());
        let tool = TerminalExecTool::new();
        let result = tool
            .execute("tc1", json!({"command": "echo hello"}), &mut ctx)
            .await
            .unwrap();
        assert!(!result.is_error());
        assert_eq!(result.data.unwrap()["stdout"], "hello\n");
    }

    #[tokio::test]
    async fn nonzero_exit_is_a_failure_result() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = ctx(dir.path().to_path_buf());
        let tool = TerminalExecTool::new();
        let result = tool.execute("tc2", json!({"command": "exit 3"}), &mut ctx).await.unwrap();
        assert!(result.is_error());
    }

    #[tokio::test]
    async fn cwd_outside_workspace_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = ctx(dir.path().to_path_buf());
        let tool = TerminalExecTool::new();
        let err = tool
            .execute("tc3", json!({"command": "pwd", "cwd": "../../etc"}), &mut ctx)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ToolErrorCode::OutsideWorkspace);
    }
}
