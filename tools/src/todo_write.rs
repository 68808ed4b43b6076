//! `todo_write`: replaces the thread's todo list atomically.
//!
//! Mirrors §4.2 step 3f: missing `content` on an item is hydrated by
//! matching its `id` against the latest known snapshot before the executor
//! persists the replacement.

use async_trait::async_trait;
use runloop_protocol::TodoItem;
use runloop_protocol::TodoStatus;
use runloop_protocol::ToolCapabilityFlags;
use runloop_protocol::ToolErrorCode;
use runloop_protocol::ToolResult;
use runloop_tools_api::Tool;
use runloop_tools_api::ToolContext;
use runloop_tools_api::ToolError;
use serde_json::Value;
use serde_json::json;

pub struct TodoWriteTool;

impl TodoWriteTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TodoWriteTool {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_status(raw: &str) -> Option<TodoStatus> {
    match raw {
        "pending" => Some(TodoStatus::Pending),
        "in_progress" => Some(TodoStatus::InProgress),
        "completed" => Some(TodoStatus::Completed),
        "cancelled" => Some(TodoStatus::Cancelled),
        _ => None,
    }
}

#[async_trait]
impl Tool for TodoWriteTool {
    fn name(&self) -> &str {
        "todo_write"
    }

    fn description(&self) -> &str {
        "Replace the full task list. At most one task may be in_progress."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "todos": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string" },
                            "content": { "type": "string" },
                            "status": { "type": "string", "enum": ["pending", "in_progress", "completed", "cancelled"] }
                        },
                        "required": ["status"]
                    }
                }
            },
            "required": ["todos"]
        })
    }

    fn capability_flags(&self) -> ToolCapabilityFlags {
        ToolCapabilityFlags {
            mutating: true,
            requires_approval: false,
            parallel_safe: false,
        }
    }

    async fn execute(&self, tool_id: &str, args: Value, ctx: &mut ToolContext) -> Result<ToolResult, ToolError> {
        let raw_todos = args.get("todos").and_then(Value::as_array).ok_or_else(|| ToolError::InvalidArgs {
            tool_name: self.name().to_string(),
            message: "todos must be an array".to_string(),
        })?;

        let in_progress_count = raw_todos
            .iter()
            .filter(|t| t.get("status").and_then(Value::as_str) == Some("in_progress"))
            .count();
        if in_progress_count > 1 {
            return Err(ToolError::InvalidArgs {
                tool_name: self.name().to_string(),
                message: "at most one task can be in_progress at a time".to_string(),
            });
        }

        let mut items = Vec::with_capacity(raw_todos.len());
        for (index, raw) in raw_todos.iter().enumerate() {
            let status_str = raw.get("status").and_then(Value::as_str).unwrap_or("");
            let status = parse_status(status_str).ok_or_else(|| ToolError::InvalidArgs {
                tool_name: self.name().to_string(),
                message: format!("todo[{index}] has invalid status {status_str:?}"),
            })?;

            let id = raw
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("todo_{}", index + 1));

            let content = match raw.get("content").and_then(Value::as_str) {
                Some(content) => content.to_string(),
                None => ctx
                    .current_todos
                    .items
                    .iter()
                    .find(|existing| existing.id == id)
                    .map(|existing| existing.content.clone())
                    .ok_or_else(|| ToolError::InvalidArgs {
                        tool_name: self.name().to_string(),
                        message: format!("todo[{index}] is missing content and has no prior snapshot entry to hydrate from"),
                    })?,
            };

            items.push(TodoItem { id, content, status, note: None });
        }

        let expected_version = ctx.current_todos.version;
        match ctx.current_todos.replace(expected_version, items.clone()) {
            Ok(()) => {}
            Err(conflict) => {
                return Ok(ToolResult::failure(tool_id, self.name(), ToolErrorCode::Internal, conflict.to_string()));
            }
        }

        let open = ctx.current_todos.open_count();
        let mut result = ToolResult::success(tool_id, self.name(), format!("{} tasks, {open} open", items.len()));
        result.data = Some(json!({ "version": ctx.current_todos.version, "todos": items }));
        Ok(result)
    }
}
