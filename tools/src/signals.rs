//! `ask_user` and `task_complete`: pseudo-tool signals (glossary) whose
//! meaning is lifecycle, not side-effecting work. The executor special-cases
//! them during turn splitting (§4.2 step 3d) rather than routing them
//! through the ordinary execute path, but they are registered here like any
//! other tool definition so the model can call them and so `execute` has a
//! well-defined fallback for direct invocation (e.g. in tests).

use async_trait::async_trait;
use runloop_protocol::AskUserReasonCode;
use runloop_protocol::AskUserSignal;
use runloop_protocol::ToolCapabilityFlags;
use runloop_protocol::ToolResult;
use runloop_tools_api::Tool;
use runloop_tools_api::ToolContext;
use runloop_tools_api::ToolError;
use serde_json::Value;
use serde_json::json;

pub struct AskUserTool;

impl AskUserTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AskUserTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for AskUserTool {
    fn name(&self) -> &str {
        "ask_user"
    }

    fn description(&self) -> &str {
        "Ask the human operator a question when a genuine external blocker prevents progress."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "question": { "type": "string" },
                "options": { "type": "array", "items": { "type": "string" } },
                "reason_code": {
                    "type": "string",
                    "enum": ["user_decision_required", "permission_blocked", "missing_external_input", "conflicting_constraints", "safety_confirmation"]
                },
                "required_from_user": { "type": "array", "items": { "type": "string" } },
                "evidence_refs": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["question", "reason_code"]
        })
    }

    fn capability_flags(&self) -> ToolCapabilityFlags {
        ToolCapabilityFlags {
            mutating: false,
            requires_approval: false,
            parallel_safe: false,
        }
    }

    async fn execute(&self, tool_id: &str, args: Value, _ctx: &mut ToolContext) -> Result<ToolResult, ToolError> {
        let signal = parse_ask_user(self.name(), &args)?;
        let mut result = ToolResult::success(tool_id, self.name(), signal.question.clone());
        result.data = Some(serde_json::to_value(&signal).unwrap_or(Value::Null));
        Ok(result)
    }
}

fn parse_ask_user(tool_name: &str, args: &Value) -> Result<AskUserSignal, ToolError> {
    let question = args.get("question").and_then(Value::as_str).ok_or_else(|| ToolError::InvalidArgs {
        tool_name: tool_name.to_string(),
        message: "question must be a string".to_string(),
    })?;
    let reason_code = match args.get("reason_code").and_then(Value::as_str) {
        Some("user_decision_required") => AskUserReasonCode::UserDecisionRequired,
        Some("permission_blocked") => AskUserReasonCode::PermissionBlocked,
        Some("missing_external_input") => AskUserReasonCode::MissingExternalInput,
        Some("conflicting_constraints") => AskUserReasonCode::ConflictingConstraints,
        Some("safety_confirmation") => AskUserReasonCode::SafetyConfirmation,
        _ => {
            return Err(ToolError::InvalidArgs {
                tool_name: tool_name.to_string(),
                message: "reason_code missing or unrecognized".to_string(),
            });
        }
    };
    let string_list = |key: &str| -> Vec<String> {
        args.get(key)
            .and_then(Value::as_array)
            .map(|values| values.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default()
    };
    Ok(AskUserSignal {
        question: question.to_string(),
        options: string_list("options"),
        reason_code,
        required_from_user: string_list("required_from_user"),
        evidence_refs: string_list("evidence_refs"),
    }
    .normalized())
}

pub struct TaskCompleteTool;

impl TaskCompleteTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TaskCompleteTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for TaskCompleteTool {
    fn name(&self) -> &str {
        "task_complete"
    }

    fn description(&self) -> &str {
        "Signal that the current task is finished; the executor applies the completion gate before honoring it."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "summary": { "type": "string", "description": "What was accomplished" }
            },
            "required": ["summary"]
        })
    }

    fn capability_flags(&self) -> ToolCapabilityFlags {
        ToolCapabilityFlags {
            mutating: false,
            requires_approval: false,
            parallel_safe: false,
        }
    }

    async fn execute(&self, tool_id: &str, args: Value, _ctx: &mut ToolContext) -> Result<ToolResult, ToolError> {
        let summary = args.get("summary").and_then(Value::as_str).ok_or_else(|| ToolError::InvalidArgs {
            tool_name: self.name().to_string(),
            message: "summary must be a string".to_string(),
        })?;
        Ok(ToolResult::success(tool_id, self.name(), summary.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runloop_protocol::CapabilityContract;
    use runloop_protocol::RunMode;
    use std::path::PathBuf;

    fn ctx() -> ToolContext {
        ToolContext::new("t1", "r1", PathBuf::from("/workspace"), CapabilityContract::new(RunMode::Act))
    }

    #[tokio::test]
    async fn ask_user_parses_full_signal() {
        let mut ctx = ctx();
        let result = AskUserTool::new()
            .execute(
                "tc1",
                json!({
                    "question": "Which branch?",
                    "reason_code": "missing_external_input",
                    "options": ["main", "dev"]
                }),
                &mut ctx,
            )
            .await
            .unwrap();
        assert!(!result.is_error());
        assert_eq!(result.data.unwrap()["reason_code"], "missing_external_input");
    }

    #[tokio::test]
    async fn ask_user_rejects_unknown_reason_code() {
        let mut ctx = ctx();
        let err = AskUserTool::new()
            .execute("tc2", json!({"question": "why?", "reason_code": "nonsense"}), &mut ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgs { .. }));
    }

    #[tokio::test]
    async fn task_complete_carries_summary() {
        let mut ctx = ctx();
        let result = TaskCompleteTool::new()
            .execute("tc3", json!({"summary": "done"}), &mut ctx)
            .await
            .unwrap();
        assert_eq!(result.summary, "done");
    }
}
