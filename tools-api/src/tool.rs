use crate::context::ToolContext;
use crate::error::ToolError;
use async_trait::async_trait;
use runloop_protocol::ToolCapabilityFlags;
use runloop_protocol::ToolResult;
use runloop_provider_api::ToolDefinition;
use serde_json::Value;

/// A tool invocable by the model, per the handler contract of §4.7:
/// `Validate`, `Execute`, and an optional `HandlePartial` for streaming
/// argument assembly.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn input_schema(&self) -> Value;

    fn capability_flags(&self) -> ToolCapabilityFlags;

    /// Validate arguments before execution. The default checks required
    /// fields named in the JSON Schema's `required` array.
    fn validate(&self, args: &Value) -> Result<(), ToolError> {
        let schema = self.input_schema();
        let Some(required) = schema.get("required").and_then(Value::as_array) else {
            return Ok(());
        };
        for field in required {
            let Some(field_name) = field.as_str() else { continue };
            if args.get(field_name).is_none() {
                return Err(ToolError::InvalidArgs {
                    tool_name: self.name().to_string(),
                    message: format!("missing required field {field_name:?}"),
                });
            }
        }
        Ok(())
    }

    /// Called with partial JSON as the model streams a tool call's
    /// arguments. Most tools only need the final, complete arguments and
    /// can leave this as a no-op.
    fn handle_partial(&self, _partial: &str) {}

    async fn execute(&self, tool_id: &str, args: Value, ctx: &mut ToolContext) -> Result<ToolResult, ToolError>;

    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.input_schema()).with_description(self.description())
    }
}
