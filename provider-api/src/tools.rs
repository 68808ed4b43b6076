use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// Definition of a tool exposed to the model for this turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: None,
            parameters,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// How the model should choose which tool, if any, to call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolChoice {
    Auto,
    Required,
    None,
    Tool { name: String },
}

impl Default for ToolChoice {
    fn default() -> Self {
        ToolChoice::Auto
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_description() {
        let tool = ToolDefinition::new("fs_read", serde_json::json!({})).with_description("reads a file");
        assert_eq!(tool.description.as_deref(), Some("reads a file"));
    }

    #[test]
    fn tool_choice_serializes_tagged() {
        let choice = ToolChoice::Tool { name: "fs_read".to_string() };
        let json = serde_json::to_value(&choice).unwrap();
        assert_eq!(json["type"], "tool");
        assert_eq!(json["name"], "fs_read");
    }
}
