use runloop_protocol::ToolErrorCode;

/// What happened during one step's provider turn plus its tool executions,
/// as seen by the decision functions (§4.2.1).
#[derive(Debug, Clone, Default)]
pub struct AttemptSummary {
    pub tool_calls: u32,
    pub tool_successes: u32,
    pub tool_failures: u32,
    pub assistant_text: String,
    /// Set when the model's text reads like a commitment ("I'll check the
    /// file now...") without an accompanying tool call in the same turn.
    pub unfulfilled_commitment_preamble: bool,
    /// The user's message contained path/action cues (§4.2.1) suggesting
    /// tool use was actually required.
    pub tool_required_by_user_text: bool,
    pub last_failure: Option<LastFailure>,
}

#[derive(Debug, Clone)]
pub struct LastFailure {
    pub tool_name: String,
    pub code: ToolErrorCode,
    pub signature: String,
}

impl AttemptSummary {
    pub fn had_zero_tool_calls(&self) -> bool {
        self.tool_calls == 0
    }
}

/// Phrases that, if present in raw user text, mark the turn as one where
/// tool use was expected (§4.2.1's "path/action cues").
const TOOL_REQUIRED_CUES: &[&str] = &["run ", "read ", "edit ", "write ", "fix ", "install ", "/", "```"];

pub fn text_implies_tool_use(user_text: &str) -> bool {
    let lower = user_text.to_lowercase();
    TOOL_REQUIRED_CUES.iter().any(|cue| lower.contains(cue))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_path_and_action_cues() {
        assert!(text_implies_tool_use("please run the build script"));
        assert!(text_implies_tool_use("open src/main.rs"));
        assert!(!text_implies_tool_use("what do you think about rust?"));
    }
}
