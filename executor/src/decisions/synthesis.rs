//! Turn outcome classification for synthesis (§4.2.2): some providers stop
//! after emitting tool calls and expect a follow-up prompt before they will
//! produce assistant text, so a turn that produced tool calls but no text
//! earns exactly one additional step with tools suppressed.

/// Directive pushed to history ahead of a suppressed-tools synthesis step.
pub const SYNTHESIS_DIRECTIVE: &str = "summarize from existing evidence";

/// True when the turn's tool calls outnumber its text emissions — here,
/// at least one tool call and no assistant text at all.
pub fn needs_followup_hint(tool_call_count: usize, assistant_text: &str) -> bool {
    tool_call_count > 0 && assistant_text.trim().is_empty()
}
