use serde::Deserialize;
use serde::Serialize;

/// Aggregate statistics describing a compression pass, surfaced for
/// observability (not sent to the provider).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ContextStats {
    pub total_messages: usize,
    pub kept_verbatim: usize,
    pub summarized_messages: usize,
    pub summary_char_count: usize,
}

/// The compaction output handed to the prompt builder (§4.4).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunContextPackage {
    pub open_goal: Option<String>,
    pub history_summary: Option<String>,
    pub anchors: Vec<String>,
    pub task_objective: Option<String>,
    pub step_sketch: Option<String>,
    pub task_progress_digest: Option<String>,
    pub stats: ContextStats,
}
