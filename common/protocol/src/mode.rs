use serde::Deserialize;
use serde::Serialize;

/// Execution mode for a run, gating which tools are available (§4.7) and
/// how the completion gate treats pending todos (§4.2.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    #[default]
    Act,
    Plan,
}

impl RunMode {
    pub fn is_plan(self) -> bool {
        matches!(self, RunMode::Plan)
    }
}
