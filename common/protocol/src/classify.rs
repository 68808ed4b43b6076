use serde::Deserialize;
use serde::Serialize;

/// Coarse intent bucket assigned to an incoming user message (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Social,
    Creative,
    Task,
}

/// Relative effort estimate used to pick a todo policy (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Trivial,
    Moderate,
    Complex,
}

/// Where a [`ClassifierResult`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierSource {
    Model,
    DeterministicFallback,
}

/// Whether a new message should continue the current objective or replace
/// it with a fresh one (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveMode {
    Continue,
    Replace,
}

/// How the orchestrator should manage the todo list for this turn (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoPolicy {
    /// Skip todos entirely — social/creative chit-chat doesn't need a plan.
    Skip,
    /// Create a todo list only if the run turns out to need more than one
    /// step.
    Lazy,
    /// Require a todo list up front.
    Required,
}

/// The classifier's verdict for one incoming message (§4.5, C6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierResult {
    pub intent: Intent,
    pub complexity: Complexity,
    pub objective_mode: ObjectiveMode,
    pub todo_policy: TodoPolicy,
    pub source: ClassifierSource,
}

impl ClassifierResult {
    /// The conservative fallback used when the classifier provider call
    /// fails or times out: treat the message as a complex task that
    /// continues the existing objective and requires a todo list, since
    /// under-planning is worse than over-planning (§4.5).
    pub fn deterministic_fallback() -> Self {
        Self {
            intent: Intent::Task,
            complexity: Complexity::Complex,
            objective_mode: ObjectiveMode::Continue,
            todo_policy: TodoPolicy::Required,
            source: ClassifierSource::DeterministicFallback,
        }
    }
}
