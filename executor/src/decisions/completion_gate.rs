//! `evaluateTaskCompletionGate` (§4.2.1).

use runloop_protocol::Complexity;
use runloop_protocol::Intent;
use runloop_protocol::RunMode;
use runloop_protocol::TodoPolicy;
use runloop_protocol::TodoSnapshot;

/// A `task` intent's completion contract is `explicit_only`: the gate only
/// considers the run complete on a step where the model emitted
/// `task_complete`. `social`/`creative` intents have no completion contract
/// at all and always pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionRejection {
    EmptyResult,
    PendingTodos,
    MissingTodosForComplexTask,
    TodoRequirementMissingPolicyRequired,
    TodoRequirementInsufficientPolicyRequired,
}

impl CompletionRejection {
    pub fn as_str(self) -> &'static str {
        match self {
            CompletionRejection::EmptyResult => "empty_result",
            CompletionRejection::PendingTodos => "pending_todos",
            CompletionRejection::MissingTodosForComplexTask => "missing_todos_for_complex_task",
            CompletionRejection::TodoRequirementMissingPolicyRequired => "todo_requirement_missing_policy_required",
            CompletionRejection::TodoRequirementInsufficientPolicyRequired => "todo_requirement_insufficient_policy_required",
        }
    }
}

/// Minimum number of todo items a `Required` policy expects for a complex
/// task before the gate considers the list merely nominal rather than a
/// real decomposition (Open Question resolution, see DESIGN.md).
const MIN_REQUIRED_TODO_ITEMS: usize = 2;

pub struct CompletionGateInputs<'a> {
    pub mode: RunMode,
    pub intent: Intent,
    pub complexity: Complexity,
    pub todo_policy: TodoPolicy,
    pub todos: &'a TodoSnapshot,
    pub assistant_text: &'a str,
    /// Whether the model emitted `task_complete` in this step.
    pub explicit_completion_signal: bool,
}

pub fn evaluate_task_completion_gate(inputs: &CompletionGateInputs<'_>) -> Result<(), CompletionRejection> {
    if matches!(inputs.intent, Intent::Social | Intent::Creative) {
        return Ok(());
    }

    if !inputs.explicit_completion_signal || inputs.assistant_text.trim().is_empty() {
        return Err(CompletionRejection::EmptyResult);
    }

    if inputs.mode == RunMode::Act && inputs.todos.open_count() > 0 {
        return Err(CompletionRejection::PendingTodos);
    }

    if matches!(inputs.complexity, Complexity::Complex) && inputs.todos.items.is_empty() {
        return Err(CompletionRejection::MissingTodosForComplexTask);
    }

    if inputs.todo_policy == TodoPolicy::Required {
        if inputs.todos.items.is_empty() {
            return Err(CompletionRejection::TodoRequirementMissingPolicyRequired);
        }
        if inputs.todos.items.len() < MIN_REQUIRED_TODO_ITEMS {
            return Err(CompletionRejection::TodoRequirementInsufficientPolicyRequired);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use runloop_protocol::TodoItem;
    use runloop_protocol::TodoStatus;

    fn item(status: TodoStatus) -> TodoItem {
        TodoItem {
            id: "1".to_string(),
            content: "do thing".to_string(),
            status,
            note: None,
        }
    }

    #[test]
    fn social_intent_always_passes() {
        let todos = TodoSnapshot::default();
        let inputs = CompletionGateInputs {
            mode: RunMode::Act,
            intent: Intent::Social,
            complexity: Complexity::Trivial,
            todo_policy: TodoPolicy::Skip,
            todos: &todos,
            assistant_text: "",
            explicit_completion_signal: false,
        };
        assert!(evaluate_task_completion_gate(&inputs).is_ok());
    }

    #[test]
    fn task_without_explicit_signal_is_empty_result() {
        let todos = TodoSnapshot::default();
        let inputs = CompletionGateInputs {
            mode: RunMode::Act,
            intent: Intent::Task,
            complexity: Complexity::Trivial,
            todo_policy: TodoPolicy::Skip,
            todos: &todos,
            assistant_text: "done",
            explicit_completion_signal: false,
        };
        assert_eq!(evaluate_task_completion_gate(&inputs), Err(CompletionRejection::EmptyResult));
    }

    #[test]
    fn act_mode_rejects_pending_todos() {
        let todos = TodoSnapshot {
            version: 0,
            items: vec![item(TodoStatus::Pending)],
        };
        let inputs = CompletionGateInputs {
            mode: RunMode::Act,
            intent: Intent::Task,
            complexity: Complexity::Trivial,
            todo_policy: TodoPolicy::Skip,
            todos: &todos,
            assistant_text: "done",
            explicit_completion_signal: true,
        };
        assert_eq!(evaluate_task_completion_gate(&inputs), Err(CompletionRejection::PendingTodos));
    }

    #[test]
    fn plan_mode_tolerates_pending_todos() {
        let todos = TodoSnapshot {
            version: 0,
            items: vec![item(TodoStatus::Pending)],
        };
        let inputs = CompletionGateInputs {
            mode: RunMode::Plan,
            intent: Intent::Task,
            complexity: Complexity::Trivial,
            todo_policy: TodoPolicy::Skip,
            todos: &todos,
            assistant_text: "done",
            explicit_completion_signal: true,
        };
        assert!(evaluate_task_completion_gate(&inputs).is_ok());
    }

    #[test]
    fn complex_task_requires_some_todos() {
        let todos = TodoSnapshot::default();
        let inputs = CompletionGateInputs {
            mode: RunMode::Act,
            intent: Intent::Task,
            complexity: Complexity::Complex,
            todo_policy: TodoPolicy::Lazy,
            todos: &todos,
            assistant_text: "done",
            explicit_completion_signal: true,
        };
        assert_eq!(evaluate_task_completion_gate(&inputs), Err(CompletionRejection::MissingTodosForComplexTask));
    }

    #[test]
    fn required_policy_wants_at_least_two_items() {
        let todos = TodoSnapshot {
            version: 0,
            items: vec![item(TodoStatus::Completed)],
        };
        let inputs = CompletionGateInputs {
            mode: RunMode::Act,
            intent: Intent::Task,
            complexity: Complexity::Complex,
            todo_policy: TodoPolicy::Required,
            todos: &todos,
            assistant_text: "done",
            explicit_completion_signal: true,
        };
        assert_eq!(
            evaluate_task_completion_gate(&inputs),
            Err(CompletionRejection::TodoRequirementInsufficientPolicyRequired)
        );
    }

    #[test]
    fn fully_satisfied_task_passes() {
        let todos = TodoSnapshot {
            version: 0,
            items: vec![item(TodoStatus::Completed), item(TodoStatus::Completed)],
        };
        let inputs = CompletionGateInputs {
            mode: RunMode::Act,
            intent: Intent::Task,
            complexity: Complexity::Complex,
            todo_policy: TodoPolicy::Required,
            todos: &todos,
            assistant_text: "done",
            explicit_completion_signal: true,
        };
        assert!(evaluate_task_completion_gate(&inputs).is_ok());
    }
}
