use crate::request::ClassifyRequest;
use runloop_protocol::ClassifierResult;
use runloop_protocol::Complexity;
use runloop_protocol::Intent;
use runloop_protocol::ObjectiveMode;
use runloop_protocol::TodoPolicy;

/// Post-processing rules applied to any classifier verdict, model-derived
/// or fallback (§4.2 step 2, §4.5):
/// - attachments always force `intent=task`.
/// - creative/social intents are coerced to a minimal-ceremony shape.
/// - `objective_mode=continue` is only honored for tasks with an open goal.
pub fn apply_rules(request: &ClassifyRequest<'_>, mut result: ClassifierResult) -> ClassifierResult {
    if request.attachments_present {
        result.intent = Intent::Task;
    }

    if matches!(result.intent, Intent::Social | Intent::Creative) {
        result.complexity = Complexity::Trivial;
        result.todo_policy = TodoPolicy::Skip;
        result.objective_mode = ObjectiveMode::Replace;
        return result;
    }

    if matches!(result.objective_mode, ObjectiveMode::Continue) && request.open_goal.is_none() {
        result.objective_mode = ObjectiveMode::Replace;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use runloop_protocol::ClassifierSource;

    fn base(intent: Intent) -> ClassifierResult {
        ClassifierResult {
            intent,
            complexity: Complexity::Complex,
            objective_mode: ObjectiveMode::Continue,
            todo_policy: TodoPolicy::Required,
            source: ClassifierSource::Model,
        }
    }

    #[test]
    fn attachments_force_task_intent() {
        let request = ClassifyRequest {
            user_text: "what's this?",
            attachments_present: true,
            open_goal: None,
        };
        let result = apply_rules(&request, base(Intent::Social));
        assert_eq!(result.intent, Intent::Task);
    }

    #[test]
    fn social_intent_is_coerced_to_minimal_ceremony() {
        let request = ClassifyRequest {
            user_text: "hey!",
            attachments_present: false,
            open_goal: None,
        };
        let result = apply_rules(&request, base(Intent::Social));
        assert_eq!(result.complexity, Complexity::Trivial);
        assert_eq!(result.todo_policy, TodoPolicy::Skip);
        assert_eq!(result.objective_mode, ObjectiveMode::Replace);
    }

    #[test]
    fn continue_requires_open_goal() {
        let request = ClassifyRequest {
            user_text: "keep going",
            attachments_present: false,
            open_goal: None,
        };
        let result = apply_rules(&request, base(Intent::Task));
        assert_eq!(result.objective_mode, ObjectiveMode::Replace);
    }

    #[test]
    fn continue_is_honored_with_open_goal() {
        let request = ClassifyRequest {
            user_text: "keep going",
            attachments_present: false,
            open_goal: Some("ship the feature"),
        };
        let result = apply_rules(&request, base(Intent::Task));
        assert_eq!(result.objective_mode, ObjectiveMode::Continue);
    }
}
