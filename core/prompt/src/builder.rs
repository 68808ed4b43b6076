//! Layered system prompt assembly (§4.2 step 3a): identity + mode +
//! complexity + todo policy + capability contract + compressed history +
//! tool memory + active skill overlays + task-progress digest + anchors.

use crate::sections;
use runloop_context::RunContextPackage;
use runloop_protocol::ClassifierResult;
use runloop_protocol::RunMode;
use runloop_protocol::TodoSnapshot;

/// Everything the prompt builder needs for one step. Pure data; building a
/// prompt is sync, pure string assembly with no I/O.
pub struct PromptInputs<'a> {
    pub mode: RunMode,
    pub classifier: &'a ClassifierResult,
    pub no_user_interaction: bool,
    pub subagent_depth: u32,
    pub context: &'a RunContextPackage,
    pub todos: &'a TodoSnapshot,
    pub skill_overlays: &'a [String],
}

pub struct SystemPromptBuilder;

impl SystemPromptBuilder {
    pub fn build(inputs: &PromptInputs<'_>) -> String {
        let sections = vec![
            sections::identity_section(),
            sections::mode_section(inputs.mode),
            sections::complexity_section(inputs.classifier),
            sections::todo_policy_section(inputs.classifier.todo_policy),
            sections::capability_section(inputs.no_user_interaction, inputs.subagent_depth),
            sections::history_section(inputs.context),
            sections::todo_memory_section(inputs.todos),
            sections::skill_overlays_section(inputs.skill_overlays),
            sections::task_progress_section(inputs.context),
            sections::anchors_section(inputs.context),
        ];
        sections::assemble(&sections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runloop_protocol::ClassifierResult;

    fn inputs(classifier: ClassifierResult, context: RunContextPackage, todos: TodoSnapshot) -> (ClassifierResult, RunContextPackage, TodoSnapshot) {
        (classifier, context, todos)
    }

    #[test]
    fn builds_non_empty_prompt_with_defaults() {
        let classifier = ClassifierResult::deterministic_fallback();
        let context = RunContextPackage::default();
        let todos = TodoSnapshot::default();
        let (classifier, context, todos) = inputs(classifier, context, todos);
        let prompt = SystemPromptBuilder::build(&PromptInputs {
            mode: RunMode::Act,
            classifier: &classifier,
            no_user_interaction: false,
            subagent_depth: 0,
            context: &context,
            todos: &todos,
            skill_overlays: &[],
        });
        assert!(prompt.contains("autonomous coding agent"));
        assert!(prompt.contains("Mode: act"));
    }

    #[test]
    fn plan_mode_section_is_present() {
        let classifier = ClassifierResult::deterministic_fallback();
        let context = RunContextPackage::default();
        let todos = TodoSnapshot::default();
        let prompt = SystemPromptBuilder::build(&PromptInputs {
            mode: RunMode::Plan,
            classifier: &classifier,
            no_user_interaction: true,
            subagent_depth: 1,
            context: &context,
            todos: &todos,
            skill_overlays: &[],
        });
        assert!(prompt.contains("Mode: plan"));
        assert!(prompt.contains("cannot ask"));
        assert!(prompt.contains("depth-1"));
    }
}
