use crate::templates;
use runloop_context::RunContextPackage;
use runloop_protocol::ClassifierResult;
use runloop_protocol::Complexity;
use runloop_protocol::RunMode;
use runloop_protocol::TodoPolicy;
use runloop_protocol::TodoSnapshot;

pub fn identity_section() -> String {
    templates::BASE_IDENTITY.to_string()
}

pub fn mode_section(mode: RunMode) -> String {
    match mode {
        RunMode::Act => templates::MODE_ACT.to_string(),
        RunMode::Plan => templates::MODE_PLAN.to_string(),
    }
}

pub fn complexity_section(classifier: &ClassifierResult) -> String {
    match classifier.complexity {
        Complexity::Trivial => "This is a trivial request; respond directly without over-engineering.".to_string(),
        Complexity::Moderate => "This request has moderate scope; break it into a short sequence of concrete steps.".to_string(),
        Complexity::Complex => "This is a complex task. Decompose it, track progress explicitly, and verify before declaring completion.".to_string(),
    }
}

pub fn todo_policy_section(policy: TodoPolicy) -> String {
    match policy {
        TodoPolicy::Required => templates::TODO_POLICY_REQUIRED.to_string(),
        TodoPolicy::Lazy => templates::TODO_POLICY_LAZY.to_string(),
        TodoPolicy::Skip => templates::TODO_POLICY_SKIP.to_string(),
    }
}

pub fn capability_section(no_user_interaction: bool, subagent_depth: u32) -> String {
    let mut lines = Vec::new();
    if no_user_interaction {
        lines.push("You cannot ask the user questions in this run; resolve ambiguity yourself or record an explicit assumption.".to_string());
    }
    if subagent_depth > 0 {
        lines.push(format!("You are a depth-{subagent_depth} subagent; prefer acting autonomously over escalating to the user."));
    }
    lines.join("\n")
}

pub fn history_section(package: &RunContextPackage) -> String {
    match &package.history_summary {
        Some(summary) if !summary.is_empty() => format!("Earlier conversation summary:\n{summary}"),
        _ => String::new(),
    }
}

pub fn anchors_section(package: &RunContextPackage) -> String {
    if package.anchors.is_empty() {
        return String::new();
    }
    format!("Recently referenced paths/commands: {}", package.anchors.join(", "))
}

pub fn task_progress_section(package: &RunContextPackage) -> String {
    package.task_progress_digest.clone().unwrap_or_default()
}

pub fn todo_memory_section(snapshot: &TodoSnapshot) -> String {
    if snapshot.items.is_empty() {
        return String::new();
    }
    let mut lines = String::from("Current task list:\n");
    for item in &snapshot.items {
        lines.push_str(&format!("- [{:?}] {}\n", item.status, item.content));
    }
    lines
}

pub fn skill_overlays_section(overlays: &[String]) -> String {
    overlays.join("\n\n")
}

/// Join non-empty, trimmed sections with a blank line, in order.
pub fn assemble(sections: &[String]) -> String {
    sections
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
