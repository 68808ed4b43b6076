//! Context Orchestrator (C5, §4.4): compresses raw transcript history into
//! a provider-sized window plus a [`RunContextPackage`] of derived context.

use crate::anchors::extract_anchors;
use crate::budget::HISTORY_RECENT_MESSAGE_KEEP;
use crate::budget::HISTORY_SOFT_CHAR_BUDGET;
use crate::budget::HISTORY_SUMMARY_MAX_CHARS;
use crate::budget::MESSAGE_PREVIEW_MAX_RUNES;
use crate::package::ContextStats;
use crate::package::RunContextPackage;
use runloop_message::truncate_preview;
use runloop_protocol::Message;
use runloop_protocol::MessageRole;
use runloop_protocol::MessageStatus;

fn total_chars(history: &[Message]) -> usize {
    history.iter().map(|m| m.text_content.chars().count()).sum()
}

fn synthetic_message(text: String) -> Message {
    Message {
        row_id: 0,
        message_id: "synthetic".to_string(),
        role: MessageRole::Assistant,
        status: MessageStatus::Final,
        created_at_ms: 0,
        text_content: text,
        blocks: Vec::new(),
    }
}

fn summarize(older: &[Message]) -> String {
    let mut summary = String::new();
    for message in older {
        let role_tag = match message.role {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::ToolResult => "tool",
        };
        let preview = truncate_preview(message.text_content.trim(), MESSAGE_PREVIEW_MAX_RUNES);
        if preview.is_empty() {
            continue;
        }
        let line = format!("- [{role_tag}] {preview}\n");
        if summary.chars().count() + line.chars().count() > HISTORY_SUMMARY_MAX_CHARS {
            break;
        }
        summary.push_str(&line);
    }
    summary
}

/// Compresses `history` and derives a [`RunContextPackage`] for the prompt
/// builder. When history fits within budget, no splitting occurs and the
/// package's `history_summary` is `None`.
pub fn compress_history(history: &[Message], open_goal: Option<&str>) -> (Vec<Message>, RunContextPackage) {
    let total = total_chars(history);
    let within_budget = total <= HISTORY_SOFT_CHAR_BUDGET && history.len() <= HISTORY_RECENT_MESSAGE_KEEP;

    let combined_text: String = history.iter().map(|m| m.text_content.as_str()).collect::<Vec<_>>().join("\n");
    let anchors = extract_anchors(&combined_text);

    if within_budget {
        let stats = ContextStats {
            total_messages: history.len(),
            kept_verbatim: history.len(),
            summarized_messages: 0,
            summary_char_count: 0,
        };
        return (
            history.to_vec(),
            RunContextPackage {
                open_goal: open_goal.map(str::to_string),
                history_summary: None,
                anchors,
                task_objective: None,
                step_sketch: None,
                task_progress_digest: None,
                stats,
            },
        );
    }

    let keep_from = history.len().saturating_sub(HISTORY_RECENT_MESSAGE_KEEP);
    let (older, recent) = history.split_at(keep_from);
    let summary = summarize(older);

    let mut compressed = Vec::with_capacity(recent.len() + 2);
    if let Some(goal) = open_goal {
        compressed.push(synthetic_message(format!("<open-goal>\n{goal}\n</open-goal>")));
    }
    if !summary.is_empty() {
        compressed.push(synthetic_message(format!("<history-summary>\n{summary}</history-summary>")));
    }
    compressed.extend_from_slice(recent);

    let stats = ContextStats {
        total_messages: history.len(),
        kept_verbatim: recent.len(),
        summarized_messages: older.len(),
        summary_char_count: summary.chars().count(),
    };

    (
        compressed,
        RunContextPackage {
            open_goal: open_goal.map(str::to_string),
            history_summary: if summary.is_empty() { None } else { Some(summary) },
            anchors,
            task_objective: None,
            step_sketch: None,
            task_progress_digest: None,
            stats,
        },
    )
}
