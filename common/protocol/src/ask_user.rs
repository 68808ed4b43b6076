use serde::Deserialize;
use serde::Serialize;

/// Machine-readable reason a run is asking the user for input (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AskUserReasonCode {
    UserDecisionRequired,
    PermissionBlocked,
    MissingExternalInput,
    ConflictingConstraints,
    SafetyConfirmation,
}

impl AskUserReasonCode {
    pub fn as_str(self) -> &'static str {
        match self {
            AskUserReasonCode::UserDecisionRequired => "user_decision_required",
            AskUserReasonCode::PermissionBlocked => "permission_blocked",
            AskUserReasonCode::MissingExternalInput => "missing_external_input",
            AskUserReasonCode::ConflictingConstraints => "conflicting_constraints",
            AskUserReasonCode::SafetyConfirmation => "safety_confirmation",
        }
    }
}

/// Cap on normalized list fields (`options`, `required_from_user`,
/// `evidence_refs`) after dedup (§4.3).
pub const MAX_LIST_ITEMS: usize = 8;
/// Cap on any single string field after normalization (§4.3).
pub const MAX_ITEM_CHARS: usize = 200;

/// The structured signal a run emits to request human input and transition
/// to `waiting_user` (§4.3, §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskUserSignal {
    pub question: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    pub reason_code: AskUserReasonCode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_from_user: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence_refs: Vec<String>,
}

impl AskUserSignal {
    /// The note suffix recorded against todos closed out by this signal
    /// (I4): `source=<reason_code>; ask: <truncated question>`.
    pub fn todo_note_suffix(&self) -> String {
        format!("source={}; ask: {}", self.reason_code.as_str(), truncate_chars(self.question.trim(), MAX_ITEM_CHARS))
    }

    /// Applies §4.3's normalization: trims every field, dedupes the list
    /// fields case-insensitively, caps each list to [`MAX_LIST_ITEMS`] with
    /// a trailing marker noting how many were dropped, and caps every
    /// string to [`MAX_ITEM_CHARS`].
    pub fn normalized(self) -> Self {
        Self {
            question: truncate_chars(self.question.trim(), MAX_ITEM_CHARS),
            options: normalize_list(self.options),
            reason_code: self.reason_code,
            required_from_user: normalize_list(self.required_from_user),
            evidence_refs: normalize_list(self.evidence_refs),
        }
    }
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut truncated: String = s.chars().take(max_chars.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}

fn normalize_list(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for item in items {
        let trimmed = item.trim();
        if trimmed.is_empty() || !seen.insert(trimmed.to_lowercase()) {
            continue;
        }
        out.push(truncate_chars(trimmed, MAX_ITEM_CHARS));
    }
    if out.len() > MAX_LIST_ITEMS {
        let dropped = out.len() - (MAX_LIST_ITEMS - 1);
        out.truncate(MAX_LIST_ITEMS - 1);
        out.push(format!("… and {dropped} more"));
    }
    out
}
