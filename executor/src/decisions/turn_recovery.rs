//! `decideTurnRecovery` (§4.2.1): the first decision function applied each
//! step, ahead of the loop guard and completion gate.

use crate::attempt::AttemptSummary;
use runloop_protocol::ToolErrorCode;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    ForceToolCall,
    RetryWithNormalizedArgs,
    ProbeWorkspaceThenRetry,
    RetryAlternativeTool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnRecoveryVerdict {
    /// Keep running; `prompt_directive` is appended to the next step's
    /// prompt and forbids another preamble without progress.
    Continue { action: RecoveryAction, prompt_directive: String },
    Fail { message: String },
    /// No recovery concern this step; fall through to the next decision
    /// function.
    Pass,
}

/// Tracks state that persists across steps for recovery decisions: how
/// much of the run's recovery budget has been spent, and how many times
/// each failure signature has recurred.
#[derive(Debug, Default)]
pub struct RecoveryState {
    pub recovery_steps_used: u32,
    pub recovery_budget: u32,
    pub failure_signature_counts: HashMap<String, u32>,
}

impl RecoveryState {
    pub fn new(recovery_budget: u32) -> Self {
        Self {
            recovery_steps_used: 0,
            recovery_budget,
            failure_signature_counts: HashMap::new(),
        }
    }

    fn record_failure_signature(&mut self, signature: &str) -> u32 {
        let count = self.failure_signature_counts.entry(signature.to_string()).or_insert(0);
        *count += 1;
        *count
    }
}

fn select_action(code: ToolErrorCode, attempt_number: u32) -> RecoveryAction {
    match code {
        ToolErrorCode::NotFound if attempt_number == 0 => RecoveryAction::ProbeWorkspaceThenRetry,
        ToolErrorCode::InvalidPath | ToolErrorCode::OutsideWorkspace | ToolErrorCode::NotFound => {
            RecoveryAction::RetryWithNormalizedArgs
        }
        _ => RecoveryAction::RetryAlternativeTool,
    }
}

/// Applies the turn-recovery rules in the order given in §4.2.1:
/// 1. Tool use was required but the attempt made none (or only promised
///    to act without following through) → force a tool call.
/// 2. The last failure signature recurred and `fail_on_repeated_failure_signature`
///    is set → fail outright.
/// 3. A recoverable tool-error code → continue with a targeted retry
///    action, naming the next concrete step.
/// 4. Recovery budget exhausted → fail, naming the last error code.
pub fn decide_turn_recovery(attempt: &AttemptSummary, state: &mut RecoveryState, fail_on_repeated_failure_signature: bool) -> TurnRecoveryVerdict {
    if attempt.tool_required_by_user_text && (attempt.had_zero_tool_calls() || attempt.unfulfilled_commitment_preamble) {
        return TurnRecoveryVerdict::Continue {
            action: RecoveryAction::ForceToolCall,
            prompt_directive: "Call a tool now; do not describe what you are about to do without doing it.".to_string(),
        };
    }

    let Some(failure) = &attempt.last_failure else {
        return TurnRecoveryVerdict::Pass;
    };

    let occurrences = state.record_failure_signature(&failure.signature);
    if occurrences > 1 && fail_on_repeated_failure_signature {
        return TurnRecoveryVerdict::Fail {
            message: format!("repeated failure signature for {}: {}", failure.tool_name, failure.signature),
        };
    }

    if !failure.code.is_recoverable_hint() {
        return TurnRecoveryVerdict::Pass;
    }

    if state.recovery_steps_used >= state.recovery_budget {
        return TurnRecoveryVerdict::Fail {
            message: format!("recovery budget exhausted after {:?} from {}", failure.code, failure.tool_name),
        };
    }

    let action = select_action(failure.code, state.recovery_steps_used);
    state.recovery_steps_used += 1;
    let directive = match action {
        RecoveryAction::ProbeWorkspaceThenRetry => {
            "The previous path was not found. List the relevant directory first, then retry with the corrected path. Do not repeat a preamble.".to_string()
        }
        RecoveryAction::RetryWithNormalizedArgs => {
            "Retry the same tool with a normalized, workspace-relative path. Do not repeat a preamble.".to_string()
        }
        RecoveryAction::RetryAlternativeTool => "That tool failed; use a different tool to achieve the same result. Do not repeat a preamble.".to_string(),
        RecoveryAction::ForceToolCall => unreachable!("force_tool_call handled above"),
    };
    TurnRecoveryVerdict::Continue { action, prompt_directive: directive }
}
