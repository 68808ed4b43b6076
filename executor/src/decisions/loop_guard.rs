//! Loop guard (§4.2.1): detects a run that is no longer making progress,
//! either by repeating an identical per-turn digest or by recurring the
//! same tool-call failure signature too many times.

use sha2::Digest;
use sha2::Sha256;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct TurnDigestInputs<'a> {
    pub tool_calls: u32,
    pub successes: u32,
    pub failures: u32,
    pub text_fingerprint: &'a str,
}

fn digest(inputs: &TurnDigestInputs<'_>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(inputs.tool_calls.to_le_bytes());
    hasher.update(inputs.successes.to_le_bytes());
    hasher.update(inputs.failures.to_le_bytes());
    hasher.update(inputs.text_fingerprint.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopGuardVerdict {
    Pass,
    Fail { reason: LoopGuardReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopGuardReason {
    NoProgress,
    RepeatedSignature,
}

impl LoopGuardReason {
    /// Both triggers surface under the same reason code (§4.2.1, scenario 5):
    /// a consumer only needs to know the loop guard fired, not which of its
    /// two counters tripped.
    pub fn as_str(self) -> &'static str {
        "loop_guard_repeated_signature"
    }
}

/// Per-run accumulator for the loop guard's two independent triggers.
#[derive(Debug, Default)]
pub struct LoopGuard {
    last_digest: Option<String>,
    consecutive_identical: u32,
    signature_counts: HashMap<String, u32>,
}

impl LoopGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record this step's turn digest and check whether the guard should
    /// fail the run. Call once per completed step, after tool execution.
    pub fn record_turn(&mut self, inputs: &TurnDigestInputs<'_>, max_no_progress_turns: u32) -> LoopGuardVerdict {
        let current = digest(inputs);
        if self.last_digest.as_deref() == Some(current.as_str()) {
            self.consecutive_identical += 1;
        } else {
            self.consecutive_identical = 0;
            self.last_digest = Some(current);
        }
        if self.consecutive_identical >= max_no_progress_turns {
            return LoopGuardVerdict::Fail { reason: LoopGuardReason::NoProgress };
        }
        LoopGuardVerdict::Pass
    }

    /// Record a tool-call signature and check whether it has recurred too
    /// many times.
    pub fn record_tool_signature(&mut self, signature: &str, max_repeated_signatures: u32) -> LoopGuardVerdict {
        let count = self.signature_counts.entry(signature.to_string()).or_insert(0);
        *count += 1;
        if *count >= max_repeated_signatures {
            return LoopGuardVerdict::Fail { reason: LoopGuardReason::RepeatedSignature };
        }
        LoopGuardVerdict::Pass
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(fp: &str) -> TurnDigestInputs<'_> {
        TurnDigestInputs {
            tool_calls: 1,
            successes: 0,
            failures: 1,
            text_fingerprint: fp,
        }
    }

    #[test]
    fn identical_digests_eventually_fail() {
        let mut guard = LoopGuard::new();
        assert_eq!(guard.record_turn(&inputs("same"), 3), LoopGuardVerdict::Pass);
        assert_eq!(guard.record_turn(&inputs("same"), 3), LoopGuardVerdict::Pass);
        let verdict = guard.record_turn(&inputs("same"), 3);
        assert_eq!(
            verdict,
            LoopGuardVerdict::Fail {
                reason: LoopGuardReason::NoProgress
            }
        );
    }

    #[test]
    fn differing_digests_reset_the_counter() {
        let mut guard = LoopGuard::new();
        guard.record_turn(&inputs("a"), 2);
        guard.record_turn(&inputs("a"), 2);
        let verdict = guard.record_turn(&inputs("b"), 2);
        assert_eq!(verdict, LoopGuardVerdict::Pass);
    }

    #[test]
    fn repeated_tool_signature_fails() {
        let mut guard = LoopGuard::new();
        guard.record_tool_signature("fs_read|not_found|x|y", 3);
        guard.record_tool_signature("fs_read|not_found|x|y", 3);
        let verdict = guard.record_tool_signature("fs_read|not_found|x|y", 3);
        assert_eq!(
            verdict,
            LoopGuardVerdict::Fail {
                reason: LoopGuardReason::RepeatedSignature
            }
        );
    }
}
