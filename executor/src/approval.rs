//! Approval gate consulted before a mutating, approval-requiring tool call
//! executes in act mode (§4.2 step h). `runloop-session`'s thread actor
//! implements this against the real `tool_approval` RPC; headless or
//! no-user-interaction runs use [`AutoApprove`]/[`AutoDeny`].

use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait ApprovalGate: Send + Sync {
    async fn request_approval(&self, run_id: &str, tool_id: &str, tool_name: &str, timeout: Duration) -> bool;
}

/// Approves every request without waiting. Useful for subagent runs and
/// tests; never wire this to a user-facing run.
pub struct AutoApprove;

#[async_trait]
impl ApprovalGate for AutoApprove {
    async fn request_approval(&self, _run_id: &str, _tool_id: &str, _tool_name: &str, _timeout: Duration) -> bool {
        true
    }
}

/// Denies every request without waiting. The safe default when no real
/// approval channel has been wired up yet.
pub struct AutoDeny;

#[async_trait]
impl ApprovalGate for AutoDeny {
    async fn request_approval(&self, _run_id: &str, _tool_id: &str, _tool_name: &str, _timeout: Duration) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn auto_approve_always_approves() {
        assert!(AutoApprove.request_approval("r1", "t1", "fs_write", Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn auto_deny_always_denies() {
        assert!(!AutoDeny.request_approval("r1", "t1", "fs_write", Duration::from_secs(1)).await);
    }
}
