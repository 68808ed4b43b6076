//! Real [`ApprovalGate`] wired to the `tool_approval` RPC (§6): the
//! executor's step loop blocks on [`ChannelApprovalGate::request_approval`]
//! while the RPC handler calls [`ChannelApprovalGate::resolve`] once the
//! user responds, or never — in which case the gate times out and denies.

use async_trait::async_trait;
use runloop_executor::ApprovalGate;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tokio::sync::oneshot;
use tokio::time::timeout;
use std::time::Duration;
use tracing::warn;

#[derive(Default)]
pub struct ChannelApprovalGate {
    pending: Mutex<HashMap<String, oneshot::Sender<bool>>>,
}

impl ChannelApprovalGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called by the `tool_approval` RPC handler once the user answers.
    /// Returns `false` if no request is pending for `tool_id` (already
    /// timed out, or the request never existed).
    pub async fn resolve(&self, tool_id: &str, approved: bool) -> bool {
        let sender = self.pending.lock().await.remove(tool_id);
        match sender {
            Some(sender) => sender.send(approved).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl ApprovalGate for ChannelApprovalGate {
    async fn request_approval(&self, run_id: &str, tool_id: &str, tool_name: &str, wait: Duration) -> bool {
        let (sender, receiver) = oneshot::channel();
        self.pending.lock().await.insert(tool_id.to_string(), sender);

        let outcome = timeout(wait, receiver).await;
        self.pending.lock().await.remove(tool_id);

        match outcome {
            Ok(Ok(approved)) => approved,
            Ok(Err(_)) => {
                warn!(run_id, tool_id, tool_name, "approval sender dropped, denying");
                false
            }
            Err(_) => {
                warn!(run_id, tool_id, tool_name, "tool approval timed out, denying");
                false
            }
        }
    }
}
