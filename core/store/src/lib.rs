//! Append-only transcript and event store, keyed by `(endpoint, thread,
//! run, row)` (C3).
//!
//! The trait in this crate is the only boundary the rest of the workspace
//! needs: [`InMemoryStore`] is the reference implementation used by tests
//! and by `app-server` when no external database is configured. A SQLite-
//! or Postgres-backed implementation can satisfy [`TranscriptStore`]
//! without the rest of the workspace changing.

pub mod error;
mod memory;

use async_trait::async_trait;
use runloop_protocol::Message;
use runloop_protocol::RealtimeEvent;

pub use error::StoreError;
pub use memory::InMemoryStore;

/// One page of messages returned by [`TranscriptStore::list_messages`].
#[derive(Debug, Clone)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub next_after_row_id: i64,
    pub has_more: bool,
}

/// The append-only store backing a thread's transcript and event log
/// (§3, §6). All operations are scoped to an `endpoint` — the outermost
/// tenancy boundary row ids are monotonic within.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Append a message, assigning it the next row id for `endpoint`.
    /// Idempotent on `message_id`: a duplicate insert returns the row
    /// already stored rather than creating a second one (§3).
    async fn append_message(&self, endpoint: &str, thread_id: &str, message: Message) -> error::Result<Message>;

    /// Fetch a single stored message by `message_id`, used by
    /// `set_tool_collapsed` (§6) to read-modify-write a tool call block.
    async fn get_message(&self, endpoint: &str, thread_id: &str, message_id: &str) -> error::Result<Message>;

    /// Overwrite an already-stored message in place, preserving its
    /// `row_id`. Used by `set_tool_collapsed` (§6, R2): the row id and
    /// ordering never change, only the message's own content.
    async fn update_message(&self, endpoint: &str, thread_id: &str, message: Message) -> error::Result<Message>;

    /// List messages after `after_row_id`, ascending, capped at `limit`
    /// (§6: `limit` ≤ 500 is enforced by the caller at the RPC boundary).
    async fn list_messages(
        &self,
        endpoint: &str,
        thread_id: &str,
        after_row_id: i64,
        limit: usize,
    ) -> error::Result<MessagePage>;

    /// Append a run event. Text deltas, transcript echoes, and
    /// thread-summary events are never passed here — callers only persist
    /// event types named as durable in §3/§6.
    async fn append_event(&self, event: RealtimeEvent) -> error::Result<RealtimeEvent>;

    /// List events for one run, ascending by `seq`.
    async fn list_run_events(&self, run_id: &str) -> error::Result<Vec<RealtimeEvent>>;

    /// Truncate a thread's transcript back to (and including) `row_id`,
    /// used by rewind (C10 invokes this after restoring a checkpoint).
    async fn truncate_after(&self, endpoint: &str, thread_id: &str, row_id: i64) -> error::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use runloop_protocol::MessageRole;
    use runloop_protocol::MessageStatus;

    pub(crate) fn sample_message(message_id: &str) -> Message {
        Message {
            row_id: 0,
            message_id: message_id.to_string(),
            role: MessageRole::User,
            status: MessageStatus::Final,
            created_at_ms: 1,
            text_content: "hello".to_string(),
            blocks: vec![],
        }
    }

    #[tokio::test]
    async fn append_and_list_round_trip() {
        let store = InMemoryStore::default();
        store.append_message("ep1", "t1", sample_message("m1")).await.unwrap();
        store.append_message("ep1", "t1", sample_message("m2")).await.unwrap();
        let page = store.list_messages("ep1", "t1", 0, 10).await.unwrap();
        assert_eq!(page.messages.len(), 2);
        assert_eq!(page.messages[0].row_id, 1);
        assert_eq!(page.messages[1].row_id, 2);
        assert!(!page.has_more);
    }
}
