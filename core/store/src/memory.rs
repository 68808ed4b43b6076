use crate::MessagePage;
use crate::TranscriptStore;
use crate::error;
use async_trait::async_trait;
use runloop_protocol::Message;
use runloop_protocol::RealtimeEvent;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct EndpointState {
    next_row_id: i64,
    /// `thread_id` -> ordered messages, row ids strictly increasing (I2).
    threads: HashMap<String, Vec<Message>>,
    /// `(thread_id, message_id)` -> row id already assigned, for idempotent
    /// re-insertion of a client-supplied `message_id`.
    message_index: HashMap<(String, String), i64>,
}

/// Reference [`TranscriptStore`] implementation backed by in-process maps.
///
/// Suitable for tests and for a single-process `app-server` deployment;
/// not durable across restarts.
#[derive(Default)]
pub struct InMemoryStore {
    endpoints: RwLock<HashMap<String, EndpointState>>,
    /// `run_id` -> durable events, in append order (seq assigned globally).
    run_events: RwLock<HashMap<String, Vec<RealtimeEvent>>>,
    next_seq: std::sync::atomic::AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TranscriptStore for InMemoryStore {
    async fn append_message(&self, endpoint: &str, thread_id: &str, mut message: Message) -> error::Result<Message> {
        let mut endpoints = self.endpoints.write().await;
        let state = endpoints.entry(endpoint.to_string()).or_default();

        let index_key = (thread_id.to_string(), message.message_id.clone());
        if let Some(&existing_row_id) = state.message_index.get(&index_key) {
            let existing = state
                .threads
                .get(thread_id)
                .and_then(|rows| rows.iter().find(|m| m.row_id == existing_row_id))
                .expect("message_index entry without a matching stored row");
            return Ok(existing.clone());
        }

        state.next_row_id += 1;
        message.row_id = state.next_row_id;
        state.message_index.insert(index_key, message.row_id);
        state.threads.entry(thread_id.to_string()).or_default().push(message.clone());
        Ok(message)
    }

    async fn get_message(&self, endpoint: &str, thread_id: &str, message_id: &str) -> error::Result<Message> {
        let endpoints = self.endpoints.read().await;
        let found = endpoints
            .get(endpoint)
            .and_then(|state| state.threads.get(thread_id))
            .and_then(|rows| rows.iter().find(|m| m.message_id == message_id));
        found.cloned().ok_or_else(|| {
            error::store_error::UnknownMessageSnafu {
                endpoint: endpoint.to_string(),
                thread_id: thread_id.to_string(),
                message_id: message_id.to_string(),
            }
            .build()
        })
    }

    async fn update_message(&self, endpoint: &str, thread_id: &str, message: Message) -> error::Result<Message> {
        let mut endpoints = self.endpoints.write().await;
        let state = endpoints.entry(endpoint.to_string()).or_default();
        let rows = state.threads.entry(thread_id.to_string()).or_default();
        let slot = rows
            .iter_mut()
            .find(|m| m.message_id == message.message_id)
            .ok_or_else(|| {
                error::store_error::UnknownMessageSnafu {
                    endpoint: endpoint.to_string(),
                    thread_id: thread_id.to_string(),
                    message_id: message.message_id.clone(),
                }
                .build()
            })?;
        let row_id = slot.row_id;
        *slot = message;
        slot.row_id = row_id;
        Ok(slot.clone())
    }

    async fn list_messages(
        &self,
        endpoint: &str,
        thread_id: &str,
        after_row_id: i64,
        limit: usize,
    ) -> error::Result<MessagePage> {
        let endpoints = self.endpoints.read().await;
        let Some(state) = endpoints.get(endpoint) else {
            return Ok(MessagePage {
                messages: vec![],
                next_after_row_id: after_row_id,
                has_more: false,
            });
        };
        let rows = state.threads.get(thread_id).map(Vec::as_slice).unwrap_or(&[]);
        let mut matching = rows.iter().filter(|m| m.row_id > after_row_id);
        let page: Vec<Message> = matching.by_ref().take(limit).cloned().collect();
        let has_more = matching.next().is_some();
        let next_after_row_id = page.last().map(|m| m.row_id).unwrap_or(after_row_id);
        Ok(MessagePage {
            messages: page,
            next_after_row_id,
            has_more,
        })
    }

    async fn append_event(&self, mut event: RealtimeEvent) -> error::Result<RealtimeEvent> {
        event.seq = self.next_seq.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
        if let Some(run_id) = event.run_id.clone() {
            let mut run_events = self.run_events.write().await;
            run_events.entry(run_id).or_default().push(event.clone());
        }
        Ok(event)
    }

    async fn list_run_events(&self, run_id: &str) -> error::Result<Vec<RealtimeEvent>> {
        let run_events = self.run_events.read().await;
        Ok(run_events.get(run_id).cloned().unwrap_or_default())
    }

    async fn truncate_after(&self, endpoint: &str, thread_id: &str, row_id: i64) -> error::Result<()> {
        let mut endpoints = self.endpoints.write().await;
        let Some(state) = endpoints.get_mut(endpoint) else {
            return Ok(());
        };
        if let Some(rows) = state.threads.get_mut(thread_id) {
            rows.retain(|m| m.row_id <= row_id);
            state
                .message_index
                .retain(|_, &mut assigned_row_id| assigned_row_id <= row_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::sample_message;

    #[tokio::test]
    async fn duplicate_message_id_is_idempotent() {
        let store = InMemoryStore::default();
        let first = store.append_message("ep1", "t1", sample_message("m1")).await.unwrap();
        let second = store.append_message("ep1", "t1", sample_message("m1")).await.unwrap();
        assert_eq!(first.row_id, second.row_id);
        let page = store.list_messages("ep1", "t1", 0, 10).await.unwrap();
        assert_eq!(page.messages.len(), 1);
    }

    #[tokio::test]
    async fn row_ids_are_per_endpoint() {
        let store = InMemoryStore::default();
        store.append_message("ep1", "t1", sample_message("m1")).await.unwrap();
        let other_endpoint_first = store.append_message("ep2", "t1", sample_message("m1")).await.unwrap();
        assert_eq!(other_endpoint_first.row_id, 1);
    }

    #[tokio::test]
    async fn list_messages_pagination_has_more() {
        let store = InMemoryStore::default();
        for i in 0..5 {
            store
                .append_message("ep1", "t1", sample_message(&format!("m{i}")))
                .await
                .unwrap();
        }
        let page = store.list_messages("ep1", "t1", 0, 2).await.unwrap();
        assert_eq!(page.messages.len(), 2);
        assert!(page.has_more);
        assert_eq!(page.next_after_row_id, 2);

        let next_page = store.list_messages("ep1", "t1", page.next_after_row_id, 10).await.unwrap();
        assert_eq!(next_page.messages.len(), 3);
        assert!(!next_page.has_more);
    }

    #[tokio::test]
    async fn truncate_after_drops_later_rows() {
        let store = InMemoryStore::default();
        for i in 0..4 {
            store
                .append_message("ep1", "t1", sample_message(&format!("m{i}")))
                .await
                .unwrap();
        }
        store.truncate_after("ep1", "t1", 2).await.unwrap();
        let page = store.list_messages("ep1", "t1", 0, 10).await.unwrap();
        assert_eq!(page.messages.len(), 2);
    }

    #[tokio::test]
    async fn update_message_preserves_row_id() {
        let store = InMemoryStore::default();
        let stored = store.append_message("ep1", "t1", sample_message("m1")).await.unwrap();

        let mut updated = stored.clone();
        updated.text_content = "edited".to_string();
        let result = store.update_message("ep1", "t1", updated).await.unwrap();

        assert_eq!(result.row_id, stored.row_id);
        assert_eq!(result.text_content, "edited");
        let fetched = store.get_message("ep1", "t1", "m1").await.unwrap();
        assert_eq!(fetched.text_content, "edited");
    }

    #[tokio::test]
    async fn get_message_unknown_id_errors() {
        let store = InMemoryStore::default();
        store.append_message("ep1", "t1", sample_message("m1")).await.unwrap();
        assert!(store.get_message("ep1", "t1", "missing").await.is_err());
    }
}
