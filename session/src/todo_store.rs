//! In-process `TodoStore` (executor decision-function boundary) keyed by
//! thread id, guarded by the same per-thread exclusive-writer discipline as
//! the rest of the session layer's state.

use async_trait::async_trait;
use runloop_executor::decisions::TodoStore;
use runloop_protocol::TodoSnapshot;
use runloop_protocol::VersionConflict;
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Default)]
pub struct InMemoryTodoStore {
    snapshots: Mutex<HashMap<String, TodoSnapshot>>,
}

#[async_trait]
impl TodoStore for InMemoryTodoStore {
    async fn load(&self, thread_id: &str) -> TodoSnapshot {
        self.snapshots.lock().await.get(thread_id).cloned().unwrap_or_default()
    }

    async fn save(&self, thread_id: &str, snapshot: &TodoSnapshot) -> Result<(), VersionConflict> {
        let mut snapshots = self.snapshots.lock().await;
        let expected_version = snapshot.version.saturating_sub(1);
        let actual_version = snapshots.get(thread_id).map(|s| s.version).unwrap_or(0);
        if actual_version != expected_version {
            return Err(VersionConflict {
                expected: expected_version,
                actual: actual_version,
            });
        }
        snapshots.insert(thread_id.to_string(), snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runloop_protocol::TodoItem;
    use runloop_protocol::TodoStatus;

    #[tokio::test]
    async fn load_missing_thread_returns_default() {
        let store = InMemoryTodoStore::default();
        let snap = store.load("t1").await;
        assert_eq!(snap.version, 0);
        assert!(snap.items.is_empty());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let store = InMemoryTodoStore::default();
        let mut snap = store.load("t1").await;
        snap.replace(
            0,
            vec![TodoItem {
                id: "a".to_string(),
                content: "do the thing".to_string(),
                status: TodoStatus::Pending,
                note: None,
            }],
        )
        .unwrap();
        store.save("t1", &snap).await.unwrap();
        let reloaded = store.load("t1").await;
        assert_eq!(reloaded.version, 1);
        assert_eq!(reloaded.items.len(), 1);
    }

    #[tokio::test]
    async fn save_with_stale_version_conflicts() {
        let store = InMemoryTodoStore::default();
        let mut snap = store.load("t1").await;
        snap.replace(0, vec![]).unwrap();
        store.save("t1", &snap).await.unwrap();

        let mut stale = TodoSnapshot::default();
        stale.replace(0, vec![]).unwrap();
        let err = store.save("t1", &stale).await.unwrap_err();
        assert_eq!(err.actual, 1);
    }
}
