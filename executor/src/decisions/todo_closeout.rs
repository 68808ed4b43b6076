//! Waiting-User Todo Closeout (I4, §4.3): before a run enters
//! `waiting_user`, every pending/in-progress todo is cancelled with a note
//! explaining why, written back with optimistic concurrency.

use async_trait::async_trait;
use runloop_protocol::AskUserSignal;
use runloop_protocol::TodoSnapshot;
use runloop_protocol::VersionConflict;
use tracing::warn;

const MAX_CLOSEOUT_RETRIES: u32 = 3;
const KEEP_COMPLETED: usize = 20;

/// The thread-scoped todo storage the closeout writes through. Kept
/// separate from [`runloop_store::TranscriptStore`] since todos are
/// versioned state, not an append-only log; `runloop-session` is expected
/// to implement this against the same backing store as the transcript.
#[async_trait]
pub trait TodoStore: Send + Sync {
    async fn load(&self, thread_id: &str) -> TodoSnapshot;
    async fn save(&self, thread_id: &str, snapshot: &TodoSnapshot) -> Result<(), VersionConflict>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CloseoutOutcome {
    pub before_open: usize,
    pub after_open: usize,
    pub cancelled: usize,
    pub retries: u32,
}

/// Cancels every open todo on `thread_id`'s snapshot with a note naming the
/// `ask_user` signal that triggered the closeout, retrying on version
/// conflict up to [`MAX_CLOSEOUT_RETRIES`] times.
pub async fn close_out_todos_for_waiting_user(store: &dyn TodoStore, thread_id: &str, signal: &AskUserSignal) -> CloseoutOutcome {
    let note_suffix = signal.todo_note_suffix();
    let mut retries = 0;
    loop {
        let mut snapshot = store.load(thread_id).await;
        let before_open = snapshot.open_count();
        let expected_version = snapshot.version;
        let cancelled = snapshot.close_for_waiting_user(&note_suffix, KEEP_COMPLETED);
        if cancelled == 0 {
            return CloseoutOutcome {
                before_open,
                after_open: snapshot.open_count(),
                cancelled: 0,
                retries,
            };
        }

        match store.save(thread_id, &snapshot).await {
            Ok(()) => {
                return CloseoutOutcome {
                    before_open,
                    after_open: snapshot.open_count(),
                    cancelled,
                    retries,
                };
            }
            Err(conflict) if retries < MAX_CLOSEOUT_RETRIES => {
                warn!(thread_id, expected_version, actual = conflict.actual, "todo closeout version conflict, retrying");
                retries += 1;
            }
            Err(_) => {
                return CloseoutOutcome {
                    before_open,
                    after_open: before_open,
                    cancelled: 0,
                    retries,
                };
            }
        }
    }
}
