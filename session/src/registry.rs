//! Thread Actor Registry (C4, §4.1, §5): resolves `(endpoint_id,
//! thread_id)` to its actor, creating one on first use.
//!
//! Grounded on §5's "Active-run-by-thread map: guarded by a service-wide
//! mutex; read snapshots are taken under lock then released before I/O" —
//! the map itself is a `std::sync::Mutex` since every operation on it is a
//! plain lookup/insert, never an `.await`.

use crate::actor::ThreadActor;
use runloop_executor::NullRealtimeSink;
use runloop_executor::RealtimeSink;
use runloop_executor::RunExecutor;
use runloop_protocol::Thread;
use runloop_store::TranscriptStore;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

/// Builds the [`RunExecutor`] a freshly-registered thread should run
/// against. Left to the caller (wired up by `runloop-app-server`) since
/// provider/tool selection is an endpoint-level configuration concern the
/// registry itself has no opinion on.
pub trait ExecutorFactory: Send + Sync {
    /// Build the executor a freshly-registered thread should run against.
    fn build_for(&self, thread: &Thread) -> Arc<RunExecutor>;

    /// The sink the thread's actor publishes `RunStateChanged` events to
    /// (§4.6). Defaults to a no-op so callers that don't wire up a
    /// broadcaster (tests, the in-process-only `responder` path) don't
    /// need to implement this.
    fn realtime_sink_for(&self, _thread: &Thread) -> Arc<dyn RealtimeSink> {
        Arc::new(NullRealtimeSink)
    }
}

pub struct ThreadActorRegistry {
    actors: Mutex<HashMap<(String, String), Arc<ThreadActor>>>,
    transcript_store: Arc<dyn TranscriptStore>,
    executor_factory: Arc<dyn ExecutorFactory>,
}

impl ThreadActorRegistry {
    pub fn new(transcript_store: Arc<dyn TranscriptStore>, executor_factory: Arc<dyn ExecutorFactory>) -> Self {
        Self {
            actors: Mutex::new(HashMap::new()),
            transcript_store,
            executor_factory,
        }
    }

    /// Resolve the actor for an existing thread, registering it on first
    /// use. A read snapshot of the map is taken under lock and released
    /// before any `.await` runs (§5) — actor construction here is
    /// synchronous, so the lock scope is naturally just the lookup.
    pub fn get_or_create(&self, thread: Thread) -> Arc<ThreadActor> {
        let key = (thread.endpoint_id.clone(), thread.thread_id.clone());
        let mut actors = self.actors.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(existing) = actors.get(&key) {
            return Arc::clone(existing);
        }
        let executor = self.executor_factory.build_for(&thread);
        let realtime_sink = self.executor_factory.realtime_sink_for(&thread);
        let actor = Arc::new(ThreadActor::new(thread, executor, Arc::clone(&self.transcript_store), realtime_sink));
        actors.insert(key, Arc::clone(&actor));
        actor
    }

    pub fn get(&self, endpoint_id: &str, thread_id: &str) -> Option<Arc<ThreadActor>> {
        let key = (endpoint_id.to_string(), thread_id.to_string());
        let actors = self.actors.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        actors.get(&key).cloned()
    }

    pub fn thread_count(&self) -> usize {
        self.actors.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    /// Snapshot of every registered actor, used by `subscribe_summary` (§6)
    /// to enumerate active runs across an endpoint's threads. Taken under
    /// lock then released before any `.await` on the returned actors, same
    /// discipline as [`Self::get_or_create`].
    pub fn all(&self) -> Vec<Arc<ThreadActor>> {
        self.actors.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).values().cloned().collect()
    }
}
