//! Realtime Broadcaster (C7, §4.6): fans out [`RealtimeEvent`]s to every
//! subscriber of a matching endpoint/thread, over two priority queues per
//! subscriber (`hi` for lifecycle/control events, `lo` for deltas), and
//! persists the non-delta ones via [`TranscriptStore::append_event`]
//! before fan-out so the durable `seq` reaches every subscriber.
//!
//! A subscriber that can't keep up loses events rather than backing up
//! the publisher, the same queue-drop-on-full discipline event buses use
//! for slow consumers generally.

use runloop_app_server_protocol::ServerResponse;
use runloop_executor::RealtimeSink;
use runloop_protocol::EventPriority;
use runloop_protocol::RealtimeEvent;
use runloop_protocol::RealtimeEventType;
use runloop_store::TranscriptStore;
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use tokio::sync::mpsc;
use tracing::warn;

const HI_CAPACITY: usize = 1024;
const LO_CAPACITY: usize = 256;

/// Channel the connection's writer task drains; carries both direct RPC
/// responses and broadcaster pushes so a single task owns the socket sink.
pub type OutboundSender = mpsc::UnboundedSender<ServerResponse>;

struct SubscriberState {
    endpoint: String,
    summary: bool,
    threads: HashSet<String>,
    hi: mpsc::Sender<RealtimeEvent>,
    lo: mpsc::Sender<RealtimeEvent>,
}

pub struct Broadcaster {
    store: Arc<dyn TranscriptStore>,
    subscribers: Mutex<HashMap<String, SubscriberState>>,
    delta_seq: AtomicU64,
}

impl Broadcaster {
    pub fn new(store: Arc<dyn TranscriptStore>) -> Arc<Self> {
        Arc::new(Self {
            store,
            subscribers: Mutex::new(HashMap::new()),
            delta_seq: AtomicU64::new(0),
        })
    }

    /// Register a fresh subscriber (one per WebSocket connection) with no
    /// subscriptions yet; `subscribe_summary`/`subscribe_thread` add to it.
    /// Spawns the drain task that forwards this subscriber's queued events
    /// into `outbound`.
    pub fn connect(&self, subscriber_id: String, endpoint: String, outbound: OutboundSender) {
        let (hi_tx, hi_rx) = mpsc::channel(HI_CAPACITY);
        let (lo_tx, lo_rx) = mpsc::channel(LO_CAPACITY);
        self.subscribers.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).insert(
            subscriber_id,
            SubscriberState {
                endpoint,
                summary: false,
                threads: HashSet::new(),
                hi: hi_tx,
                lo: lo_tx,
            },
        );
        tokio::spawn(drain(hi_rx, lo_rx, outbound));
    }

    pub fn subscribe_summary(&self, subscriber_id: &str) {
        if let Some(sub) = self.subscribers.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).get_mut(subscriber_id) {
            sub.summary = true;
        }
    }

    pub fn subscribe_thread(&self, subscriber_id: &str, thread_id: &str) {
        if let Some(sub) = self.subscribers.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).get_mut(subscriber_id) {
            sub.threads.insert(thread_id.to_string());
        }
    }

    pub fn disconnect(&self, subscriber_id: &str) {
        self.subscribers.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).remove(subscriber_id);
    }

    /// Persist (if non-delta) and fan an event out to every matching
    /// subscriber of `endpoint`. A detail subscriber of `event.thread_id`
    /// gets everything; a summary subscriber only gets `RunStateChanged`,
    /// the signal it needs to keep an `active_runs` view current.
    pub async fn publish(&self, endpoint: &str, mut event: RealtimeEvent) {
        if event.priority == EventPriority::Delta {
            event.seq = self.delta_seq.fetch_add(1, Ordering::Relaxed) + 1;
        } else {
            match self.store.append_event(event.clone()).await {
                Ok(persisted) => event = persisted,
                Err(err) => warn!(%err, thread_id = %event.thread_id, "failed to persist realtime event, broadcasting unpersisted"),
            }
        }

        let subscribers = self.subscribers.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        for sub in subscribers.values() {
            if sub.endpoint != endpoint {
                continue;
            }
            let interested = sub.threads.contains(&event.thread_id) || (sub.summary && event.event_type == RealtimeEventType::RunStateChanged);
            if !interested {
                continue;
            }
            let channel = if event.priority == EventPriority::Delta { &sub.lo } else { &sub.hi };
            if channel.try_send(event.clone()).is_err() {
                warn!(thread_id = %event.thread_id, "dropping realtime event for a slow or full subscriber queue");
            }
        }
    }
}

/// Drains `hi` ahead of `lo` (§4.6): every buffered high-priority event is
/// forwarded before a single low-priority one is considered.
async fn drain(mut hi: mpsc::Receiver<RealtimeEvent>, mut lo: mpsc::Receiver<RealtimeEvent>, outbound: OutboundSender) {
    let mut lo_open = true;
    loop {
        while let Ok(event) = hi.try_recv() {
            if outbound.send(ServerResponse::EventNotify(event)).is_err() {
                return;
            }
        }
        if !lo_open {
            match hi.recv().await {
                Some(event) => {
                    if outbound.send(ServerResponse::EventNotify(event)).is_err() {
                        return;
                    }
                }
                None => return,
            }
            continue;
        }
        tokio::select! {
            biased;
            maybe = hi.recv() => match maybe {
                Some(event) => {
                    if outbound.send(ServerResponse::EventNotify(event)).is_err() {
                        return;
                    }
                }
                None => return,
            },
            maybe = lo.recv() => match maybe {
                Some(event) => {
                    if outbound.send(ServerResponse::EventNotify(event)).is_err() {
                        return;
                    }
                }
                None => lo_open = false,
            },
        }
    }
}

/// Bridges [`RealtimeSink::publish`] (synchronous, from the executor's step
/// loop) into the broadcaster's async `publish`. Spawns a task per event
/// rather than blocking the caller, matching §4.6's requirement that a
/// slow subscriber never backs up the run.
pub struct BroadcastRealtimeSink {
    broadcaster: Arc<Broadcaster>,
    endpoint_id: String,
}

impl BroadcastRealtimeSink {
    pub fn new(broadcaster: Arc<Broadcaster>, endpoint_id: String) -> Self {
        Self { broadcaster, endpoint_id }
    }
}

impl RealtimeSink for BroadcastRealtimeSink {
    fn publish(&self, event: RealtimeEvent) {
        let broadcaster = Arc::clone(&self.broadcaster);
        let endpoint_id = self.endpoint_id.clone();
        tokio::spawn(async move {
            broadcaster.publish(&endpoint_id, event).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runloop_protocol::EventPhase;
    use runloop_protocol::StreamKind;
    use runloop_store::InMemoryStore;
    use serde_json::Value;

    fn event(thread_id: &str, event_type: RealtimeEventType, priority: EventPriority) -> RealtimeEvent {
        RealtimeEvent {
            seq: 0,
            thread_id: thread_id.to_string(),
            run_id: Some("r1".to_string()),
            event_type,
            stream: StreamKind::Lifecycle,
            phase: EventPhase::StateChange,
            priority,
            payload: Value::Null,
            created_at_ms: 0,
        }
    }

    #[tokio::test]
    async fn thread_subscriber_receives_its_thread_events_only() {
        let broadcaster = Broadcaster::new(Arc::new(InMemoryStore::default()));
        let (tx, mut rx) = mpsc::unbounded_channel();
        broadcaster.connect("sub1".to_string(), "ep1".to_string(), tx);
        broadcaster.subscribe_thread("sub1", "th1");

        broadcaster.publish("ep1", event("th1", RealtimeEventType::MessageComplete, EventPriority::Lifecycle)).await;
        broadcaster.publish("ep1", event("th2", RealtimeEventType::MessageComplete, EventPriority::Lifecycle)).await;

        let received = rx.recv().await.unwrap();
        match received {
            ServerResponse::EventNotify(e) => assert_eq!(e.thread_id, "th1"),
            other => panic!("unexpected response: {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn summary_subscriber_only_sees_run_state_changes() {
        let broadcaster = Broadcaster::new(Arc::new(InMemoryStore::default()));
        let (tx, mut rx) = mpsc::unbounded_channel();
        broadcaster.connect("sub1".to_string(), "ep1".to_string(), tx);
        broadcaster.subscribe_summary("sub1");

        broadcaster.publish("ep1", event("th1", RealtimeEventType::MessageDelta, EventPriority::Delta)).await;
        broadcaster.publish("ep1", event("th1", RealtimeEventType::RunStateChanged, EventPriority::Lifecycle)).await;

        let received = rx.recv().await.unwrap();
        match received {
            ServerResponse::EventNotify(e) => assert_eq!(e.event_type, RealtimeEventType::RunStateChanged),
            other => panic!("unexpected response: {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn non_delta_events_are_persisted_with_a_real_seq() {
        let store = Arc::new(InMemoryStore::default());
        let broadcaster = Broadcaster::new(Arc::clone(&store) as Arc<dyn TranscriptStore>);
        let (tx, mut rx) = mpsc::unbounded_channel();
        broadcaster.connect("sub1".to_string(), "ep1".to_string(), tx);
        broadcaster.subscribe_thread("sub1", "th1");

        broadcaster.publish("ep1", event("th1", RealtimeEventType::MessageComplete, EventPriority::Lifecycle)).await;

        let received = rx.recv().await.unwrap();
        match received {
            ServerResponse::EventNotify(e) => assert_eq!(e.seq, 1),
            other => panic!("unexpected response: {other:?}"),
        }
        let stored = store.list_run_events("r1").await.unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn disconnect_stops_the_drain_task() {
        let broadcaster = Broadcaster::new(Arc::new(InMemoryStore::default()));
        let (tx, rx) = mpsc::unbounded_channel();
        broadcaster.connect("sub1".to_string(), "ep1".to_string(), tx);
        broadcaster.subscribe_thread("sub1", "th1");
        broadcaster.disconnect("sub1");

        broadcaster.publish("ep1", event("th1", RealtimeEventType::MessageComplete, EventPriority::Lifecycle)).await;
        drop(rx);
    }
}
