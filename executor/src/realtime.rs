//! Producer side of the Realtime Broadcaster (C7, §4.6): the step loop
//! publishes events as they happen; a concrete [`RealtimeSink`] (wired up
//! by `runloop-app-server`) fans them out to subscribers and persists the
//! non-delta ones.

use runloop_protocol::RealtimeEvent;

/// Sink the executor publishes realtime events to. `publish` is
/// synchronous and infallible from the caller's perspective — §4.6's
/// drop-on-full semantics mean a slow or absent subscriber never backs up
/// the step loop. Implementations that need to persist or fan out
/// asynchronously should hand the event to a channel or background task
/// rather than block here.
pub trait RealtimeSink: Send + Sync {
    fn publish(&self, event: RealtimeEvent);
}

/// Default sink for callers that don't wire up a broadcaster (tests, the
/// `responder` path in isolation).
pub struct NullRealtimeSink;

impl RealtimeSink for NullRealtimeSink {
    fn publish(&self, _event: RealtimeEvent) {}
}
