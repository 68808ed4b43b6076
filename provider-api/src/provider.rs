use crate::error::ProviderError;
use crate::request::ProviderRequest;
use crate::stream::ProviderStreamEvent;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// A streaming turn: either the event sequence or the transport error that
/// stopped it before `TurnComplete` was reached.
pub type ProviderEventStream = BoxStream<'static, Result<ProviderStreamEvent, ProviderError>>;

/// Normalizes one vendor's wire protocol to the uniform event contract in
/// [`crate::stream`] (C1). Implemented once per vendor in `runloop-providers`.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable identifier used in config and in the provider registry
    /// (e.g. `"openai"`, `"anthropic"`, `"moonshot"`).
    fn name(&self) -> &str;

    /// Start a streaming turn. The returned stream yields events in
    /// wire order and ends after a `TurnComplete` or `Error` event.
    async fn stream_turn(&self, request: ProviderRequest) -> Result<ProviderEventStream, ProviderError>;
}
