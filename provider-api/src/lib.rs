//! Uniform provider contract (C1): every vendor adapter normalizes its
//! wire protocol down to [`ProviderStreamEvent`] and is looked up through
//! a single [`ProviderRegistry`].

pub mod error;
mod provider;
mod registry;
mod request;
mod stream;
mod tools;

pub use error::ProviderError;
pub use provider::Provider;
pub use provider::ProviderEventStream;
pub use registry::ProviderRegistry;
pub use request::ProviderMessage;
pub use request::ProviderMessageRole;
pub use request::ProviderRequest;
pub use request::ProviderToolCall;
pub use stream::ProviderStreamEvent;
pub use stream::StopReason;
pub use stream::TokenUsage;
pub use stream::TurnResult;
pub use tools::ToolChoice;
pub use tools::ToolDefinition;
