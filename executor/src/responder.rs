//! Responder path (§4.2 step 2): `social`/`creative` intents skip tool
//! use, todo management, and completion gating entirely. The executor
//! issues one provider turn with tools suppressed and finalizes directly
//! from its text.

use crate::error::ExecutorError;
use crate::error::executor_error::ProviderSnafu;
use futures::StreamExt;
use runloop_provider_api::Provider;
use runloop_provider_api::ProviderMessage;
use runloop_provider_api::ProviderMessageRole;
use runloop_provider_api::ProviderRequest;
use runloop_provider_api::ToolChoice;
use runloop_provider_api::TurnResult;
use snafu::ResultExt;
use std::sync::Arc;

pub async fn run_responder_turn(provider: &Arc<dyn Provider>, model_id: &str, system_prompt: String, user_text: &str) -> Result<String, ExecutorError> {
    let request = ProviderRequest {
        model_id: model_id.to_string(),
        system_prompt,
        messages: vec![ProviderMessage {
            role: ProviderMessageRole::User,
            content: user_text.to_string(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }],
        tools: Vec::new(),
        tool_choice: ToolChoice::None,
        max_output_tokens: None,
    };

    let mut stream = provider.stream_turn(request).await.context(ProviderSnafu)?;
    let mut events = Vec::new();
    while let Some(event) = stream.next().await {
        events.push(event.context(ProviderSnafu)?);
    }
    Ok(TurnResult::fold(&events).text)
}
