//! Anthropic Messages API streaming adapter.

use crate::sse::SseDecoder;
use async_trait::async_trait;
use runloop_provider_api::Provider;
use runloop_provider_api::ProviderError;
use runloop_provider_api::ProviderEventStream;
use runloop_provider_api::ProviderMessageRole;
use runloop_provider_api::ProviderRequest;
use runloop_provider_api::ProviderStreamEvent;
use runloop_provider_api::StopReason;
use runloop_provider_api::TokenUsage;
use serde_json::Value;
use serde_json::json;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::warn;

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url("https://api.anthropic.com/v1", api_key)
    }

    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    fn request_body(&self, request: &ProviderRequest) -> Value {
        let messages: Vec<Value> = request
            .messages
            .iter()
            .filter(|m| !matches!(m.role, ProviderMessageRole::System))
            .map(|m| {
                let role = match m.role {
                    ProviderMessageRole::User | ProviderMessageRole::Tool => "user",
                    _ => "assistant",
                };
                json!({ "role": role, "content": m.content })
            })
            .collect();

        let tools: Vec<Value> = request
            .tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "input_schema": t.parameters,
                })
            })
            .collect();

        let mut body = json!({
            "model": request.model_id,
            "system": request.system_prompt,
            "messages": messages,
            "stream": true,
            "max_tokens": request.max_output_tokens.unwrap_or(4096),
        });
        if !tools.is_empty() {
            body["tools"] = json!(tools);
        }
        body
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn stream_turn(&self, request: ProviderRequest) -> Result<ProviderEventStream, ProviderError> {
        let body = self.request_body(&request);
        let response = self
            .client
            .post(format!("{}/messages", self.base_url.trim_end_matches('/')))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|err| ProviderError::Transport {
                provider: "anthropic".to_string(),
                message: err.to_string(),
                retryable: err.is_timeout() || err.is_connect(),
            })?;

        if !response.status().is_success() {
            let retryable = response.status().is_server_error() || response.status().as_u16() == 429;
            let status = response.status();
            let body_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Transport {
                provider: "anthropic".to_string(),
                message: format!("HTTP {status}: {body_text}"),
                retryable,
            });
        }

        let (tx, rx) = mpsc::channel(32);
        let mut byte_stream = response.bytes_stream();

        tokio::spawn(async move {
            use futures::StreamExt;

            let mut decoder = SseDecoder::new();
            let mut block_names: HashMap<u32, String> = HashMap::new();
            let mut block_ids: HashMap<u32, String> = HashMap::new();
            let mut block_args: HashMap<u32, String> = HashMap::new();
            let mut usage = TokenUsage::default();

            while let Some(chunk) = byte_stream.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(err) => {
                        let _ = tx
                            .send(Err(ProviderError::Transport {
                                provider: "anthropic".to_string(),
                                message: err.to_string(),
                                retryable: true,
                            }))
                            .await;
                        return;
                    }
                };

                for payload in decoder.feed(&chunk) {
                    let parsed: Value = match serde_json::from_str(&payload) {
                        Ok(v) => v,
                        Err(err) => {
                            warn!(%err, "skipping unparseable anthropic SSE frame");
                            continue;
                        }
                    };
                    let event_type = parsed.get("type").and_then(Value::as_str).unwrap_or_default();

                    match event_type {
                        "content_block_start" => {
                            let index = parsed.get("index").and_then(Value::as_u64).unwrap_or(0) as u32;
                            if let Some(block) = parsed.get("content_block") {
                                if block.get("type").and_then(Value::as_str) == Some("tool_use") {
                                    if let Some(name) = block.get("name").and_then(Value::as_str) {
                                        block_names.insert(index, name.to_string());
                                    }
                                    if let Some(id) = block.get("id").and_then(Value::as_str) {
                                        block_ids.insert(index, id.to_string());
                                    }
                                }
                            }
                        }
                        "content_block_delta" => {
                            let index = parsed.get("index").and_then(Value::as_u64).unwrap_or(0) as u32;
                            let Some(delta) = parsed.get("delta") else { continue };
                            match delta.get("type").and_then(Value::as_str) {
                                Some("text_delta") => {
                                    if let Some(text) = delta.get("text").and_then(Value::as_str) {
                                        if tx
                                            .send(Ok(ProviderStreamEvent::TextDelta { delta: text.to_string() }))
                                            .await
                                            .is_err()
                                        {
                                            return;
                                        }
                                    }
                                }
                                Some("input_json_delta") => {
                                    if let Some(partial) = delta.get("partial_json").and_then(Value::as_str) {
                                        block_args.entry(index).or_default().push_str(partial);
                                    }
                                }
                                _ => {}
                            }
                        }
                        "content_block_stop" => {
                            let index = parsed.get("index").and_then(Value::as_u64).unwrap_or(0) as u32;
                            if let Some(name) = block_names.remove(&index) {
                                let raw_args = block_args.remove(&index).unwrap_or_default();
                                let arguments = serde_json::from_str(&raw_args).unwrap_or(Value::Null);
                                let call_id = block_ids.remove(&index).unwrap_or_else(|| format!("toolu_{index}"));
                                if tx
                                    .send(Ok(ProviderStreamEvent::ToolCallComplete { call_id, name, arguments }))
                                    .await
                                    .is_err()
                                {
                                    return;
                                }
                            }
                        }
                        "message_delta" => {
                            if let Some(output_tokens) =
                                parsed.pointer("/usage/output_tokens").and_then(Value::as_u64)
                            {
                                usage.output_tokens = output_tokens as u32;
                            }
                            if let Some(input_tokens) = parsed.pointer("/usage/input_tokens").and_then(Value::as_u64) {
                                usage.input_tokens = input_tokens as u32;
                            }
                        }
                        "message_stop" => {
                            let stop_reason = if block_ids.is_empty() && !usage_has_tool(&block_names) {
                                StopReason::EndTurn
                            } else {
                                StopReason::ToolUse
                            };
                            let _ = tx.send(Ok(ProviderStreamEvent::TurnComplete { usage, stop_reason })).await;
                            return;
                        }
                        _ => {}
                    }
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

fn usage_has_tool(block_names: &HashMap<u32, String>) -> bool {
    !block_names.is_empty()
}
