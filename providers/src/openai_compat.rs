//! OpenAI Chat Completions-shaped streaming adapter.
//!
//! Used directly for `openai`, with a configurable base URL for
//! `openai_compatible` third-party endpoints, and for `moonshot` (the
//! Moonshot Kimi Chat API is Chat Completions-compatible).

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
use tracing::debug;
use tracing::warn;

pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn request_body(&self, request: &ProviderRequest) -> Value {
        let messages: Vec<Value> = request
            .messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    ProviderMessageRole::System => "system",
                    ProviderMessageRole::User => "user",
                    ProviderMessageRole::Assistant => "assistant",
                    ProviderMessageRole::Tool => "tool",
                };
                let mut entry = json!({ "role": role, "content": m.content });
                if let Some(tool_call_id) = &m.tool_call_id {
                    entry["tool_call_id"] = json!(tool_call_id);
                }
                if !m.tool_calls.is_empty() {
                    entry["tool_calls"] = json!(
                        m.tool_calls
                            .iter()
                            .map(|c| json!({
                                "id": c.id,
                                "type": "function",
                                "function": { "name": c.name, "arguments": c.arguments.to_string() },
                            }))
                            .collect::<Vec<_>>()
                    );
                }
                entry
            })
            .collect();

        let tools: Vec<Value> = request
            .tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    }
                })
            })
            .collect();

        let mut body = json!({
            "model": request.model_id,
            "messages": messages,
            "stream": true,
        });
        if !tools.is_empty() {
            body["tools"] = json!(tools);
        }
        if let Some(max_tokens) = request.max_output_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        body
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stream_turn(&self, request: ProviderRequest) -> Result<ProviderEventStream, ProviderError> {
        let body = self.request_body(&request);
        let response = self
            .client
            .post(self.chat_completions_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| ProviderError::Transport {
                provider: self.name.clone(),
                message: err.to_string(),
                retryable: err.is_timeout() || err.is_connect(),
            })?;

        if !response.status().is_success() {
            let retryable = response.status().is_server_error() || response.status().as_u16() == 429;
            let status = response.status();
            let body_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Transport {
                provider: self.name.clone(),
                message: format!("HTTP {status}: {body_text}"),
                retryable,
            });
        }

        let (tx, rx) = mpsc::channel(32);
        let provider_name = self.name.clone();
        let mut byte_stream = response.bytes_stream();

        tokio::spawn(async move {
            use futures::StreamExt;

            let mut decoder = SseDecoder::new();
            let mut tool_call_names: HashMap<u32, String> = HashMap::new();
            let mut tool_call_ids: HashMap<u32, String> = HashMap::new();
            let mut tool_call_args: HashMap<u32, String> = HashMap::new();
            let mut usage = TokenUsage::default();

            while let Some(chunk) = byte_stream.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(err) => {
                        let _ = tx
                            .send(Err(ProviderError::Transport {
                                provider: provider_name.clone(),
                                message: err.to_string(),
                                retryable: true,
                            }))
                            .await;
                        return;
                    }
                };

                for payload in decoder.feed(&chunk) {
                    if payload == "[DONE]" {
                        continue;
                    }
                    let parsed: Value = match serde_json::from_str(&payload) {
                        Ok(v) => v,
                        Err(err) => {
                            warn!(provider = %provider_name, %err, "skipping unparseable SSE frame");
                            continue;
                        }
                    };

                    if let Some(usage_obj) = parsed.get("usage") {
                        usage.input_tokens = usage_obj.get("prompt_tokens").and_then(Value::as_u64).unwrap_or(0) as u32;
                        usage.output_tokens =
                            usage_obj.get("completion_tokens").and_then(Value::as_u64).unwrap_or(0) as u32;
                    }

                    let Some(choice) = parsed.get("choices").and_then(|c| c.get(0)) else {
                        continue;
                    };
                    let delta = choice.get("delta").cloned().unwrap_or(Value::Null);

                    if let Some(text) = delta.get("content").and_then(Value::as_str) {
                        if !text.is_empty() && tx.send(Ok(ProviderStreamEvent::TextDelta { delta: text.to_string() })).await.is_err()
                        {
                            return;
                        }
                    }

                    if let Some(calls) = delta.get("tool_calls").and_then(Value::as_array) {
                        for call in calls {
                            let index = call.get("index").and_then(Value::as_u64).unwrap_or(0) as u32;
                            if let Some(id) = call.get("id").and_then(Value::as_str) {
                                tool_call_ids.insert(index, id.to_string());
                            }
                            if let Some(function) = call.get("function") {
                                if let Some(name) = function.get("name").and_then(Value::as_str) {
                                    tool_call_names.insert(index, name.to_string());
                                }
                                if let Some(args_delta) = function.get("arguments").and_then(Value::as_str) {
                                    tool_call_args.entry(index).or_default().push_str(args_delta);
                                }
                            }
                        }
                    }

                    if let Some(finish_reason) = choice.get("finish_reason").and_then(Value::as_str) {
                        for (index, name) in tool_call_names.iter() {
                            let raw_args = tool_call_args.get(index).cloned().unwrap_or_default();
                            let arguments = serde_json::from_str(&raw_args).unwrap_or(Value::Null);
                            let call_id = tool_call_ids.get(index).cloned().unwrap_or_else(|| format!("call_{index}"));
                            if tx
                                .send(Ok(ProviderStreamEvent::ToolCallComplete {
                                    call_id,
                                    name: name.clone(),
                                    arguments,
                                }))
                                .await
                                .is_err()
                            {
                                return;
                            }
                        }

                        let stop_reason = match finish_reason {
                            "tool_calls" => StopReason::ToolUse,
                            "length" => StopReason::MaxTokens,
                            _ => StopReason::EndTurn,
                        };
                        let _ = tx.send(Ok(ProviderStreamEvent::TurnComplete { usage, stop_reason })).await;
                        debug!(provider = %provider_name, ?stop_reason, "turn complete");
                        return;
                    }
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}
