//! Model-first classifier (C6, §4.5) with a deterministic reject fallback.

use crate::request::ClassifyRequest;
use crate::rules::apply_rules;
use futures::StreamExt;
use runloop_protocol::ClassifierResult;
use runloop_protocol::ClassifierSource;
use runloop_protocol::Complexity;
use runloop_protocol::Intent;
use runloop_protocol::ObjectiveMode;
use runloop_protocol::TodoPolicy;
use runloop_provider_api::Provider;
use runloop_provider_api::ProviderMessage;
use runloop_provider_api::ProviderMessageRole;
use runloop_provider_api::ProviderRequest;
use runloop_provider_api::ToolChoice;
use runloop_provider_api::TurnResult;
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

const CLASSIFIER_SYSTEM_PROMPT: &str = "Classify the user's message. Respond with only a JSON object: \
{\"intent\": \"social\"|\"creative\"|\"task\", \"complexity\": \"trivial\"|\"moderate\"|\"complex\", \"objective_mode\": \"continue\"|\"replace\"}";

#[derive(Debug, Deserialize)]
struct ClassifierWireResult {
    intent: Intent,
    complexity: Complexity,
    objective_mode: ObjectiveMode,
}

fn todo_policy_for(intent: Intent, complexity: Complexity) -> TodoPolicy {
    match intent {
        Intent::Social | Intent::Creative => TodoPolicy::Skip,
        Intent::Task => match complexity {
            Complexity::Trivial => TodoPolicy::Lazy,
            Complexity::Moderate => TodoPolicy::Lazy,
            Complexity::Complex => TodoPolicy::Required,
        },
    }
}

/// Invokes a configured model to classify intent/complexity, falling back
/// deterministically to [`ClassifierResult::deterministic_fallback`] when
/// the provider call fails or returns unparseable output.
pub struct Classifier {
    provider: Arc<dyn Provider>,
    model_id: String,
}

impl Classifier {
    pub fn new(provider: Arc<dyn Provider>, model_id: impl Into<String>) -> Self {
        Self {
            provider,
            model_id: model_id.into(),
        }
    }

    pub async fn classify(&self, request: &ClassifyRequest<'_>) -> ClassifierResult {
        let result = match self.classify_via_model(request).await {
            Ok(result) => result,
            Err(reason) => {
                warn!(reason, "classifier falling back to deterministic result");
                ClassifierResult::deterministic_fallback()
            }
        };
        apply_rules(request, result)
    }

    async fn classify_via_model(&self, request: &ClassifyRequest<'_>) -> Result<ClassifierResult, &'static str> {
        let provider_request = ProviderRequest {
            model_id: self.model_id.clone(),
            system_prompt: CLASSIFIER_SYSTEM_PROMPT.to_string(),
            messages: vec![ProviderMessage {
                role: ProviderMessageRole::User,
                content: request.user_text.to_string(),
                tool_calls: Vec::new(),
                tool_call_id: None,
            }],
            tools: Vec::new(),
            tool_choice: ToolChoice::None,
            max_output_tokens: Some(200),
        };

        let mut stream = self.provider.stream_turn(provider_request).await.map_err(|_| "provider_unavailable")?;
        let mut events = Vec::new();
        while let Some(event) = stream.next().await {
            events.push(event.map_err(|_| "stream_error")?);
        }
        let turn = TurnResult::fold(&events);

        let wire: ClassifierWireResult = serde_json::from_str(turn.text.trim()).map_err(|_| "model_classifier_failed")?;
        let todo_policy = todo_policy_for(wire.intent, wire.complexity);
        Ok(ClassifierResult {
            intent: wire.intent,
            complexity: wire.complexity,
            objective_mode: wire.objective_mode,
            todo_policy,
            source: ClassifierSource::Model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::stream;
    use runloop_provider_api::ProviderError;
    use runloop_provider_api::ProviderEventStream;
    use runloop_provider_api::ProviderStreamEvent;
    use runloop_provider_api::StopReason;
    use runloop_provider_api::TokenUsage;

    struct ScriptedProvider {
        text: &'static str,
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn stream_turn(&self, _request: ProviderRequest) -> Result<ProviderEventStream, ProviderError> {
            let events = vec![
                Ok(ProviderStreamEvent::TextDelta { delta: self.text.to_string() }),
                Ok(ProviderStreamEvent::TurnComplete {
                    usage: TokenUsage::default(),
                    stop_reason: StopReason::EndTurn,
                }),
            ];
            Ok(stream::iter(events).boxed())
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl Provider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        async fn stream_turn(&self, _request: ProviderRequest) -> Result<ProviderEventStream, ProviderError> {
            Err(ProviderError::EmptyOutput { provider: "failing".to_string() })
        }
    }

    #[tokio::test]
    async fn parses_well_formed_model_output() {
        let provider = Arc::new(ScriptedProvider {
            text: r#"{"intent": "task", "complexity": "moderate", "objective_mode": "replace"}"#,
        });
        let classifier = Classifier::new(provider, "test-model");
        let request = ClassifyRequest {
            user_text: "fix the bug",
            attachments_present: false,
            open_goal: None,
        };
        let result = classifier.classify(&request).await;
        assert_eq!(result.intent, Intent::Task);
        assert_eq!(result.complexity, Complexity::Moderate);
        assert_eq!(result.source, ClassifierSource::Model);
    }

    #[tokio::test]
    async fn falls_back_deterministically_on_provider_failure() {
        let classifier = Classifier::new(Arc::new(FailingProvider), "test-model");
        let request = ClassifyRequest {
            user_text: "fix the bug",
            attachments_present: false,
            open_goal: None,
        };
        let result = classifier.classify(&request).await;
        assert_eq!(result.source, ClassifierSource::DeterministicFallback);
        assert_eq!(result.todo_policy, TodoPolicy::Required);
    }

    #[tokio::test]
    async fn falls_back_on_unparseable_model_output() {
        let provider = Arc::new(ScriptedProvider { text: "not json" });
        let classifier = Classifier::new(provider, "test-model");
        let request = ClassifyRequest {
            user_text: "fix the bug",
            attachments_present: false,
            open_goal: None,
        };
        let result = classifier.classify(&request).await;
        assert_eq!(result.source, ClassifierSource::DeterministicFallback);
    }

    #[tokio::test]
    async fn attachments_force_task_even_on_fallback() {
        let classifier = Classifier::new(Arc::new(FailingProvider), "test-model");
        let request = ClassifyRequest {
            user_text: "look at this image",
            attachments_present: true,
            open_goal: None,
        };
        let result = classifier.classify(&request).await;
        assert_eq!(result.intent, Intent::Task);
    }
}
