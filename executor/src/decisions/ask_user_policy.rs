//! Ask-User Policy (C9, §4.3): classifies an `ask_user` signal as a
//! legitimate external blocker vs. delegating collectable work, model-first
//! with a deterministic reject fallback.

use futures::StreamExt;
use runloop_protocol::AskUserReasonCode;
use runloop_protocol::AskUserSignal;
use runloop_protocol::ClassifierSource;
use runloop_provider_api::Provider;
use runloop_provider_api::ProviderMessage;
use runloop_provider_api::ProviderMessageRole;
use runloop_provider_api::ProviderRequest;
use runloop_provider_api::ToolChoice;
use runloop_provider_api::TurnResult;
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

const ASK_USER_POLICY_SYSTEM_PROMPT: &str = "You judge whether an agent's request to ask the human a question is \
legitimate or is delegating work the agent's own tools could do (running commands, reading files, fetching URLs). \
Respond with only JSON: {\"allow\": true|false, \"reason\": \"...\", \"confidence\": 0.0-1.0}";

#[derive(Debug, Deserialize)]
struct PolicyWireResult {
    allow: bool,
    reason: String,
    confidence: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AskUserVerdict {
    pub allow: bool,
    pub reason: String,
    pub confidence: f32,
    pub source: ClassifierSource,
}

impl AskUserVerdict {
    fn deterministic_reject(reason: impl Into<String>) -> Self {
        Self {
            allow: false,
            reason: reason.into(),
            confidence: 1.0,
            source: ClassifierSource::DeterministicFallback,
        }
    }
}

/// Model-first policy classifier with a deterministic reject fallback: any
/// provider failure or unparseable output defaults to disallowing the
/// `ask_user` signal, since over-escalating is worse than one extra
/// rejected question (the inverse conservatism of the intent classifier's
/// fallback, which defaults to the larger task).
pub struct AskUserPolicy {
    provider: Arc<dyn Provider>,
    model_id: String,
}

impl AskUserPolicy {
    pub fn new(provider: Arc<dyn Provider>, model_id: impl Into<String>) -> Self {
        Self {
            provider,
            model_id: model_id.into(),
        }
    }

    pub async fn evaluate(&self, signal: &AskUserSignal) -> AskUserVerdict {
        let verdict = match self.evaluate_via_model(signal).await {
            Ok(verdict) => verdict,
            Err(reason) => {
                warn!(reason, "ask-user policy falling back to deterministic reject");
                AskUserVerdict::deterministic_reject(reason)
            }
        };
        apply_ask_user_rules(signal, verdict)
    }

    async fn evaluate_via_model(&self, signal: &AskUserSignal) -> Result<AskUserVerdict, &'static str> {
        let user_text = serde_json::json!({
            "question": signal.question,
            "reason_code": signal.reason_code.as_str(),
            "required_from_user": signal.required_from_user,
        })
        .to_string();

        let request = ProviderRequest {
            model_id: self.model_id.clone(),
            system_prompt: ASK_USER_POLICY_SYSTEM_PROMPT.to_string(),
            messages: vec![ProviderMessage {
                role: ProviderMessageRole::User,
                content: user_text,
                tool_calls: Vec::new(),
                tool_call_id: None,
            }],
            tools: Vec::new(),
            tool_choice: ToolChoice::None,
            max_output_tokens: Some(200),
        };

        let mut stream = self.provider.stream_turn(request).await.map_err(|_| "provider_unavailable")?;
        let mut events = Vec::new();
        while let Some(event) = stream.next().await {
            events.push(event.map_err(|_| "stream_error")?);
        }
        let turn = TurnResult::fold(&events);
        let wire: PolicyWireResult = serde_json::from_str(turn.text.trim()).map_err(|_| "policy_classifier_failed")?;
        Ok(AskUserVerdict {
            allow: wire.allow,
            reason: wire.reason,
            confidence: wire.confidence,
            source: ClassifierSource::Model,
        })
    }
}

/// Hard post-processing rule (§4.3): `permission_blocked` and
/// `conflicting_constraints` require non-empty `evidence_refs` regardless
/// of what the model or the deterministic fallback decided.
pub fn apply_ask_user_rules(signal: &AskUserSignal, mut verdict: AskUserVerdict) -> AskUserVerdict {
    let requires_evidence = matches!(
        signal.reason_code,
        AskUserReasonCode::PermissionBlocked | AskUserReasonCode::ConflictingConstraints
    );
    if requires_evidence && signal.evidence_refs.is_empty() {
        verdict.allow = false;
        verdict.reason = format!("{} requires non-empty evidence_refs", signal.reason_code.as_str());
    }
    verdict
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

    fn signal(reason_code: AskUserReasonCode, evidence_refs: Vec<String>) -> AskUserSignal {
        AskUserSignal {
            question: "Which API key should I use?".to_string(),
            options: vec![],
            reason_code,
            required_from_user: vec![],
            evidence_refs,
        }
    }

    #[tokio::test]
    async fn model_allow_is_honored_when_evidence_not_required() {
        let provider = Arc::new(ScriptedProvider {
            text: r#"{"allow": true, "reason": "genuine external blocker", "confidence": 0.9}"#,
        });
        let policy = AskUserPolicy::new(provider, "test-model");
        let verdict = policy.evaluate(&signal(AskUserReasonCode::MissingExternalInput, vec![])).await;
        assert!(verdict.allow);
        assert_eq!(verdict.source, ClassifierSource::Model);
    }

    #[tokio::test]
    async fn provider_failure_falls_back_to_reject() {
        let policy = AskUserPolicy::new(Arc::new(FailingProvider), "test-model");
        let verdict = policy.evaluate(&signal(AskUserReasonCode::UserDecisionRequired, vec![])).await;
        assert!(!verdict.allow);
        assert_eq!(verdict.source, ClassifierSource::DeterministicFallback);
    }

    #[tokio::test]
    async fn permission_blocked_without_evidence_is_forced_reject() {
        let provider = Arc::new(ScriptedProvider {
            text: r#"{"allow": true, "reason": "looks fine", "confidence": 0.8}"#,
        });
        let policy = AskUserPolicy::new(provider, "test-model");
        let verdict = policy.evaluate(&signal(AskUserReasonCode::PermissionBlocked, vec![])).await;
        assert!(!verdict.allow);
        assert!(verdict.reason.contains("evidence_refs"));
    }

    #[tokio::test]
    async fn permission_blocked_with_evidence_keeps_model_verdict() {
        let provider = Arc::new(ScriptedProvider {
            text: r#"{"allow": true, "reason": "confirmed blocker", "confidence": 0.8}"#,
        });
        let policy = AskUserPolicy::new(provider, "test-model");
        let verdict = policy
            .evaluate(&signal(AskUserReasonCode::PermissionBlocked, vec!["tool_call:tc1".to_string()]))
            .await;
        assert!(verdict.allow);
    }
}
