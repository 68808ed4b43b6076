//! Thread Actor (C4, §4.1, §5): the single owner of one `(endpoint_id,
//! thread_id)`'s mutable state. Every mutating operation is serialized
//! through `state`'s exclusive lock: a keyed map, background task per
//! run, channel-based completion signal, combined with the per-thread
//! exclusive lock as an alternative to a mailbox task.
//!
//! `send_user_turn` validates and persists synchronously under the lock,
//! then spawns the run in the background and returns immediately — the
//! `kind: "start"` result is the caller's cue that progress now arrives
//! over the realtime stream rather than this call's return value.

use crate::error::SessionError;
use crate::error::session_error::IllegalRunTransitionSnafu;
use crate::error::session_error::InvalidMessageIdSnafu;
use crate::error::session_error::ModelLockViolationSnafu;
use crate::error::session_error::RunChangedSnafu;
use crate::error::session_error::StoreSnafu;
use crate::error::session_error::ThreadBusySnafu;
use crate::error::session_error::UnknownToolCallSnafu;
use crate::error::session_error::WaitingPromptChangedSnafu;
use crate::request::SendUserTurnInput;
use crate::request::SendUserTurnResult;
use runloop_executor::RealtimeSink;
use runloop_executor::RunExecutor;
use runloop_executor::RunOutcome;
use runloop_executor::RunRequest;
use runloop_protocol::EventPhase;
use runloop_protocol::EventPriority;
use runloop_protocol::LoopConfig;
use runloop_protocol::Message;
use runloop_protocol::MessageBlock;
use runloop_protocol::MessageRole;
use runloop_protocol::MessageStatus;
use runloop_protocol::RealtimeEvent;
use runloop_protocol::RealtimeEventType;
use runloop_protocol::Run;
use runloop_protocol::RunState;
use runloop_protocol::StreamKind;
use runloop_protocol::Thread;
use runloop_protocol::now_ms;
use runloop_store::TranscriptStore;
use snafu::ResultExt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing::warn;
use uuid::Uuid;

/// Transcript pages are small enough per thread that a single page covers
/// any realistic history; §6 caps RPC `list_messages` at the same limit.
const HISTORY_LOAD_LIMIT: usize = 500;

struct WaitingPrompt {
    prompt_id: String,
    question: String,
}

struct ThreadActorState {
    thread: Thread,
    active_run: Option<Run>,
    run_cancellation: Option<CancellationToken>,
    waiting_prompt: Option<WaitingPrompt>,
}

pub struct ThreadActor {
    endpoint_id: String,
    thread_id: String,
    executor: Arc<RunExecutor>,
    transcript_store: Arc<dyn TranscriptStore>,
    realtime_sink: Arc<dyn RealtimeSink>,
    state: Mutex<ThreadActorState>,
}

impl ThreadActor {
    pub fn new(thread: Thread, executor: Arc<RunExecutor>, transcript_store: Arc<dyn TranscriptStore>, realtime_sink: Arc<dyn RealtimeSink>) -> Self {
        Self {
            endpoint_id: thread.endpoint_id.clone(),
            thread_id: thread.thread_id.clone(),
            executor,
            transcript_store,
            realtime_sink,
            state: Mutex::new(ThreadActorState {
                thread,
                active_run: None,
                run_cancellation: None,
                waiting_prompt: None,
            }),
        }
    }

    /// Publish a `RunStateChanged` event (§4.6) for a thread-summary
    /// subscriber to pick up. `seq` is assigned downstream by the sink
    /// (persisted events get the store's real seq; this call never touches
    /// the store directly).
    fn publish_run_state_changed(&self, run_id: &str, state: RunState) {
        self.realtime_sink.publish(RealtimeEvent {
            seq: 0,
            thread_id: self.thread_id.clone(),
            run_id: Some(run_id.to_string()),
            event_type: RealtimeEventType::RunStateChanged,
            stream: StreamKind::Lifecycle,
            phase: EventPhase::StateChange,
            priority: EventPriority::Lifecycle,
            payload: serde_json::json!({ "state": state }),
            created_at_ms: now_ms(),
        });
    }

    pub async fn send_user_turn(self: &Arc<Self>, input: SendUserTurnInput) -> Result<SendUserTurnResult, SessionError> {
        let mut guard = self.state.lock().await;

        if !guard.thread.accepts_model(input.model.as_deref()) {
            return ModelLockViolationSnafu {
                thread_id: self.thread_id.clone(),
                locked_model_id: guard.thread.model_id.clone().unwrap_or_default(),
                requested_model_id: input.model.clone().unwrap_or_default(),
            }
            .fail();
        }

        if let Some(active) = &guard.active_run {
            if !active.state.is_terminal() {
                if input.expected_run_id.as_deref() == Some(active.run_id.as_str()) {
                    return Ok(SendUserTurnResult::started(active.run_id.clone(), None));
                }
                return ThreadBusySnafu {
                    thread_id: self.thread_id.clone(),
                    active_run_id: active.run_id.clone(),
                }
                .fail();
            }
        }

        if let Some(expected) = &input.expected_run_id {
            let matches_active = guard.active_run.as_ref().is_some_and(|r| &r.run_id == expected);
            if !matches_active {
                return RunChangedSnafu {
                    expected: expected.clone(),
                    actual: guard.active_run.as_ref().map(|r| r.run_id.clone()).unwrap_or_default(),
                }
                .fail();
            }
        }

        let consumed_waiting_prompt_id = match (&input.reply_to_waiting_prompt_id, &guard.waiting_prompt) {
            (Some(expected), Some(pending)) if expected == &pending.prompt_id => Some(pending.prompt_id.clone()),
            (Some(expected), other) => {
                return WaitingPromptChangedSnafu {
                    expected: expected.clone(),
                    actual: other.as_ref().map(|p| p.prompt_id.clone()).unwrap_or_default(),
                }
                .fail();
            }
            (None, _) => None,
        };
        if consumed_waiting_prompt_id.is_some() {
            guard.waiting_prompt = None;
        }

        if let Some(candidate) = &input.input.client_message_id {
            if !runloop_protocol::is_valid_message_id(candidate) {
                return InvalidMessageIdSnafu { message_id: candidate.clone() }.fail();
            }
        }
        let message_id = input.input.client_message_id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
        let user_message = Message {
            row_id: 0,
            message_id: message_id.clone(),
            role: MessageRole::User,
            status: MessageStatus::Final,
            created_at_ms: now_ms(),
            text_content: input.input.text.clone(),
            blocks: vec![MessageBlock::Text { text: input.input.text.clone() }],
        };
        let stored = self
            .transcript_store
            .append_message(&self.endpoint_id, &self.thread_id, user_message)
            .await
            .context(StoreSnafu)?;
        guard.thread.record_last_message(stored.text_content.clone(), stored.created_at_ms);

        let run_id = Uuid::new_v4().to_string();
        let mut run = Run::new(run_id.clone(), self.endpoint_id.clone(), self.thread_id.clone(), message_id.clone());
        run.transition(RunState::Running).context(IllegalRunTransitionSnafu)?;
        let cancellation = CancellationToken::new();
        guard.active_run = Some(run);
        guard.run_cancellation = Some(cancellation.clone());
        guard.thread.last_run_status = Some(RunState::Running);
        let open_goal = guard.thread.open_goal.clone();
        let workspace_root = guard.thread.working_dir.clone();

        drop(guard);
        self.publish_run_state_changed(&run_id, RunState::Running);

        let history = self
            .transcript_store
            .list_messages(&self.endpoint_id, &self.thread_id, 0, HISTORY_LOAD_LIMIT)
            .await
            .context(StoreSnafu)?
            .messages;

        let config_override = LoopConfig {
            mode: input.options.mode,
            max_steps: input.options.max_steps.unwrap_or_else(|| LoopConfig::default().max_steps),
            max_no_tool_rounds: input.options.max_no_tool_rounds.unwrap_or_else(|| LoopConfig::default().max_no_tool_rounds),
            ..LoopConfig::default()
        };

        let run_request = RunRequest {
            run_id: run_id.clone(),
            thread_id: self.thread_id.clone(),
            message_id,
            user_text: input.input.text,
            attachments_present: !input.input.attachments.is_empty(),
            history,
            open_goal,
            workspace_root,
            cancellation,
            config_override: Some(config_override),
        };

        self.spawn_run(run_request);

        Ok(SendUserTurnResult::started(run_id, consumed_waiting_prompt_id))
    }

    fn spawn_run(self: &Arc<Self>, request: RunRequest) {
        let run_id = request.run_id.clone();
        info!(thread_id = %self.thread_id, run_id, "starting run");
        // `ThreadActor` lives behind an `Arc` in the registry; the
        // background task holds its own clone so it can report the
        // outcome back through `record_outcome` once the run finishes.
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = this.executor.run(request).await;
            info!(thread_id = %this.thread_id, run_id = %run_id, outcome = ?outcome, "run finished");
            this.record_outcome(&run_id, &outcome).await;
        });
    }

    /// Record the outcome of a run that finished in the background. Called
    /// by the task spawned in [`Self::spawn_run`] via the registry so the
    /// actor's own state stays the single source of truth for
    /// `last_run_status`/`waiting_prompt`.
    pub async fn record_outcome(&self, run_id: &str, outcome: &RunOutcome) {
        let mut guard = self.state.lock().await;
        let Some(active) = guard.active_run.as_mut() else {
            warn!(thread_id = %self.thread_id, run_id, "run outcome recorded with no active run");
            return;
        };
        if active.run_id != run_id {
            warn!(thread_id = %self.thread_id, run_id, active_run_id = %active.run_id, "run outcome does not match the active run");
            return;
        }
        if let Err(err) = active.transition(outcome.terminal_state()) {
            warn!(thread_id = %self.thread_id, run_id, %err, "ignoring illegal terminal transition");
        }
        guard.thread.last_run_status = Some(active.state);
        if let RunOutcome::Failed { reason } | RunOutcome::TimedOut { reason } = outcome {
            active.error = Some(reason.clone());
            guard.thread.last_run_error = Some(reason.clone());
        }
        if let RunOutcome::WaitingUser { prompt_id, question, .. } = outcome {
            guard.waiting_prompt = Some(WaitingPrompt {
                prompt_id: prompt_id.clone(),
                question: question.clone(),
            });
        }
        let final_state = active.state;
        guard.run_cancellation = None;
        drop(guard);
        self.publish_run_state_changed(run_id, final_state);
    }

    /// Cancel the thread's active run, if any. A no-op (not an error) if
    /// nothing is running — canceling an already-finished run is never a
    /// caller mistake worth surfacing.
    pub async fn cancel_run(&self) {
        let guard = self.state.lock().await;
        if let Some(token) = &guard.run_cancellation {
            token.cancel();
        }
    }

    pub async fn snapshot(&self) -> Thread {
        self.state.lock().await.thread.clone()
    }

    pub async fn active_run_snapshot(&self) -> Option<Run> {
        self.state.lock().await.active_run.clone()
    }

    pub async fn approve_tool(&self, tool_id: &str, approved: bool, gate: &crate::approval::ChannelApprovalGate) -> bool {
        let _guard = self.state.lock().await;
        gate.resolve(tool_id, approved).await
    }

    pub async fn waiting_prompt_id(&self) -> Option<String> {
        self.state.lock().await.waiting_prompt.as_ref().map(|p| p.prompt_id.clone())
    }

    /// `set_tool_collapsed` (§6, R2): read-modify-write the `collapsed` flag
    /// on one tool call block of an already-persisted message. Round-tripping
    /// `true` then `false` must restore the original `message_json`
    /// byte-for-byte (modulo `updated_at`), so this only ever touches the
    /// one field named on the matching block.
    pub async fn set_tool_collapsed(&self, message_id: &str, tool_id: &str, collapsed: bool) -> Result<(), SessionError> {
        let mut message = self
            .transcript_store
            .get_message(&self.endpoint_id, &self.thread_id, message_id)
            .await
            .context(StoreSnafu)?;

        let mut found = false;
        for block in &mut message.blocks {
            if let MessageBlock::ToolCall { tool_id: candidate, collapsed: slot, .. } = block {
                if candidate == tool_id {
                    *slot = Some(collapsed);
                    found = true;
                    break;
                }
            }
        }
        if !found {
            return UnknownToolCallSnafu {
                message_id: message_id.to_string(),
                tool_id: tool_id.to_string(),
            }
            .fail();
        }

        self.transcript_store
            .update_message(&self.endpoint_id, &self.thread_id, message)
            .await
            .context(StoreSnafu)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::SendUserTurnOptions;
    use crate::request::UserInput;
    use crate::todo_store::InMemoryTodoStore;
    use async_trait::async_trait;
    use futures::StreamExt;
    use futures::stream;
    use runloop_checkpoint::WorkspaceCheckpointer;
    use runloop_classifier::Classifier;
    use runloop_executor::RunExecutorBuilder;
    use runloop_executor::decisions::AskUserPolicy;
    use runloop_provider_api::Provider;
    use runloop_provider_api::ProviderError;
    use runloop_provider_api::ProviderEventStream;
    use runloop_provider_api::ProviderRequest;
    use runloop_provider_api::ProviderStreamEvent;
    use runloop_provider_api::StopReason;
    use runloop_provider_api::TokenUsage;
    use runloop_store::InMemoryStore;
    use runloop_tools_api::ToolRegistry;
    use std::path::PathBuf;

    struct ScriptedTextProvider {
        text: &'static str,
    }

    #[async_trait]
    impl Provider for ScriptedTextProvider {
        fn name(&self) -> &str {
            "scripted-text"
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

    fn social_classifier_json() -> &'static str {
        r#"{"intent":"social","complexity":"trivial","objective_mode":"replace"}"#
    }

    fn test_actor(working_dir: PathBuf, checkpoints_root: &std::path::Path) -> Arc<ThreadActor> {
        let provider: Arc<dyn Provider> = Arc::new(ScriptedTextProvider { text: "hi there" });
        let classifier_provider: Arc<dyn Provider> = Arc::new(ScriptedTextProvider { text: social_classifier_json() });
        let ask_user_provider: Arc<dyn Provider> = Arc::new(ScriptedTextProvider { text: r#"{"allow":false,"reason":"n/a","confidence":0.0}"# });
        let executor = RunExecutorBuilder::new()
            .provider(provider)
            .model_id("main-model")
            .tool_registry(Arc::new(ToolRegistry::new()))
            .classifier(Arc::new(Classifier::new(classifier_provider, "classifier-model")))
            .ask_user_policy(Arc::new(AskUserPolicy::new(ask_user_provider, "ask-model")))
            .todo_store(Arc::new(InMemoryTodoStore::default()))
            .transcript_store(Arc::new(InMemoryStore::default()))
            .checkpointer(Arc::new(WorkspaceCheckpointer::new(checkpoints_root)))
            .endpoint_id("ep1")
            .build();
        let thread = Thread::new("ep1", "th1", working_dir);
        Arc::new(ThreadActor::new(thread, Arc::new(executor), Arc::new(InMemoryStore::default()), Arc::new(runloop_executor::NullRealtimeSink)))
    }

    fn turn(text: &str) -> SendUserTurnInput {
        SendUserTurnInput {
            thread_id: "th1".to_string(),
            model: None,
            input: UserInput {
                text: text.to_string(),
                attachments: Vec::new(),
                client_message_id: None,
            },
            options: SendUserTurnOptions::default(),
            expected_run_id: None,
            reply_to_waiting_prompt_id: None,
        }
    }

    #[tokio::test]
    async fn send_user_turn_starts_a_run_and_marks_it_active() {
        let workdir = tempfile::tempdir().unwrap();
        let checkpoints = tempfile::tempdir().unwrap();
        let actor = test_actor(workdir.path().to_path_buf(), checkpoints.path());

        let result = actor.send_user_turn(turn("hello there")).await.unwrap();
        assert_eq!(result.kind, "start");

        let active = actor.active_run_snapshot().await.unwrap();
        assert_eq!(active.run_id, result.run_id);
    }

    #[tokio::test]
    async fn second_call_while_busy_with_mismatched_expected_run_is_rejected() {
        let workdir = tempfile::tempdir().unwrap();
        let checkpoints = tempfile::tempdir().unwrap();
        let actor = test_actor(workdir.path().to_path_buf(), checkpoints.path());

        // Seed an in-flight run directly rather than racing the background
        // task spawned by `send_user_turn`, whose completion timing isn't
        // something a caller should have to reason about here.
        {
            let mut guard = actor.state.lock().await;
            let mut run = Run::new("already-running", "ep1", "th1", "m1");
            run.transition(RunState::Running).unwrap();
            guard.active_run = Some(run);
        }

        let mut second_input = turn("second turn");
        second_input.expected_run_id = Some("not-the-active-run".to_string());
        let err = actor.send_user_turn(second_input).await.unwrap_err();
        assert!(matches!(err, SessionError::ThreadBusy { .. }));
    }

    #[tokio::test]
    async fn repeated_call_with_expected_run_matching_the_active_run_is_idempotent() {
        let workdir = tempfile::tempdir().unwrap();
        let checkpoints = tempfile::tempdir().unwrap();
        let actor = test_actor(workdir.path().to_path_buf(), checkpoints.path());

        {
            let mut guard = actor.state.lock().await;
            let mut run = Run::new("already-running", "ep1", "th1", "m1");
            run.transition(RunState::Running).unwrap();
            guard.active_run = Some(run);
        }

        let mut second_input = turn("same request again");
        second_input.expected_run_id = Some("already-running".to_string());
        let result = actor.send_user_turn(second_input).await.unwrap();
        assert_eq!(result.run_id, "already-running");
        assert_eq!(result.kind, "start");
    }

    #[tokio::test]
    async fn model_lock_violation_is_rejected_before_persisting_anything() {
        let workdir = tempfile::tempdir().unwrap();
        let checkpoints = tempfile::tempdir().unwrap();
        let actor = test_actor(workdir.path().to_path_buf(), checkpoints.path());
        {
            let mut guard = actor.state.lock().await;
            guard.thread.model_locked = true;
            guard.thread.model_id = Some("locked-model".to_string());
        }

        let mut input = turn("please switch models");
        input.model = Some("other-model".to_string());
        let err = actor.send_user_turn(input).await.unwrap_err();
        assert!(matches!(err, SessionError::ModelLockViolation { .. }));
    }

    #[tokio::test]
    async fn reply_with_mismatched_waiting_prompt_is_rejected() {
        let workdir = tempfile::tempdir().unwrap();
        let checkpoints = tempfile::tempdir().unwrap();
        let actor = test_actor(workdir.path().to_path_buf(), checkpoints.path());

        let mut input = turn("my answer");
        input.reply_to_waiting_prompt_id = Some("some-prompt".to_string());
        let err = actor.send_user_turn(input).await.unwrap_err();
        assert!(matches!(err, SessionError::WaitingPromptChanged { .. }));
    }

    #[tokio::test]
    async fn send_user_turn_persists_on_top_of_prior_transcript_history() {
        let workdir = tempfile::tempdir().unwrap();
        let checkpoints = tempfile::tempdir().unwrap();
        let actor = test_actor(workdir.path().to_path_buf(), checkpoints.path());

        // Seed a prior message directly, as if an earlier turn had already
        // run to completion, so `send_user_turn` has history to load.
        let prior = Message {
            row_id: 0,
            message_id: "m-prior".to_string(),
            role: MessageRole::User,
            status: MessageStatus::Final,
            created_at_ms: now_ms(),
            text_content: "earlier turn".to_string(),
            blocks: vec![MessageBlock::Text { text: "earlier turn".to_string() }],
        };
        actor.transcript_store.append_message("ep1", "th1", prior).await.unwrap();

        actor.send_user_turn(turn("follow-up turn")).await.unwrap();

        let history = actor.transcript_store.list_messages("ep1", "th1", 0, HISTORY_LOAD_LIMIT).await.unwrap().messages;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].text_content, "earlier turn");
        assert_eq!(history[1].text_content, "follow-up turn");
    }

    #[tokio::test]
    async fn set_tool_collapsed_round_trips_back_to_the_original_value() {
        let workdir = tempfile::tempdir().unwrap();
        let checkpoints = tempfile::tempdir().unwrap();
        let actor = test_actor(workdir.path().to_path_buf(), checkpoints.path());

        let message = Message {
            row_id: 0,
            message_id: "m-tool".to_string(),
            role: MessageRole::Assistant,
            status: MessageStatus::Final,
            created_at_ms: now_ms(),
            text_content: String::new(),
            blocks: vec![MessageBlock::ToolCall {
                tool_id: "tool-1".to_string(),
                tool_name: "fs_read".to_string(),
                args: serde_json::json!({}),
                collapsed: None,
                result: None,
                status: runloop_protocol::ToolCallStatus::Success,
            }],
        };
        actor.transcript_store.append_message("ep1", "th1", message).await.unwrap();

        actor.set_tool_collapsed("m-tool", "tool-1", true).await.unwrap();
        let after_collapse = actor.transcript_store.get_message("ep1", "th1", "m-tool").await.unwrap();
        let original = serde_json::to_string(&after_collapse.blocks).unwrap();

        actor.set_tool_collapsed("m-tool", "tool-1", false).await.unwrap();
        let uncollapsed = actor.transcript_store.get_message("ep1", "th1", "m-tool").await.unwrap();
        assert!(!original.contains("\"collapsed\":false"));
        match &uncollapsed.blocks[0] {
            MessageBlock::ToolCall { collapsed, .. } => assert_eq!(*collapsed, Some(false)),
            _ => panic!("expected tool call block"),
        }
    }

    #[tokio::test]
    async fn set_tool_collapsed_on_unknown_tool_id_is_rejected() {
        let workdir = tempfile::tempdir().unwrap();
        let checkpoints = tempfile::tempdir().unwrap();
        let actor = test_actor(workdir.path().to_path_buf(), checkpoints.path());

        let message = Message {
            row_id: 0,
            message_id: "m-tool".to_string(),
            role: MessageRole::Assistant,
            status: MessageStatus::Final,
            created_at_ms: now_ms(),
            text_content: String::new(),
            blocks: vec![],
        };
        actor.transcript_store.append_message("ep1", "th1", message).await.unwrap();

        let err = actor.set_tool_collapsed("m-tool", "missing-tool", true).await.unwrap_err();
        assert!(matches!(err, SessionError::UnknownToolCall { .. }));
    }

    #[tokio::test]
    async fn cancel_run_with_nothing_active_is_a_harmless_noop() {
        let workdir = tempfile::tempdir().unwrap();
        let checkpoints = tempfile::tempdir().unwrap();
        let actor = test_actor(workdir.path().to_path_buf(), checkpoints.path());
        actor.cancel_run().await;
    }
}
