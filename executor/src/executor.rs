//! Run Executor (C8, §4.2): advances one thread's run through the bounded
//! step loop — classify, build prompt, stream a provider turn, execute
//! tool calls, apply the decision-function pipeline in order, and either
//! continue or finalize. A builder panics on missing required
//! collaborators, and the step loop threads mutable run state through
//! named stages rather than spreading it across closures.

use crate::approval::ApprovalGate;
use crate::approval::AutoDeny;
use crate::attempt::AttemptSummary;
use crate::attempt::LastFailure;
use crate::attempt::text_implies_tool_use;
use crate::decisions::AskUserPolicy;
use crate::decisions::CompletionGateInputs;
use crate::decisions::LoopGuardVerdict;
use crate::decisions::SYNTHESIS_DIRECTIVE;
use crate::decisions::TodoStore;
use crate::decisions::TurnDigestInputs;
use crate::decisions::TurnRecoveryVerdict;
use crate::decisions::close_out_todos_for_waiting_user;
use crate::decisions::decide_turn_recovery;
use crate::decisions::evaluate_task_completion_gate;
use crate::decisions::needs_followup_hint;
use crate::error::ExecutorError;
use crate::error::executor_error::CheckpointSnafu;
use crate::error::executor_error::ProviderSnafu;
use crate::error::executor_error::StalledSnafu;
use crate::error::executor_error::StoreSnafu;
use runloop_error::ErrorExt;
use crate::realtime::NullRealtimeSink;
use crate::realtime::RealtimeSink;
use crate::responder::run_responder_turn;
use crate::result::RunOutcome;
use crate::state::RuntimeState;
use futures::StreamExt;
use runloop_checkpoint::WorkspaceCheckpointer;
use runloop_classifier::ClassifyRequest;
use runloop_classifier::Classifier;
use runloop_context::compress_history;
use runloop_message::to_provider_messages;
use runloop_prompt::PromptInputs;
use runloop_prompt::SystemPromptBuilder;
use runloop_protocol::AskUserReasonCode;
use runloop_protocol::AskUserSignal;
use runloop_protocol::CapabilityContract;
use runloop_protocol::ClassifierResult;
use runloop_protocol::EventPhase;
use runloop_protocol::EventPriority;
use runloop_protocol::FallbackConfig;
use runloop_protocol::FallbackState;
use runloop_protocol::Intent;
use runloop_protocol::LoopConfig;
use runloop_protocol::Message;
use runloop_protocol::MessageBlock;
use runloop_protocol::MessageRole;
use runloop_protocol::MessageStatus;
use runloop_protocol::RealtimeEvent;
use runloop_protocol::RealtimeEventType;
use runloop_protocol::StallRecovery;
use runloop_protocol::StreamKind;
use runloop_protocol::ToolCallStatus;
use runloop_protocol::ToolErrorCode;
use runloop_protocol::TodoSnapshot;
use runloop_protocol::ToolResult;
use runloop_protocol::now_ms;
use runloop_provider_api::Provider;
use runloop_provider_api::ProviderRequest;
use runloop_provider_api::ProviderStreamEvent;
use runloop_provider_api::ProviderToolCall;
use runloop_provider_api::ToolChoice;
use runloop_provider_api::TurnResult;
use runloop_store::TranscriptStore;
use runloop_tools_api::ToolContext;
use runloop_tools_api::ToolRegistry;
use sha2::Digest;
use sha2::Sha256;
use snafu::ResultExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// One run's inputs, assembled by `runloop-session` before handing control
/// to the executor.
pub struct RunRequest {
    pub run_id: String,
    pub thread_id: String,
    pub message_id: String,
    pub user_text: String,
    pub attachments_present: bool,
    pub history: Vec<Message>,
    pub open_goal: Option<String>,
    pub workspace_root: PathBuf,
    /// Cancellation source owned by the caller (`runloop-session`'s thread
    /// actor), so `cancel_run` can reach a run already in flight.
    pub cancellation: CancellationToken,
    /// Per-turn override of the executor's default `LoopConfig` (`options.max_steps`,
    /// `options.max_no_tool_rounds`, `options.mode` from `SendUserTurn`, §4.1).
    /// `None` runs with the executor's configured default.
    pub config_override: Option<LoopConfig>,
}

pub struct RunExecutor {
    provider: Arc<dyn Provider>,
    model_id: String,
    tool_registry: Arc<ToolRegistry>,
    classifier: Arc<Classifier>,
    ask_user_policy: Arc<AskUserPolicy>,
    todo_store: Arc<dyn TodoStore>,
    transcript_store: Arc<dyn TranscriptStore>,
    checkpointer: Arc<WorkspaceCheckpointer>,
    approval_gate: Arc<dyn ApprovalGate>,
    config: LoopConfig,
    endpoint_id: String,
    realtime_sink: Arc<dyn RealtimeSink>,
}

#[derive(Default)]
pub struct RunExecutorBuilder {
    provider: Option<Arc<dyn Provider>>,
    model_id: Option<String>,
    tool_registry: Option<Arc<ToolRegistry>>,
    classifier: Option<Arc<Classifier>>,
    ask_user_policy: Option<Arc<AskUserPolicy>>,
    todo_store: Option<Arc<dyn TodoStore>>,
    transcript_store: Option<Arc<dyn TranscriptStore>>,
    checkpointer: Option<Arc<WorkspaceCheckpointer>>,
    approval_gate: Option<Arc<dyn ApprovalGate>>,
    config: Option<LoopConfig>,
    endpoint_id: Option<String>,
    realtime_sink: Option<Arc<dyn RealtimeSink>>,
}

impl RunExecutorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    pub fn tool_registry(mut self, tool_registry: Arc<ToolRegistry>) -> Self {
        self.tool_registry = Some(tool_registry);
        self
    }

    pub fn classifier(mut self, classifier: Arc<Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn ask_user_policy(mut self, ask_user_policy: Arc<AskUserPolicy>) -> Self {
        self.ask_user_policy = Some(ask_user_policy);
        self
    }

    pub fn todo_store(mut self, todo_store: Arc<dyn TodoStore>) -> Self {
        self.todo_store = Some(todo_store);
        self
    }

    pub fn transcript_store(mut self, transcript_store: Arc<dyn TranscriptStore>) -> Self {
        self.transcript_store = Some(transcript_store);
        self
    }

    pub fn checkpointer(mut self, checkpointer: Arc<WorkspaceCheckpointer>) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    pub fn approval_gate(mut self, approval_gate: Arc<dyn ApprovalGate>) -> Self {
        self.approval_gate = Some(approval_gate);
        self
    }

    pub fn config(mut self, config: LoopConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn endpoint_id(mut self, endpoint_id: impl Into<String>) -> Self {
        self.endpoint_id = Some(endpoint_id.into());
        self
    }

    pub fn realtime_sink(mut self, realtime_sink: Arc<dyn RealtimeSink>) -> Self {
        self.realtime_sink = Some(realtime_sink);
        self
    }

    pub fn build(self) -> RunExecutor {
        RunExecutor {
            provider: self.provider.expect("provider is required"),
            model_id: self.model_id.expect("model_id is required"),
            tool_registry: self.tool_registry.expect("tool_registry is required"),
            classifier: self.classifier.expect("classifier is required"),
            ask_user_policy: self.ask_user_policy.expect("ask_user_policy is required"),
            todo_store: self.todo_store.expect("todo_store is required"),
            transcript_store: self.transcript_store.expect("transcript_store is required"),
            checkpointer: self.checkpointer.expect("checkpointer is required"),
            approval_gate: self.approval_gate.unwrap_or_else(|| Arc::new(AutoDeny)),
            config: self.config.unwrap_or_default(),
            endpoint_id: self.endpoint_id.expect("endpoint_id is required"),
            realtime_sink: self.realtime_sink.unwrap_or_else(|| Arc::new(NullRealtimeSink)),
        }
    }
}

fn args_digest(args: &serde_json::Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(args.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

const COMMITMENT_CUES: &[&str] = &["i'll", "i will", "let me", "going to", "i'm going to"];

fn looks_like_commitment(text: &str) -> bool {
    let lower = text.to_lowercase();
    COMMITMENT_CUES.iter().any(|cue| lower.contains(cue))
}

fn assistant_message(turn: &TurnResult) -> Message {
    let mut blocks = Vec::new();
    if !turn.text.is_empty() {
        blocks.push(MessageBlock::Text { text: turn.text.clone() });
    }
    for call in &turn.tool_calls {
        blocks.push(MessageBlock::ToolCall {
            tool_id: call.id.clone(),
            tool_name: call.name.clone(),
            args: call.arguments.clone(),
            collapsed: None,
            result: None,
            status: ToolCallStatus::Pending,
        });
    }
    Message {
        row_id: 0,
        message_id: Uuid::new_v4().to_string(),
        role: MessageRole::Assistant,
        status: MessageStatus::Draft,
        created_at_ms: now_ms(),
        text_content: turn.text.clone(),
        blocks,
    }
}

fn tool_results_message(results: &[(ProviderToolCall, ToolResult)]) -> Option<Message> {
    if results.is_empty() {
        return None;
    }
    let blocks = results
        .iter()
        .map(|(call, result)| MessageBlock::ToolCall {
            tool_id: call.id.clone(),
            tool_name: call.name.clone(),
            args: call.arguments.clone(),
            collapsed: None,
            result: Some(serde_json::to_value(result).unwrap_or(serde_json::Value::Null)),
            status: result.status,
        })
        .collect();
    Some(Message {
        row_id: 0,
        message_id: Uuid::new_v4().to_string(),
        role: MessageRole::ToolResult,
        status: MessageStatus::Final,
        created_at_ms: now_ms(),
        text_content: String::new(),
        blocks,
    })
}

fn directive_message(text: impl Into<String>) -> Message {
    Message {
        row_id: 0,
        message_id: Uuid::new_v4().to_string(),
        role: MessageRole::User,
        status: MessageStatus::Final,
        created_at_ms: now_ms(),
        text_content: text.into(),
        blocks: Vec::new(),
    }
}

fn parse_ask_user_signal(call: &ProviderToolCall) -> Result<AskUserSignal, String> {
    let args = &call.arguments;
    let question = args
        .get("question")
        .and_then(serde_json::Value::as_str)
        .ok_or("ask_user call is missing \"question\"")?;
    let reason_code = match args.get("reason_code").and_then(serde_json::Value::as_str) {
        Some("user_decision_required") => AskUserReasonCode::UserDecisionRequired,
        Some("permission_blocked") => AskUserReasonCode::PermissionBlocked,
        Some("missing_external_input") => AskUserReasonCode::MissingExternalInput,
        Some("conflicting_constraints") => AskUserReasonCode::ConflictingConstraints,
        Some("safety_confirmation") => AskUserReasonCode::SafetyConfirmation,
        _ => return Err("ask_user call has a missing or unrecognized reason_code".to_string()),
    };
    let string_list = |key: &str| -> Vec<String> {
        args.get(key)
            .and_then(serde_json::Value::as_array)
            .map(|values| values.iter().filter_map(serde_json::Value::as_str).map(str::to_string).collect())
            .unwrap_or_default()
    };
    Ok(AskUserSignal {
        question: question.to_string(),
        options: string_list("options"),
        reason_code,
        required_from_user: string_list("required_from_user"),
        evidence_refs: string_list("evidence_refs"),
    }
    .normalized())
}

impl RunExecutor {
    pub async fn run(&self, request: RunRequest) -> RunOutcome {
        let config = request.config_override.clone().unwrap_or_else(|| self.config.clone());
        let capability = CapabilityContract::new(config.mode);

        if let Err(err) = self
            .checkpointer
            .create_pre_run(&request.thread_id, &request.run_id, &request.workspace_root)
            .await
            .context(CheckpointSnafu)
        {
            return RunOutcome::Failed { reason: err.to_string() };
        }

        let classify_request = ClassifyRequest {
            user_text: &request.user_text,
            attachments_present: request.attachments_present,
            open_goal: request.open_goal.as_deref(),
        };
        let classifier_result = self.classifier.classify(&classify_request).await;

        if matches!(classifier_result.intent, Intent::Social | Intent::Creative) {
            return self.run_responder_path(&request, &classifier_result, &capability, &config).await;
        }

        self.run_task_path(request, classifier_result, capability, config).await
    }

    async fn run_responder_path(&self, request: &RunRequest, classifier_result: &ClassifierResult, capability: &CapabilityContract, config: &LoopConfig) -> RunOutcome {
        let (_, context_package) = compress_history(&request.history, request.open_goal.as_deref());
        let todos = TodoSnapshot::default();
        let prompt = SystemPromptBuilder::build(&PromptInputs {
            mode: config.mode,
            classifier: classifier_result,
            no_user_interaction: capability.no_user_interaction,
            subagent_depth: capability.subagent_depth,
            context: &context_package,
            todos: &todos,
            skill_overlays: &[],
        });

        match run_responder_turn(&self.provider, &self.model_id, prompt, &request.user_text).await {
            Ok(text) => match self.finalize_assistant_message(request, text.clone()).await {
                Ok(message_id) => RunOutcome::Success { message_id, summary: text },
                Err(err) => RunOutcome::Failed { reason: err.to_string() },
            },
            Err(err) => RunOutcome::Failed { reason: err.to_string() },
        }
    }

    async fn run_task_path(&self, request: RunRequest, classifier_result: ClassifierResult, capability: CapabilityContract, config: LoopConfig) -> RunOutcome {
        let mut state = RuntimeState::new(
            config.stall_timeout.saturating_mul(4).max(Duration::from_secs(60)),
            config.stall_timeout,
            config.max_repeated_failures,
        );
        state.cancellation = request.cancellation.clone();
        let mut history = request.history.clone();
        let mut todos = self.todo_store.load(&request.thread_id).await;
        let mut fallback_state = FallbackState::new(self.model_id.clone());
        let mut suppress_tools_this_step = false;

        for _step in 0..config.max_steps {
            if state.cancellation.is_cancelled() {
                return RunOutcome::Canceled;
            }
            if state.is_wall_time_exceeded() {
                return RunOutcome::TimedOut { reason: "run exceeded its wall-time deadline".to_string() };
            }
            if state.is_idle_timed_out() {
                return RunOutcome::TimedOut { reason: "run exceeded its idle watchdog".to_string() };
            }

            let (compressed, context_package) = compress_history(&history, request.open_goal.as_deref());
            let prompt = SystemPromptBuilder::build(&PromptInputs {
                mode: config.mode,
                classifier: &classifier_result,
                no_user_interaction: capability.no_user_interaction,
                subagent_depth: capability.subagent_depth,
                context: &context_package,
                todos: &todos,
                skill_overlays: &[],
            });
            let (tool_defs, tool_choice) = if suppress_tools_this_step {
                (Vec::new(), ToolChoice::None)
            } else {
                (self.tool_registry.definitions_for(&capability, config.enforce_plan_mode_guard), ToolChoice::Auto)
            };
            suppress_tools_this_step = false;

            let provider_request = ProviderRequest {
                model_id: fallback_state.current_model.clone(),
                system_prompt: prompt,
                messages: to_provider_messages(&compressed),
                tools: tool_defs,
                tool_choice,
                max_output_tokens: None,
            };

            let turn = match self.stream_turn_with_recovery(provider_request, &request.thread_id, &request.run_id, &config, &mut fallback_state).await {
                Ok(turn) => turn,
                Err(err) => return RunOutcome::Failed { reason: err.to_string() },
            };
            state.record_progress();
            history.push(assistant_message(&turn));

            let mut normal_calls = Vec::new();
            let mut task_complete_call = None;
            let mut ask_user_call = None;
            for call in &turn.tool_calls {
                match call.name.as_str() {
                    "task_complete" => task_complete_call = Some(call.clone()),
                    "ask_user" => ask_user_call = Some(call.clone()),
                    _ => normal_calls.push(call.clone()),
                }
            }

            let mut tool_ctx = ToolContext::new(request.thread_id.clone(), request.run_id.clone(), request.workspace_root.clone(), capability.clone());
            tool_ctx.current_todos = todos.clone();
            tool_ctx.cancellation = state.cancellation.clone();

            let mut tool_successes = 0u32;
            let mut tool_failures = 0u32;
            let mut last_failure: Option<LastFailure> = None;
            let mut executed = Vec::new();

            for call in &normal_calls {
                let result = self.execute_one_tool(call, &capability, &mut tool_ctx, &config).await;
                self.publish_tool_call_completed(&request.thread_id, &request.run_id, call, &result);
                if result.is_error() {
                    tool_failures += 1;
                    if let Some(signature) = result.failure_signature(&args_digest(&call.arguments)) {
                        let code = result.error.as_ref().map(|e| e.code).unwrap_or(ToolErrorCode::Internal);
                        last_failure = Some(LastFailure { tool_name: call.name.clone(), code, signature });
                    }
                } else {
                    tool_successes += 1;
                }
                executed.push((call.clone(), result));
            }
            if let Some(message) = tool_results_message(&executed) {
                history.push(message);
            }

            if tool_ctx.current_todos.version != todos.version {
                if let Err(source) = self.todo_store.save(&request.thread_id, &tool_ctx.current_todos).await {
                    return RunOutcome::Failed {
                        reason: ExecutorError::TodoVersionConflict { run_id: request.run_id.clone(), source }.to_string(),
                    };
                }
            }
            todos = tool_ctx.current_todos;

            let attempt = AttemptSummary {
                tool_calls: normal_calls.len() as u32,
                tool_successes,
                tool_failures,
                assistant_text: turn.text.clone(),
                unfulfilled_commitment_preamble: normal_calls.is_empty()
                    && task_complete_call.is_none()
                    && ask_user_call.is_none()
                    && looks_like_commitment(&turn.text),
                tool_required_by_user_text: text_implies_tool_use(&request.user_text),
                last_failure,
            };

            match decide_turn_recovery(&attempt, &mut state.recovery, true) {
                TurnRecoveryVerdict::Fail { message } => return RunOutcome::Failed { reason: message },
                TurnRecoveryVerdict::Continue { prompt_directive, .. } => {
                    history.push(directive_message(prompt_directive));
                    continue;
                }
                TurnRecoveryVerdict::Pass => {}
            }

            let digest_inputs = TurnDigestInputs {
                tool_calls: attempt.tool_calls,
                successes: tool_successes,
                failures: tool_failures,
                text_fingerprint: turn.text.trim(),
            };
            if let LoopGuardVerdict::Fail { reason } = state.loop_guard.record_turn(&digest_inputs, config.max_no_tool_rounds) {
                return RunOutcome::Failed { reason: reason.as_str().to_string() };
            }
            if let Some(failure) = &attempt.last_failure {
                if let LoopGuardVerdict::Fail { reason } = state.loop_guard.record_tool_signature(&failure.signature, config.max_repeated_failures) {
                    return RunOutcome::Failed { reason: reason.as_str().to_string() };
                }
            }

            if let Some(ask_user_call) = &ask_user_call {
                match parse_ask_user_signal(ask_user_call) {
                    Ok(signal) if capability.allows_ask_user() => {
                        let verdict = self.ask_user_policy.evaluate(&signal).await;
                        if verdict.allow {
                            let closeout = close_out_todos_for_waiting_user(self.todo_store.as_ref(), &request.thread_id, &signal).await;
                            self.publish_lifecycle_event(
                                &request.thread_id,
                                &request.run_id,
                                RealtimeEventType::TodosCloseoutWaitingUser,
                                serde_json::json!({
                                    "before_open": closeout.before_open,
                                    "after_open": closeout.after_open,
                                    "cancelled": closeout.cancelled,
                                    "retries": closeout.retries,
                                    "updated": closeout.before_open > 0,
                                }),
                            );
                            return match self.finalize_assistant_message(&request, signal.question.clone()).await {
                                Ok(message_id) => RunOutcome::WaitingUser {
                                    message_id,
                                    prompt_id: ask_user_call.id.clone(),
                                    question: signal.question,
                                },
                                Err(err) => RunOutcome::Failed { reason: err.to_string() },
                            };
                        }
                        history.push(directive_message(format!(
                            "Your request to ask the user was declined ({}); keep working with the tools available.",
                            verdict.reason
                        )));
                        continue;
                    }
                    Ok(_) => {
                        history.push(directive_message(
                            "ask_user is not available for this run; keep working with the tools available.",
                        ));
                        continue;
                    }
                    Err(message) => {
                        history.push(directive_message(message));
                        continue;
                    }
                }
            }

            if task_complete_call.is_none() && state.synthesis_step_available && needs_followup_hint(normal_calls.len(), &turn.text) {
                state.synthesis_step_available = false;
                suppress_tools_this_step = true;
                history.push(directive_message(SYNTHESIS_DIRECTIVE));
                continue;
            }

            let explicit_completion_signal = task_complete_call.is_some();
            let gate_inputs = CompletionGateInputs {
                mode: config.mode,
                intent: classifier_result.intent,
                complexity: classifier_result.complexity,
                todo_policy: classifier_result.todo_policy,
                todos: &todos,
                assistant_text: &turn.text,
                explicit_completion_signal,
            };
            match evaluate_task_completion_gate(&gate_inputs) {
                Ok(()) => {
                    return match self.finalize_assistant_message(&request, turn.text.clone()).await {
                        Ok(message_id) => RunOutcome::Success { message_id, summary: turn.text },
                        Err(err) => RunOutcome::Failed { reason: err.to_string() },
                    };
                }
                Err(rejection) => {
                    state.completion_attempts += 1;
                    history.push(directive_message(format!("You cannot finish yet: {}.", rejection.as_str())));
                }
            }
        }

        RunOutcome::Failed {
            reason: "max_steps reached without the run reaching a terminal state".to_string(),
        }
    }

    async fn execute_one_tool(&self, call: &ProviderToolCall, capability: &CapabilityContract, ctx: &mut ToolContext, config: &LoopConfig) -> ToolResult {
        let tool = match self.tool_registry.get(&call.name) {
            Ok(tool) => tool,
            Err(err) => return ToolResult::failure(&call.id, &call.name, ToolErrorCode::NotFound, err.to_string()),
        };

        let flags = tool.capability_flags();
        if capability.mode_blocks_mutating(flags, config.enforce_plan_mode_guard) {
            return ToolResult::failure(&call.id, &call.name, ToolErrorCode::PermissionDenied, "mutating tools are blocked in plan mode");
        }

        if flags.requires_approval && !capability.no_user_interaction {
            let approved = self
                .approval_gate
                .request_approval(&ctx.run_id, &call.id, &call.name, config.tool_timeout)
                .await;
            if !approved {
                return ToolResult::failure(&call.id, &call.name, ToolErrorCode::PermissionDenied, "tool call was not approved");
            }
        }

        if let Err(err) = tool.validate(&call.arguments) {
            return ToolResult::failure(&call.id, &call.name, err.code(), err.to_string());
        }

        match tool.execute(&call.id, call.arguments.clone(), ctx).await {
            Ok(result) => result,
            Err(err) => ToolResult::failure(&call.id, &call.name, err.code(), err.to_string()),
        }
    }

    /// One stream attempt, racing every read against `stall_timeout`
    /// independent of the run-level idle watchdog (§10.5): a provider can
    /// go silent mid-turn without the whole run being idle.
    async fn stream_turn(&self, request: ProviderRequest, thread_id: &str, run_id: &str, stall_timeout: Duration) -> Result<TurnResult, ExecutorError> {
        let mut stream = self.provider.stream_turn(request).await.context(ProviderSnafu)?;
        let mut events = Vec::new();
        loop {
            match tokio::time::timeout(stall_timeout, stream.next()).await {
                Ok(Some(event)) => {
                    let event = event.context(ProviderSnafu)?;
                    self.publish_stream_event(thread_id, run_id, &event);
                    events.push(event);
                }
                Ok(None) => break,
                Err(_elapsed) => return StalledSnafu { timeout: stall_timeout }.fail(),
            }
        }
        Ok(TurnResult::fold(&events))
    }

    /// Wraps [`Self::stream_turn`] with stall recovery and model fallback
    /// (§10.5, teacher: `stream_with_tools`/`FallbackState`). `fallback_state`
    /// lives for the whole run, not just one step, so a fallback chosen on
    /// an earlier step's stall stays in effect for the rest of the run.
    async fn stream_turn_with_recovery(
        &self,
        mut request: ProviderRequest,
        thread_id: &str,
        run_id: &str,
        config: &LoopConfig,
        fallback_state: &mut FallbackState,
    ) -> Result<TurnResult, ExecutorError> {
        let retry_budget = config.fallback.max_retries.max(1);
        let mut stall_retries = 0u32;
        loop {
            request.model_id = fallback_state.current_model.clone();
            match self.stream_turn(request.clone(), thread_id, run_id, config.stream_stall_timeout).await {
                Ok(turn) => return Ok(turn),
                Err(ExecutorError::Stalled { timeout }) => {
                    self.publish_lifecycle_event(
                        thread_id,
                        run_id,
                        RealtimeEventType::StreamStallDetected,
                        serde_json::json!({ "timeout_ms": timeout.as_millis() }),
                    );
                    match config.stall_recovery {
                        StallRecovery::Abort => return StalledSnafu { timeout }.fail(),
                        StallRecovery::Retry => {
                            stall_retries += 1;
                            if stall_retries > retry_budget {
                                return StalledSnafu { timeout }.fail();
                            }
                            continue;
                        }
                        StallRecovery::Fallback => {
                            if self.apply_fallback(thread_id, run_id, fallback_state, &config.fallback, format!("stream stalled for {timeout:?}")) {
                                continue;
                            }
                            return StalledSnafu { timeout }.fail();
                        }
                    }
                }
                Err(err @ ExecutorError::Provider { ref source }) if source.is_retryable() => {
                    let reason = err.to_string();
                    if self.apply_fallback(thread_id, run_id, fallback_state, &config.fallback, reason) {
                        continue;
                    }
                    return Err(err);
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Switches `fallback_state` to the next configured model and publishes
    /// `ModelFallbackStarted`, returning whether a switch happened (`false`
    /// once the fallback budget or model list is exhausted).
    fn apply_fallback(&self, thread_id: &str, run_id: &str, fallback_state: &mut FallbackState, config: &FallbackConfig, reason: String) -> bool {
        if !fallback_state.should_fallback(config) {
            return false;
        }
        let Some(next_model) = fallback_state.next_model(config) else {
            return false;
        };
        self.publish_lifecycle_event(
            thread_id,
            run_id,
            RealtimeEventType::ModelFallbackStarted,
            serde_json::json!({ "from": fallback_state.current_model, "to": next_model, "reason": reason }),
        );
        fallback_state.record_fallback(next_model, reason);
        true
    }

    fn publish_lifecycle_event(&self, thread_id: &str, run_id: &str, event_type: RealtimeEventType, payload: serde_json::Value) {
        self.realtime_sink.publish(RealtimeEvent {
            seq: 0,
            thread_id: thread_id.to_string(),
            run_id: Some(run_id.to_string()),
            event_type,
            stream: StreamKind::Lifecycle,
            phase: EventPhase::StateChange,
            priority: EventPriority::Lifecycle,
            payload,
            created_at_ms: now_ms(),
        });
    }

    /// Maps a provider's stream events onto the Realtime Broadcaster's event
    /// types (§4.6). `seq` is left at `0`: the concrete sink is responsible
    /// for assigning the durable row id (non-delta events) or a local
    /// counter (deltas, which are never persisted).
    fn publish_stream_event(&self, thread_id: &str, run_id: &str, event: &ProviderStreamEvent) {
        let (event_type, stream, phase, priority, payload) = match event {
            ProviderStreamEvent::TextDelta { delta } => (
                RealtimeEventType::MessageDelta,
                StreamKind::Assistant,
                EventPhase::StateChange,
                EventPriority::Delta,
                serde_json::json!({ "delta": delta }),
            ),
            ProviderStreamEvent::ToolCallDelta { call_id, delta } => (
                RealtimeEventType::MessageDelta,
                StreamKind::Tool,
                EventPhase::StateChange,
                EventPriority::Delta,
                serde_json::json!({ "call_id": call_id, "delta": delta }),
            ),
            ProviderStreamEvent::ToolCallComplete { call_id, name, arguments } => (
                RealtimeEventType::ToolCallStarted,
                StreamKind::Tool,
                EventPhase::Start,
                EventPriority::Lifecycle,
                serde_json::json!({ "call_id": call_id, "name": name, "arguments": arguments }),
            ),
            ProviderStreamEvent::TurnComplete { usage, stop_reason } => (
                RealtimeEventType::MessageComplete,
                StreamKind::Assistant,
                EventPhase::End,
                EventPriority::Lifecycle,
                serde_json::json!({ "usage": usage, "stop_reason": stop_reason }),
            ),
            ProviderStreamEvent::Error { message, retryable } => (
                RealtimeEventType::MessageComplete,
                StreamKind::Assistant,
                EventPhase::Error,
                EventPriority::Lifecycle,
                serde_json::json!({ "message": message, "retryable": retryable }),
            ),
        };

        self.realtime_sink.publish(RealtimeEvent {
            seq: 0,
            thread_id: thread_id.to_string(),
            run_id: Some(run_id.to_string()),
            event_type,
            stream,
            phase,
            priority,
            payload,
            created_at_ms: now_ms(),
        });
    }

    fn publish_tool_call_completed(&self, thread_id: &str, run_id: &str, call: &ProviderToolCall, result: &ToolResult) {
        self.realtime_sink.publish(RealtimeEvent {
            seq: 0,
            thread_id: thread_id.to_string(),
            run_id: Some(run_id.to_string()),
            event_type: RealtimeEventType::ToolCallCompleted,
            stream: StreamKind::Tool,
            phase: if result.is_error() { EventPhase::Error } else { EventPhase::End },
            priority: EventPriority::Lifecycle,
            payload: serde_json::json!({ "call_id": call.id, "name": call.name, "result": result }),
            created_at_ms: now_ms(),
        });
    }

    async fn finalize_assistant_message(&self, request: &RunRequest, text: String) -> Result<String, ExecutorError> {
        let message_id = format!("{}-final", request.run_id);
        let message = Message {
            row_id: 0,
            message_id: message_id.clone(),
            role: MessageRole::Assistant,
            status: MessageStatus::Final,
            created_at_ms: now_ms(),
            text_content: text,
            blocks: Vec::new(),
        };
        self.transcript_store
            .append_message(&self.endpoint_id, &request.thread_id, message)
            .await
            .context(StoreSnafu)?;
        Ok(message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::stream;
    use runloop_protocol::VersionConflict;
    use runloop_provider_api::ProviderError;
    use runloop_provider_api::ProviderEventStream;
    use runloop_provider_api::ProviderStreamEvent;
    use runloop_provider_api::StopReason;
    use runloop_provider_api::TokenUsage;
    use runloop_tools_api::Tool;
    use runloop_tools_api::ToolError;
    use serde_json::Value;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    /// Emits a fixed text response with no tool calls. Used for the
    /// classifier, the ask-user policy (unused in these scenarios), and
    /// the social/creative responder path.
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

    /// Drives a multi-step task run: the first call emits a tool call to
    /// `echo`, every call after that signals `task_complete`.
    struct ScriptedStepProvider {
        calls: AtomicUsize,
    }

    impl ScriptedStepProvider {
        fn new() -> Self {
            Self { calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl Provider for ScriptedStepProvider {
        fn name(&self) -> &str {
            "scripted-step"
        }

        async fn stream_turn(&self, _request: ProviderRequest) -> Result<ProviderEventStream, ProviderError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let events = if call == 0 {
                vec![
                    Ok(ProviderStreamEvent::TextDelta { delta: "Reading the file now.".to_string() }),
                    Ok(ProviderStreamEvent::ToolCallComplete {
                        call_id: "tc1".to_string(),
                        name: "echo".to_string(),
                        arguments: json!({"text": "hi"}),
                    }),
                    Ok(ProviderStreamEvent::TurnComplete {
                        usage: TokenUsage::default(),
                        stop_reason: StopReason::ToolUse,
                    }),
                ]
            } else {
                vec![
                    Ok(ProviderStreamEvent::TextDelta { delta: "All done.".to_string() }),
                    Ok(ProviderStreamEvent::ToolCallComplete {
                        call_id: "tc2".to_string(),
                        name: "task_complete".to_string(),
                        arguments: json!({"summary": "fixed it"}),
                    }),
                    Ok(ProviderStreamEvent::TurnComplete {
                        usage: TokenUsage::default(),
                        stop_reason: StopReason::ToolUse,
                    }),
                ]
            };
            Ok(stream::iter(events).boxed())
        }
    }

    /// Drives the §4.2.2 synthesis path: a tool call with no text (earns a
    /// suppressed-tools synthesis step), a synthesis step that still
    /// produces no text (so the follow-up hint would fire again were the
    /// budget not spent), a normal tool call once tools return, then
    /// completion. Records whether each call it served was offered any
    /// tools, so the test can assert exactly one suppressed step occurred.
    struct ScriptedSynthesisProvider {
        calls: AtomicUsize,
        tools_offered: std::sync::Mutex<Vec<bool>>,
    }

    impl ScriptedSynthesisProvider {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                tools_offered: std::sync::Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Provider for ScriptedSynthesisProvider {
        fn name(&self) -> &str {
            "scripted-synthesis"
        }

        async fn stream_turn(&self, request: ProviderRequest) -> Result<ProviderEventStream, ProviderError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            self.tools_offered.lock().unwrap().push(!request.tools.is_empty());
            let events = match call {
                0 => vec![
                    Ok(ProviderStreamEvent::ToolCallComplete {
                        call_id: "tc1".to_string(),
                        name: "echo".to_string(),
                        arguments: json!({"text": "hi"}),
                    }),
                    Ok(ProviderStreamEvent::TurnComplete {
                        usage: TokenUsage::default(),
                        stop_reason: StopReason::ToolUse,
                    }),
                ],
                1 => vec![Ok(ProviderStreamEvent::TurnComplete {
                    usage: TokenUsage::default(),
                    stop_reason: StopReason::EndTurn,
                })],
                2 => vec![
                    Ok(ProviderStreamEvent::ToolCallComplete {
                        call_id: "tc2".to_string(),
                        name: "echo".to_string(),
                        arguments: json!({"text": "hi again"}),
                    }),
                    Ok(ProviderStreamEvent::TurnComplete {
                        usage: TokenUsage::default(),
                        stop_reason: StopReason::ToolUse,
                    }),
                ],
                _ => vec![
                    Ok(ProviderStreamEvent::TextDelta { delta: "All fixed.".to_string() }),
                    Ok(ProviderStreamEvent::ToolCallComplete {
                        call_id: "tc3".to_string(),
                        name: "task_complete".to_string(),
                        arguments: json!({"summary": "fixed it"}),
                    }),
                    Ok(ProviderStreamEvent::TurnComplete {
                        usage: TokenUsage::default(),
                        stop_reason: StopReason::ToolUse,
                    }),
                ],
            };
            Ok(stream::iter(events).boxed())
        }
    }

    /// Always calls an unregistered tool with the same arguments, so every
    /// attempt produces the same `NotFound` failure signature.
    struct ScriptedUnknownToolProvider;

    #[async_trait]
    impl Provider for ScriptedUnknownToolProvider {
        fn name(&self) -> &str {
            "scripted-unknown-tool"
        }

        async fn stream_turn(&self, _request: ProviderRequest) -> Result<ProviderEventStream, ProviderError> {
            let events = vec![
                Ok(ProviderStreamEvent::ToolCallComplete {
                    call_id: "tc-missing".to_string(),
                    name: "mystery_tool".to_string(),
                    arguments: json!({"path": "x"}),
                }),
                Ok(ProviderStreamEvent::TurnComplete {
                    usage: TokenUsage::default(),
                    stop_reason: StopReason::ToolUse,
                }),
            ];
            Ok(stream::iter(events).boxed())
        }
    }

    /// Always calls `ask_user` with a signal that requires no evidence.
    struct ScriptedAskUserProvider;

    #[async_trait]
    impl Provider for ScriptedAskUserProvider {
        fn name(&self) -> &str {
            "scripted-ask-user"
        }

        async fn stream_turn(&self, _request: ProviderRequest) -> Result<ProviderEventStream, ProviderError> {
            let events = vec![
                Ok(ProviderStreamEvent::ToolCallComplete {
                    call_id: "tc-ask".to_string(),
                    name: "ask_user".to_string(),
                    arguments: json!({
                        "question": "Which environment should I deploy to?",
                        "reason_code": "user_decision_required",
                    }),
                }),
                Ok(ProviderStreamEvent::TurnComplete {
                    usage: TokenUsage::default(),
                    stop_reason: StopReason::ToolUse,
                }),
            ];
            Ok(stream::iter(events).boxed())
        }
    }

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "echoes the given text back as the tool result"
        }

        fn input_schema(&self) -> Value {
            json!({"type": "object", "properties": {"text": {"type": "string"}}, "required": ["text"]})
        }

        fn capability_flags(&self) -> runloop_protocol::ToolCapabilityFlags {
            runloop_protocol::ToolCapabilityFlags {
                mutating: false,
                requires_approval: false,
                parallel_safe: true,
            }
        }

        async fn execute(&self, tool_id: &str, args: Value, _ctx: &mut ToolContext) -> Result<ToolResult, ToolError> {
            let text = args.get("text").and_then(Value::as_str).unwrap_or_default();
            Ok(ToolResult::success(tool_id, self.name(), text.to_string()))
        }
    }

    struct NullTodoStore;

    #[async_trait]
    impl TodoStore for NullTodoStore {
        async fn load(&self, _thread_id: &str) -> TodoSnapshot {
            TodoSnapshot::default()
        }

        async fn save(&self, _thread_id: &str, _snapshot: &TodoSnapshot) -> Result<(), VersionConflict> {
            Ok(())
        }
    }

    fn task_classifier() -> Arc<Classifier> {
        let provider: Arc<dyn Provider> = Arc::new(ScriptedTextProvider {
            text: r#"{"intent": "task", "complexity": "moderate", "objective_mode": "replace"}"#,
        });
        Arc::new(Classifier::new(provider, "classify-model"))
    }

    fn social_classifier() -> Arc<Classifier> {
        let provider: Arc<dyn Provider> = Arc::new(ScriptedTextProvider {
            text: r#"{"intent": "social", "complexity": "trivial", "objective_mode": "replace"}"#,
        });
        Arc::new(Classifier::new(provider, "classify-model"))
    }

    fn reject_ask_user_policy() -> Arc<AskUserPolicy> {
        let provider: Arc<dyn Provider> = Arc::new(ScriptedTextProvider {
            text: r#"{"allow": false, "reason": "unused in this scenario", "confidence": 1.0}"#,
        });
        Arc::new(AskUserPolicy::new(provider, "ask-model"))
    }

    fn allow_ask_user_policy() -> Arc<AskUserPolicy> {
        let provider: Arc<dyn Provider> = Arc::new(ScriptedTextProvider {
            text: r#"{"allow": true, "reason": "genuine external blocker", "confidence": 0.9}"#,
        });
        Arc::new(AskUserPolicy::new(provider, "ask-model"))
    }

    fn builder_with(provider: Arc<dyn Provider>, classifier: Arc<Classifier>, ask_user_policy: Arc<AskUserPolicy>, checkpoints_root: &std::path::Path) -> RunExecutorBuilder {
        let tool_registry = Arc::new(ToolRegistry::new());
        tool_registry.register(Arc::new(EchoTool));

        RunExecutorBuilder::new()
            .provider(provider)
            .model_id("main-model")
            .tool_registry(tool_registry)
            .classifier(classifier)
            .ask_user_policy(ask_user_policy)
            .todo_store(Arc::new(NullTodoStore))
            .transcript_store(Arc::new(runloop_store::InMemoryStore::default()))
            .checkpointer(Arc::new(WorkspaceCheckpointer::new(checkpoints_root)))
            .endpoint_id("ep1")
    }

    fn request(workspace_root: PathBuf) -> RunRequest {
        RunRequest {
            run_id: "run-1".to_string(),
            thread_id: "thread-1".to_string(),
            message_id: "msg-1".to_string(),
            user_text: "please take care of the remaining work".to_string(),
            attachments_present: false,
            history: Vec::new(),
            open_goal: None,
            workspace_root,
            cancellation: CancellationToken::new(),
            config_override: None,
        }
    }

    #[tokio::test]
    async fn completes_after_a_tool_call_and_task_complete_signal() {
        let workdir = tempfile::tempdir().unwrap();
        let checkpoints = tempfile::tempdir().unwrap();
        let executor = builder_with(Arc::new(ScriptedStepProvider::new()), task_classifier(), reject_ask_user_policy(), checkpoints.path()).build();

        let outcome = executor.run(request(workdir.path().to_path_buf())).await;
        match outcome {
            RunOutcome::Success { summary, .. } => assert_eq!(summary, "All done."),
            other => panic!("expected Success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn social_intent_routes_through_responder_path_without_tool_use() {
        let workdir = tempfile::tempdir().unwrap();
        let checkpoints = tempfile::tempdir().unwrap();
        let provider: Arc<dyn Provider> = Arc::new(ScriptedTextProvider { text: "Hello! How can I help today?" });
        let executor = builder_with(provider, social_classifier(), reject_ask_user_policy(), checkpoints.path()).build();

        let outcome = executor.run(request(workdir.path().to_path_buf())).await;
        match outcome {
            RunOutcome::Success { summary, .. } => assert_eq!(summary, "Hello! How can I help today?"),
            other => panic!("expected Success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn tool_calls_with_no_text_earn_one_suppressed_tools_synthesis_step() {
        let workdir = tempfile::tempdir().unwrap();
        let checkpoints = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedSynthesisProvider::new());
        let executor = builder_with(Arc::clone(&provider) as Arc<dyn Provider>, task_classifier(), reject_ask_user_policy(), checkpoints.path()).build();

        let outcome = executor.run(request(workdir.path().to_path_buf())).await;
        match outcome {
            RunOutcome::Success { summary, .. } => assert_eq!(summary, "All fixed."),
            other => panic!("expected Success, got {other:?}"),
        }
        // Only the second call (the synthesis step after a no-text tool
        // call) should have had its tools suppressed; the budget is spent
        // after that even though the third call repeats the same pattern.
        assert_eq!(*provider.tools_offered.lock().unwrap(), vec![true, false, true, true]);
    }

    #[tokio::test]
    async fn repeated_unknown_tool_failure_fails_the_run() {
        let workdir = tempfile::tempdir().unwrap();
        let checkpoints = tempfile::tempdir().unwrap();
        let executor = builder_with(Arc::new(ScriptedUnknownToolProvider), task_classifier(), reject_ask_user_policy(), checkpoints.path()).build();

        let outcome = executor.run(request(workdir.path().to_path_buf())).await;
        assert!(matches!(outcome, RunOutcome::Failed { .. }), "expected Failed, got {outcome:?}");
    }

    #[tokio::test]
    async fn allowed_ask_user_signal_ends_the_run_waiting_on_the_user() {
        let workdir = tempfile::tempdir().unwrap();
        let checkpoints = tempfile::tempdir().unwrap();
        let provider: Arc<dyn Provider> = Arc::new(ScriptedAskUserProvider);
        let executor = builder_with(provider, task_classifier(), allow_ask_user_policy(), checkpoints.path()).build();

        let outcome = executor.run(request(workdir.path().to_path_buf())).await;
        match outcome {
            RunOutcome::WaitingUser { question, .. } => assert_eq!(question, "Which environment should I deploy to?"),
            other => panic!("expected WaitingUser, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejected_ask_user_signal_keeps_the_run_going_until_max_steps() {
        let workdir = tempfile::tempdir().unwrap();
        let checkpoints = tempfile::tempdir().unwrap();
        let provider: Arc<dyn Provider> = Arc::new(ScriptedAskUserProvider);
        let mut config = LoopConfig::default();
        config.max_steps = 2;
        let executor = builder_with(provider, task_classifier(), reject_ask_user_policy(), checkpoints.path())
            .config(config)
            .build();

        let outcome = executor.run(request(workdir.path().to_path_buf())).await;
        assert!(matches!(outcome, RunOutcome::Failed { .. }), "expected Failed after exhausting max_steps, got {outcome:?}");
    }

    #[tokio::test]
    async fn per_run_config_override_takes_precedence_over_the_builder_default() {
        let workdir = tempfile::tempdir().unwrap();
        let checkpoints = tempfile::tempdir().unwrap();
        let provider: Arc<dyn Provider> = Arc::new(ScriptedAskUserProvider);
        // Builder default allows plenty of steps; the per-run override below
        // should be what actually governs this run.
        let executor = builder_with(provider, task_classifier(), reject_ask_user_policy(), checkpoints.path()).build();

        let mut override_config = LoopConfig::default();
        override_config.max_steps = 1;
        let mut req = request(workdir.path().to_path_buf());
        req.config_override = Some(override_config);

        let outcome = executor.run(req).await;
        assert!(matches!(outcome, RunOutcome::Failed { .. }), "expected Failed after a single overridden step, got {outcome:?}");
    }

    #[derive(Default)]
    struct RecordingSink {
        events: std::sync::Mutex<Vec<RealtimeEvent>>,
    }

    impl RealtimeSink for RecordingSink {
        fn publish(&self, event: RealtimeEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    /// Blocks forever on `main-model` (simulating a provider gone silent
    /// mid-stream), but answers immediately once the executor has fallen
    /// back to any other model.
    struct StallsOnPrimaryModelProvider;

    #[async_trait]
    impl Provider for StallsOnPrimaryModelProvider {
        fn name(&self) -> &str {
            "stalls-on-primary"
        }

        async fn stream_turn(&self, request: ProviderRequest) -> Result<ProviderEventStream, ProviderError> {
            if request.model_id == "main-model" {
                return Ok(stream::pending().boxed());
            }
            let events = vec![
                Ok(ProviderStreamEvent::TextDelta { delta: "recovered".to_string() }),
                Ok(ProviderStreamEvent::ToolCallComplete {
                    call_id: "tc1".to_string(),
                    name: "task_complete".to_string(),
                    arguments: json!({"summary": "recovered via fallback"}),
                }),
                Ok(ProviderStreamEvent::TurnComplete {
                    usage: TokenUsage::default(),
                    stop_reason: StopReason::ToolUse,
                }),
            ];
            Ok(stream::iter(events).boxed())
        }
    }

    #[tokio::test]
    async fn stall_recovery_falls_back_to_the_next_configured_model() {
        let workdir = tempfile::tempdir().unwrap();
        let checkpoints = tempfile::tempdir().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let mut config = LoopConfig::default();
        config.stream_stall_timeout = Duration::from_millis(20);
        config.stall_recovery = StallRecovery::Fallback;
        config.fallback = FallbackConfig {
            enabled: true,
            fallback_models: vec!["backup-model".to_string()],
            max_retries: 1,
        };
        let executor = builder_with(Arc::new(StallsOnPrimaryModelProvider), task_classifier(), reject_ask_user_policy(), checkpoints.path())
            .config(config)
            .realtime_sink(sink.clone())
            .build();

        let outcome = executor.run(request(workdir.path().to_path_buf())).await;
        match outcome {
            RunOutcome::Success { summary, .. } => assert_eq!(summary, "recovered via fallback"),
            other => panic!("expected Success after falling back, got {other:?}"),
        }

        let events = sink.events.lock().unwrap();
        assert!(events.iter().any(|e| e.event_type == RealtimeEventType::StreamStallDetected));
        assert!(events.iter().any(|e| e.event_type == RealtimeEventType::ModelFallbackStarted));
    }

    #[tokio::test]
    async fn stall_recovery_abort_fails_the_run_without_a_fallback_model() {
        let workdir = tempfile::tempdir().unwrap();
        let checkpoints = tempfile::tempdir().unwrap();
        let mut config = LoopConfig::default();
        config.stream_stall_timeout = Duration::from_millis(20);
        config.stall_recovery = StallRecovery::Abort;
        let executor = builder_with(Arc::new(StallsOnPrimaryModelProvider), task_classifier(), reject_ask_user_policy(), checkpoints.path())
            .config(config)
            .build();

        let outcome = executor.run(request(workdir.path().to_path_buf())).await;
        assert!(matches!(outcome, RunOutcome::Failed { .. }), "expected Failed on stall with Abort recovery, got {outcome:?}");
    }
}
