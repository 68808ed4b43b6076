//! RPC dispatch (C11, §6): one async function per [`ClientRequest`] variant,
//! each translating a `runloop-session`/`runloop-store` result into the
//! matching [`ServerResponse`] or an [`ErrorResponse`] carrying the
//! HTTP-style code named in §6's per-operation error column.

use crate::app::AppState;
use runloop_app_server_protocol::ActiveRunSnapshotRequest;
use runloop_app_server_protocol::ActiveRunSnapshotResponse;
use runloop_app_server_protocol::ActiveRunSummary;
use runloop_app_server_protocol::ClientRequest;
use runloop_app_server_protocol::ErrorResponse;
use runloop_app_server_protocol::ListMessagesRequest;
use runloop_app_server_protocol::ListMessagesResponse;
use runloop_app_server_protocol::MessageRow;
use runloop_app_server_protocol::OkResponse;
use runloop_app_server_protocol::RunCancelRequest;
use runloop_app_server_protocol::SendUserTurnRequest;
use runloop_app_server_protocol::SendUserTurnResponse;
use runloop_app_server_protocol::ServerResponse;
use runloop_app_server_protocol::SetToolCollapsedRequest;
use runloop_app_server_protocol::SubscribeSummaryRequest;
use runloop_app_server_protocol::SubscribeSummaryResponse;
use runloop_app_server_protocol::SubscribeThreadRequest;
use runloop_app_server_protocol::SubscribeThreadResponse;
use runloop_app_server_protocol::ToolApprovalRequest;
use runloop_app_server_protocol::clamp_list_messages_limit;
use runloop_protocol::Message;
use runloop_protocol::Thread;
use runloop_session::Attachment;
use runloop_session::SendUserTurnInput;
use runloop_session::SendUserTurnOptions;
use runloop_session::SessionError;
use runloop_session::UserInput;
use runloop_store::StoreError;
use serde_json::Value;

pub async fn dispatch(state: &AppState, subscriber_id: &str, request: ClientRequest) -> ServerResponse {
    match request {
        ClientRequest::SendUserTurn(req) => send_user_turn(state, req).await,
        ClientRequest::RunCancel(req) => run_cancel(state, req).await,
        ClientRequest::ToolApproval(req) => tool_approval(state, req).await,
        ClientRequest::SubscribeSummary(req) => subscribe_summary(state, subscriber_id, req).await,
        ClientRequest::SubscribeThread(req) => subscribe_thread(state, subscriber_id, req).await,
        ClientRequest::ListMessages(req) => list_messages(state, req).await,
        ClientRequest::ActiveRunSnapshot(req) => active_run_snapshot(state, req).await,
        ClientRequest::SetToolCollapsed(req) => set_tool_collapsed(state, req).await,
    }
}

fn new_thread(state: &AppState, thread_id: &str) -> Thread {
    Thread::new(state.endpoint_id.clone(), thread_id.to_string(), state.workspace_root.join(thread_id))
}

fn message_to_json(message: &Message) -> Value {
    serde_json::to_value(message).unwrap_or(Value::Null)
}

fn error(request_id: impl Into<String>, code: u16, message: impl Into<String>) -> ServerResponse {
    ServerResponse::Error(ErrorResponse {
        request_id: Some(request_id.into()),
        code,
        error: message.into(),
    })
}

/// Maps a [`SessionError`] to the HTTP-style code named across §6's
/// per-operation error columns: 400 for caller mistakes, 403 for
/// permission/model-lock, 404 for unknown thread/run/tool-call, 409 for a
/// conflicting concurrent state, 503 for an unconfigured or failing
/// dependency.
fn session_error_code(err: &SessionError) -> u16 {
    match err {
        SessionError::NotConfigured { .. } => 503,
        SessionError::ThreadBusy { .. }
        | SessionError::RunChanged { .. }
        | SessionError::WaitingPromptChanged { .. }
        | SessionError::ModelSwitchRequiresExplicitRestart { .. }
        | SessionError::TodoVersionConflict { .. } => 409,
        SessionError::ModelLockViolation { .. } | SessionError::PermissionDenied { .. } => 403,
        SessionError::InvalidMessageId { .. } | SessionError::IllegalRunTransition { .. } => 400,
        SessionError::UnknownThread { .. }
        | SessionError::UnknownRun { .. }
        | SessionError::NoPendingPrompt { .. }
        | SessionError::UnknownToolCall { .. } => 404,
        SessionError::Store { .. } | SessionError::Checkpoint { .. } => 503,
    }
}

fn store_error_code(err: &StoreError) -> u16 {
    match err {
        StoreError::UnknownThread { .. } | StoreError::UnknownRun { .. } | StoreError::UnknownMessage { .. } => 404,
        StoreError::ThreadBusy { .. } => 409,
        StoreError::CursorOutOfRange { .. } => 400,
    }
}

async fn send_user_turn(state: &AppState, req: SendUserTurnRequest) -> ServerResponse {
    if req.text.trim().is_empty() {
        return error(req.request_id, 400, "text must not be empty");
    }

    let actor = state.registry.get_or_create(new_thread(state, &req.thread_id));
    let input = SendUserTurnInput {
        thread_id: req.thread_id,
        model: req.model,
        input: UserInput {
            text: req.text,
            attachments: req
                .attachment_ids
                .into_iter()
                .map(|attachment_id| Attachment { attachment_id, kind: "ref".to_string() })
                .collect(),
            client_message_id: req.client_message_id,
        },
        options: SendUserTurnOptions {
            max_steps: req.max_steps,
            max_no_tool_rounds: req.max_no_tool_rounds,
            mode: req.mode,
        },
        expected_run_id: req.expected_run_id,
        reply_to_waiting_prompt_id: req.reply_to_waiting_prompt_id,
    };

    match actor.send_user_turn(input).await {
        Ok(result) => ServerResponse::SendUserTurn(SendUserTurnResponse {
            request_id: req.request_id,
            run_id: result.run_id,
            kind: result.kind.to_string(),
            consumed_waiting_prompt_id: result.consumed_waiting_prompt_id,
        }),
        Err(err) => error(req.request_id, session_error_code(&err), err.to_string()),
    }
}

async fn run_cancel(state: &AppState, req: RunCancelRequest) -> ServerResponse {
    let actor = if let Some(thread_id) = &req.thread_id {
        state.registry.get(&state.endpoint_id, thread_id)
    } else if let Some(run_id) = &req.run_id {
        find_actor_by_run_id(state, run_id).await
    } else {
        return error(req.request_id, 400, "run_cancel requires either run_id or thread_id");
    };

    let Some(actor) = actor else {
        return error(req.request_id, 404, "no matching active run or thread");
    };
    actor.cancel_run().await;
    ServerResponse::RunCancel(OkResponse { request_id: req.request_id, ok: true })
}

async fn tool_approval(state: &AppState, req: ToolApprovalRequest) -> ServerResponse {
    let Some(actor) = find_actor_by_run_id(state, &req.run_id).await else {
        return error(req.request_id, 400, "no active run matches run_id");
    };
    let thread = actor.snapshot().await;
    let Some(gate) = state.executor_factory.approval_gate_for(&thread.endpoint_id, &thread.thread_id) else {
        return error(req.request_id, 400, "thread has no pending approval gate");
    };
    let resolved = actor.approve_tool(&req.tool_id, req.approved, &gate).await;
    ServerResponse::ToolApproval(OkResponse { request_id: req.request_id, ok: resolved })
}

async fn subscribe_summary(state: &AppState, subscriber_id: &str, req: SubscribeSummaryRequest) -> ServerResponse {
    state.broadcaster.subscribe_summary(subscriber_id);

    let mut active_runs = Vec::new();
    for actor in state.registry.all() {
        if let Some(run) = actor.active_run_snapshot().await {
            if !run.state.is_terminal() {
                let thread = actor.snapshot().await;
                active_runs.push(ActiveRunSummary { thread_id: thread.thread_id, run_id: run.run_id });
            }
        }
    }
    ServerResponse::SubscribeSummary(SubscribeSummaryResponse { request_id: req.request_id, active_runs })
}

async fn subscribe_thread(state: &AppState, subscriber_id: &str, req: SubscribeThreadRequest) -> ServerResponse {
    let actor = state.registry.get_or_create(new_thread(state, &req.thread_id));
    state.broadcaster.subscribe_thread(subscriber_id, &req.thread_id);
    let run_id = actor.active_run_snapshot().await.map(|run| run.run_id);
    ServerResponse::SubscribeThread(SubscribeThreadResponse { request_id: req.request_id, run_id })
}

async fn list_messages(state: &AppState, req: ListMessagesRequest) -> ServerResponse {
    if state.registry.get(&state.endpoint_id, &req.thread_id).is_none() {
        return error(req.request_id, 404, format!("no such thread {}", req.thread_id));
    }

    let result = if let Some(tail) = req.tail {
        state.transcript_store.list_messages(&state.endpoint_id, &req.thread_id, 0, usize::MAX).await.map(|page| {
            let skip = page.messages.len().saturating_sub(tail);
            let messages = page.messages[skip..].to_vec();
            (messages, page.next_after_row_id, false)
        })
    } else {
        let limit = clamp_list_messages_limit(req.limit);
        let after_row_id = req.after_row_id.unwrap_or(0);
        state
            .transcript_store
            .list_messages(&state.endpoint_id, &req.thread_id, after_row_id, limit)
            .await
            .map(|page| (page.messages, page.next_after_row_id, page.has_more))
    };

    match result {
        Ok((messages, next_after_row_id, has_more)) => ServerResponse::ListMessages(ListMessagesResponse {
            request_id: req.request_id,
            messages: messages.iter().map(|m| MessageRow { row_id: m.row_id, message_json: message_to_json(m) }).collect(),
            next_after_row_id,
            has_more,
        }),
        Err(err) => error(req.request_id, store_error_code(&err), err.to_string()),
    }
}

async fn active_run_snapshot(state: &AppState, req: ActiveRunSnapshotRequest) -> ServerResponse {
    let Some(actor) = state.registry.get(&state.endpoint_id, &req.thread_id) else {
        return error(req.request_id, 404, format!("no such thread {}", req.thread_id));
    };
    let Some(run) = actor.active_run_snapshot().await else {
        return ServerResponse::ActiveRunSnapshot(ActiveRunSnapshotResponse {
            request_id: req.request_id,
            ok: true,
            run_id: None,
            message_json: None,
        });
    };

    let message_json = match state.transcript_store.get_message(&state.endpoint_id, &req.thread_id, &run.message_id).await {
        Ok(message) => Some(message_to_json(&message)),
        Err(_) => None,
    };
    ServerResponse::ActiveRunSnapshot(ActiveRunSnapshotResponse {
        request_id: req.request_id,
        ok: true,
        run_id: Some(run.run_id),
        message_json,
    })
}

async fn set_tool_collapsed(state: &AppState, req: SetToolCollapsedRequest) -> ServerResponse {
    let Some(actor) = state.registry.get(&state.endpoint_id, &req.thread_id) else {
        return error(req.request_id, 404, format!("no such thread {}", req.thread_id));
    };
    match actor.set_tool_collapsed(&req.message_id, &req.tool_id, req.collapsed).await {
        Ok(()) => ServerResponse::SetToolCollapsed(OkResponse { request_id: req.request_id, ok: true }),
        Err(err) => error(req.request_id, session_error_code(&err), err.to_string()),
    }
}

async fn find_actor_by_run_id(state: &AppState, run_id: &str) -> Option<std::sync::Arc<runloop_session::ThreadActor>> {
    for actor in state.registry.all() {
        if let Some(run) = actor.active_run_snapshot().await {
            if run.run_id == run_id {
                return Some(actor);
            }
        }
    }
    None
}
