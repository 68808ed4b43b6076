//! Wires a concrete [`ExecutorFactory`] (C4's extension point): every
//! thread in this deployment shares the endpoint's single resolved
//! provider/model (§10.3), but gets its own [`ChannelApprovalGate`] and
//! [`RealtimeSink`] bridging into the [`Broadcaster`].

use crate::broadcaster::BroadcastRealtimeSink;
use crate::broadcaster::Broadcaster;
use runloop_checkpoint::WorkspaceCheckpointer;
use runloop_classifier::Classifier;
use runloop_executor::RealtimeSink;
use runloop_executor::RunExecutor;
use runloop_executor::RunExecutorBuilder;
use runloop_executor::decisions::AskUserPolicy;
use runloop_protocol::LoopConfig;
use runloop_protocol::Thread;
use runloop_provider_api::Provider;
use runloop_session::ExecutorFactory;
use runloop_session::approval::ChannelApprovalGate;
use runloop_session::todo_store::InMemoryTodoStore;
use runloop_store::TranscriptStore;
use runloop_tools_api::ToolRegistry;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

/// Builds one [`RunExecutor`] per thread against the endpoint's configured
/// default model, and remembers each thread's [`ChannelApprovalGate`] so
/// the `tool_approval` RPC handler can resolve a pending approval.
pub struct RuntimeExecutorFactory {
    provider: Arc<dyn Provider>,
    model_id: String,
    tool_registry: Arc<ToolRegistry>,
    transcript_store: Arc<dyn TranscriptStore>,
    checkpoints_root: PathBuf,
    loop_config: LoopConfig,
    broadcaster: Arc<Broadcaster>,
    approval_gates: Mutex<HashMap<(String, String), Arc<ChannelApprovalGate>>>,
}

impl RuntimeExecutorFactory {
    pub fn new(
        provider: Arc<dyn Provider>,
        model_id: impl Into<String>,
        tool_registry: Arc<ToolRegistry>,
        transcript_store: Arc<dyn TranscriptStore>,
        checkpoints_root: PathBuf,
        loop_config: LoopConfig,
        broadcaster: Arc<Broadcaster>,
    ) -> Self {
        Self {
            provider,
            model_id: model_id.into(),
            tool_registry,
            transcript_store,
            checkpoints_root,
            loop_config,
            broadcaster,
            approval_gates: Mutex::new(HashMap::new()),
        }
    }

    /// The approval gate registered for `(endpoint_id, thread_id)`, if that
    /// thread's executor has been built. Used by the `tool_approval` RPC
    /// handler to resolve a pending `ChannelApprovalGate::request_approval`.
    pub fn approval_gate_for(&self, endpoint_id: &str, thread_id: &str) -> Option<Arc<ChannelApprovalGate>> {
        self.approval_gates
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&(endpoint_id.to_string(), thread_id.to_string()))
            .cloned()
    }
}

impl ExecutorFactory for RuntimeExecutorFactory {
    fn build_for(&self, thread: &Thread) -> Arc<RunExecutor> {
        let approval_gate = Arc::new(ChannelApprovalGate::new());
        self.approval_gates
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert((thread.endpoint_id.clone(), thread.thread_id.clone()), Arc::clone(&approval_gate));

        let realtime_sink = Arc::new(BroadcastRealtimeSink::new(Arc::clone(&self.broadcaster), thread.endpoint_id.clone()));

        Arc::new(
            RunExecutorBuilder::new()
                .provider(Arc::clone(&self.provider))
                .model_id(self.model_id.clone())
                .tool_registry(Arc::clone(&self.tool_registry))
                .classifier(Arc::new(Classifier::new(Arc::clone(&self.provider), self.model_id.clone())))
                .ask_user_policy(Arc::new(AskUserPolicy::new(Arc::clone(&self.provider), self.model_id.clone())))
                .todo_store(Arc::new(InMemoryTodoStore::default()))
                .transcript_store(Arc::clone(&self.transcript_store))
                .checkpointer(Arc::new(WorkspaceCheckpointer::new(self.checkpoints_root.clone())))
                .approval_gate(approval_gate)
                .config(self.loop_config.clone())
                .endpoint_id(thread.endpoint_id.clone())
                .realtime_sink(realtime_sink)
                .build(),
        )
    }

    /// The actor publishes `RunStateChanged` (§4.6) through the same
    /// broadcaster its executor's stream/tool-call events go through, so
    /// `subscribe_summary`/`subscribe_thread` clients see lifecycle
    /// transitions pushed in realtime rather than only via polling.
    fn realtime_sink_for(&self, thread: &Thread) -> Arc<dyn RealtimeSink> {
        Arc::new(BroadcastRealtimeSink::new(Arc::clone(&self.broadcaster), thread.endpoint_id.clone()))
    }
}
