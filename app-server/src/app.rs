//! Axum app: state and router for the RPC/Subscription Surface (C11).
//!
//! Single route, upgrade-then-hand-off-to-a-dedicated-handler: a
//! connection here serves both RPC request/response and realtime fan-out
//! on one socket, so [`handle_socket`] drives a writer task fed by both
//! paths instead of writing directly from the recv loop.

use crate::broadcaster::Broadcaster;
use crate::connection::handle_socket;
use crate::executor_factory::RuntimeExecutorFactory;
use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::Response;
use axum::routing::get;
use runloop_session::ThreadActorRegistry;
use runloop_store::TranscriptStore;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ThreadActorRegistry>,
    pub executor_factory: Arc<RuntimeExecutorFactory>,
    pub broadcaster: Arc<Broadcaster>,
    pub transcript_store: Arc<dyn TranscriptStore>,
    pub endpoint_id: String,
    /// Root directory under which a freshly-seen thread's working directory
    /// is derived: `workspace_root.join(thread_id)` (no workspace-root
    /// configuration concept exists upstream of this server yet).
    pub workspace_root: PathBuf,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new().route("/", get(ws_handler)).with_state(state)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}
