//! `runloop-app-server`: the RPC/Subscription Surface (C11) binary. Loads
//! configuration, resolves the default provider/model, and serves the
//! WebSocket surface described in §6.

mod app;
mod broadcaster;
mod connection;
mod executor_factory;
mod handlers;

use crate::app::AppState;
use crate::app::router;
use crate::broadcaster::Broadcaster;
use crate::executor_factory::RuntimeExecutorFactory;
use clap::Parser;
use runloop_config::find_runloop_home;
use runloop_config::load_runtime_config;
use runloop_config::resolve_default_model;
use runloop_session::ThreadActorRegistry;
use runloop_store::InMemoryStore;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "runloop-app-server")]
#[command(about = "WebSocket RPC surface for the run orchestrator")]
struct Cli {
    /// Address to bind the WebSocket server to, overriding `config.toml`'s
    /// `bind_addr` (default "127.0.0.1:4180").
    #[arg(long)]
    bind: Option<String>,
}

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:4180";
/// Single endpoint this deployment serves. Multi-endpoint/multi-tenant
/// hosting is out of scope (§ Non-goals); a future revision would derive
/// this per-connection from an auth layer instead.
const ENDPOINT_ID: &str = "local";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))).init();

    let cli = Cli::parse();
    let config = load_runtime_config()?;
    let resolved = resolve_default_model(&config)?;

    let providers = runloop_providers::build_registry(&config.providers)?;
    let provider = providers.get(&resolved.provider.id)?;
    let tool_registry = Arc::new(runloop_tools::default_registry());

    let home = find_runloop_home();
    let checkpoints_root = home.join("checkpoints");
    let workspace_root = home.join("workspaces");

    let store = Arc::new(InMemoryStore::default()) as Arc<dyn runloop_store::TranscriptStore>;
    let broadcaster = Broadcaster::new(Arc::clone(&store));
    let executor_factory = Arc::new(RuntimeExecutorFactory::new(
        provider,
        resolved.model.id.clone(),
        tool_registry,
        Arc::clone(&store),
        checkpoints_root,
        config.loop_config.clone(),
        Arc::clone(&broadcaster),
    ));
    let registry = Arc::new(ThreadActorRegistry::new(Arc::clone(&store), executor_factory.clone()));

    let state = Arc::new(AppState {
        registry,
        executor_factory,
        broadcaster,
        transcript_store: store,
        endpoint_id: ENDPOINT_ID.to_string(),
        workspace_root,
    });

    let bind_addr = cli.bind.or(config.bind_addr).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
    serve(bind_addr, state).await
}

async fn serve(bind_addr: String, state: Arc<AppState>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(bind_addr, "runloop-app-server listening");
    axum::serve(listener, router(state)).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
