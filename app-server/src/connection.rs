//! WebSocket connection lifecycle (C11, §4.6/§6).
//!
//! One socket carries both RPC request/response traffic and realtime
//! event fan-out, so the socket is split: the recv loop owns the read
//! half and dispatches requests, while a single writer task owns the
//! write half and drains one outbound queue fed by both the RPC-response
//! path and the broadcaster's per-subscriber drain task (see
//! `broadcaster::drain`). This avoids interleaving writes from two
//! independent tasks onto the same `WebSocket` sink, which axum's
//! `SplitSink` does not allow.

use crate::app::AppState;
use crate::handlers::dispatch;
use axum::extract::ws::Message;
use axum::extract::ws::WebSocket;
use futures::SinkExt;
use futures::StreamExt;
use runloop_app_server_protocol::ClientRequest;
use runloop_app_server_protocol::ErrorResponse;
use runloop_app_server_protocol::ServerResponse;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

pub async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let subscriber_id = Uuid::new_v4().to_string();
    let (sink, mut stream) = socket.split();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<ServerResponse>();

    state.broadcaster.connect(subscriber_id.clone(), state.endpoint_id.clone(), outbound_tx.clone());
    let writer = tokio::spawn(write_loop(sink, outbound_rx));

    while let Some(received) = stream.next().await {
        let message = match received {
            Ok(message) => message,
            Err(err) => {
                warn!(%err, subscriber_id, "websocket read error, closing connection");
                break;
            }
        };
        let text = match message {
            Message::Text(text) => text.to_string(),
            Message::Binary(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Message::Close(_) => break,
            _ => continue,
        };

        let response = match serde_json::from_str::<ClientRequest>(&text) {
            Ok(request) => dispatch(&state, &subscriber_id, request).await,
            Err(err) => ServerResponse::Error(ErrorResponse {
                request_id: None,
                code: 400,
                error: format!("malformed request: {err}"),
            }),
        };
        if outbound_tx.send(response).is_err() {
            break;
        }
    }

    state.broadcaster.disconnect(&subscriber_id);
    drop(outbound_tx);
    let _ = writer.await;
}

async fn write_loop(mut sink: futures::stream::SplitSink<WebSocket, Message>, mut outbound_rx: mpsc::UnboundedReceiver<ServerResponse>) {
    while let Some(response) = outbound_rx.recv().await {
        let json = serde_json::to_string(&response).unwrap_or_else(|_| {
            serde_json::to_string(&ServerResponse::Error(ErrorResponse {
                request_id: None,
                code: 500,
                error: "serialization error".to_string(),
            }))
            .expect("ErrorResponse always serializes")
        });
        if sink.send(Message::Text(json.into())).await.is_err() {
            return;
        }
    }
}
