//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::app::AppState;
use crate::relay::{ConnectionGuard, ConnectionId, Outbound, Peer};
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::ws::protocol::{ClientMsg, ProtocolError, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id = ConnectionId::new();
    info!(conn_id = %conn_id, "New WebSocket connection");

    let (ws_sink, ws_stream) = socket.split();
    let (out_tx, out_rx) = mpsc::channel(state.config.outbound_queue.max(1));

    // Dropped at the end of this function, which posts the disconnect
    let guard = state.relay.connect(Peer::new(conn_id, out_tx)).await;

    let mut writer_handle = tokio::spawn(write_loop(conn_id, ws_sink, out_rx));
    let limiter = ConnectionRateLimiter::new(state.config.input_rate_limit);

    tokio::select! {
        _ = read_loop(&guard, ws_stream, &limiter) => {}
        _ = &mut writer_handle => {
            debug!(conn_id = %conn_id, "Writer finished, closing connection");
        }
    }

    writer_handle.abort();
    drop(guard);

    info!(conn_id = %conn_id, "WebSocket connection closed");
}

/// Reader loop: WebSocket -> relay
async fn read_loop(
    guard: &ConnectionGuard,
    mut ws_stream: SplitStream<WebSocket>,
    limiter: &ConnectionRateLimiter,
) {
    let conn_id = guard.conn_id();

    while let Some(result) = ws_stream.next().await {
        let text = match result {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(_)) => {
                let e = ProtocolError::UnsupportedFrame("binary");
                warn!(conn_id = %conn_id, error = %e, "Ignoring frame");
                continue;
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(Message::Close(_)) => {
                info!(conn_id = %conn_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(conn_id = %conn_id, error = %e, "WebSocket error");
                break;
            }
        };

        if !limiter.check_input() {
            warn!(conn_id = %conn_id, "Rate limited inbound message");
            continue;
        }

        match ClientMsg::decode(&text) {
            Ok(msg) => {
                if !guard.submit(msg).await {
                    debug!(conn_id = %conn_id, "Relay channel closed");
                    break;
                }
            }
            Err(e) => {
                warn!(conn_id = %conn_id, error = %e, "Failed to parse client message");
            }
        }
    }
}

/// Writer loop: relay -> WebSocket
async fn write_loop(
    conn_id: ConnectionId,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut out_rx: mpsc::Receiver<Outbound>,
) {
    while let Some(outbound) = out_rx.recv().await {
        match outbound {
            Outbound::Message(msg) => {
                if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                    debug!(conn_id = %conn_id, error = %e, "WebSocket send failed");
                    break;
                }
            }
            Outbound::Close => {
                let _ = ws_sink.send(Message::Close(None)).await;
                break;
            }
        }
    }
}

/// Send a message over WebSocket
async fn send_msg(sink: &mut SplitSink<WebSocket, Message>, msg: &ServerMsg) -> Result<(), String> {
    let json = msg.encode().map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
