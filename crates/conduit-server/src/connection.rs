//! Per-connection relay: authorize, spawn, then pump envelopes both ways
//! until either side goes away.

use std::borrow::Cow;
use std::net::SocketAddr;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use conduit_common::{SessionEvent, SessionId};
use conduit_session::SessionHost;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::protocol::{ClientMessage, ServerMessage, Utf8Stream};
use crate::routes::{AppState, ConnectParams};

/// Longest input fragment written to logs.
const LOG_PREVIEW_CHARS: usize = 80;

/// Handle a single upgraded WebSocket.
pub async fn handle_socket(
    mut socket: WebSocket,
    state: AppState,
    params: ConnectParams,
    peer: Option<SocketAddr>,
) {
    let peer = peer.map(|addr| addr.to_string()).unwrap_or_default();

    // 1. Gate: token, then directory.
    if let Err(e) = state.gate.authorize(params.token.as_deref()).await {
        warn!(%peer, "Refusing connection: {e}");
        close(&mut socket, e.close_code(), e.to_string()).await;
        return;
    }
    let cwd = match state.gate.resolve_directory(params.dir.as_deref()) {
        Ok(cwd) => cwd,
        Err(e) => {
            warn!(%peer, "Refusing connection: {e}");
            close(&mut socket, e.close_code(), e.to_string()).await;
            return;
        }
    };

    // 2. One session per connection.
    let id = SessionId::new();
    let (tx, mut events) = mpsc::unbounded_channel();
    state.host.attach(&id, tx).await;

    if let Err(e) = state.host.spawn(&id, Some(cwd.clone())).await {
        let message = ServerMessage::Error {
            data: e.to_string(),
        };
        let _ = socket.send(Message::Text(message.to_json())).await;
        let _ = socket.send(Message::Close(None)).await;
        state.host.remove(&id).await;
        return;
    }

    info!(session = %id, %peer, cwd = %cwd.display(), "Client connected");

    // 3. Relay until the socket closes or the session is torn down.
    let (mut sink, mut stream) = socket.split();
    let mut decoder = Utf8Stream::new();

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    debug!(session = %id, "Session torn down");
                    break;
                };
                if !forward_event(&mut sink, &mut decoder, event).await {
                    break;
                }
            }

            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        apply_client_message(&state.host, &id, &text).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(session = %id, "WebSocket error: {e}");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    // 4. Connection gone: the process goes with it.
    state.host.remove(&id).await;
    info!(session = %id, %peer, "Client disconnected");
}

/// Send one session event as an envelope. Returns `false` once the socket
/// is unusable.
async fn forward_event(
    sink: &mut SplitSink<WebSocket, Message>,
    decoder: &mut Utf8Stream,
    event: SessionEvent,
) -> bool {
    let messages = match event {
        SessionEvent::Data { bytes, .. } => {
            let data = decoder.decode(&bytes);
            if data.is_empty() {
                return true;
            }
            vec![ServerMessage::Data { data }]
        }
        SessionEvent::Exited { exit, .. } => {
            let mut messages = Vec::with_capacity(2);
            let tail = decoder.flush();
            if !tail.is_empty() {
                messages.push(ServerMessage::Data { data: tail });
            }
            messages.push(ServerMessage::Exit {
                exit_code: exit.exit_code,
                signal: exit.signal,
            });
            messages
        }
        SessionEvent::Error { message, .. } => vec![ServerMessage::Error { data: message }],
    };

    for message in messages {
        if sink.send(Message::Text(message.to_json())).await.is_err() {
            return false;
        }
    }
    true
}

/// Apply one inbound envelope. Malformed envelopes are logged and dropped.
async fn apply_client_message(host: &SessionHost, id: &SessionId, text: &str) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Input { data }) => {
            debug!(session = %id, input = %preview(&data), "Input");
            host.write(id, data.as_bytes()).await;
        }
        Ok(ClientMessage::Submit { data }) => {
            host.submit_text(id, data);
        }
        Ok(ClientMessage::Resize { cols, rows }) => {
            debug!(session = %id, cols, rows, "Resize");
            host.resize(id, cols, rows).await;
        }
        Err(e) => {
            warn!(session = %id, "Dropping malformed message: {e}");
        }
    }
}

async fn close(socket: &mut WebSocket, code: u16, reason: String) {
    let frame = CloseFrame {
        code,
        reason: Cow::Owned(reason),
    };
    let _ = socket.send(Message::Close(Some(frame))).await;
}

/// Escaped and truncated, so control bytes stay readable in logs.
fn preview(text: &str) -> String {
    format!("{text:?}").chars().take(LOG_PREVIEW_CHARS).collect()
}
