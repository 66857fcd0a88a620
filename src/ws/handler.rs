//! WebSocket upgrade handler for relay clients

use std::sync::atomic::Ordering;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::util::rate_limit::ClientRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

type WsSink = futures::stream::SplitSink<WebSocket, Message>;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4();
    state
        .relay_stats
        .active_connections
        .fetch_add(1, Ordering::Relaxed);
    info!(connection_id = %connection_id, "Web client connected");

    let (mut ws_sink, ws_stream) = socket.split();

    let welcome = ServerMsg::Welcome {
        connection_id,
        udp_target: state.forwarder.target(),
        server_time: unix_millis(),
    };

    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(connection_id = %connection_id, error = %e, "Failed to send welcome");
    } else {
        run_session(connection_id, &state, ws_sink, ws_stream).await;
    }

    state
        .relay_stats
        .active_connections
        .fetch_sub(1, Ordering::Relaxed);
    info!(connection_id = %connection_id, "Web client disconnected");
}

/// What became of one client frame
#[derive(Debug)]
enum MessageOutcome {
    Forwarded,
    /// Counted in `dropped_messages`, nothing to tell the client
    Dropped,
    Ignored,
    /// Counted in `dropped_messages`, the client gets an error
    Rejected(ServerMsg),
    Close,
}

/// Read eye data until the client goes away, forwarding each message
async fn run_session(
    connection_id: Uuid,
    state: &AppState,
    mut ws_sink: WsSink,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
) {
    let rate_limiter = ClientRateLimiter::new();

    while let Some(result) = ws_stream.next().await {
        let msg = match result {
            Ok(msg) => msg,
            Err(e) => {
                error!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
        };

        match process_message(connection_id, state, &rate_limiter, msg).await {
            MessageOutcome::Forwarded | MessageOutcome::Dropped | MessageOutcome::Ignored => {}
            MessageOutcome::Rejected(reply) => {
                if let Err(e) = send_msg(&mut ws_sink, &reply).await {
                    debug!(connection_id = %connection_id, error = %e, "WebSocket send failed");
                    break;
                }
            }
            MessageOutcome::Close => break,
        }
    }
}

/// Handle one client frame: rate limit, parse, forward
async fn process_message(
    connection_id: Uuid,
    state: &AppState,
    rate_limiter: &ClientRateLimiter,
    msg: Message,
) -> MessageOutcome {
    let dropped = || {
        state
            .relay_stats
            .dropped_messages
            .fetch_add(1, Ordering::Relaxed)
    };

    let text = match msg {
        Message::Text(text) => text,
        Message::Binary(_) => {
            warn!(connection_id = %connection_id, "Received binary message, ignoring");
            return MessageOutcome::Ignored;
        }
        Message::Ping(_) | Message::Pong(_) => return MessageOutcome::Ignored,
        Message::Close(_) => {
            info!(connection_id = %connection_id, "Client initiated close");
            return MessageOutcome::Close;
        }
    };

    if !rate_limiter.check_eye_data() {
        dropped();
        debug!(connection_id = %connection_id, "Rate limited eye data");
        return MessageOutcome::Dropped;
    }

    match ClientMsg::parse(&text) {
        Ok(ClientMsg::EyeData(sample)) => match state.forwarder.forward(&sample).await {
            Ok(_) => MessageOutcome::Forwarded,
            Err(e) => {
                dropped();
                warn!(connection_id = %connection_id, error = %e, "UDP send error");
                MessageOutcome::Dropped
            }
        },
        Ok(ClientMsg::Other { event }) => {
            debug!(connection_id = %connection_id, event = %event, "Ignoring event");
            MessageOutcome::Ignored
        }
        Err(e) => {
            dropped();
            warn!(connection_id = %connection_id, error = %e, "Failed to parse client message");
            MessageOutcome::Rejected(ServerMsg::Error {
                code: "invalid_message".to_string(),
                message: e.to_string(),
            })
        }
    }
}

/// Send a message over WebSocket
async fn send_msg(sink: &mut WsSink, msg: &ServerMsg) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
