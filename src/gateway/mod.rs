pub mod dispatcher;
pub mod error;
pub mod events;
pub mod heartbeat;
pub mod reconnect;
pub mod registry;
pub mod router;
pub mod session;

use axum::extract::ws::{CloseFrame, Message as WsMessage, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::models::room::RoomKey;
use crate::state::AppState;
use error::GatewayError;
use events::{close_code, ClientFrame, ServerFrame};
use session::{ConnState, SessionHandle, OUTBOUND_BUFFER};

pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn send_frame(
    sink: &mut SplitSink<WebSocket, WsMessage>,
    frame: &ServerFrame,
) -> Result<(), axum::Error> {
    match serde_json::to_string(frame) {
        Ok(text) => sink.send(WsMessage::Text(text.into())).await,
        Err(_) => Ok(()),
    }
}

fn close_msg(code: u16, reason: &'static str) -> WsMessage {
    WsMessage::Close(Some(CloseFrame {
        code,
        reason: reason.into(),
    }))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_sink, mut ws_stream) = socket.split();

    let session_id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::channel::<ServerFrame>(OUTBOUND_BUFFER);

    let mut conn = ConnState::Connecting;
    tracing::trace!(%session_id, state = ?conn, "transport handshake complete");
    if !state.registry.register(SessionHandle::new(session_id, tx)) {
        return;
    }
    conn = ConnState::Authenticating;
    tracing::trace!(%session_id, state = ?conn, "session registered");

    // ---- Authenticating: only an auth frame moves the session forward ----
    let auth_timeout = tokio::time::sleep(state.timeouts.auth);
    tokio::pin!(auth_timeout);

    let user_id = loop {
        tokio::select! {
            _ = &mut auth_timeout => {
                let _ = ws_sink
                    .send(close_msg(close_code::AUTH_TIMEOUT, "authentication timed out"))
                    .await;
                teardown(&state, session_id);
                return;
            }
            msg = ws_stream.next() => {
                match msg {
                    Some(Ok(WsMessage::Text(text))) => {
                        match serde_json::from_str::<ClientFrame>(&text) {
                            Ok(ClientFrame::Auth { token }) => {
                                match state
                                    .registry
                                    .authenticate(session_id, &token, state.auth.as_ref())
                                    .await
                                {
                                    Ok(user_id) => {
                                        let ack = ServerFrame::AuthOk { user_id, session_id };
                                        if send_frame(&mut ws_sink, &ack).await.is_err() {
                                            teardown(&state, session_id);
                                            return;
                                        }
                                        break user_id;
                                    }
                                    Err(err) => {
                                        let _ = send_frame(&mut ws_sink, &err.to_frame()).await;
                                        let _ = ws_sink
                                            .send(close_msg(
                                                close_code::AUTH_FAILED,
                                                "authentication failed",
                                            ))
                                            .await;
                                        teardown(&state, session_id);
                                        return;
                                    }
                                }
                            }
                            // Anything else is rejected and the session stays
                            // in Authenticating until the timeout fires.
                            Ok(_) => {
                                let err = GatewayError::Permission(
                                    "authenticate before any other frame".to_string(),
                                );
                                if send_frame(&mut ws_sink, &err.to_frame()).await.is_err() {
                                    teardown(&state, session_id);
                                    return;
                                }
                            }
                            Err(e) => {
                                let err =
                                    GatewayError::Validation(format!("malformed frame: {e}"));
                                if send_frame(&mut ws_sink, &err.to_frame()).await.is_err() {
                                    teardown(&state, session_id);
                                    return;
                                }
                            }
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => {
                        teardown(&state, session_id);
                        return;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(_)) => {
                        teardown(&state, session_id);
                        return;
                    }
                }
            }
        }
    };

    conn = ConnState::Active;
    tracing::debug!(%session_id, user_id, state = ?conn, "session active");

    // ---- Active ----
    let mut last_heartbeat = tokio::time::Instant::now();
    let mut heartbeat_sweep = tokio::time::interval(heartbeat::CHECK_INTERVAL);

    loop {
        tokio::select! {
            outbound = rx.recv() => {
                match outbound {
                    Some(frame) => {
                        if send_frame(&mut ws_sink, &frame).await.is_err() {
                            conn = ConnState::Closing;
                            break;
                        }
                    }
                    // The registry dropped our handle: force-closed.
                    None => {
                        conn = ConnState::Closing;
                        break;
                    }
                }
            }
            _ = heartbeat_sweep.tick() => {
                if last_heartbeat.elapsed() > state.timeouts.heartbeat_grace {
                    let _ = ws_sink
                        .send(close_msg(close_code::HEARTBEAT_TIMEOUT, "heartbeat timed out"))
                        .await;
                    conn = ConnState::Closing;
                    break;
                }
            }
            msg = ws_stream.next() => {
                match msg {
                    Some(Ok(WsMessage::Text(text))) => {
                        match serde_json::from_str::<ClientFrame>(&text) {
                            Ok(ClientFrame::Heartbeat) => {
                                last_heartbeat = tokio::time::Instant::now();
                                if send_frame(&mut ws_sink, &ServerFrame::HeartbeatAck)
                                    .await
                                    .is_err()
                                {
                                    conn = ConnState::Closing;
                                    break;
                                }
                            }
                            Ok(ClientFrame::JoinRoom(room)) => {
                                if let Err(err) =
                                    join_room(&state, session_id, user_id, room).await
                                {
                                    if send_frame(&mut ws_sink, &err.to_frame()).await.is_err() {
                                        conn = ConnState::Closing;
                                        break;
                                    }
                                }
                            }
                            Ok(ClientFrame::LeaveRoom(room)) => {
                                state.rooms.leave(&state.registry, session_id, room);
                            }
                            Ok(ClientFrame::SendMessage(payload)) => {
                                // Errors go to this sender only; recipients
                                // see the message through fan-out.
                                if let Err(err) =
                                    state.dispatcher.handle_send(session_id, payload).await
                                {
                                    if send_frame(&mut ws_sink, &err.to_frame()).await.is_err() {
                                        conn = ConnState::Closing;
                                        break;
                                    }
                                }
                            }
                            Ok(ClientFrame::Auth { .. }) => {
                                let err = GatewayError::Validation(
                                    "session is already authenticated".to_string(),
                                );
                                if send_frame(&mut ws_sink, &err.to_frame()).await.is_err() {
                                    conn = ConnState::Closing;
                                    break;
                                }
                            }
                            Err(e) => {
                                let err =
                                    GatewayError::Validation(format!("malformed frame: {e}"));
                                if send_frame(&mut ws_sink, &err.to_frame()).await.is_err() {
                                    conn = ConnState::Closing;
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => {
                        conn = ConnState::Closing;
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(_)) => {
                        conn = ConnState::Closing;
                        break;
                    }
                }
            }
        }
    }

    tracing::debug!(%session_id, user_id, state = ?conn, "connection closing");
    teardown(&state, session_id);
    conn = ConnState::Closed;
    tracing::trace!(%session_id, state = ?conn, "connection closed");
}

/// Membership is verified against the external collaborator before the
/// router mutates any shared structure.
async fn join_room(
    state: &AppState,
    session_id: Uuid,
    user_id: i64,
    room: RoomKey,
) -> Result<(), GatewayError> {
    let allowed = state.membership.is_member(user_id, room).await?;
    if !allowed {
        return Err(GatewayError::Permission(
            "not a member of this room".to_string(),
        ));
    }
    state.rooms.join(&state.registry, session_id, room)
}

/// Remove the session and every room subscription it held. Idempotent;
/// safe to call from any exit path.
fn teardown(state: &AppState, session_id: Uuid) {
    if let Some(handle) = state.registry.unregister(session_id) {
        state.rooms.on_disconnect(session_id, &handle.joined_rooms);
    }
}
