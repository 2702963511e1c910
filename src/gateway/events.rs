use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::message::{Message, MessageKind};
use crate::models::room::{RoomKey, RoomKind};

/// Close codes sent when the server terminates a connection.
pub mod close_code {
    pub const NORMAL: u16 = 1000;
    pub const AUTH_FAILED: u16 = 4004;
    pub const AUTH_TIMEOUT: u16 = 4008;
    pub const HEARTBEAT_TIMEOUT: u16 = 4009;
}

/// Frames a client may send. Unknown `type` values fail to parse and are
/// answered with a validation error.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientFrame {
    Auth { token: String },
    JoinRoom(RoomKey),
    LeaveRoom(RoomKey),
    SendMessage(SendMessagePayload),
    Heartbeat,
}

fn default_message_kind() -> MessageKind {
    MessageKind::Text
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendMessagePayload {
    pub sender_id: i64,
    pub receiver_type: RoomKind,
    pub receiver_id: i64,
    pub content: String,
    #[serde(default = "default_message_kind")]
    pub message_type: MessageKind,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_size: Option<i64>,
}

impl SendMessagePayload {
    pub fn room(&self) -> RoomKey {
        RoomKey {
            kind: self.receiver_type,
            id: self.receiver_id,
        }
    }
}

/// Frames the server sends.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerFrame {
    AuthOk { user_id: i64, session_id: Uuid },
    NewMessage(Message),
    HeartbeatAck,
    Error { code: &'static str, message: String },
}
