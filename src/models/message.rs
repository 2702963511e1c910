use serde::{Deserialize, Serialize};

use super::room::{RoomKey, RoomKind};

/// Payload classification for a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Image,
    Audio,
    Video,
    File,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Image => "image",
            MessageKind::Audio => "audio",
            MessageKind::Video => "video",
            MessageKind::File => "file",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(MessageKind::Text),
            "image" => Some(MessageKind::Image),
            "audio" => Some(MessageKind::Audio),
            "video" => Some(MessageKind::Video),
            "file" => Some(MessageKind::File),
            _ => None,
        }
    }
}

/// A dispatched chat message. Immutable once created: the dispatcher assigns
/// `id` and `sent_at`, persists the row, and only then fans the message out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub sender_id: i64,
    pub sender_name: String,
    pub receiver_type: RoomKind,
    pub receiver_id: i64,
    pub content: String,
    pub message_type: MessageKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<i64>,
    pub sent_at: String,
}

impl Message {
    pub fn room(&self) -> RoomKey {
        RoomKey {
            kind: self.receiver_type,
            id: self.receiver_id,
        }
    }
}

/// Validated draft handed to the store. Built by the dispatcher from a
/// `send_message` frame after validation and timestamping.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_type: RoomKind,
    pub receiver_id: i64,
    pub content: String,
    pub message_type: MessageKind,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<i64>,
    pub sent_at: String,
}

impl NewMessage {
    pub fn room(&self) -> RoomKey {
        RoomKey {
            kind: self.receiver_type,
            id: self.receiver_id,
        }
    }
}
