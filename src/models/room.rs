use serde::{Deserialize, Serialize};

/// The two kinds of conversation a message can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomKind {
    Friend,
    Group,
}

impl RoomKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomKind::Friend => "friend",
            RoomKind::Group => "group",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "friend" => Some(RoomKind::Friend),
            "group" => Some(RoomKind::Group),
            _ => None,
        }
    }
}

/// Identity of a conversation channel. Two sessions are in the same room
/// iff their keys are equal. For group rooms `id` is the group id; for
/// friend rooms it is the friendship record id, which is the same for both
/// parties of the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomKey {
    #[serde(rename = "type")]
    pub kind: RoomKind,
    pub id: i64,
}

impl RoomKey {
    pub fn friend(id: i64) -> Self {
        Self {
            kind: RoomKind::Friend,
            id,
        }
    }

    pub fn group(id: i64) -> Self {
        Self {
            kind: RoomKind::Group,
            id,
        }
    }
}

impl std::fmt::Display for RoomKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.id)
    }
}
