use std::collections::HashSet;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::events::ServerFrame;
use crate::models::room::RoomKey;

/// Capacity of a session's outbound frame buffer. A recipient that falls
/// this far behind is closed rather than allowed to stall the dispatcher.
pub const OUTBOUND_BUFFER: usize = 256;

/// Per-connection lifecycle. Tracked explicitly by the connection task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Connecting,
    Authenticating,
    Active,
    Closing,
    Closed,
}

/// Server-side state bound to one connection. Owned by the registry; the
/// stored `tx` is the last long-lived sender for the connection's outbound
/// channel, so unregistering a session wakes its task with a closed channel.
#[derive(Debug)]
pub struct SessionHandle {
    pub session_id: Uuid,
    pub user_id: Option<i64>,
    pub joined_rooms: HashSet<RoomKey>,
    pub tx: mpsc::Sender<ServerFrame>,
}

impl SessionHandle {
    pub fn new(session_id: Uuid, tx: mpsc::Sender<ServerFrame>) -> Self {
        Self {
            session_id,
            user_id: None,
            joined_rooms: HashSet::new(),
            tx,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}
