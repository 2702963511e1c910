use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::error::GatewayError;
use super::events::ServerFrame;
use super::session::SessionHandle;
use crate::auth::AuthValidator;
use crate::models::room::RoomKey;

/// Tracks every live session on this node. All session mutation goes
/// through these entry points; nothing else touches the table.
pub struct SessionRegistry {
    sessions: DashMap<Uuid, SessionHandle>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Insert an unauthenticated session. Returns false if the id is
    /// already registered.
    pub fn register(&self, handle: SessionHandle) -> bool {
        match self.sessions.entry(handle.session_id) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(v) => {
                v.insert(handle);
                true
            }
        }
    }

    /// Validate the token through the auth collaborator and bind the user
    /// to the session. The token is validated before the entry lock is
    /// taken, so the registry never holds a shard lock across an await.
    pub async fn authenticate(
        &self,
        session_id: Uuid,
        token: &str,
        validator: &dyn AuthValidator,
    ) -> Result<i64, GatewayError> {
        let user_id = validator
            .validate_token(token)
            .await
            .ok_or_else(|| GatewayError::Auth("invalid or expired token".to_string()))?;

        let mut entry = self
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| GatewayError::Auth("unknown session".to_string()))?;
        entry.user_id = Some(user_id);
        Ok(user_id)
    }

    /// Remove a session. Idempotent; returns the handle so the caller can
    /// clean up room subscriptions. Dropping the handle closes the
    /// session's outbound channel.
    pub fn unregister(&self, session_id: Uuid) -> Option<SessionHandle> {
        self.sessions.remove(&session_id).map(|(_, handle)| handle)
    }

    pub fn contains(&self, session_id: Uuid) -> bool {
        self.sessions.contains_key(&session_id)
    }

    pub fn user_of(&self, session_id: Uuid) -> Option<i64> {
        self.sessions.get(&session_id).and_then(|s| s.user_id)
    }

    /// Transient sender clone for fan-out. None once the session is gone.
    pub fn sender(&self, session_id: Uuid) -> Option<mpsc::Sender<ServerFrame>> {
        self.sessions.get(&session_id).map(|s| s.tx.clone())
    }

    /// Record a room on the session. Fails for unknown or unauthenticated
    /// sessions. Used only by the room router.
    pub(crate) fn add_room(&self, session_id: Uuid, room: RoomKey) -> Result<(), GatewayError> {
        let mut entry = self.sessions.get_mut(&session_id).ok_or_else(|| {
            GatewayError::Permission("session is not registered".to_string())
        })?;
        if !entry.is_authenticated() {
            return Err(GatewayError::Permission(
                "session is not authenticated".to_string(),
            ));
        }
        entry.joined_rooms.insert(room);
        Ok(())
    }

    /// Drop a room from the session. Used only by the room router.
    pub(crate) fn remove_room(&self, session_id: Uuid, room: RoomKey) {
        if let Some(mut entry) = self.sessions.get_mut(&session_id) {
            entry.joined_rooms.remove(&room);
        }
    }

    pub fn joined_rooms(&self, session_id: Uuid) -> Vec<RoomKey> {
        self.sessions
            .get(&session_id)
            .map(|s| s.joined_rooms.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Distinct user ids with at least one authenticated session.
    pub fn online_user_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .sessions
            .iter()
            .filter_map(|entry| entry.value().user_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn handle(id: Uuid) -> SessionHandle {
        let (tx, _rx) = mpsc::channel(8);
        SessionHandle::new(id, tx)
    }

    #[test]
    fn test_register_rejects_duplicate_id() {
        let registry = SessionRegistry::new();
        let id = Uuid::new_v4();
        assert!(registry.register(handle(id)));
        assert!(!registry.register(handle(id)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let registry = SessionRegistry::new();
        let id = Uuid::new_v4();
        registry.register(handle(id));
        assert!(registry.unregister(id).is_some());
        assert!(registry.unregister(id).is_none());
    }

    #[test]
    fn test_add_room_requires_authentication() {
        let registry = SessionRegistry::new();
        let id = Uuid::new_v4();
        registry.register(handle(id));
        let err = registry
            .add_room(id, RoomKey::group(1))
            .expect_err("unauthenticated join must fail");
        assert_eq!(err.code(), "permission_error");
    }

    #[test]
    fn test_online_user_ids_dedupes_multiple_sessions() {
        let registry = SessionRegistry::new();
        for _ in 0..2 {
            let id = Uuid::new_v4();
            let mut h = handle(id);
            h.user_id = Some(7);
            registry.register(h);
        }
        assert_eq!(registry.online_user_ids(), vec![7]);
    }

    #[test]
    fn test_unregister_closes_outbound_channel() {
        let registry = SessionRegistry::new();
        let id = Uuid::new_v4();
        let (tx, mut rx) = mpsc::channel::<ServerFrame>(8);
        registry.register(SessionHandle::new(id, tx));
        registry.unregister(id);
        // The registry held the last sender; the channel is now closed.
        assert!(rx.try_recv().is_err());
        assert!(registry.sender(id).is_none());
    }
}
