use std::collections::HashSet;

use dashmap::DashMap;
use uuid::Uuid;

use super::error::GatewayError;
use super::registry::SessionRegistry;
use crate::models::room::RoomKey;

/// Maps each room to the sessions currently subscribed to it. Entries hold
/// session ids only; the registry remains the single owner of session state.
pub struct RoomRouter {
    rooms: DashMap<RoomKey, HashSet<Uuid>>,
}

impl RoomRouter {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
        }
    }

    /// Subscribe a session to a room. Requires an authenticated session;
    /// membership against the external collaborator is checked by the
    /// caller before this point. Joining twice is a no-op.
    pub fn join(
        &self,
        registry: &SessionRegistry,
        session_id: Uuid,
        room: RoomKey,
    ) -> Result<(), GatewayError> {
        registry.add_room(session_id, room)?;
        self.rooms.entry(room).or_default().insert(session_id);

        // A disconnect may have run between the two inserts; undo ours so
        // the subscription table never outlives the session.
        if !registry.contains(session_id) {
            self.forget(session_id, room);
        }
        Ok(())
    }

    /// Unsubscribe a session from a room. No-op if not subscribed.
    pub fn leave(&self, registry: &SessionRegistry, session_id: Uuid, room: RoomKey) {
        registry.remove_room(session_id, room);
        self.forget(session_id, room);
    }

    /// Sessions currently subscribed to the room. Empty is valid.
    pub fn resolve_recipients(&self, room: RoomKey) -> Vec<Uuid> {
        self.rooms
            .get(&room)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Remove the session from every room it had joined. Order between
    /// rooms does not matter.
    pub fn on_disconnect(&self, session_id: Uuid, joined_rooms: &HashSet<RoomKey>) {
        for room in joined_rooms {
            self.forget(session_id, *room);
        }
    }

    fn forget(&self, session_id: Uuid, room: RoomKey) {
        if let Some(mut set) = self.rooms.get_mut(&room) {
            set.remove(&session_id);
            let empty = set.is_empty();
            drop(set);
            if empty {
                self.rooms.remove_if(&room, |_, s| s.is_empty());
            }
        }
    }

    pub fn subscriber_count(&self, room: RoomKey) -> usize {
        self.rooms.get(&room).map(|s| s.len()).unwrap_or(0)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

impl Default for RoomRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::session::SessionHandle;
    use tokio::sync::mpsc;

    fn registered(registry: &SessionRegistry, user_id: i64) -> Uuid {
        let id = Uuid::new_v4();
        let (tx, _rx) = mpsc::channel(8);
        let mut handle = SessionHandle::new(id, tx);
        handle.user_id = Some(user_id);
        assert!(registry.register(handle));
        id
    }

    #[test]
    fn test_join_leave_round_trip() {
        let registry = SessionRegistry::new();
        let router = RoomRouter::new();
        let session = registered(&registry, 1);
        let room = RoomKey::group(42);

        router.join(&registry, session, room).unwrap();
        assert!(router.resolve_recipients(room).contains(&session));
        assert!(registry.joined_rooms(session).contains(&room));

        router.leave(&registry, session, room);
        assert!(router.resolve_recipients(room).is_empty());
        assert!(registry.joined_rooms(session).is_empty());
        assert_eq!(router.room_count(), 0);
    }

    #[test]
    fn test_join_twice_is_noop() {
        let registry = SessionRegistry::new();
        let router = RoomRouter::new();
        let session = registered(&registry, 1);
        let room = RoomKey::friend(9);

        router.join(&registry, session, room).unwrap();
        router.join(&registry, session, room).unwrap();
        assert_eq!(router.subscriber_count(room), 1);
        assert_eq!(registry.joined_rooms(session).len(), 1);
    }

    #[test]
    fn test_leave_unjoined_room_is_noop() {
        let registry = SessionRegistry::new();
        let router = RoomRouter::new();
        let session = registered(&registry, 1);
        router.leave(&registry, session, RoomKey::group(5));
        assert_eq!(router.room_count(), 0);
    }

    #[test]
    fn test_disconnect_removes_session_from_every_room() {
        let registry = SessionRegistry::new();
        let router = RoomRouter::new();
        let session = registered(&registry, 1);
        let other = registered(&registry, 2);
        let rooms = [RoomKey::group(1), RoomKey::group(2), RoomKey::friend(3)];

        for room in rooms {
            router.join(&registry, session, room).unwrap();
        }
        router.join(&registry, other, rooms[0]).unwrap();

        let handle = registry.unregister(session).unwrap();
        router.on_disconnect(session, &handle.joined_rooms);

        for room in rooms {
            assert!(
                !router.resolve_recipients(room).contains(&session),
                "disconnected session must not be resolvable in {room}"
            );
        }
        // Unrelated subscriber is untouched.
        assert!(router.resolve_recipients(rooms[0]).contains(&other));
        assert_eq!(router.room_count(), 1);
    }

    #[test]
    fn test_join_rejected_for_unauthenticated_session() {
        let registry = SessionRegistry::new();
        let router = RoomRouter::new();
        let id = Uuid::new_v4();
        let (tx, _rx) = mpsc::channel(8);
        registry.register(SessionHandle::new(id, tx));

        let err = router
            .join(&registry, id, RoomKey::group(1))
            .expect_err("unauthenticated join must be rejected");
        assert_eq!(err.code(), "permission_error");
        assert_eq!(router.room_count(), 0);
    }

    #[test]
    fn test_join_after_disconnect_leaves_no_subscription() {
        let registry = SessionRegistry::new();
        let router = RoomRouter::new();
        let session = registered(&registry, 1);
        registry.unregister(session);

        let err = router
            .join(&registry, session, RoomKey::group(1))
            .expect_err("join for a gone session must fail");
        assert_eq!(err.code(), "permission_error");
        assert_eq!(router.room_count(), 0);
    }
}
