use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::error::GatewayError;
use super::events::{SendMessagePayload, ServerFrame};
use super::registry::SessionRegistry;
use super::router::RoomRouter;
use crate::membership::MembershipChecker;
use crate::models::message::{Message, NewMessage};
use crate::models::room::RoomKey;
use crate::snowflake;
use crate::store::MessageStore;

/// Validates, timestamps, persists and fans out messages. Persistence
/// always completes before any recipient sees the message; a store failure
/// is reported to the sender alone and nothing is broadcast.
pub struct Dispatcher {
    registry: Arc<SessionRegistry>,
    rooms: Arc<RoomRouter>,
    store: Arc<dyn MessageStore>,
    membership: Arc<dyn MembershipChecker>,
    // One lock per room: messages for a room are persisted and enqueued
    // under it, which fixes the delivery order every subscriber observes.
    // Unrelated rooms never contend here.
    send_order: DashMap<RoomKey, Arc<Mutex<()>>>,
    persist_timeout: Duration,
}

fn now_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

impl Dispatcher {
    pub fn new(
        registry: Arc<SessionRegistry>,
        rooms: Arc<RoomRouter>,
        store: Arc<dyn MessageStore>,
        membership: Arc<dyn MembershipChecker>,
        persist_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            rooms,
            store,
            membership,
            send_order: DashMap::new(),
            persist_timeout,
        }
    }

    pub async fn handle_send(
        &self,
        session_id: Uuid,
        payload: SendMessagePayload,
    ) -> Result<Message, GatewayError> {
        let user_id = self.registry.user_of(session_id).ok_or_else(|| {
            GatewayError::Permission("session is not authenticated".to_string())
        })?;

        if payload.sender_id != user_id {
            return Err(GatewayError::Validation(
                "sender_id does not match the authenticated user".to_string(),
            ));
        }
        if payload.content.trim().is_empty() {
            return Err(GatewayError::Validation(
                "content must not be empty".to_string(),
            ));
        }

        let room = payload.room();
        let allowed = self.membership.is_member(user_id, room).await?;
        if !allowed {
            return Err(GatewayError::Permission(
                "not a member of the target room".to_string(),
            ));
        }

        let lock = self.send_order.entry(room).or_default().clone();
        let _order = lock.lock().await;

        let draft = NewMessage {
            id: snowflake::generate(),
            sender_id: user_id,
            receiver_type: payload.receiver_type,
            receiver_id: payload.receiver_id,
            content: payload.content,
            message_type: payload.message_type,
            file_url: payload.file_url,
            file_name: payload.file_name,
            file_size: payload.file_size,
            sent_at: now_timestamp(),
        };

        let message =
            match tokio::time::timeout(self.persist_timeout, self.store.save_message(&draft)).await
            {
                Ok(Ok(message)) => message,
                Ok(Err(e)) => {
                    tracing::warn!(room = %room, "message store rejected save: {e:?}");
                    return Err(GatewayError::Dispatch(
                        "failed to persist message".to_string(),
                    ));
                }
                Err(_) => {
                    tracing::warn!(room = %room, "message store timed out");
                    return Err(GatewayError::Dispatch(
                        "message store timed out".to_string(),
                    ));
                }
            };

        self.fan_out(room, &message);
        Ok(message)
    }

    /// Deliver to every current subscriber. Fire-and-forget per recipient:
    /// a full or closed outbound buffer closes that session without
    /// stalling delivery to the rest.
    fn fan_out(&self, room: RoomKey, message: &Message) {
        for session_id in self.rooms.resolve_recipients(room) {
            let Some(tx) = self.registry.sender(session_id) else {
                continue;
            };
            match tx.try_send(ServerFrame::NewMessage(message.clone())) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(%session_id, "outbound buffer overflow, closing session");
                    self.force_close(session_id);
                }
                Err(TrySendError::Closed(_)) => {
                    self.force_close(session_id);
                }
            }
        }
    }

    /// Unregister a session and drop its room subscriptions. Dropping the
    /// handle closes the outbound channel, which wakes the connection task.
    pub fn force_close(&self, session_id: Uuid) {
        if let Some(handle) = self.registry.unregister(session_id) {
            self.rooms.on_disconnect(session_id, &handle.joined_rooms);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::gateway::session::SessionHandle;
    use crate::models::message::MessageKind;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    struct StaticMembership(bool);

    #[async_trait]
    impl MembershipChecker for StaticMembership {
        async fn is_member(&self, _user_id: i64, _room: RoomKey) -> Result<bool, AppError> {
            Ok(self.0)
        }
    }

    struct RecordingStore {
        saved: AtomicUsize,
        fail: bool,
    }

    impl RecordingStore {
        fn new(fail: bool) -> Self {
            Self {
                saved: AtomicUsize::new(0),
                fail,
            }
        }
    }

    #[async_trait]
    impl MessageStore for RecordingStore {
        async fn save_message(&self, draft: &NewMessage) -> Result<Message, AppError> {
            if self.fail {
                return Err(AppError::Internal("store offline".to_string()));
            }
            self.saved.fetch_add(1, Ordering::SeqCst);
            Ok(Message {
                id: draft.id,
                sender_id: draft.sender_id,
                sender_name: "alice".to_string(),
                receiver_type: draft.receiver_type,
                receiver_id: draft.receiver_id,
                content: draft.content.clone(),
                message_type: draft.message_type,
                file_url: draft.file_url.clone(),
                file_name: draft.file_name.clone(),
                file_size: draft.file_size,
                sent_at: draft.sent_at.clone(),
            })
        }

        async fn load_history(
            &self,
            _room: RoomKey,
            _after: Option<i64>,
            _limit: i64,
        ) -> Result<Vec<Message>, AppError> {
            Ok(Vec::new())
        }
    }

    struct Harness {
        registry: Arc<SessionRegistry>,
        rooms: Arc<RoomRouter>,
        store: Arc<RecordingStore>,
        dispatcher: Dispatcher,
    }

    fn harness(store_fails: bool, member: bool) -> Harness {
        let registry = Arc::new(SessionRegistry::new());
        let rooms = Arc::new(RoomRouter::new());
        let store = Arc::new(RecordingStore::new(store_fails));
        let dispatcher = Dispatcher::new(
            registry.clone(),
            rooms.clone(),
            store.clone(),
            Arc::new(StaticMembership(member)),
            Duration::from_secs(1),
        );
        Harness {
            registry,
            rooms,
            store,
            dispatcher,
        }
    }

    fn connect(h: &Harness, user_id: i64, buffer: usize) -> (Uuid, mpsc::Receiver<ServerFrame>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(buffer);
        let mut handle = SessionHandle::new(id, tx);
        handle.user_id = Some(user_id);
        assert!(h.registry.register(handle));
        (id, rx)
    }

    fn send_payload(sender_id: i64, room: RoomKey, content: &str) -> SendMessagePayload {
        SendMessagePayload {
            sender_id,
            receiver_type: room.kind,
            receiver_id: room.id,
            content: content.to_string(),
            message_type: MessageKind::Text,
            file_url: None,
            file_name: None,
            file_size: None,
        }
    }

    fn recv_content(rx: &mut mpsc::Receiver<ServerFrame>) -> String {
        match rx.try_recv().expect("expected a frame") {
            ServerFrame::NewMessage(m) => m.content,
            other => panic!("expected new_message, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_send_to_empty_room_persists_without_fanout() {
        let h = harness(false, true);
        let (sender, mut rx) = connect(&h, 1, 8);
        let room = RoomKey::group(42);

        let msg = h
            .dispatcher
            .handle_send(sender, send_payload(1, room, "hi"))
            .await
            .expect("send to empty room must succeed");

        assert_eq!(msg.content, "hi");
        assert!(!msg.sent_at.is_empty());
        assert_eq!(h.store.saved.load(Ordering::SeqCst), 1);
        // Sender did not join the room, so no echo either.
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_subscribers_receive_in_send_order() {
        let h = harness(false, true);
        let (a, mut rx_a) = connect(&h, 1, 8);
        let (b, mut rx_b) = connect(&h, 2, 8);
        let room = RoomKey::group(42);
        h.rooms.join(&h.registry, a, room).unwrap();
        h.rooms.join(&h.registry, b, room).unwrap();

        h.dispatcher
            .handle_send(a, send_payload(1, room, "first"))
            .await
            .unwrap();
        h.dispatcher
            .handle_send(a, send_payload(1, room, "second"))
            .await
            .unwrap();

        for rx in [&mut rx_a, &mut rx_b] {
            assert_eq!(recv_content(rx), "first");
            assert_eq!(recv_content(rx), "second");
        }
    }

    #[tokio::test]
    async fn test_store_failure_reaches_sender_only() {
        let h = harness(true, true);
        let (a, mut rx_a) = connect(&h, 1, 8);
        let (b, mut rx_b) = connect(&h, 2, 8);
        let room = RoomKey::group(42);
        h.rooms.join(&h.registry, a, room).unwrap();
        h.rooms.join(&h.registry, b, room).unwrap();

        let err = h
            .dispatcher
            .handle_send(a, send_payload(1, room, "hi"))
            .await
            .expect_err("failing store must surface a dispatch error");
        assert_eq!(err.code(), "dispatch_error");
        assert_eq!(h.store.saved.load(Ordering::SeqCst), 0);
        assert!(rx_a.try_recv().is_err(), "no broadcast on store failure");
        assert!(rx_b.try_recv().is_err(), "no broadcast on store failure");
    }

    #[tokio::test]
    async fn test_empty_content_is_rejected() {
        let h = harness(false, true);
        let (a, _rx) = connect(&h, 1, 8);
        let err = h
            .dispatcher
            .handle_send(a, send_payload(1, RoomKey::group(1), "   "))
            .await
            .expect_err("blank content must be rejected");
        assert_eq!(err.code(), "validation_error");
        assert_eq!(h.store.saved.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sender_id_mismatch_is_rejected() {
        let h = harness(false, true);
        let (a, _rx) = connect(&h, 1, 8);
        let err = h
            .dispatcher
            .handle_send(a, send_payload(99, RoomKey::group(1), "hi"))
            .await
            .expect_err("spoofed sender must be rejected");
        assert_eq!(err.code(), "validation_error");
    }

    #[tokio::test]
    async fn test_non_member_sender_is_rejected() {
        let h = harness(false, false);
        let (a, _rx) = connect(&h, 1, 8);
        let err = h
            .dispatcher
            .handle_send(a, send_payload(1, RoomKey::group(1), "hi"))
            .await
            .expect_err("non-member send must be rejected");
        assert_eq!(err.code(), "permission_error");
        assert_eq!(h.store.saved.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unauthenticated_sender_is_rejected() {
        let h = harness(false, true);
        let id = Uuid::new_v4();
        let (tx, _rx) = mpsc::channel(8);
        h.registry.register(SessionHandle::new(id, tx));
        let err = h
            .dispatcher
            .handle_send(id, send_payload(1, RoomKey::group(1), "hi"))
            .await
            .expect_err("unauthenticated send must be rejected");
        assert_eq!(err.code(), "permission_error");
    }

    #[tokio::test]
    async fn test_backpressure_overflow_closes_slow_recipient() {
        let h = harness(false, true);
        let (a, mut rx_a) = connect(&h, 1, 8);
        // One-slot buffer and nobody draining it: the second message
        // overflows and the session is closed.
        let (b, _rx_b) = connect(&h, 2, 1);
        let room = RoomKey::group(42);
        h.rooms.join(&h.registry, a, room).unwrap();
        h.rooms.join(&h.registry, b, room).unwrap();

        h.dispatcher
            .handle_send(a, send_payload(1, room, "one"))
            .await
            .unwrap();
        h.dispatcher
            .handle_send(a, send_payload(1, room, "two"))
            .await
            .unwrap();

        assert!(!h.registry.contains(b), "overflowed session must be closed");
        assert!(!h.rooms.resolve_recipients(room).contains(&b));
        // The healthy subscriber got both messages.
        assert_eq!(recv_content(&mut rx_a), "one");
        assert_eq!(recv_content(&mut rx_a), "two");
        assert_eq!(h.store.saved.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_recipients_resolved_after_disconnect_are_skipped() {
        let h = harness(false, true);
        let (a, _rx_a) = connect(&h, 1, 8);
        let (b, _rx_b) = connect(&h, 2, 8);
        let room = RoomKey::group(7);
        h.rooms.join(&h.registry, a, room).unwrap();
        h.rooms.join(&h.registry, b, room).unwrap();

        let handle = h.registry.unregister(b).unwrap();
        h.rooms.on_disconnect(b, &handle.joined_rooms);

        let msg = h
            .dispatcher
            .handle_send(a, send_payload(1, room, "hi"))
            .await
            .unwrap();
        assert_eq!(msg.content, "hi");
        assert!(!h.rooms.resolve_recipients(room).contains(&b));
    }
}
