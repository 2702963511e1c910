use sqlx::SqlitePool;
use std::sync::Arc;

use crate::auth::{AuthValidator, TokenAuthValidator};
use crate::config::Timeouts;
use crate::gateway::dispatcher::Dispatcher;
use crate::gateway::registry::SessionRegistry;
use crate::gateway::router::RoomRouter;
use crate::membership::{DbMembershipChecker, MembershipChecker};
use crate::store::{DbMessageStore, MessageStore};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub registry: Arc<SessionRegistry>,
    pub rooms: Arc<RoomRouter>,
    pub dispatcher: Arc<Dispatcher>,
    pub auth: Arc<dyn AuthValidator>,
    pub membership: Arc<dyn MembershipChecker>,
    pub store: Arc<dyn MessageStore>,
    pub timeouts: Timeouts,
}

impl AppState {
    /// Wire the gateway structures and database-backed collaborators.
    pub fn new(db: SqlitePool, timeouts: Timeouts) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let rooms = Arc::new(RoomRouter::new());
        let auth: Arc<dyn AuthValidator> = Arc::new(TokenAuthValidator::new(db.clone()));
        let membership: Arc<dyn MembershipChecker> =
            Arc::new(DbMembershipChecker::new(db.clone()));
        let store: Arc<dyn MessageStore> = Arc::new(DbMessageStore::new(db.clone()));
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&rooms),
            Arc::clone(&store),
            Arc::clone(&membership),
            timeouts.persist,
        ));

        Self {
            db,
            registry,
            rooms,
            dispatcher,
            auth,
            membership,
            store,
            timeouts,
        }
    }
}
