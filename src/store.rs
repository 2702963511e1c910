use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::db;
use crate::error::AppError;
use crate::models::message::{Message, NewMessage};
use crate::models::room::RoomKey;

/// Persistence collaborator for dispatched messages. The dispatcher writes
/// through this before any fan-out; the history route reads through it.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn save_message(&self, draft: &NewMessage) -> Result<Message, AppError>;

    async fn load_history(
        &self,
        room: RoomKey,
        after: Option<i64>,
        limit: i64,
    ) -> Result<Vec<Message>, AppError>;
}

/// Store backed by the messages table.
pub struct DbMessageStore {
    pool: SqlitePool,
}

impl DbMessageStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for DbMessageStore {
    async fn save_message(&self, draft: &NewMessage) -> Result<Message, AppError> {
        db::messages::insert_message(&self.pool, draft).await
    }

    async fn load_history(
        &self,
        room: RoomKey,
        after: Option<i64>,
        limit: i64,
    ) -> Result<Vec<Message>, AppError> {
        db::messages::list_history(&self.pool, room, after, limit).await
    }
}
