use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::db;
use crate::error::AppError;
use crate::models::room::{RoomKey, RoomKind};

/// Answers whether a user may participate in a room. Joins and sends are
/// both gated on this.
#[async_trait]
pub trait MembershipChecker: Send + Sync {
    async fn is_member(&self, user_id: i64, room: RoomKey) -> Result<bool, AppError>;
}

/// Checker backed by the friends and group_members tables.
pub struct DbMembershipChecker {
    pool: SqlitePool,
}

impl DbMembershipChecker {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipChecker for DbMembershipChecker {
    async fn is_member(&self, user_id: i64, room: RoomKey) -> Result<bool, AppError> {
        match room.kind {
            RoomKind::Friend => db::friends::is_party(&self.pool, room.id, user_id).await,
            RoomKind::Group => db::groups::is_member(&self.pool, room.id, user_id).await,
        }
    }
}
