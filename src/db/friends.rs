use sqlx::{Row, SqlitePool};

use crate::error::AppError;
use crate::snowflake;

/// Check whether a user is a party to an active friendship.
pub async fn is_party(
    pool: &SqlitePool,
    friendship_id: i64,
    user_id: i64,
) -> Result<bool, AppError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM friends WHERE id = ? AND status = 'active' \
         AND (user_id = ? OR friend_id = ?)",
    )
    .bind(friendship_id)
    .bind(user_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

/// Find the friendship record between two users, in either direction.
pub async fn find_between(
    pool: &SqlitePool,
    user_a: i64,
    user_b: i64,
) -> Result<Option<i64>, AppError> {
    let row = sqlx::query(
        "SELECT id FROM friends WHERE (user_id = ? AND friend_id = ?) \
         OR (user_id = ? AND friend_id = ?) LIMIT 1",
    )
    .bind(user_a)
    .bind(user_b)
    .bind(user_b)
    .bind(user_a)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|r| r.get("id")))
}

/// Create an active friendship between two users. Returns the friendship id,
/// which doubles as the room id of their direct conversation.
pub async fn create_friendship(
    pool: &SqlitePool,
    user_id: i64,
    friend_id: i64,
) -> Result<i64, AppError> {
    if let Some(existing) = find_between(pool, user_id, friend_id).await? {
        return Ok(existing);
    }
    let id = snowflake::generate();
    sqlx::query("INSERT INTO friends (id, user_id, friend_id, status) VALUES (?, ?, ?, 'active')")
        .bind(id)
        .bind(user_id)
        .bind(friend_id)
        .execute(pool)
        .await?;
    Ok(id)
}
