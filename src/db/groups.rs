use sqlx::SqlitePool;

use crate::error::AppError;
use crate::snowflake;

pub async fn is_member(pool: &SqlitePool, group_id: i64, user_id: i64) -> Result<bool, AppError> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM group_members WHERE group_id = ? AND user_id = ?")
            .bind(group_id)
            .bind(user_id)
            .fetch_one(pool)
            .await?;
    Ok(count > 0)
}

pub async fn create_group(pool: &SqlitePool, name: &str, owner_id: i64) -> Result<i64, AppError> {
    let id = snowflake::generate();
    sqlx::query("INSERT INTO chat_groups (id, name, owner_id) VALUES (?, ?, ?)")
        .bind(id)
        .bind(name)
        .bind(owner_id)
        .execute(pool)
        .await?;
    add_member(pool, id, owner_id, "owner").await?;
    Ok(id)
}

/// Add a member to a group. No-op if already present.
pub async fn add_member(
    pool: &SqlitePool,
    group_id: i64,
    user_id: i64,
    role: &str,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT OR IGNORE INTO group_members (id, group_id, user_id, role) VALUES (?, ?, ?, ?)",
    )
    .bind(snowflake::generate())
    .bind(group_id)
    .bind(user_id)
    .bind(role)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn remove_member(pool: &SqlitePool, group_id: i64, user_id: i64) -> Result<(), AppError> {
    sqlx::query("DELETE FROM group_members WHERE group_id = ? AND user_id = ?")
        .bind(group_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}
