use sqlx::{Row, SqlitePool};

use crate::error::AppError;
use crate::models::user::{CreateUser, User};
use crate::snowflake;

fn row_to_user(row: sqlx::sqlite::SqliteRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        nickname: row.get("nickname"),
        avatar_url: row.get("avatar_url"),
        created_at: row.get("created_at"),
    }
}

const SELECT_USERS: &str = "SELECT id, username, nickname, avatar_url, created_at FROM users";

pub async fn get_user(pool: &SqlitePool, user_id: i64) -> Result<User, AppError> {
    let row = sqlx::query(&format!("{SELECT_USERS} WHERE id = ?"))
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("unknown_user".to_string()))?;
    Ok(row_to_user(row))
}

pub async fn list_users_by_ids(pool: &SqlitePool, ids: &[i64]) -> Result<Vec<User>, AppError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!("{SELECT_USERS} WHERE id IN ({placeholders}) ORDER BY id");
    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(id);
    }
    let rows = query.fetch_all(pool).await?;
    Ok(rows.into_iter().map(row_to_user).collect())
}

pub async fn create_user(pool: &SqlitePool, input: &CreateUser) -> Result<User, AppError> {
    let id = snowflake::generate();
    sqlx::query("INSERT INTO users (id, username, nickname) VALUES (?, ?, ?)")
        .bind(id)
        .bind(&input.username)
        .bind(&input.nickname)
        .execute(pool)
        .await?;
    get_user(pool, id).await
}

/// Resolve the name shown next to a user's messages.
pub async fn display_name(pool: &SqlitePool, user_id: i64) -> Result<String, AppError> {
    let user = get_user(pool, user_id).await?;
    Ok(user.display_name().to_string())
}
