use sqlx::{Row, SqlitePool};

use crate::error::AppError;
use crate::models::message::{Message, MessageKind, NewMessage};
use crate::models::room::{RoomKey, RoomKind};

fn row_to_message(row: sqlx::sqlite::SqliteRow) -> Message {
    let receiver_type: String = row.get("receiver_type");
    let message_type: String = row.get("message_type");
    Message {
        id: row.get("id"),
        sender_id: row.get("sender_id"),
        sender_name: row.get("sender_name"),
        receiver_type: RoomKind::parse(&receiver_type).unwrap_or(RoomKind::Friend),
        receiver_id: row.get("receiver_id"),
        content: row.get("content"),
        message_type: MessageKind::parse(&message_type).unwrap_or(MessageKind::Text),
        file_url: row.get("file_url"),
        file_name: row.get("file_name"),
        file_size: row.get("file_size"),
        sent_at: row.get("sent_at"),
    }
}

// sender_name falls back to the username when no nickname is set.
const SELECT_MESSAGES: &str = "SELECT m.id, m.sender_id, \
    COALESCE(u.nickname, u.username) AS sender_name, m.receiver_type, \
    m.receiver_id, m.content, m.message_type, m.file_url, m.file_name, \
    m.file_size, m.sent_at \
    FROM messages m INNER JOIN users u ON m.sender_id = u.id";

pub async fn get_message(pool: &SqlitePool, message_id: i64) -> Result<Message, AppError> {
    let row = sqlx::query(&format!("{SELECT_MESSAGES} WHERE m.id = ?"))
        .bind(message_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("unknown_message".to_string()))?;
    Ok(row_to_message(row))
}

pub async fn insert_message(pool: &SqlitePool, draft: &NewMessage) -> Result<Message, AppError> {
    sqlx::query(
        "INSERT INTO messages (id, sender_id, receiver_type, receiver_id, content, \
         message_type, file_url, file_name, file_size, sent_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(draft.id)
    .bind(draft.sender_id)
    .bind(draft.receiver_type.as_str())
    .bind(draft.receiver_id)
    .bind(&draft.content)
    .bind(draft.message_type.as_str())
    .bind(&draft.file_url)
    .bind(&draft.file_name)
    .bind(draft.file_size)
    .bind(&draft.sent_at)
    .execute(pool)
    .await?;

    get_message(pool, draft.id).await
}

pub async fn list_history(
    pool: &SqlitePool,
    room: RoomKey,
    after: Option<i64>,
    limit: i64,
) -> Result<Vec<Message>, AppError> {
    let rows = if let Some(after_id) = after {
        sqlx::query(&format!(
            "{SELECT_MESSAGES} WHERE m.receiver_type = ? AND m.receiver_id = ? \
             AND m.id > ? ORDER BY m.id ASC LIMIT ?"
        ))
        .bind(room.kind.as_str())
        .bind(room.id)
        .bind(after_id)
        .bind(limit + 1)
        .fetch_all(pool)
        .await?
    } else {
        sqlx::query(&format!(
            "{SELECT_MESSAGES} WHERE m.receiver_type = ? AND m.receiver_id = ? \
             ORDER BY m.id DESC LIMIT ?"
        ))
        .bind(room.kind.as_str())
        .bind(room.id)
        .bind(limit + 1)
        .fetch_all(pool)
        .await?
    };

    Ok(rows.into_iter().map(row_to_message).collect())
}
