use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::models::room::{RoomKey, RoomKind};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub after: Option<i64>,
    pub limit: Option<i64>,
}

/// Paginated history for one conversation. Callers must be members of the
/// room; the messages come back in the same per-room order the dispatcher
/// accepted them in.
pub async fn history(
    state: State<AppState>,
    Path((kind, id)): Path<(String, i64)>,
    auth: AuthUser,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let kind = RoomKind::parse(&kind)
        .ok_or_else(|| AppError::BadRequest("receiver type must be friend or group".to_string()))?;
    let room = RoomKey { kind, id };

    if !state.membership.is_member(auth.user_id, room).await? {
        return Err(AppError::Forbidden(
            "not a member of this conversation".to_string(),
        ));
    }

    let limit = params.limit.unwrap_or(50).min(100);
    let mut rows = state.store.load_history(room, params.after, limit).await?;

    let has_more = rows.len() as i64 > limit;
    if has_more {
        rows.truncate(limit as usize);
    }
    let last_id = rows.last().map(|m| m.id);

    let mut response = serde_json::json!({ "data": rows });
    if has_more || last_id.is_some() {
        response["cursor"] = serde_json::json!({
            "after": last_id.unwrap_or_default(),
            "has_more": has_more
        });
    }
    Ok(Json(response))
}
