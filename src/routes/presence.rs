use axum::extract::State;
use axum::Json;

use crate::db;
use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Users with at least one authenticated gateway session right now.
pub async fn online_users(
    state: State<AppState>,
    _auth: AuthUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let ids = state.registry.online_user_ids();
    let users = db::users::list_users_by_ids(&state.db, &ids).await?;
    let count = users.len();
    Ok(Json(serde_json::json!({
        "data": {
            "online_users": users,
            "count": count
        }
    })))
}
