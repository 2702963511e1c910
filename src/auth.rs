use async_trait::async_trait;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;

use crate::error::AppError;

/// Resolves a presented token to a user id. The gateway only ever sees this
/// interface; credential issuance lives outside the core.
#[async_trait]
pub trait AuthValidator: Send + Sync {
    async fn validate_token(&self, token: &str) -> Option<i64>;
}

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Helper to create a token hash for token creation.
pub fn create_token_hash(token: &str) -> String {
    hash_token(token)
}

/// Generate a random token string.
pub fn generate_token() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let random: u64 = rand::random();
    format!("{ts:x}.{random:x}")
}

/// Insert a bearer token for a user. Used by the seed utility and tests;
/// production issuance happens in the external auth service.
pub async fn issue_token(pool: &SqlitePool, user_id: i64, days: i64) -> Result<String, AppError> {
    let token = generate_token();
    let token_hash = create_token_hash(&token);
    let expires_at = (chrono::Utc::now() + chrono::Duration::days(days))
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string();
    sqlx::query("INSERT INTO user_tokens (token_hash, user_id, expires_at) VALUES (?, ?, ?)")
        .bind(&token_hash)
        .bind(user_id)
        .bind(&expires_at)
        .execute(pool)
        .await?;
    Ok(token)
}

/// Validator backed by the `user_tokens` table.
pub struct TokenAuthValidator {
    pool: SqlitePool,
}

impl TokenAuthValidator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthValidator for TokenAuthValidator {
    async fn validate_token(&self, token: &str) -> Option<i64> {
        // Clients that reuse the HTTP header value send "Bearer xxx".
        let raw = token.strip_prefix("Bearer ").unwrap_or(token);
        if raw.is_empty() {
            return None;
        }
        let token_hash = hash_token(raw);
        let row = sqlx::query_as::<_, (i64, String)>(
            "SELECT user_id, expires_at FROM user_tokens WHERE token_hash = ?",
        )
        .bind(&token_hash)
        .fetch_optional(&self.pool)
        .await
        .ok()??;

        let now = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string();
        if row.1 < now {
            return None;
        }
        Some(row.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_hash_is_stable() {
        assert_eq!(create_token_hash("abc"), create_token_hash("abc"));
        assert_ne!(create_token_hash("abc"), create_token_hash("abd"));
    }

    #[test]
    fn test_generated_tokens_differ() {
        assert_ne!(generate_token(), generate_token());
    }
}
