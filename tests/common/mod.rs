#![allow(dead_code)]

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

use ventichat::auth;
use ventichat::config::Timeouts;
use ventichat::db;
use ventichat::models::user::{CreateUser, User};
use ventichat::routes;
use ventichat::state::AppState;

/// A user created for testing, bundling the User record with its raw token.
pub struct TestUser {
    pub user: User,
    pub token: String,
}

impl TestUser {
    /// Returns the Authorization header value.
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Test server that owns an in-memory SQLite pool and full AppState.
/// Each instance is isolated — safe for parallel tests.
pub struct TestServer {
    pub state: AppState,
}

impl TestServer {
    pub async fn new() -> Self {
        Self::with_timeouts(Timeouts::default()).await
    }

    /// Create a TestServer with custom protocol timeouts. The pool is a
    /// single in-memory connection so every query sees the same database.
    pub async fn with_timeouts(timeouts: Timeouts) -> Self {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .expect("invalid sqlite url")
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .expect("failed to create test pool");
        sqlx::migrate!()
            .run(&pool)
            .await
            .expect("failed to run migrations");

        Self {
            state: AppState::new(pool, timeouts),
        }
    }

    /// Returns an Axum Router wired to this server's state for `oneshot()` calls.
    pub fn router(&self) -> axum::Router {
        routes::router(self.state.clone())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.state.db
    }

    /// Binds a TCP listener on port 0, spawns the server, and returns the base URL.
    pub async fn spawn(&self) -> String {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://127.0.0.1:{}", addr.port())
    }

    /// Create a user and issue a bearer token for it.
    pub async fn create_user_with_token(&self, username: &str) -> TestUser {
        let user = db::users::create_user(
            self.pool(),
            &CreateUser {
                username: username.to_string(),
                nickname: None,
            },
        )
        .await
        .expect("failed to create test user");

        let token = auth::issue_token(self.pool(), user.id, 30)
            .await
            .expect("failed to issue token");

        TestUser { user, token }
    }

    /// Create an active friendship; the returned id is the friend room id.
    pub async fn create_friendship(&self, user_a: i64, user_b: i64) -> i64 {
        db::friends::create_friendship(self.pool(), user_a, user_b)
            .await
            .expect("failed to create friendship")
    }

    /// Create a group owned by `owner_id` with the given extra members;
    /// the returned id is the group room id.
    pub async fn create_group(&self, name: &str, owner_id: i64, members: &[i64]) -> i64 {
        let group_id = db::groups::create_group(self.pool(), name, owner_id)
            .await
            .expect("failed to create group");
        for member in members {
            db::groups::add_member(self.pool(), group_id, *member, "member")
                .await
                .expect("failed to add group member");
        }
        group_id
    }
}
