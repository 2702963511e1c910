use std::time::Duration;

/// Protocol timeouts. Shared with the gateway through `AppState`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timeouts {
    /// How long an unauthenticated connection may stay open.
    pub auth: Duration,
    /// Grace window after the last heartbeat before the connection is closed.
    pub heartbeat_grace: Duration,
    /// Upper bound on a single persistence call during dispatch.
    pub persist: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            auth: Duration::from_secs(10),
            heartbeat_grace: Duration::from_secs(30),
            persist: Duration::from_secs(5),
        }
    }
}

pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub timeouts: Timeouts,
}

fn env_secs(var: &str, default: Duration) -> Duration {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Timeouts::default();
        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(39210),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:ventichat.db?mode=rwc".to_string()),
            timeouts: Timeouts {
                auth: env_secs("VENTI_AUTH_TIMEOUT_SECS", defaults.auth),
                heartbeat_grace: env_secs("VENTI_HEARTBEAT_GRACE_SECS", defaults.heartbeat_grace),
                persist: env_secs("VENTI_PERSIST_TIMEOUT_SECS", defaults.persist),
            },
        }
    }
}
