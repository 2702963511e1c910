use std::time::Duration;

/// How often the server sweeps Active connections for missed heartbeats.
pub const CHECK_INTERVAL: Duration = Duration::from_secs(5);
