use std::time::Duration;

/// Client-side reconnection policy. The delivery core closes connections
/// for timeouts and transport faults; clients are expected to reconnect
/// with capped exponential backoff rather than a fixed delay, and to call
/// `reset` once a handshake completes. Kept transport-free so the schedule
/// can be tested on its own.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    base: Duration,
    cap: Duration,
    attempt: u32,
}

impl ReconnectPolicy {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self {
            base,
            cap,
            attempt: 0,
        }
    }

    /// Delay to wait before the next connection attempt. Doubles per
    /// attempt up to the cap; retries are unlimited.
    pub fn next_delay(&mut self) -> Duration {
        let factor = 2u32.saturating_pow(self.attempt.min(31));
        let delay = self.base.saturating_mul(factor).min(self.cap);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    /// Call after a successful handshake so the next failure starts over
    /// from the base delay.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempt
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(3), Duration::from_secs(60))
    }
}
