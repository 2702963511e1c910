use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

// Ventichat epoch: 2023-01-01T00:00:00Z
const EPOCH: i64 = 1_672_531_200_000;

static SEQUENCE: AtomicI64 = AtomicI64::new(0);
static LAST_TIMESTAMP: AtomicI64 = AtomicI64::new(0);

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock went backwards")
        .as_millis() as i64
}

/// Generate a time-ordered id. Fits in an i64 (42 bits of millis since the
/// epoch, 12 bits of sequence), so ids sort by creation time.
pub fn generate() -> i64 {
    let mut timestamp = now_ms() - EPOCH;
    let last = LAST_TIMESTAMP.load(Ordering::SeqCst);

    if timestamp == last {
        let seq = SEQUENCE.fetch_add(1, Ordering::SeqCst) & 0xFFF;
        if seq == 0 {
            // Sequence overflow, wait for next millisecond
            while timestamp <= last {
                timestamp = now_ms() - EPOCH;
            }
        }
        LAST_TIMESTAMP.store(timestamp, Ordering::SeqCst);
        (timestamp << 22) | seq
    } else {
        LAST_TIMESTAMP.store(timestamp, Ordering::SeqCst);
        SEQUENCE.store(1, Ordering::SeqCst);
        timestamp << 22
    }
}

/// Millisecond unix timestamp embedded in an id.
pub fn timestamp_of(id: i64) -> i64 {
    (id >> 22) + EPOCH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generates_unique_ids() {
        let a = generate();
        let b = generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_ids_are_positive() {
        assert!(generate() > 0);
    }

    #[test]
    fn test_timestamp_extraction() {
        let id = generate();
        let ts = timestamp_of(id);
        let now = now_ms();
        assert!(ts <= now && ts > now - 1000);
    }

    #[test]
    fn test_monotonically_increasing() {
        let ids: Vec<i64> = (0..100).map(|_| generate()).collect();
        for w in ids.windows(2) {
            assert!(w[0] < w[1], "ids should be monotonically increasing");
        }
    }
}
