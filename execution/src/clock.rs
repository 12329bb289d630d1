use std::time::{SystemTime, UNIX_EPOCH};

/// Source of wall-clock time in unix milliseconds.
///
/// The engine never reads the system clock directly so that the 24h windows
/// can be stepped through in tests.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0)
    }
}
