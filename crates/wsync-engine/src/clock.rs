//! Timestamp authority: the source of `modified` values for writes.

use std::sync::Mutex;

use wsync_types::Timestamp;

/// Source of modification timestamps.
///
/// Values are two-decimal seconds. Consecutive calls inside one 10ms window
/// may return equal values; callers must not rely on strict increase.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time from the system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock that starts at a fixed instant and advances by `step` seconds on
/// every read. Gives deterministic, strictly increasing timestamps for tests
/// and replays.
#[derive(Debug)]
pub struct ManualClock {
    next: Mutex<Timestamp>,
    step: f64,
}

impl ManualClock {
    pub fn new(start: Timestamp, step: f64) -> Self {
        Self {
            next: Mutex::new(start),
            step,
        }
    }

    /// Move the clock to `to` without returning a reading.
    pub fn set(&self, to: Timestamp) {
        let mut next = self.next.lock().unwrap_or_else(|e| e.into_inner());
        *next = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        let mut next = self.next.lock().unwrap_or_else(|e| e.into_inner());
        let now = *next;
        *next = now.add_secs(self.step);
        now
    }
}
