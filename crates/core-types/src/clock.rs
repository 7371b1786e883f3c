use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;

use crate::TimestampMs;

/// Millisecond wall clock driven by tokio's monotonic clock.
///
/// The wall time is sampled once; later readings advance with tokio time,
/// which keeps timestamps and timer deadlines consistent when time is paused.
#[derive(Clone, Copy, Debug)]
pub struct Clock {
    origin: Instant,
    epoch_ms: TimestampMs,
}

impl Clock {
    pub fn new() -> Self {
        Self::anchored(Utc::now().timestamp_millis().max(0) as TimestampMs)
    }

    pub fn anchored(epoch_ms: TimestampMs) -> Self {
        Self {
            origin: Instant::now(),
            epoch_ms,
        }
    }

    pub fn now_ms(&self) -> TimestampMs {
        self.epoch_ms + self.origin.elapsed().as_millis() as TimestampMs
    }

    /// Monotonic instant matching a timestamp from [`Clock::now_ms`].
    pub fn instant_at(&self, at: TimestampMs) -> Instant {
        self.origin + Duration::from_millis(at.saturating_sub(self.epoch_ms))
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}
