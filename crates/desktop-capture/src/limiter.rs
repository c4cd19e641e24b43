use core::time::Duration;
use std::thread;

/// Paces captures against a fixed minimum interval.
///
/// Each frame is paced independently, there is no averaging across frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameRateLimiter {
    min_interval: Duration,
}

impl FrameRateLimiter {
    /// Creates a limiter allowing at most `max_fps` captures per second.
    ///
    /// The interval is whole milliseconds, `1000 / max_fps`.
    pub fn new(max_fps: u32) -> Self {
        Self {
            min_interval: Duration::from_millis(1000 / u64::from(max_fps.max(1))),
        }
    }

    /// The target time between the start of two captures.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// How long to wait after a capture that took `elapsed`.
    pub fn remaining(&self, elapsed: Duration) -> Duration {
        self.min_interval.saturating_sub(elapsed)
    }

    /// Blocks the calling thread for the shortfall of `elapsed` against the interval.
    pub fn delay(&self, elapsed: Duration) {
        let remaining = self.remaining(elapsed);
        if !remaining.is_zero() {
            thread::sleep(remaining);
        }
    }
}
