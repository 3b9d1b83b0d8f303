// Per-frame delta filtering: clamps long frames and swallows the first
// frames after the loop was blocked by a modal pause.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct FrameClock {
    max_delta: Duration,
    resume_skip_frames: u32,
    skip_remaining: u32,
    suspended: bool,
}

impl FrameClock {
    pub fn new(max_delta: Duration, resume_skip_frames: u32) -> Self {
        Self {
            max_delta,
            resume_skip_frames,
            skip_remaining: 0,
            suspended: false,
        }
    }

    /// Filter a raw frame delta. Returns zero while suspended or during the
    /// skip window after [`resume`](Self::resume).
    pub fn filter(&mut self, raw: Duration) -> Duration {
        if self.suspended {
            return Duration::ZERO;
        }
        if self.skip_remaining > 0 {
            self.skip_remaining -= 1;
            return Duration::ZERO;
        }
        raw.min(self.max_delta)
    }

    pub fn suspend(&mut self) {
        self.suspended = true;
    }

    pub fn resume(&mut self) {
        self.suspended = false;
        self.skip_remaining = self.resume_skip_frames;
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn max_delta(&self) -> Duration {
        self.max_delta
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(Duration::from_millis(100), 2)
    }
}
