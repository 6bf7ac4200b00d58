//! Frame clock

use std::time::Instant;

/// Longest step a single frame may advance, in seconds
pub const MAX_FRAME_TIME: f32 = 0.25;

/// Tracks elapsed time and the clamped per-frame delta
pub struct FrameClock {
    /// Seconds of simulated time since start
    pub total_time: f32,
    /// Seconds since the previous tick
    pub delta_time: f32,
    last_instant: Option<Instant>,
    frames: u64,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            total_time: 0.0,
            delta_time: 0.0,
            last_instant: None,
            frames: 0,
        }
    }

    /// Advance the clock. Call once per frame.
    pub fn tick(&mut self) {
        let now = Instant::now();
        let elapsed = self
            .last_instant
            .map(|last| now.duration_since(last).as_secs_f32())
            .unwrap_or(0.0);
        self.last_instant = Some(now);
        self.advance(elapsed);
    }

    /// Advance by `elapsed` seconds, clamped so a stall does not teleport
    /// animated objects
    pub fn advance(&mut self, elapsed: f32) {
        self.delta_time = elapsed.clamp(0.0, MAX_FRAME_TIME);
        self.total_time += self.delta_time;
        self.frames += 1;
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Frames per second implied by the last delta
    pub fn fps(&self) -> f32 {
        if self.delta_time > 0.0 {
            1.0 / self.delta_time
        } else {
            0.0
        }
    }
}
