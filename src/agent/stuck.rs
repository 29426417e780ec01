//! Progress monitoring
//!
//! Declares an agent "stuck" when its sampled positions stop covering
//! ground, which triggers the local recovery paths (wiggle, ladder abort,
//! repath).

use glam::Vec3;

const SAMPLE_INTERVAL: f32 = 0.25;
const SAMPLE_COUNT: usize = 8;
/// Minimum ground covered over the full sample window to count as moving
const MIN_TRAVEL: f32 = 25.0;

/// Ring buffer of recent positions with a stuck verdict
#[derive(Debug, Clone)]
pub struct StuckMonitor {
    samples: [Vec3; SAMPLE_COUNT],
    head: usize,
    filled: usize,
    last_sample_at: f32,
    stuck: bool,
}

impl Default for StuckMonitor {
    fn default() -> Self {
        Self {
            samples: [Vec3::ZERO; SAMPLE_COUNT],
            head: 0,
            filled: 0,
            last_sample_at: f32::NEG_INFINITY,
            stuck: false,
        }
    }
}

impl StuckMonitor {
    /// Feed the current position; updates the verdict once per interval
    pub fn update(&mut self, now: f32, pos: Vec3) {
        if now - self.last_sample_at < SAMPLE_INTERVAL {
            return;
        }
        self.last_sample_at = now;
        self.samples[self.head] = pos;
        self.head = (self.head + 1) % SAMPLE_COUNT;
        if self.filled < SAMPLE_COUNT {
            self.filled += 1;
            return;
        }

        // oldest sample is the one the head now points at
        let oldest = self.samples[self.head];
        self.stuck = pos.distance(oldest) < MIN_TRAVEL;
    }

    /// Forget all history and clear the verdict. Called whenever the agent
    /// deliberately stops (waiting, crouched holds) or recovers.
    pub fn reset(&mut self) {
        self.filled = 0;
        self.head = 0;
        self.stuck = false;
        self.last_sample_at = f32::NEG_INFINITY;
    }

    #[must_use]
    pub fn is_stuck(&self) -> bool {
        self.stuck
    }
}
