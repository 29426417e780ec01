//! Fixed-step clock and the deadline value type
//!
//! All waiting anywhere in the engine (repath throttling, ladder timeouts,
//! dodge dwell, retreat cooldowns) is a [`Countdown`] compared against the
//! clock, never a sleep or an ad hoc timestamp field.

/// Monotone simulation clock advanced in discrete steps
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    now: f32,
    tick: u64,
}

impl Clock {
    /// A clock at time zero
    #[must_use]
    pub fn new() -> Self {
        Self { now: 0.0, tick: 0 }
    }

    /// Current simulation time in seconds
    #[must_use]
    pub fn now(&self) -> f32 {
        self.now
    }

    /// Number of completed ticks
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Advance by one fixed step
    pub fn advance(&mut self, dt: f32) {
        self.now += dt;
        self.tick += 1;
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

/// A deadline: armed at some time for some duration, queried against the
/// clock. A fresh countdown is already elapsed.
#[derive(Debug, Clone, Copy)]
pub struct Countdown {
    expires_at: f32,
}

impl Countdown {
    /// Arm the countdown for `duration` seconds from `now`
    pub fn start(&mut self, now: f32, duration: f32) {
        self.expires_at = now + duration;
    }

    /// Force the countdown into the elapsed state
    pub fn invalidate(&mut self) {
        self.expires_at = f32::NEG_INFINITY;
    }

    /// True once the armed duration has passed (or it was never armed)
    #[must_use]
    pub fn is_elapsed(&self, now: f32) -> bool {
        now >= self.expires_at
    }

    /// Seconds until expiry (zero if elapsed)
    #[must_use]
    pub fn remaining(&self, now: f32) -> f32 {
        (self.expires_at - now).max(0.0)
    }
}

impl Default for Countdown {
    fn default() -> Self {
        Self {
            expires_at: f32::NEG_INFINITY,
        }
    }
}

/// Measures elapsed time since it was last started
#[derive(Debug, Clone, Copy, Default)]
pub struct Stopwatch {
    started_at: f32,
}

impl Stopwatch {
    /// Restart measuring from `now`
    pub fn start(&mut self, now: f32) {
        self.started_at = now;
    }

    /// Seconds since the last start
    #[must_use]
    pub fn elapsed(&self, now: f32) -> f32 {
        now - self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_countdown_is_elapsed() {
        let c = Countdown::default();
        assert!(c.is_elapsed(0.0));
    }

    #[test]
    fn test_countdown_elapses_after_duration() {
        let mut c = Countdown::default();
        c.start(10.0, 0.5);
        assert!(!c.is_elapsed(10.0));
        assert!(!c.is_elapsed(10.4));
        assert!(c.is_elapsed(10.5));
        assert!((c.remaining(10.2) - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_invalidate() {
        let mut c = Countdown::default();
        c.start(0.0, 100.0);
        c.invalidate();
        assert!(c.is_elapsed(0.0));
    }

    #[test]
    fn test_clock_advances() {
        let mut clock = Clock::new();
        for _ in 0..10 {
            clock.advance(0.1);
        }
        assert_eq!(clock.tick(), 10);
        assert!((clock.now() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_stopwatch() {
        let mut s = Stopwatch::default();
        s.start(3.0);
        assert!((s.elapsed(7.5) - 4.5).abs() < 1e-6);
    }
}
