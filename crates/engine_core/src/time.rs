//! Frame clock for the fixed-step loop. One tick is one rendered frame.

use std::time::{Duration, Instant};

/// Counts simulation ticks and paces them against wall time.
#[derive(Debug)]
pub struct FrameClock {
    /// Time of the last `advance` call.
    last_frame: Instant,
    /// Wall time between the last two `advance` calls.
    delta: Duration,
    /// Ticks run since the clock was created.
    tick_count: u64,
    /// Fixed tick length (default 60 Hz).
    tick_length: Duration,
    /// Wall time not yet consumed by ticks.
    accumulator: Duration,
    /// Upper bound on ticks run per frame, so a stalled frame can't spiral.
    max_catch_up: u32,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            delta: Duration::ZERO,
            tick_count: 0,
            tick_length: Duration::from_secs_f64(1.0 / 60.0),
            accumulator: Duration::ZERO,
            max_catch_up: 4,
        }
    }

    /// Record the wall time at the start of a rendered frame.
    pub fn advance(&mut self) {
        let now = Instant::now();
        self.delta = now - self.last_frame;
        self.last_frame = now;
        self.accumulator += self.delta;
        let cap = self.tick_length * self.max_catch_up;
        if self.accumulator > cap {
            self.accumulator = cap;
        }
    }

    /// Consume one tick's worth of accumulated time. Returns false once the frame is caught up.
    pub fn should_tick(&mut self) -> bool {
        if self.accumulator >= self.tick_length {
            self.accumulator -= self.tick_length;
            self.tick_count += 1;
            true
        } else {
            false
        }
    }

    /// Count a tick without consulting wall time (tests, headless stepping).
    pub fn step(&mut self) {
        self.tick_count += 1;
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Tick counter as the float time fed to shaders.
    pub fn shader_time(&self) -> f32 {
        self.tick_count as f32
    }

    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Frames per second measured over the last frame.
    pub fn fps(&self) -> f32 {
        if self.delta.as_secs_f32() > 0.0 {
            1.0 / self.delta.as_secs_f32()
        } else {
            0.0
        }
    }

    /// Set the tick rate in Hz.
    pub fn set_tick_rate(&mut self, hz: f64) {
        self.tick_length = Duration::from_secs_f64(1.0 / hz.max(1.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_counts_ticks() {
        let mut clock = FrameClock::new();
        for _ in 0..3 {
            clock.step();
        }
        assert_eq!(clock.tick_count(), 3);
        assert_eq!(clock.shader_time(), 3.0);
    }

    #[test]
    fn no_tick_without_elapsed_time() {
        let mut clock = FrameClock::new();
        assert!(!clock.should_tick());
        assert_eq!(clock.tick_count(), 0);
    }
}
