//! Frame timing for the driver.
//!
//! [`FrameClock`] supplies the `time` value fed to the simulation step (seconds
//! since start) and counts frames. In fixed-step mode the clock ignores the
//! wall clock entirely, so headless runs are reproducible.
//!
//! ```ignore
//! use quantum_echo::clock::FrameClock;
//!
//! let mut clock = FrameClock::fixed(1.0 / 60.0);
//! let t = clock.tick();
//! ```

use std::time::{Duration, Instant};

/// Time source for the frame driver.
#[derive(Debug)]
pub struct FrameClock {
    start: Instant,
    last_tick: Instant,
    /// Seconds since start, as last reported by `tick`.
    elapsed_secs: f32,
    delta_secs: f32,
    frame_count: u64,
    fps: f32,
    fps_frame_count: u64,
    fps_update_time: Instant,
    fps_update_interval: Duration,
    /// Fixed step in seconds; `None` follows the wall clock.
    fixed_step: Option<f32>,
}

impl FrameClock {
    /// Wall-clock timer starting now.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_tick: now,
            elapsed_secs: 0.0,
            delta_secs: 0.0,
            frame_count: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_update_time: now,
            fps_update_interval: Duration::from_millis(500),
            fixed_step: None,
        }
    }

    /// Deterministic timer advancing by `step` seconds per tick.
    pub fn fixed(step: f32) -> Self {
        let mut clock = Self::new();
        clock.set_fixed_step(Some(step));
        clock
    }

    /// Advance one frame and return the new time in seconds.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();

        match self.fixed_step {
            Some(step) => {
                self.delta_secs = step;
                self.elapsed_secs += step;
            }
            None => {
                self.delta_secs = now.duration_since(self.last_tick).as_secs_f32();
                self.elapsed_secs = now.duration_since(self.start).as_secs_f32();
            }
        }
        self.last_tick = now;
        self.frame_count += 1;

        let fps_elapsed = now.duration_since(self.fps_update_time);
        if fps_elapsed >= self.fps_update_interval {
            let frames_since = self.frame_count - self.fps_frame_count;
            self.fps = frames_since as f32 / fps_elapsed.as_secs_f32();
            self.fps_frame_count = self.frame_count;
            self.fps_update_time = now;
        }

        self.elapsed_secs
    }

    /// Seconds since start as of the last tick.
    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed_secs
    }

    /// Seconds between the last two ticks.
    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta_secs
    }

    /// Ticks since start.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Measured frames per second (wall clock), refreshed twice a second.
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    #[inline]
    pub fn fixed_step(&self) -> Option<f32> {
        self.fixed_step
    }

    /// Switch between fixed-step (`Some`) and wall-clock (`None`) timing.
    ///
    /// Non-positive steps are clamped to zero, which freezes time.
    pub fn set_fixed_step(&mut self, step: Option<f32>) {
        self.fixed_step = step.map(|s| s.max(0.0));
    }

    /// Restart from zero, keeping the timing mode.
    pub fn reset(&mut self) {
        let fixed_step = self.fixed_step;
        *self = Self::new();
        self.fixed_step = fixed_step;
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_clock_new() {
        let clock = FrameClock::new();
        assert_eq!(clock.frame(), 0);
        assert_eq!(clock.elapsed(), 0.0);
        assert_eq!(clock.fixed_step(), None);
    }

    #[test]
    fn test_wall_clock_advances() {
        let mut clock = FrameClock::new();
        thread::sleep(Duration::from_millis(10));
        let t = clock.tick();

        assert!(t > 0.0);
        assert!(clock.delta() > 0.0);
        assert_eq!(clock.frame(), 1);
    }

    #[test]
    fn test_fixed_step_ignores_wall_clock() {
        let mut clock = FrameClock::fixed(0.5);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(clock.tick(), 0.5);
        assert_eq!(clock.tick(), 1.0);
        assert_eq!(clock.delta(), 0.5);
        assert_eq!(clock.frame(), 2);
    }

    #[test]
    fn test_negative_step_freezes() {
        let mut clock = FrameClock::fixed(-1.0);
        assert_eq!(clock.fixed_step(), Some(0.0));
        assert_eq!(clock.tick(), 0.0);
    }

    #[test]
    fn test_reset_keeps_mode() {
        let mut clock = FrameClock::fixed(0.25);
        clock.tick();
        clock.tick();
        clock.reset();
        assert_eq!(clock.frame(), 0);
        assert_eq!(clock.elapsed(), 0.0);
        assert_eq!(clock.fixed_step(), Some(0.25));
    }
}
