//! Time utilities for the frame loop

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Process start time for uptime tracking
static PROCESS_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize process start time (call once at startup)
pub fn init_process_time() {
    PROCESS_START.get_or_init(Instant::now);
}

/// Get uptime in seconds
pub fn uptime_secs() -> u64 {
    PROCESS_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Simulated frame rate of the game host
pub const FRAME_TPS: u32 = 60;
pub const FRAME_DURATION_MICROS: u64 = 1_000_000 / FRAME_TPS as u64;

/// Frames between status log lines
pub const STATUS_LOG_INTERVAL_FRAMES: u64 = FRAME_TPS as u64 * 5;

/// Measures real time between frames
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    max_delta: f32,
}

impl FrameClock {
    /// `max_delta` caps the reported delta after a stall
    pub fn new(max_delta: f32) -> Self {
        Self {
            last: Instant::now(),
            max_delta,
        }
    }

    /// Seconds since the previous call
    pub fn delta(&mut self) -> f32 {
        let now = Instant::now();
        let dt = now.duration_since(self.last).as_secs_f32();
        self.last = now;
        dt.min(self.max_delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_duration_matches_rate() {
        assert_eq!(FRAME_DURATION_MICROS, 16_666);
        assert_eq!(STATUS_LOG_INTERVAL_FRAMES, 300);
    }

    #[test]
    fn test_frame_clock_caps_stalls() {
        let mut clock = FrameClock::new(0.01);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(clock.delta(), 0.01);
        assert!(clock.delta() < 0.01);
    }
}
