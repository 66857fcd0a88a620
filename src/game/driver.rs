//! Frame driver: one `tick(dt)` per simulated frame

use serde::Serialize;

use crate::input::LatchReader;

use super::engine::CharacterEngine;
use super::motion::{ControlInput, MotionController};

/// Read-only view of the character for status reporting
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlayerStatus {
    pub frame: u64,
    pub position: [f32; 3],
    pub height: f32,
    pub vertical_velocity: f32,
    pub grounded: bool,
    pub input: ControlInput,
    /// Frames since a sample last arrived; `None` until the first one
    pub frames_since_input: Option<u64>,
    pub receiver_running: bool,
}

/// Pulls the latest latched input and runs the controller against the engine
pub struct FrameDriver<E: CharacterEngine> {
    latch: LatchReader,
    controller: MotionController,
    engine: E,
    frame: u64,
    last_input_frame: Option<u64>,
}

impl<E: CharacterEngine> FrameDriver<E> {
    pub fn new(latch: LatchReader, controller: MotionController, mut engine: E) -> Self {
        controller.attach(&mut engine);
        Self {
            latch,
            controller,
            engine,
            frame: 0,
            last_input_frame: None,
        }
    }

    /// Run one frame
    pub fn tick(&mut self, dt: f32) {
        self.frame += 1;

        let snapshot = self.latch.consume();
        if snapshot.is_some_and(|s| s.fresh) {
            self.last_input_frame = Some(self.frame);
        }

        self.controller.update(dt, snapshot, &mut self.engine);
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    #[cfg(test)]
    pub fn controller(&self) -> &MotionController {
        &self.controller
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn latch(&self) -> &LatchReader {
        &self.latch
    }

    pub fn status(&self) -> PlayerStatus {
        let state = self.controller.state();
        PlayerStatus {
            frame: self.frame,
            position: self.engine.position().to_array(),
            height: state.current_height,
            vertical_velocity: state.vertical_velocity,
            grounded: self.engine.is_grounded(),
            input: *self.controller.input(),
            frames_since_input: self.last_input_frame.map(|f| self.frame - f),
            receiver_running: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::engine::FlatGroundEngine;
    use crate::game::motion::MotionConfig;
    use crate::game::steering::AutoForward;
    use crate::input::{input_latch, LatchResetPolicy};
    use crate::net::EyeSample;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn test_wink_published_between_ticks_jumps() {
        let (writer, reader) = input_latch(LatchResetPolicy::ResetEveryConsume);
        let controller = MotionController::new(MotionConfig::default());
        let mut driver = FrameDriver::new(reader, controller, FlatGroundEngine::default());

        driver.tick(DT);

        // Wink opens and closes entirely between two frames
        writer.publish(EyeSample::new(0.0, true, false));
        writer.publish(EyeSample::new(0.0, false, false));
        driver.tick(DT);

        assert_eq!(driver.controller().state().vertical_velocity, 8.0);
        assert!(!driver.engine().is_grounded());
    }

    #[test]
    fn test_status_tracks_input_age() {
        let (writer, reader) = input_latch(LatchResetPolicy::ResetEveryConsume);
        let controller = MotionController::new(MotionConfig::default());
        let mut driver = FrameDriver::new(reader, controller, FlatGroundEngine::default());

        driver.tick(DT);
        assert_eq!(driver.status().frames_since_input, None);

        writer.publish(EyeSample::new(0.5, false, true));
        driver.tick(DT);
        driver.tick(DT);
        driver.tick(DT);

        let status = driver.status();
        assert_eq!(status.frame, 4);
        assert_eq!(status.frames_since_input, Some(2));
        assert_eq!(status.input.gaze_x, 0.5);
        assert!(status.input.right_closed);
        assert!(status.height < 2.0);
    }

    #[test]
    fn test_input_age_counts_silent_frames_under_both_policies() {
        for policy in [
            LatchResetPolicy::ResetEveryConsume,
            LatchResetPolicy::ResetOnlyOnDecode,
        ] {
            let (writer, reader) = input_latch(policy);
            let controller = MotionController::new(MotionConfig::default());
            let mut driver = FrameDriver::new(reader, controller, FlatGroundEngine::default());

            writer.publish(EyeSample::new(0.0, false, false));
            for _ in 0..100 {
                driver.tick(DT);
            }
            assert_eq!(driver.status().frames_since_input, Some(99), "{policy:?}");

            writer.publish(EyeSample::new(0.0, false, false));
            driver.tick(DT);
            assert_eq!(driver.status().frames_since_input, Some(0), "{policy:?}");
        }
    }

    /// Counts frames where a jump impulse was applied
    fn jumps_with_wink_held_at_half_rate(policy: LatchResetPolicy) -> usize {
        let (writer, reader) = input_latch(policy);
        let controller = MotionController::new(MotionConfig::default());
        let mut driver = FrameDriver::new(reader, controller, FlatGroundEngine::default());

        let mut jumps = 0;
        for frame in 0..600 {
            if frame % 2 == 0 {
                writer.publish(EyeSample::new(0.0, true, false));
            }
            driver.tick(DT);
            if driver.controller().state().vertical_velocity == 8.0 {
                jumps += 1;
            }
        }
        jumps
    }

    #[test]
    fn test_held_wink_jumps_once_under_both_policies() {
        assert_eq!(
            jumps_with_wink_held_at_half_rate(LatchResetPolicy::ResetEveryConsume),
            1
        );
        assert_eq!(
            jumps_with_wink_held_at_half_rate(LatchResetPolicy::ResetOnlyOnDecode),
            1
        );
    }

    #[test]
    fn test_held_crouch_is_steady_between_packets() {
        let (writer, reader) = input_latch(LatchResetPolicy::ResetOnlyOnDecode);
        let controller = MotionController::new(MotionConfig::default());
        let mut driver = FrameDriver::new(reader, controller, FlatGroundEngine::default());

        let mut previous = driver.status().height;
        for frame in 0..120 {
            if frame % 3 == 0 {
                writer.publish(EyeSample::new(0.0, false, true));
            }
            driver.tick(DT);
            let height = driver.status().height;
            assert!(height <= previous, "frame {frame}: {height} > {previous}");
            previous = height;
        }
        assert!((previous - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_stale_input_keeps_character_moving() {
        let (writer, reader) = input_latch(LatchResetPolicy::ResetEveryConsume);
        let config = MotionConfig::default().with_auto_forward(AutoForward::OnFirstInput);
        let mut driver = FrameDriver::new(
            reader,
            MotionController::new(config),
            FlatGroundEngine::default(),
        );

        writer.publish(EyeSample::new(1.0, false, false));
        for _ in 0..60 {
            driver.tick(DT);
        }

        let position = driver.engine().position();
        assert!((position.x - 5.0).abs() < 1e-3);
        assert!((position.z - 5.0).abs() < 1e-3);
    }

    #[test]
    fn test_collider_initialised_on_construction() {
        let (_writer, reader) = input_latch(LatchResetPolicy::ResetEveryConsume);
        let driver = FrameDriver::new(
            reader,
            MotionController::new(MotionConfig::default()),
            FlatGroundEngine::default(),
        );
        assert_eq!(driver.engine().collider(), (2.0, 1.0));
    }
}
