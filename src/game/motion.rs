//! Character motion state machine
//!
//! Runs once per frame on the frame context. Order within a frame:
//! vertical integration, jump, crouch, steering, then a single displacement
//! request. Jump is evaluated after gravity, so a jump frame ends with a
//! vertical velocity of exactly `jump_impulse`.

use glam::Vec3;
use serde::Serialize;
use tracing::{debug, info};

use crate::input::LatchSnapshot;

use super::engine::CharacterEngine;
use super::steering::{
    flat_direction, forward_axis, gaze_offset, heading_of, right_axis, sanitize_gaze,
    turn_towards, AutoForward, HorizontalSmoothing, SteeringMode,
};

/// Tuning for the motion controller
#[derive(Debug, Clone)]
pub struct MotionConfig {
    /// Lateral speed at gaze offset 1.0
    pub move_speed: f32,
    /// Auto-forward running speed
    pub forward_speed: f32,
    pub jump_impulse: f32,
    /// Vertical acceleration, negative is down
    pub gravity: f32,
    /// Vertical velocity held while resting on the ground
    pub ground_stick_velocity: f32,

    pub standing_height: f32,
    pub crouch_height: f32,
    /// Exponential blend rate per second toward the target height
    pub crouch_speed: f32,

    /// Gaze offsets at or below this magnitude are ignored
    pub gaze_deadzone: f32,
    /// Gaze offsets are clamped to ±this
    pub max_gaze_offset: f32,
    /// Raycast targets closer than this are ignored
    pub raycast_deadzone: f32,
    /// Heading blend rate per second in raycast mode
    pub turn_rate: f32,

    pub steering: SteeringMode,
    pub auto_forward: AutoForward,
    pub smoothing: Option<HorizontalSmoothing>,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            move_speed: 5.0,
            forward_speed: 5.0,
            jump_impulse: 8.0,
            gravity: -9.81,
            ground_stick_velocity: -2.0,
            standing_height: 2.0,
            crouch_height: 1.0,
            crouch_speed: 10.0,
            gaze_deadzone: 0.1,
            max_gaze_offset: 2.0,
            raycast_deadzone: 0.5,
            turn_rate: 10.0,
            steering: SteeringMode::DirectOffset,
            auto_forward: AutoForward::Off,
            smoothing: None,
        }
    }
}

impl MotionConfig {
    pub fn with_steering(mut self, steering: SteeringMode) -> Self {
        self.steering = steering;
        self
    }

    pub fn with_auto_forward(mut self, auto_forward: AutoForward) -> Self {
        self.auto_forward = auto_forward;
        self
    }

    pub fn with_forward_speed(mut self, forward_speed: f32) -> Self {
        self.forward_speed = forward_speed;
        self
    }

    pub fn with_smoothing(mut self, smoothing: HorizontalSmoothing) -> Self {
        self.smoothing = Some(smoothing);
        self
    }
}

/// Input as the controller currently sees it. Persists across frames that
/// bring no new snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ControlInput {
    pub gaze_x: f32,
    pub gaze_y: f32,
    pub left_closed: bool,
    pub right_closed: bool,
}

impl ControlInput {
    /// Fold a snapshot in. A stale snapshot only refreshes gaze so a held
    /// eye stays closed between packets.
    fn apply(&mut self, snapshot: LatchSnapshot) {
        self.gaze_x = snapshot.gaze_x;
        self.gaze_y = snapshot.gaze_y;
        if snapshot.fresh {
            self.left_closed = snapshot.left_closed;
            self.right_closed = snapshot.right_closed;
        }
    }
}

/// State private to the controller
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MotionState {
    pub vertical_velocity: f32,
    pub current_height: f32,
    pub was_left_closed_previous_frame: bool,
    pub has_auto_started: bool,
    #[serde(skip)]
    pub horizontal_velocity: Vec3,
    /// Yaw in radians, 0 faces +Z
    pub heading: f32,
}

/// Per-frame character controller
pub struct MotionController {
    config: MotionConfig,
    state: MotionState,
    input: ControlInput,
}

impl MotionController {
    pub fn new(config: MotionConfig) -> Self {
        let state = MotionState {
            vertical_velocity: 0.0,
            current_height: config.standing_height,
            was_left_closed_previous_frame: false,
            has_auto_started: false,
            horizontal_velocity: Vec3::ZERO,
            heading: 0.0,
        };

        Self {
            config,
            state,
            input: ControlInput::default(),
        }
    }

    pub fn state(&self) -> &MotionState {
        &self.state
    }

    pub fn input(&self) -> &ControlInput {
        &self.input
    }

    /// Size the collider to the starting height
    pub fn attach<E: CharacterEngine>(&self, engine: &mut E) {
        let height = self.state.current_height;
        engine.set_collider(height, height * 0.5);
    }

    /// Advance one frame. `snapshot` is `None` when nothing new arrived.
    pub fn update<E: CharacterEngine>(
        &mut self,
        dt: f32,
        snapshot: Option<LatchSnapshot>,
        engine: &mut E,
    ) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        if let Some(snapshot) = snapshot {
            self.input.apply(snapshot);
            if self.config.auto_forward == AutoForward::OnFirstInput && !self.state.has_auto_started
            {
                self.state.has_auto_started = true;
                info!("First eye input received, auto-run started");
            }
        }

        let grounded = engine.is_grounded();

        self.integrate_vertical(grounded, dt);
        self.handle_jump(grounded);
        self.handle_crouch(dt, engine);
        let horizontal = self.steer(dt, &*engine);

        let velocity = horizontal + Vec3::Y * self.state.vertical_velocity;
        engine.move_by(velocity * dt);
    }

    fn integrate_vertical(&mut self, grounded: bool, dt: f32) {
        if grounded && self.state.vertical_velocity <= 0.0 {
            self.state.vertical_velocity = self.config.ground_stick_velocity;
        }
        self.state.vertical_velocity += self.config.gravity * dt;
    }

    fn handle_jump(&mut self, grounded: bool) {
        let left = self.input.left_closed;
        if grounded && left && !self.state.was_left_closed_previous_frame {
            self.state.vertical_velocity = self.config.jump_impulse;
            debug!(impulse = self.config.jump_impulse, "Jump");
        }
        self.state.was_left_closed_previous_frame = left;
    }

    fn handle_crouch<E: CharacterEngine>(&mut self, dt: f32, engine: &mut E) {
        let target = if self.input.right_closed {
            self.config.crouch_height
        } else {
            self.config.standing_height
        };

        let t = (self.config.crouch_speed * dt).clamp(0.0, 1.0);
        let height = self.state.current_height + (target - self.state.current_height) * t;

        self.state.current_height = height;
        engine.set_collider(height, height * 0.5);
    }

    /// Horizontal velocity for this frame
    fn steer<E: CharacterEngine>(&mut self, dt: f32, engine: &E) -> Vec3 {
        let mut target = match self.config.steering {
            SteeringMode::DirectOffset => {
                let offset = gaze_offset(
                    self.input.gaze_x,
                    self.config.gaze_deadzone,
                    self.config.max_gaze_offset,
                );
                right_axis(self.state.heading) * offset * self.config.move_speed
            }
            SteeringMode::RaycastToWorldPoint => self.raycast_velocity(dt, engine),
        };

        let running = match self.config.auto_forward {
            AutoForward::Off => false,
            AutoForward::Always => true,
            AutoForward::OnFirstInput => self.state.has_auto_started,
        };
        if running {
            target += forward_axis(self.state.heading) * self.config.forward_speed;
        }

        self.state.horizontal_velocity = match self.config.smoothing {
            Some(smoothing) => smoothing.step(self.state.horizontal_velocity, target, dt),
            None => target,
        };
        self.state.horizontal_velocity
    }

    fn raycast_velocity<E: CharacterEngine>(&mut self, dt: f32, engine: &E) -> Vec3 {
        // Raycast gaze is a screen point, so only non-finite values are dropped
        let gaze_x = sanitize_gaze(self.input.gaze_x, f32::MAX);
        let gaze_y = sanitize_gaze(self.input.gaze_y, f32::MAX);

        let position = engine.position();
        let Some(direction) = engine
            .gaze_to_world(gaze_x, gaze_y)
            .and_then(|point| flat_direction(position, point, self.config.raycast_deadzone))
        else {
            return Vec3::ZERO;
        };

        self.state.heading = turn_towards(
            self.state.heading,
            heading_of(direction),
            self.config.turn_rate * dt,
        );
        direction * self.config.move_speed
    }
}
