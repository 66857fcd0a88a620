//! Gaze-to-steering policies

use std::str::FromStr;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::input::UnknownVariant;

/// How gaze becomes horizontal motion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SteeringMode {
    /// Gaze X is a lateral offset, strafing along the character's right axis
    #[default]
    DirectOffset,
    /// Gaze is projected into the world and the character walks toward it
    RaycastToWorldPoint,
}

impl FromStr for SteeringMode {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" | "direct_offset" => Ok(Self::DirectOffset),
            "raycast" | "raycast_to_world_point" => Ok(Self::RaycastToWorldPoint),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

/// Constant forward running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoForward {
    #[default]
    Off,
    Always,
    /// Start running the first time any input arrives, then never stop
    OnFirstInput,
}

impl FromStr for AutoForward {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(Self::Off),
            "always" => Ok(Self::Always),
            "on_first_input" => Ok(Self::OnFirstInput),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

/// Linear acceleration/deceleration of horizontal velocity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HorizontalSmoothing {
    /// Rate toward a non-zero target (units/s²)
    pub acceleration: f32,
    /// Rate toward rest (units/s²)
    pub deceleration: f32,
}

impl Default for HorizontalSmoothing {
    fn default() -> Self {
        Self {
            acceleration: 10.0,
            deceleration: 10.0,
        }
    }
}

impl HorizontalSmoothing {
    /// Step `current` toward `target` for one frame
    pub fn step(&self, current: Vec3, target: Vec3, dt: f32) -> Vec3 {
        let rate = if target.length() > 0.1 {
            self.acceleration
        } else {
            self.deceleration
        };
        move_towards(current, target, rate * dt)
    }
}

/// Replace NaN with zero and clamp to `±max`
pub fn sanitize_gaze(gaze: f32, max: f32) -> f32 {
    if gaze.is_nan() {
        return 0.0;
    }
    gaze.clamp(-max, max)
}

/// Lateral offset after the deadzone
pub fn gaze_offset(gaze_x: f32, deadzone: f32, max: f32) -> f32 {
    let gaze = sanitize_gaze(gaze_x, max);
    if gaze.abs() > deadzone {
        gaze
    } else {
        0.0
    }
}

/// Unit direction on the horizontal plane from `position` toward `target`,
/// or `None` when the target is within `deadzone`
pub fn flat_direction(position: Vec3, target: Vec3, deadzone: f32) -> Option<Vec3> {
    let mut delta = target - position;
    delta.y = 0.0;

    let distance = delta.length();
    if distance > deadzone && distance.is_finite() {
        Some(delta / distance)
    } else {
        None
    }
}

/// Forward axis for a yaw (0 = +Z)
pub fn forward_axis(heading: f32) -> Vec3 {
    let (sin, cos) = heading.sin_cos();
    Vec3::new(sin, 0.0, cos)
}

/// Right axis for a yaw (0 = +X)
pub fn right_axis(heading: f32) -> Vec3 {
    let (sin, cos) = heading.sin_cos();
    Vec3::new(cos, 0.0, -sin)
}

/// Yaw of a horizontal direction
pub fn heading_of(direction: Vec3) -> f32 {
    direction.x.atan2(direction.z)
}

/// Interpolate yaw along the shortest arc, `t` in 0..=1
pub fn turn_towards(heading: f32, target: f32, t: f32) -> f32 {
    use std::f32::consts::{PI, TAU};

    let delta = (target - heading + PI).rem_euclid(TAU) - PI;
    let turned = heading + delta * t.clamp(0.0, 1.0);
    (turned + PI).rem_euclid(TAU) - PI
}

/// Move `current` toward `target` by at most `max_delta`
pub fn move_towards(current: Vec3, target: Vec3, max_delta: f32) -> Vec3 {
    let delta = target - current;
    let distance = delta.length();
    if distance <= max_delta || distance == 0.0 {
        target
    } else {
        current + delta / distance * max_delta
    }
}
