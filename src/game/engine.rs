//! Character engine boundary
//!
//! The controller never resolves collisions itself. It asks the host engine
//! whether the character is grounded, resizes the collider and requests one
//! displacement per frame.

use glam::Vec3;

/// What the motion controller needs from the host engine
pub trait CharacterEngine {
    /// Whether the last displacement left the character on the ground
    fn is_grounded(&self) -> bool;

    /// Current world position of the character's feet
    fn position(&self) -> Vec3;

    /// Resize the collider; `center_y` is measured from the feet
    fn set_collider(&mut self, height: f32, center_y: f32);

    /// Move by an already dt-scaled displacement
    fn move_by(&mut self, displacement: Vec3);

    /// Project a gaze point onto the world. Engines without a camera return
    /// `None`, which disables raycast steering.
    fn gaze_to_world(&self, _gaze_x: f32, _gaze_y: f32) -> Option<Vec3> {
        None
    }
}

/// Chase camera used to project gaze onto the ground plane
///
/// Gaze coordinates are normalized screen offsets: -1..1 left to right and
/// -1..1 bottom to top.
#[derive(Debug, Clone, Copy)]
pub struct GazeCamera {
    pub height: f32,
    pub distance_back: f32,
    /// Downward pitch in radians
    pub pitch: f32,
    /// tan(vertical_fov / 2)
    pub half_fov_tan: f32,
    pub aspect: f32,
}

impl Default for GazeCamera {
    fn default() -> Self {
        Self {
            height: 3.0,
            distance_back: 6.0,
            pitch: 0.35,
            half_fov_tan: 0.6,
            aspect: 16.0 / 9.0,
        }
    }
}

impl GazeCamera {
    /// Intersect the gaze ray with the horizontal plane through `anchor`
    pub fn project(&self, anchor: Vec3, gaze_x: f32, gaze_y: f32) -> Option<Vec3> {
        let origin = anchor + Vec3::new(0.0, self.height, -self.distance_back);
        let (sin_p, cos_p) = self.pitch.sin_cos();
        let forward = Vec3::new(0.0, -sin_p, cos_p);
        let up = Vec3::new(0.0, cos_p, sin_p);

        let dir = forward
            + Vec3::X * gaze_x * self.half_fov_tan * self.aspect
            + up * gaze_y * self.half_fov_tan;

        // At or above the horizon the ray never reaches the plane
        if dir.y >= -1e-4 {
            return None;
        }

        let t = (anchor.y - origin.y) / dir.y;
        let hit = origin + dir * t;
        hit.is_finite().then_some(hit)
    }
}

/// Kinematic character on an infinite flat floor
#[derive(Debug, Clone)]
pub struct FlatGroundEngine {
    position: Vec3,
    ground_y: f32,
    grounded: bool,
    collider_height: f32,
    collider_center_y: f32,
    camera: GazeCamera,
}

impl FlatGroundEngine {
    pub fn new(ground_y: f32) -> Self {
        Self {
            position: Vec3::new(0.0, ground_y, 0.0),
            ground_y,
            grounded: true,
            collider_height: 0.0,
            collider_center_y: 0.0,
            camera: GazeCamera::default(),
        }
    }

    /// Current collider as `(height, center_y)`
    pub fn collider(&self) -> (f32, f32) {
        (self.collider_height, self.collider_center_y)
    }
}

impl Default for FlatGroundEngine {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl CharacterEngine for FlatGroundEngine {
    fn is_grounded(&self) -> bool {
        self.grounded
    }

    fn position(&self) -> Vec3 {
        self.position
    }

    fn set_collider(&mut self, height: f32, center_y: f32) {
        self.collider_height = height;
        self.collider_center_y = center_y;
    }

    fn move_by(&mut self, displacement: Vec3) {
        if !displacement.is_finite() {
            return;
        }

        self.position += displacement;
        if self.position.y <= self.ground_y {
            self.position.y = self.ground_y;
            self.grounded = true;
        } else {
            self.grounded = false;
        }
    }

    fn gaze_to_world(&self, gaze_x: f32, gaze_y: f32) -> Option<Vec3> {
        self.camera.project(self.position, gaze_x, gaze_y)
    }
}
