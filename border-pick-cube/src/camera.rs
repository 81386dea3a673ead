//! Camera viewpoints registered by the task.
use crate::{pose::to_wxyz, RobotTaskConfig};
use nalgebra::{Rotation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_2;

/// Configuration of a camera.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Unique name of the camera.
    pub uid: String,

    /// Camera position.
    pub eye: [f32; 3],

    /// Point the camera looks at.
    pub target: [f32; 3],

    /// Image width in pixels.
    pub width: u32,

    /// Image height in pixels.
    pub height: u32,

    /// Vertical field of view in radians.
    pub fov: f32,

    /// Near clip plane.
    pub near: f32,

    /// Far clip plane.
    pub far: f32,
}

impl CameraConfig {
    /// Camera used for sensor observations.
    pub fn sensor(cfg: &RobotTaskConfig) -> Self {
        Self {
            uid: "base_camera".to_string(),
            eye: cfg.sensor_cam_eye_pos,
            target: cfg.sensor_cam_target_pos,
            width: 128,
            height: 128,
            fov: FRAC_PI_2,
            near: 0.01,
            far: 100.0,
        }
    }

    /// Camera used for rendering to humans.
    pub fn human(cfg: &RobotTaskConfig) -> Self {
        Self {
            uid: "render_camera".to_string(),
            eye: cfg.human_cam_eye_pos,
            target: cfg.human_cam_target_pos,
            width: 512,
            height: 512,
            fov: 1.0,
            near: 0.01,
            far: 100.0,
        }
    }

    /// Camera pose as position and `[w, x, y, z]` quaternion.
    pub fn pose(&self) -> ([f32; 3], [f32; 4]) {
        (self.eye, look_at(self.eye, self.target))
    }
}

/// Orientation of a frame at `eye` whose x axis points at `target` and whose z axis is as
/// close to world up as possible, as a `[w, x, y, z]` quaternion.
pub fn look_at(eye: [f32; 3], target: [f32; 3]) -> [f32; 4] {
    let forward = (Vector3::from(target) - Vector3::from(eye)).normalize();
    let mut left = Vector3::z().cross(&forward);
    if left.norm() < 1e-6 {
        // Looking straight up or down.
        left = Vector3::y();
    }
    let left = left.normalize();
    let up = forward.cross(&left);
    let rotation = Rotation3::from_basis_unchecked(&[forward, left, up]);
    to_wxyz(&UnitQuaternion::from_rotation_matrix(&rotation))
}
