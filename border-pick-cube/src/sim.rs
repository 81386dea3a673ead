//! Capabilities the task consumes from a batched physics simulation.
//!
//! The task never steps physics or detects contacts itself. It builds bodies, reads and writes
//! their poses, queries the robot, and registers cameras through these traits, so that the
//! task logic can run against any simulation backend, including the in-memory
//! [`fake`](crate::fake) one used in tests.
use crate::{CameraConfig, Pose};
use anyhow::Result;
use ndarray::Array2;

/// Collision and visual geometry of a body.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    /// Axis-aligned box.
    Box {
        /// Half extents along x, y and z.
        half_size: [f32; 3],
    },
    /// Sphere.
    Sphere {
        /// Radius.
        radius: f32,
    },
}

/// How a body takes part in the dynamics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyType {
    /// Moved by the physics.
    Dynamic,
    /// Moved only by setting its pose.
    Kinematic,
}

/// Description of a body to build.
#[derive(Clone, Debug, PartialEq)]
pub struct ActorBuilder {
    /// Unique name.
    pub name: String,

    /// Geometry.
    pub shape: Shape,

    /// Base color of the visual material, RGBA.
    pub color: [f32; 4],

    /// Body type.
    pub body_type: BodyType,

    /// Whether the geometry collides.
    pub collision: bool,

    /// Environment slots the body exists in. `None` means every slot.
    pub scene_idxs: Option<Vec<usize>>,

    /// Pose set right after building, a single row applied to every slot.
    pub initial_pose: Pose,
}

impl ActorBuilder {
    /// A dynamic cube with collision.
    pub fn cube(name: impl Into<String>, half_size: f32) -> Self {
        Self {
            name: name.into(),
            shape: Shape::Box {
                half_size: [half_size; 3],
            },
            color: [1.0, 0.0, 0.0, 1.0],
            body_type: BodyType::Dynamic,
            collision: true,
            scene_idxs: None,
            initial_pose: Pose::single([0.0, 0.0, half_size], crate::pose::IDENTITY_QUAT),
        }
    }

    /// A dynamic sphere with collision.
    pub fn sphere(name: impl Into<String>, radius: f32) -> Self {
        Self {
            name: name.into(),
            shape: Shape::Sphere { radius },
            color: [1.0, 1.0, 1.0, 1.0],
            body_type: BodyType::Dynamic,
            collision: true,
            scene_idxs: None,
            initial_pose: Pose::single([0.0; 3], crate::pose::IDENTITY_QUAT),
        }
    }

    /// Sets the base color.
    pub fn color(mut self, color: [f32; 4]) -> Self {
        self.color = color;
        self
    }

    /// Makes the body kinematic.
    pub fn kinematic(mut self) -> Self {
        self.body_type = BodyType::Kinematic;
        self
    }

    /// Removes the collision geometry.
    pub fn without_collision(mut self) -> Self {
        self.collision = false;
        self
    }

    /// Restricts the body to the given environment slots.
    pub fn scene_idxs(mut self, scene_idxs: Vec<usize>) -> Self {
        self.scene_idxs = Some(scene_idxs);
        self
    }

    /// Sets the initial pose.
    pub fn initial_pose(mut self, pose: Pose) -> Self {
        self.initial_pose = pose;
        self
    }
}

/// A body, possibly existing in several environment slots.
pub trait Actor {
    /// Name of the body.
    fn name(&self) -> &str;

    /// Environment slots the body exists in, in the row order of [`Actor::pose`].
    fn scene_idxs(&self) -> Vec<usize>;

    /// Current pose, one row per slot.
    fn pose(&self) -> Pose;

    /// Sets the pose of the slots `env_idx`; row `r` of `pose` goes to slot `env_idx[r]`.
    fn set_pose(&mut self, env_idx: &[usize], pose: &Pose) -> Result<()>;
}

/// Read access to the robot state.
pub trait Robot {
    /// Joint positions, `[B, dof]`.
    fn qpos(&self) -> Array2<f32>;

    /// Joint velocities, `[B, dof]`.
    fn qvel(&self) -> Array2<f32>;

    /// Pose of the tool center point.
    fn tcp_pose(&self) -> Pose;

    /// Whether the gripper holds the named body, per environment.
    fn is_grasping(&self, object: &str) -> Vec<bool>;
}

/// A batched simulation of `B` environment slots.
pub trait Simulation {
    /// Handle of a built body.
    type Actor: Actor;

    /// Handle of the robot.
    type Robot: Robot;

    /// Creates a simulation with `num_envs` slots.
    fn create(num_envs: usize) -> Result<Self>
    where
        Self: Sized;

    /// Number of environment slots.
    fn num_envs(&self) -> usize;

    /// Loads the robot with the given base pose.
    fn load_agent(&mut self, robot_uid: &str, base_pose: &Pose) -> Result<()>;

    /// The loaded robot.
    fn robot(&self) -> &Self::Robot;

    /// Builds the table workspace.
    fn build_table(&mut self, robot_init_qpos_noise: f32) -> Result<()>;

    /// Resets the table workspace and the robot of the slots `env_idx`.
    fn initialize_table(&mut self, env_idx: &[usize]) -> Result<()>;

    /// Builds a body. Built bodies are part of the state snapshot.
    fn build_actor(&mut self, builder: ActorBuilder) -> Result<Self::Actor>;

    /// Excludes a body from rendered observations.
    fn hide(&mut self, name: &str);

    /// Registers a camera.
    fn add_camera(&mut self, camera: &CameraConfig) -> Result<()>;

    /// Includes a body in the state snapshot.
    fn add_to_state_registry(&mut self, name: &str);

    /// Excludes a body from the state snapshot.
    fn remove_from_state_registry(&mut self, name: &str);

    /// Applies actions, `[B, action_dim]`, and advances the physics by one control step.
    fn step(&mut self, action: &Array2<f32>) -> Result<()>;
}
