//! Success evaluation of the pick-and-place task.
use crate::{
    pose::{row_distances, row_norms},
    scene::CubeActor,
    sim::{Actor, Robot, Simulation},
    RobotTaskConfig,
};
use border_core::{
    record::{Record, RecordValue},
    Info,
};
use ndarray::{s, Array1, Array2, ArrayView2};

/// Snapshot of the simulation quantities the task depends on.
#[derive(Clone, Debug, PartialEq)]
pub struct TaskState {
    /// Tool center point positions, `[B, 3]`.
    pub tcp_pos: Array2<f32>,

    /// Cube positions, `[B, 3]`.
    pub obj_pos: Array2<f32>,

    /// Goal positions, `[B, 3]`.
    pub goal_pos: Array2<f32>,

    /// Full joint velocities including finger joints, `[B, dof]`.
    pub qvel: Array2<f32>,

    /// Grasp flags.
    pub is_grasped: Vec<bool>,
}

impl TaskState {
    /// Reads the current state from the simulation.
    pub fn capture<S: Simulation, G: Actor>(
        sim: &S,
        cube: &CubeActor<S::Actor>,
        goal_site: &G,
    ) -> Self {
        let robot = sim.robot();
        Self {
            tcp_pos: robot.tcp_pose().p,
            obj_pos: cube.pose().p,
            goal_pos: goal_site.pose().p,
            qvel: robot.qvel(),
            is_grasped: cube.grasped_by(robot),
        }
    }

    /// Batch size.
    pub fn len(&self) -> usize {
        self.obj_pos.nrows()
    }

    /// Returns `true` if the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Removes the trailing `finger_dof` joints from the joint velocities.
pub fn strip_finger_vel(qvel: &Array2<f32>, finger_dof: usize) -> ArrayView2<f32> {
    let keep = qvel.ncols().saturating_sub(finger_dof);
    qvel.slice(s![.., ..keep])
}

/// Per-environment evaluation of the task.
#[derive(Clone, Debug, PartialEq)]
pub struct EvaluationResult {
    /// The cube is placed and the robot is static.
    pub success: Vec<bool>,

    /// The cube is within the success threshold of the goal.
    pub is_obj_placed: Vec<bool>,

    /// The stripped joint velocity norm is below the static threshold.
    pub is_robot_static: Vec<bool>,

    /// The robot holds the cube.
    pub is_grasped: Vec<bool>,

    /// Distance between the cube and the goal.
    pub obj_goal_dist: Array1<f32>,

    /// Norm of the joint velocities without finger joints.
    pub vel_norm: Array1<f32>,
}

impl Info for EvaluationResult {}

impl EvaluationResult {
    /// Keys of [`EvaluationResult::to_record`].
    pub const KEYS: [&'static str; 6] = [
        "success",
        "is_obj_placed",
        "is_robot_static",
        "is_grasped",
        "obj_goal_dist",
        "vel_norm",
    ];

    /// Batch size.
    pub fn len(&self) -> usize {
        self.success.len()
    }

    /// Returns `true` if the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.success.is_empty()
    }

    /// Record with exactly the keys in [`EvaluationResult::KEYS`].
    pub fn to_record(&self) -> Record {
        Record::from_slice(&[
            ("success", RecordValue::Flags(self.success.clone())),
            ("is_obj_placed", RecordValue::Flags(self.is_obj_placed.clone())),
            ("is_robot_static", RecordValue::Flags(self.is_robot_static.clone())),
            ("is_grasped", RecordValue::Flags(self.is_grasped.clone())),
            ("obj_goal_dist", RecordValue::Array1(self.obj_goal_dist.to_vec())),
            ("vel_norm", RecordValue::Array1(self.vel_norm.to_vec())),
        ])
    }
}

/// Computes success flags from the task state.
#[derive(Clone, Debug)]
pub struct TaskEvaluator {
    goal_thresh: f32,
    finger_dof: usize,
    static_threshold: f32,
}

impl TaskEvaluator {
    /// Creates an evaluator for the given task constants.
    pub fn new(cfg: &RobotTaskConfig) -> Self {
        Self {
            goal_thresh: cfg.goal_thresh,
            finger_dof: cfg.finger_dof(),
            static_threshold: cfg.static_threshold(),
        }
    }

    /// Number of stripped finger joints.
    pub fn finger_dof(&self) -> usize {
        self.finger_dof
    }

    /// Norm of the joint velocities without finger joints, per environment.
    pub fn stripped_vel_norm(&self, qvel: &Array2<f32>) -> Array1<f32> {
        row_norms(strip_finger_vel(qvel, self.finger_dof))
    }

    /// Evaluates every environment of the batch.
    pub fn evaluate(&self, state: &TaskState) -> EvaluationResult {
        let obj_goal_dist = row_distances(state.goal_pos.view(), state.obj_pos.view());
        let vel_norm = self.stripped_vel_norm(&state.qvel);

        let is_obj_placed: Vec<bool> = obj_goal_dist
            .iter()
            .map(|&d| d <= self.goal_thresh)
            .collect();
        let is_robot_static: Vec<bool> = vel_norm
            .iter()
            .map(|&v| v < self.static_threshold)
            .collect();
        let success = is_obj_placed
            .iter()
            .zip(is_robot_static.iter())
            .map(|(&placed, &still)| placed && still)
            .collect();

        EvaluationResult {
            success,
            is_obj_placed,
            is_robot_static,
            is_grasped: state.is_grasped.clone(),
            obj_goal_dist,
            vel_norm,
        }
    }
}
