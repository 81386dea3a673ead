//! Registered pick-and-place tasks.
use crate::SceneVariant;
use anyhow::Result;
use border_core::error::BorderError;

/// Episode length of every registered task.
pub const MAX_EPISODE_STEPS: usize = 50;

/// A registered task.
#[derive(Clone, Debug, PartialEq)]
pub struct TaskSpec {
    /// Task identifier.
    pub id: &'static str,

    /// Robot identifier.
    pub robot_uid: &'static str,

    /// Human-readable robot name.
    pub robot_name: &'static str,

    /// Scene construction strategy.
    pub variant: SceneVariant,

    /// Episodes are truncated after this number of steps.
    pub max_episode_steps: usize,
}

/// All registered tasks.
pub const TASKS: [TaskSpec; 4] = [
    TaskSpec {
        id: "PickCube-v1",
        robot_uid: "panda",
        robot_name: "Panda",
        variant: SceneVariant::Default,
        max_episode_steps: MAX_EPISODE_STEPS,
    },
    TaskSpec {
        id: "PickCubeSO100-v1",
        robot_uid: "so100",
        robot_name: "SO100",
        variant: SceneVariant::Default,
        max_episode_steps: MAX_EPISODE_STEPS,
    },
    TaskSpec {
        id: "PickCubeWidowXAI-v1",
        robot_uid: "widowxai",
        robot_name: "WidowXAI",
        variant: SceneVariant::Default,
        max_episode_steps: MAX_EPISODE_STEPS,
    },
    TaskSpec {
        id: "PickCubeDR-v1",
        robot_uid: "panda",
        robot_name: "Panda",
        variant: SceneVariant::DomainRandomized,
        max_episode_steps: MAX_EPISODE_STEPS,
    },
];

impl TaskSpec {
    /// Looks up a registered task.
    pub fn lookup(id: &str) -> Result<&'static TaskSpec> {
        TASKS
            .iter()
            .find(|spec| spec.id == id)
            .ok_or_else(|| BorderError::UnknownTask(id.to_string()).into())
    }

    /// Identifiers of all registered tasks.
    pub fn ids() -> impl Iterator<Item = &'static str> {
        TASKS.iter().map(|spec| spec.id)
    }

    /// Short description of the task.
    pub fn description(&self) -> String {
        let mut s = format!(
            "Grasp a red cube with the {} robot and move it to a goal position marked by a \
             green sphere. The cube is placed flat on the table with a random position and \
             rotation about the vertical axis, and the goal is placed above the table. \
             Success requires the cube to be within the goal threshold of the goal while the \
             robot is static.",
            self.robot_name
        );
        if self.variant == SceneVariant::DomainRandomized {
            s.push_str(" Every environment has a cube of its own random color.");
        }
        s
    }
}
