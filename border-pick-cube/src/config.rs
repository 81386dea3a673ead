//! Task constants per robot and configuration of [`PickCubeEnv`](crate::PickCubeEnv).
use crate::{ObsMode, RewardMode, SceneVariant, TaskSpec};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Robot identifier used when the requested one is not in the task table.
pub const DEFAULT_ROBOT_UID: &str = "panda";

/// Robot families with distinct gripper kinematics.
///
/// The family decides how many trailing finger joints are removed from the joint velocity
/// before the stillness check and how loose that check is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RobotFamily {
    /// Franka Emika Panda, two finger joints.
    Panda,
    /// Fetch mobile manipulator.
    Fetch,
    /// UFactory xArm6 with a Robotiq gripper, two finger joints.
    XArm6,
    /// SO-100 arm, one gripper joint.
    So100,
    /// WidowX AI, two finger joints.
    WidowXAi,
    /// Any robot outside of the supported set.
    Other,
}

impl RobotFamily {
    /// Resolves the family of a robot identifier. Unsupported identifiers map to
    /// [`RobotFamily::Other`].
    pub fn from_uid(uid: &str) -> Self {
        match uid {
            "panda" => Self::Panda,
            "fetch" => Self::Fetch,
            "xarm6_robotiq" => Self::XArm6,
            "so100" => Self::So100,
            "widowxai" => Self::WidowXAi,
            _ => Self::Other,
        }
    }

    /// The number of trailing gripper joints excluded from the stillness check.
    pub fn finger_dof(&self) -> usize {
        match self {
            Self::Panda | Self::WidowXAi | Self::XArm6 => 2,
            Self::So100 => 1,
            Self::Fetch | Self::Other => 0,
        }
    }

    /// Upper bound (exclusive) of the stripped joint-velocity norm for a static robot.
    pub fn static_threshold(&self) -> f32 {
        match self {
            Self::XArm6 => 1.0,
            _ => 0.2,
        }
    }
}

/// Task constants of a robot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RobotTaskConfig {
    /// Robot family resolved from the identifier.
    pub family: RobotFamily,

    /// Half of the edge length of the cube.
    pub cube_half_size: f32,

    /// Success distance between the cube and the goal.
    pub goal_thresh: f32,

    /// Half size of the square region where the cube and the goal are spawned.
    pub cube_spawn_half_size: f32,

    /// Center of the spawn region on the table.
    pub cube_spawn_center: [f32; 2],

    /// Maximum height of the goal above the resting cube.
    pub max_goal_height: f32,

    /// Eye position of the sensor camera.
    pub sensor_cam_eye_pos: [f32; 3],

    /// Target position of the sensor camera.
    pub sensor_cam_target_pos: [f32; 3],

    /// Eye position of the human render camera.
    pub human_cam_eye_pos: [f32; 3],

    /// Target position of the human render camera.
    pub human_cam_target_pos: [f32; 3],
}

impl RobotTaskConfig {
    /// Returns the task constants of a robot.
    ///
    /// Unsupported identifiers fall back to the constants of [`DEFAULT_ROBOT_UID`]; the robot
    /// family stays [`RobotFamily::Other`], so no joints are stripped for them.
    pub fn resolve(robot_uid: &str) -> Self {
        let family = RobotFamily::from_uid(robot_uid);
        let table_family = match family {
            RobotFamily::Other => {
                log::warn!(
                    "No pick-cube constants for robot {:?}, using those of {:?}",
                    robot_uid,
                    DEFAULT_ROBOT_UID
                );
                RobotFamily::Panda
            }
            f => f,
        };

        Self {
            family,
            ..Self::table(table_family)
        }
    }

    /// Number of gripper joints stripped from the joint velocity.
    pub fn finger_dof(&self) -> usize {
        self.family.finger_dof()
    }

    /// Stillness threshold of the robot.
    pub fn static_threshold(&self) -> f32 {
        self.family.static_threshold()
    }

    fn table(family: RobotFamily) -> Self {
        match family {
            RobotFamily::So100 => Self {
                family,
                cube_half_size: 0.0125,
                goal_thresh: 0.0125 * 1.25,
                cube_spawn_half_size: 0.05,
                cube_spawn_center: [-0.46, -0.1],
                max_goal_height: 0.08,
                sensor_cam_eye_pos: [-0.27, 0.0, 0.4],
                sensor_cam_target_pos: [-0.56, 0.0, -0.25],
                human_cam_eye_pos: [-0.1, 0.3, 0.4],
                human_cam_target_pos: [-0.46, 0.0, 0.1],
            },
            _ => Self {
                family,
                cube_half_size: 0.02,
                goal_thresh: 0.025,
                cube_spawn_half_size: 0.1,
                cube_spawn_center: [0.0, 0.0],
                max_goal_height: 0.3,
                sensor_cam_eye_pos: [0.3, 0.0, 0.6],
                sensor_cam_target_pos: [-0.1, 0.0, 0.1],
                human_cam_eye_pos: [0.6, 0.7, 0.6],
                human_cam_target_pos: [0.0, 0.0, 0.35],
            },
        }
    }
}

/// Configuration of [`PickCubeEnv`](crate::PickCubeEnv).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PickCubeConfig {
    /// Robot identifier.
    pub robot_uid: String,

    /// Number of parallel environments.
    pub num_envs: usize,

    /// Scene construction strategy.
    pub variant: SceneVariant,

    /// Observation mode.
    pub obs_mode: ObsMode,

    /// Reward mode.
    pub reward_mode: RewardMode,

    /// Noise of the initial joint positions, forwarded to the table scene.
    pub robot_init_qpos_noise: f32,

    /// Episodes are truncated after this number of steps.
    pub max_episode_steps: usize,

    /// Root seed of the per-environment random streams.
    pub seed: u64,
}

impl Default for PickCubeConfig {
    fn default() -> Self {
        Self {
            robot_uid: DEFAULT_ROBOT_UID.to_string(),
            num_envs: 1,
            variant: SceneVariant::Default,
            obs_mode: ObsMode::State,
            reward_mode: RewardMode::NormalizedDense,
            robot_init_qpos_noise: 0.02,
            max_episode_steps: crate::MAX_EPISODE_STEPS,
            seed: 0,
        }
    }
}

impl PickCubeConfig {
    /// Default configuration of a registered task.
    pub fn from_task(task_id: &str) -> Result<Self> {
        let spec = TaskSpec::lookup(task_id)?;
        Ok(Self {
            robot_uid: spec.robot_uid.to_string(),
            variant: spec.variant,
            max_episode_steps: spec.max_episode_steps,
            ..Self::default()
        })
    }

    /// Sets the robot identifier.
    pub fn robot_uid(mut self, robot_uid: impl Into<String>) -> Self {
        self.robot_uid = robot_uid.into();
        self
    }

    /// Sets the number of parallel environments.
    pub fn num_envs(mut self, num_envs: usize) -> Self {
        self.num_envs = num_envs;
        self
    }

    /// Sets the scene construction strategy.
    pub fn variant(mut self, variant: SceneVariant) -> Self {
        self.variant = variant;
        self
    }

    /// Sets the observation mode.
    pub fn obs_mode(mut self, obs_mode: ObsMode) -> Self {
        self.obs_mode = obs_mode;
        self
    }

    /// Sets the reward mode.
    pub fn reward_mode(mut self, reward_mode: RewardMode) -> Self {
        self.reward_mode = reward_mode;
        self
    }

    /// Sets the noise of the initial joint positions.
    pub fn robot_init_qpos_noise(mut self, v: f32) -> Self {
        self.robot_init_qpos_noise = v;
        self
    }

    /// Sets the maximum number of steps in an episode.
    pub fn max_episode_steps(mut self, v: usize) -> Self {
        self.max_episode_steps = v;
        self
    }

    /// Sets the root seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Loads [`PickCubeConfig`] from YAML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`PickCubeConfig`] as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    const SUPPORTED: [&str; 5] = ["panda", "fetch", "xarm6_robotiq", "so100", "widowxai"];

    #[test]
    fn test_resolve_supported_robots() {
        let panda = RobotTaskConfig::resolve("panda");
        assert_eq!(panda.family, RobotFamily::Panda);
        assert_eq!(panda.cube_half_size, 0.02);
        assert_eq!(panda.goal_thresh, 0.025);
        assert_eq!(panda.max_goal_height, 0.3);

        let so100 = RobotTaskConfig::resolve("so100");
        assert_eq!(so100.family, RobotFamily::So100);
        assert_eq!(so100.cube_half_size, 0.0125);
        assert_eq!(so100.cube_spawn_center, [-0.46, -0.1]);
        assert_eq!(so100.finger_dof(), 1);
    }

    #[test]
    fn test_unknown_robot_falls_back_to_panda_constants() {
        let cfg = RobotTaskConfig::resolve("ur5e");
        let panda = RobotTaskConfig::resolve("panda");

        assert_eq!(cfg.family, RobotFamily::Other);
        assert_eq!(cfg.finger_dof(), 0);
        assert_eq!(cfg.static_threshold(), 0.2);
        assert_eq!(
            RobotTaskConfig {
                family: RobotFamily::Panda,
                ..cfg
            },
            panda
        );
    }

    #[test]
    fn test_constants_are_positive() {
        for uid in SUPPORTED.iter().chain(["unknown"].iter()) {
            let cfg = RobotTaskConfig::resolve(uid);
            assert!(cfg.cube_half_size > 0.0, "{}", uid);
            assert!(cfg.goal_thresh > 0.0, "{}", uid);
            assert!(cfg.cube_spawn_half_size > 0.0, "{}", uid);
            assert!(cfg.max_goal_height > 0.0, "{}", uid);
        }
    }

    #[test]
    fn test_family_dispatch() {
        let strip: Vec<usize> = SUPPORTED
            .iter()
            .map(|uid| RobotFamily::from_uid(uid).finger_dof())
            .collect();
        assert_eq!(strip, vec![2, 0, 2, 1, 2]);

        assert_eq!(RobotFamily::XArm6.static_threshold(), 1.0);
        assert_eq!(RobotFamily::Panda.static_threshold(), 0.2);
        assert_eq!(RobotFamily::So100.static_threshold(), 0.2);
    }

    #[test]
    fn test_serde_pick_cube_config() -> Result<()> {
        let config = PickCubeConfig::default()
            .robot_uid("so100")
            .num_envs(8)
            .variant(SceneVariant::DomainRandomized)
            .reward_mode(RewardMode::Dense)
            .seed(7);

        let dir = TempDir::new("pick_cube_config")?;
        let path = dir.path().join("pick_cube.yaml");
        config.save(&path)?;
        let config_ = PickCubeConfig::load(&path)?;
        assert_eq!(config, config_);
        Ok(())
    }

    #[test]
    fn test_from_task() -> Result<()> {
        let config = PickCubeConfig::from_task("PickCubeDR-v1")?;
        assert_eq!(config.robot_uid, "panda");
        assert_eq!(config.variant, SceneVariant::DomainRandomized);
        assert_eq!(config.max_episode_steps, 50);

        assert!(PickCubeConfig::from_task("PickCube-v0").is_err());
        Ok(())
    }
}
