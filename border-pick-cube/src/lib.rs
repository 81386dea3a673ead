#![warn(missing_docs)]
//! Batched pick-and-place cube task.
//!
//! A robot arm has to grasp a cube on a table and carry it to a goal position, in `B` parallel
//! environments stepped together. [`PickCubeEnv`] implements [`border_core::Env`] on top of any
//! simulation that provides the capabilities in [`sim`].
//!
//! ```no_run
//! use anyhow::Result;
//! use border_core::Env;
//! use border_pick_cube::{fake::FakeSim, PickCubeConfig, PickCubeEnv};
//!
//! fn main() -> Result<()> {
//!     let config = PickCubeConfig::from_task("PickCubeDR-v1")?.num_envs(4);
//!     let mut env = PickCubeEnv::<FakeSim>::build(&config, 0)?;
//!     let obs = env.reset(None)?;
//!     println!("{:?}", obs.flatten()?);
//!     Ok(())
//! }
//! ```
//!
//! * [`RobotTaskConfig`] - task constants of a robot
//! * [`EpisodeRandomizer`] - initial cube and goal placements
//! * [`TaskEvaluator`] - success flags
//! * [`RewardShaper`] - staged dense reward
//! * [`scene::DomainRandomizedSceneBuilder`] - one independently colored cube per environment
mod camera;
mod config;
mod env;
mod episode_evaluator;
pub mod evaluator;
pub mod fake;
mod obs;
pub mod pose;
pub mod randomization;
mod registry;
pub mod reward;
pub mod scene;
pub mod sim;

pub use camera::{look_at, CameraConfig};
pub use config::{PickCubeConfig, RobotFamily, RobotTaskConfig, DEFAULT_ROBOT_UID};
pub use env::{PickCubeEnv, AGENT_BASE_POS};
pub use episode_evaluator::PickCubeEvaluator;
pub use evaluator::{EvaluationResult, TaskEvaluator, TaskState};
pub use obs::{ObsMode, PickCubeAct, PickCubeObs};
pub use pose::Pose;
pub use randomization::{BatchedRng, EpisodeRandomizer};
pub use registry::{TaskSpec, MAX_EPISODE_STEPS, TASKS};
pub use reward::{RewardMode, RewardShaper, MAX_DENSE_REWARD};
pub use scene::SceneVariant;
