//! Batched pick-and-place environment.
use crate::{
    evaluator::{EvaluationResult, TaskEvaluator, TaskState},
    pose::IDENTITY_QUAT,
    randomization::EpisodeRandomizer,
    reward::{RewardShaper, StageMeans, MAX_DENSE_REWARD},
    scene::{build_cube, build_goal_site, CubeActor},
    sim::{Actor, Robot, Simulation},
    BatchedRng, CameraConfig, PickCubeAct, PickCubeConfig, PickCubeObs, Pose, RobotTaskConfig,
};
use anyhow::Result;
use border_core::{error::BorderError, record::Record, Env, Step};
use log::{info, trace};
use ndarray::{Array1, Array2};

/// Base position of the robot.
pub const AGENT_BASE_POS: [f32; 3] = [-0.615, 0.0, 0.0];

/// Grasp a cube and carry it to a goal, in `B` parallel environments.
///
/// The environment owns the simulation `S`. Construction loads the robot, registers the
/// cameras and builds the table, the cube and the goal marker. Nothing is placed until the
/// first call to [`Env::reset`].
pub struct PickCubeEnv<S: Simulation> {
    config: PickCubeConfig,
    task: RobotTaskConfig,
    sim: S,
    cube: CubeActor<S::Actor>,
    goal_site: S::Actor,
    rng: BatchedRng,
    randomizer: EpisodeRandomizer,
    evaluator: TaskEvaluator,
    shaper: RewardShaper,
    elapsed_steps: Vec<usize>,
    cameras: Vec<CameraConfig>,
}

impl<S: Simulation> PickCubeEnv<S> {
    /// Builds the scene of the task in `sim`.
    pub fn new(config: PickCubeConfig, mut sim: S) -> Result<Self> {
        let num_envs = sim.num_envs();
        if num_envs != config.num_envs {
            return Err(BorderError::BatchSizeMismatch {
                name: "simulation".to_string(),
                expected: config.num_envs,
                actual: num_envs,
            }
            .into());
        }

        let task = RobotTaskConfig::resolve(&config.robot_uid);
        sim.load_agent(
            &config.robot_uid,
            &Pose::single(AGENT_BASE_POS, IDENTITY_QUAT),
        )?;

        let cameras = vec![CameraConfig::sensor(&task), CameraConfig::human(&task)];
        for camera in cameras.iter() {
            sim.add_camera(camera)?;
        }
        log::debug!("Registered {} cameras", cameras.len());

        sim.build_table(config.robot_init_qpos_noise)?;
        let mut rng = BatchedRng::new(num_envs, config.seed);
        let cube = build_cube(config.variant, &mut sim, task.cube_half_size, &mut rng)?;
        let goal_site = build_goal_site(&mut sim, task.goal_thresh)?;

        info!(
            "Built PickCubeEnv: robot = {:?}, num_envs = {}, variant = {:?}",
            config.robot_uid, num_envs, config.variant
        );

        Ok(Self {
            randomizer: EpisodeRandomizer::new(&task),
            evaluator: TaskEvaluator::new(&task),
            shaper: RewardShaper::new(&task),
            elapsed_steps: vec![0; num_envs],
            config,
            task,
            sim,
            cube,
            goal_site,
            rng,
            cameras,
        })
    }

    /// Configuration of the environment.
    pub fn config(&self) -> &PickCubeConfig {
        &self.config
    }

    /// Task constants of the robot.
    pub fn task_config(&self) -> &RobotTaskConfig {
        &self.task
    }

    /// The simulation.
    pub fn sim(&self) -> &S {
        &self.sim
    }

    /// The simulation, mutably.
    pub fn sim_mut(&mut self) -> &mut S {
        &mut self.sim
    }

    /// The cube.
    pub fn cube(&self) -> &CubeActor<S::Actor> {
        &self.cube
    }

    /// The goal marker.
    pub fn goal_site(&self) -> &S::Actor {
        &self.goal_site
    }

    /// Registered cameras, the sensor camera first.
    pub fn cameras(&self) -> &[CameraConfig] {
        &self.cameras
    }

    /// Steps taken since the last reset, per environment.
    pub fn elapsed_steps(&self) -> &[usize] {
        &self.elapsed_steps
    }

    fn check_indices(&self, env_idx: &[usize]) -> Result<()> {
        let num_envs = self.elapsed_steps.len();
        match env_idx.iter().find(|&&i| i >= num_envs) {
            Some(&index) => Err(BorderError::InvalidEnvIndex { index, num_envs }.into()),
            None => Ok(()),
        }
    }

    /// Starts new episodes in the environments `env_idx`.
    ///
    /// The table scene of these environments is reinitialized first. Then cube and goal poses
    /// are drawn from the random streams of these environments only.
    pub fn initialize_episode(&mut self, env_idx: &[usize]) -> Result<()> {
        self.check_indices(env_idx)?;
        self.sim.initialize_table(env_idx)?;

        let poses = self.randomizer.sample(&mut self.rng, env_idx);
        self.cube.set_pose(env_idx, &poses.cube)?;
        self.goal_site.set_pose(env_idx, &poses.goal)?;

        for &i in env_idx {
            self.elapsed_steps[i] = 0;
        }
        Ok(())
    }

    fn task_state(&self) -> TaskState {
        TaskState::capture(&self.sim, &self.cube, &self.goal_site)
    }

    /// Evaluates the current state of every environment.
    pub fn evaluate(&self) -> EvaluationResult {
        self.evaluator.evaluate(&self.task_state())
    }

    /// Staged dense reward of the current state, given its evaluation `info`.
    ///
    /// Positions and joint velocities are read from the simulation, so `_obs` may be of any
    /// observation mode.
    pub fn compute_dense_reward(
        &self,
        _obs: &PickCubeObs,
        action: &Array2<f32>,
        info: &EvaluationResult,
    ) -> Array1<f32> {
        self.shaper.dense_reward(&self.task_state(), action, info)
    }

    /// Dense reward of the current state, scaled into `[0, 1]`.
    pub fn compute_normalized_dense_reward(
        &self,
        obs: &PickCubeObs,
        action: &Array2<f32>,
        info: &EvaluationResult,
    ) -> Array1<f32> {
        self.compute_dense_reward(obs, action, info) / MAX_DENSE_REWARD
    }

    /// Batch means of the reward stages of the current state.
    pub fn staged_rewards(&self, info: &EvaluationResult) -> StageMeans {
        self.shaper.staged_rewards(&self.task_state(), info)
    }

    fn observe_state(&self, state: &TaskState) -> PickCubeObs {
        let robot = self.sim.robot();
        let with_task_state = self.config.obs_mode.has_task_state();
        PickCubeObs {
            qpos: robot.qpos(),
            qvel: state.qvel.clone(),
            is_grasped: state
                .is_grasped
                .iter()
                .map(|&g| if g { 1.0 } else { 0.0 })
                .collect(),
            tcp_to_obj_pos: with_task_state.then(|| &state.obj_pos - &state.tcp_pos),
            obj_to_goal_pos: with_task_state.then(|| &state.goal_pos - &state.obj_pos),
        }
    }

    /// Observation of the current state.
    pub fn observe(&self) -> PickCubeObs {
        self.observe_state(&self.task_state())
    }
}

impl<S: Simulation> Env for PickCubeEnv<S> {
    type Config = PickCubeConfig;
    type Obs = PickCubeObs;
    type Act = PickCubeAct;
    type Info = EvaluationResult;

    /// Creates a simulation with `config.num_envs` environments and builds the task in it.
    ///
    /// `seed` replaces `config.seed` as the root seed of the random streams.
    fn build(config: &Self::Config, seed: i64) -> Result<Self> {
        let sim = S::create(config.num_envs)?;
        Self::new(config.clone().seed(seed as u64), sim)
    }

    fn num_envs(&self) -> usize {
        self.elapsed_steps.len()
    }

    fn step(&mut self, a: &Self::Act) -> Result<(Step<Self>, Record)> {
        trace!("PickCubeEnv::step()");
        let num_envs = self.num_envs();
        if a.action.nrows() != num_envs {
            return Err(BorderError::BatchSizeMismatch {
                name: "action".to_string(),
                expected: num_envs,
                actual: a.action.nrows(),
            }
            .into());
        }

        self.sim.step(&a.action)?;
        self.elapsed_steps.iter_mut().for_each(|c| *c += 1);

        let state = self.task_state();
        let info = self.evaluator.evaluate(&state);
        let reward = self
            .shaper
            .reward(self.config.reward_mode, &state, &a.action, &info);
        let is_terminated = info.success.iter().map(|&s| s as i8).collect();
        let is_truncated = self
            .elapsed_steps
            .iter()
            .map(|&c| (c >= self.config.max_episode_steps) as i8)
            .collect();
        let obs = self.observe_state(&state);

        let mut record = info.to_record();
        record.merge_inplace(self.shaper.staged_rewards(&state, &info).to_record());

        let step = Step::new(
            obs,
            a.clone(),
            reward.to_vec(),
            is_terminated,
            is_truncated,
            info,
            None,
        );
        Ok((step, record))
    }

    fn reset(&mut self, is_done: Option<&Vec<i8>>) -> Result<PickCubeObs> {
        trace!("PickCubeEnv::reset()");
        let num_envs = self.num_envs();
        let env_idx: Vec<usize> = match is_done {
            None => (0..num_envs).collect(),
            Some(flags) => {
                if flags.len() != num_envs {
                    return Err(BorderError::BatchSizeMismatch {
                        name: "is_done".to_string(),
                        expected: num_envs,
                        actual: flags.len(),
                    }
                    .into());
                }
                flags
                    .iter()
                    .enumerate()
                    .filter(|(_, &f)| f == 1)
                    .map(|(i, _)| i)
                    .collect()
            }
        };

        if !env_idx.is_empty() {
            self.initialize_episode(&env_idx)?;
        }
        Ok(self.observe())
    }

    /// Reseeds the random stream of every environment from `ix`, then resets all of them.
    fn reset_with_index(&mut self, ix: usize) -> Result<PickCubeObs> {
        self.rng = BatchedRng::new(self.num_envs(), ix as u64);
        self.reset(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{fake::FakeSim, ObsMode};

    fn env(config: PickCubeConfig) -> PickCubeEnv<FakeSim> {
        let sim = FakeSim::create(config.num_envs).unwrap();
        PickCubeEnv::new(config, sim).unwrap()
    }

    #[test]
    fn test_construction() {
        let env = env(PickCubeConfig::default().num_envs(2));
        let (uid, base) = env.sim().agent();
        assert_eq!(uid, "panda");
        assert_eq!(base.p.row(0).to_vec(), AGENT_BASE_POS.to_vec());
        assert_eq!(env.sim().table_noise(), Some(0.02));

        let uids: Vec<_> = env.sim().cameras().into_iter().map(|c| c.uid).collect();
        assert_eq!(uids, vec!["base_camera", "render_camera"]);
        assert!(env.sim().is_hidden("goal_site"));
        assert!(env.elapsed_steps().iter().all(|&c| c == 0));
    }

    #[test]
    fn test_simulation_size_must_match() {
        let sim = FakeSim::create(3).unwrap();
        assert!(PickCubeEnv::new(PickCubeConfig::default().num_envs(2), sim).is_err());
    }

    #[test]
    fn test_obs_modes() -> Result<()> {
        let mut state_env = env(PickCubeConfig::default().num_envs(2));
        let obs = state_env.reset(None)?;
        assert!(obs.tcp_to_obj_pos.is_some());
        assert_eq!(obs.flatten()?.shape(), &[2, 9 + 9 + 1 + 3 + 3]);

        let mut none_env = env(PickCubeConfig::default().num_envs(2).obs_mode(ObsMode::None));
        let obs = none_env.reset(None)?;
        assert!(obs.tcp_to_obj_pos.is_none());
        assert!(obs.obj_to_goal_pos.is_none());
        assert_eq!(obs.flatten()?.ncols(), 9 + 9 + 1);
        Ok(())
    }

    #[test]
    fn test_relative_positions() -> Result<()> {
        let mut env = env(PickCubeConfig::default().num_envs(3));
        let obs = env.reset(None)?;
        let cube = env.cube().pose().p;
        let goal = env.goal_site().pose().p;
        let tcp = env.sim().robot().tcp_pose().p;

        assert_eq!(obs.tcp_to_obj_pos, Some(&cube - &tcp));
        assert_eq!(obs.obj_to_goal_pos, Some(&goal - &cube));
        Ok(())
    }

    #[test]
    fn test_invalid_indices_are_rejected() -> Result<()> {
        let mut env = env(PickCubeConfig::default().num_envs(2));
        assert!(env.initialize_episode(&[2]).is_err());
        assert!(env.reset(Some(&vec![1, 0, 1])).is_err());

        env.reset(None)?;
        let act = PickCubeAct::from(Array2::zeros((3, 8)));
        assert!(env.step(&act).is_err());
        Ok(())
    }
}
