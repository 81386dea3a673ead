//! Staged dense reward.
//!
//! The reward adds four gated stages: reaching the cube, grasping it, carrying it to the goal
//! while grasped, and holding still once it is placed. Each stage lies in `[0, 1]`. Successful
//! environments get [`MAX_DENSE_REWARD`] regardless of the stages.
use crate::{
    evaluator::{strip_finger_vel, EvaluationResult, TaskState},
    pose::{row_distances, row_norms},
    RobotTaskConfig,
};
use border_core::record::Record;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Reward of a successful environment, and the normalizer of the dense reward.
pub const MAX_DENSE_REWARD: f32 = 5.0;

/// Kind of reward returned by the environment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RewardMode {
    /// 1 on success, 0 otherwise.
    Sparse,
    /// Staged dense reward.
    Dense,
    /// Staged dense reward divided by [`MAX_DENSE_REWARD`].
    #[default]
    NormalizedDense,
    /// Always 0.
    None,
}

/// Per-environment reward stages.
#[derive(Clone, Debug, PartialEq)]
pub struct RewardComponents {
    /// `1 - tanh(5 * |tcp - cube|)`.
    pub reaching: Array1<f32>,

    /// 1 while grasped.
    pub grasp_bonus: Array1<f32>,

    /// `1 - tanh(5 * |goal - cube|)` while grasped.
    pub placing: Array1<f32>,

    /// `1 - tanh(5 * stripped joint speed)` once placed.
    pub static_bonus: Array1<f32>,
}

impl RewardComponents {
    /// Sum of the stages.
    pub fn total(&self) -> Array1<f32> {
        &self.reaching + &self.grasp_bonus + &self.placing + &self.static_bonus
    }
}

/// Means of the reward stages over the batch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StageMeans {
    /// Mean reaching reward.
    pub reaching: f32,
    /// Fraction of grasping environments.
    pub grasp_rate: f32,
    /// Mean placing reward.
    pub placing: f32,
    /// Mean static reward.
    pub static_bonus: f32,
}

impl StageMeans {
    /// Keys of [`StageMeans::to_record`].
    pub const KEYS: [&'static str; 4] = [
        "reaching_reward",
        "grasp_reward",
        "placing_reward",
        "static_reward",
    ];

    /// Record with exactly the keys in [`StageMeans::KEYS`].
    pub fn to_record(&self) -> Record {
        let mut record = Record::from_scalar("reaching_reward", self.reaching);
        record.merge_inplace(Record::from_scalar("grasp_reward", self.grasp_rate));
        record.merge_inplace(Record::from_scalar("placing_reward", self.placing));
        record.merge_inplace(Record::from_scalar("static_reward", self.static_bonus));
        record
    }
}

fn shaped(dist: Array1<f32>) -> Array1<f32> {
    dist.mapv(|d| 1.0 - (5.0 * d).tanh())
}

fn indicator(flags: &[bool]) -> Array1<f32> {
    flags.iter().map(|&f| if f { 1.0 } else { 0.0 }).collect()
}

fn mean(a: &Array1<f32>) -> f32 {
    a.mean().unwrap_or(0.0)
}

/// Computes the staged reward.
#[derive(Clone, Debug)]
pub struct RewardShaper {
    finger_dof: usize,
}

impl RewardShaper {
    /// Creates a shaper for the given task constants.
    pub fn new(cfg: &RobotTaskConfig) -> Self {
        Self {
            finger_dof: cfg.finger_dof(),
        }
    }

    /// Reward stages of every environment.
    pub fn components(&self, state: &TaskState, info: &EvaluationResult) -> RewardComponents {
        let reaching = shaped(row_distances(state.obj_pos.view(), state.tcp_pos.view()));
        let grasp_bonus = indicator(&info.is_grasped);
        let placing =
            shaped(row_distances(state.goal_pos.view(), state.obj_pos.view())) * &grasp_bonus;
        let static_bonus = shaped(row_norms(strip_finger_vel(&state.qvel, self.finger_dof)))
            * &indicator(&info.is_obj_placed);

        RewardComponents {
            reaching,
            grasp_bonus,
            placing,
            static_bonus,
        }
    }

    /// Staged dense reward, set to [`MAX_DENSE_REWARD`] in successful environments.
    pub fn dense_reward(
        &self,
        state: &TaskState,
        _action: &Array2<f32>,
        info: &EvaluationResult,
    ) -> Array1<f32> {
        let mut reward = self.components(state, info).total();
        for (r, &success) in reward.iter_mut().zip(info.success.iter()) {
            if success {
                *r = MAX_DENSE_REWARD;
            }
        }
        reward
    }

    /// Dense reward divided by [`MAX_DENSE_REWARD`].
    pub fn normalized_dense_reward(
        &self,
        state: &TaskState,
        action: &Array2<f32>,
        info: &EvaluationResult,
    ) -> Array1<f32> {
        self.dense_reward(state, action, info) / MAX_DENSE_REWARD
    }

    /// Reward of the given mode.
    pub fn reward(
        &self,
        mode: RewardMode,
        state: &TaskState,
        action: &Array2<f32>,
        info: &EvaluationResult,
    ) -> Array1<f32> {
        match mode {
            RewardMode::Sparse => indicator(&info.success),
            RewardMode::Dense => self.dense_reward(state, action, info),
            RewardMode::NormalizedDense => self.normalized_dense_reward(state, action, info),
            RewardMode::None => Array1::zeros(info.len()),
        }
    }

    /// Batch means of the reward stages, for monitoring.
    pub fn staged_rewards(&self, state: &TaskState, info: &EvaluationResult) -> StageMeans {
        let c = self.components(state, info);
        StageMeans {
            reaching: mean(&c.reaching),
            grasp_rate: mean(&c.grasp_bonus),
            placing: mean(&c.placing),
            static_bonus: mean(&c.static_bonus),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TaskEvaluator;
    use ndarray::array;

    fn panda() -> RobotTaskConfig {
        RobotTaskConfig::resolve("panda")
    }

    fn evaluate(state: &TaskState) -> EvaluationResult {
        TaskEvaluator::new(&panda()).evaluate(state)
    }

    fn no_action(b: usize) -> Array2<f32> {
        Array2::zeros((b, 8))
    }

    /// Batch of three: far from everything, grasped halfway to the goal, placed and moving.
    fn mixed_state() -> TaskState {
        TaskState {
            tcp_pos: array![[0.5f32, 0.0, 0.5], [0.0, 0.0, 0.1], [0.0, 0.0, 0.02]],
            obj_pos: array![[0.0f32, 0.0, 0.02], [0.0, 0.0, 0.1], [0.0, 0.0, 0.02]],
            goal_pos: array![[0.1f32, 0.0, 0.2], [0.0, 0.0, 0.2], [0.0, 0.0, 0.03]],
            qvel: array![
                [0.0f32, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
                [0.3, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
                [0.3, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]
            ],
            is_grasped: vec![false, true, true],
        }
    }

    #[test]
    fn test_success_overrides_to_max() {
        let state = TaskState {
            tcp_pos: array![[0.0f32, 0.0, 0.02]],
            obj_pos: array![[0.0f32, 0.0, 0.02]],
            goal_pos: array![[0.0f32, 0.0, 0.02]],
            qvel: array![[0.05f32, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]],
            is_grasped: vec![true],
        };
        let info = evaluate(&state);
        assert_eq!(info.success, vec![true]);

        let shaper = RewardShaper::new(&panda());
        let action = no_action(1);
        assert_eq!(shaper.dense_reward(&state, &action, &info), array![5.0f32]);
        assert_eq!(shaper.normalized_dense_reward(&state, &action, &info), array![1.0f32]);
    }

    #[test]
    fn test_stages_are_gated() {
        let state = mixed_state();
        let info = evaluate(&state);
        let c = RewardShaper::new(&panda()).components(&state, &info);

        // Not grasped: no placing reward although the cube is near the goal.
        assert_eq!(c.grasp_bonus[0], 0.0);
        assert_eq!(c.placing[0], 0.0);
        // Grasped and 0.1 away from the goal.
        assert_eq!(c.grasp_bonus[1], 1.0);
        assert!((c.placing[1] - (1.0 - 0.5f32.tanh())).abs() < 1e-6);
        // Only the placed environment gets the static reward.
        assert_eq!(info.is_obj_placed, vec![false, false, true]);
        assert_eq!(c.static_bonus[1], 0.0);
        assert!((c.static_bonus[2] - (1.0 - 1.5f32.tanh())).abs() < 1e-6);
        // Reaching is 1 at the cube.
        assert_eq!(c.reaching[1], 1.0);
    }

    #[test]
    fn test_dense_reward_bounds_and_normalization() {
        let state = mixed_state();
        let info = evaluate(&state);
        let shaper = RewardShaper::new(&panda());
        let action = no_action(3);

        let dense = shaper.dense_reward(&state, &action, &info);
        let normalized = shaper.normalized_dense_reward(&state, &action, &info);
        for i in 0..3 {
            assert!(dense[i] >= 0.0 && dense[i] <= MAX_DENSE_REWARD);
            assert!(!info.success[i] || dense[i] == MAX_DENSE_REWARD);
            assert_eq!(normalized[i], dense[i] / MAX_DENSE_REWARD);
        }
    }

    #[test]
    fn test_reward_modes() {
        let state = mixed_state();
        let info = evaluate(&state);
        let shaper = RewardShaper::new(&panda());
        let action = no_action(3);

        assert_eq!(
            shaper.reward(RewardMode::Sparse, &state, &action, &info),
            indicator(&info.success)
        );
        assert_eq!(
            shaper.reward(RewardMode::None, &state, &action, &info),
            Array1::<f32>::zeros(3)
        );
        assert_eq!(
            shaper.reward(RewardMode::Dense, &state, &action, &info),
            shaper.dense_reward(&state, &action, &info)
        );
    }

    #[test]
    fn test_staged_rewards_are_batch_means() {
        let state = mixed_state();
        let info = evaluate(&state);
        let shaper = RewardShaper::new(&panda());
        let c = shaper.components(&state, &info);
        let means = shaper.staged_rewards(&state, &info);

        assert!((means.grasp_rate - 2.0 / 3.0).abs() < 1e-6);
        assert!((means.reaching - c.reaching.sum() / 3.0).abs() < 1e-6);

        let record = means.to_record();
        assert_eq!(record.get_scalar("grasp_reward").unwrap(), means.grasp_rate);
        assert_eq!(record.get_scalar("static_reward").unwrap(), means.static_bonus);
    }
}
