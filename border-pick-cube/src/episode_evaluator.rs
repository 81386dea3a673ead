//! Evaluation of policies on [`PickCubeEnv`] with success rates.
use crate::{sim::Simulation, PickCubeEnv};
use anyhow::Result;
use border_core::{record::Record, run_batched_episode, Env, Evaluator, Policy};

/// An evaluator for [`PickCubeEnv`].
///
/// Works like the `DefaultEvaluator` of `border-core` and also reports the fraction of
/// environments that succeeded at least once in an episode. Every environment of the batch
/// runs until its first terminated or truncated step.
pub struct PickCubeEvaluator<S: Simulation> {
    n_episodes: usize,
    env: PickCubeEnv<S>,
}

impl<S: Simulation> Evaluator<PickCubeEnv<S>> for PickCubeEvaluator<S> {
    fn evaluate<P: Policy<PickCubeEnv<S>>>(&mut self, policy: &mut P) -> Result<Record> {
        let n_envs = self.env.num_envs();
        let mut r_total = 0f32;
        let mut n_success = 0usize;

        for ix in 0..self.n_episodes {
            let init_obs = self.env.reset_with_index(ix)?;
            let (r, s) = self.run_episode(policy, init_obs)?;
            r_total += r;
            n_success += s;
        }

        let n = (self.n_episodes * n_envs).max(1) as f32;
        let mut record = Record::from_scalar("Episode return", r_total / n);
        record.merge_inplace(Record::from_scalar("Success rate", n_success as f32 / n));
        Ok(record)
    }
}

impl<S: Simulation> PickCubeEvaluator<S> {
    /// Constructs [`PickCubeEvaluator`].
    ///
    /// `env` - Instance of the environment.
    /// `n_episodes` - The number of batched episodes for evaluation.
    pub fn new(env: PickCubeEnv<S>, n_episodes: usize) -> Self {
        Self { n_episodes, env }
    }

    /// The evaluated environment.
    pub fn env(&self) -> &PickCubeEnv<S> {
        &self.env
    }

    /// Runs a batched episode, returning the summed returns and the number of successful
    /// environments.
    fn run_episode<P: Policy<PickCubeEnv<S>>>(
        &mut self,
        policy: &mut P,
        init_obs: <PickCubeEnv<S> as Env>::Obs,
    ) -> Result<(f32, usize)> {
        let mut succeeded = vec![false; self.env.num_envs()];
        let r_total = run_batched_episode(&mut self.env, policy, init_obs, |i, step| {
            succeeded[i] |= step.info.success[i];
        })?;
        Ok((r_total, succeeded.iter().filter(|&&s| s).count()))
    }
}
