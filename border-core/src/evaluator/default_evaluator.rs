//! Default implementation of the [`Evaluator`] trait.
use super::Evaluator;
use crate::{record::Record, Env, Policy, Step};
use anyhow::Result;

/// Runs a fixed number of batched episodes and reports the average return.
///
/// An episode of the batch ends for an instance at its first terminated or truncated step.
/// Rewards of an instance after that step are ignored, and the batch episode ends when every
/// instance is done. The reported `"Episode return"` is averaged over instances and episodes.
pub struct DefaultEvaluator<E: Env> {
    n_episodes: usize,
    env: E,
}

impl<E: Env> Evaluator<E> for DefaultEvaluator<E> {
    fn evaluate<P: Policy<E>>(&mut self, policy: &mut P) -> Result<Record> {
        let n_envs = self.env.num_envs();
        let mut r_total = 0f32;

        for ix in 0..self.n_episodes {
            log::trace!("Episode: {:?}", ix);
            let init_obs = self.env.reset_with_index(ix)?;
            r_total += run_batched_episode(&mut self.env, policy, init_obs, |_, _| {})?;
        }

        let n = (self.n_episodes * n_envs).max(1) as f32;
        Ok(Record::from_scalar("Episode return", r_total / n))
    }
}

/// Runs one batched episode of `env` from `init_obs` and returns the summed rewards.
///
/// Instance `i` contributes until its first terminated or truncated step, inclusive.
/// `on_step(i, step)` is called for every step that counts for instance `i`.
pub fn run_batched_episode<E, P, F>(
    env: &mut E,
    policy: &mut P,
    init_obs: E::Obs,
    mut on_step: F,
) -> Result<f32>
where
    E: Env,
    P: Policy<E>,
    F: FnMut(usize, &Step<E>),
{
    let n_envs = env.num_envs();
    let mut active = vec![true; n_envs];
    let mut r_total = 0f32;
    let mut prev_obs = init_obs;

    loop {
        let act = policy.sample(&prev_obs);
        let (step, _) = env.step(&act)?;
        for i in 0..n_envs {
            if active[i] {
                r_total += step.reward[i];
                on_step(i, &step);
                active[i] = !step.is_done(i);
            }
        }
        if active.iter().all(|a| !a) {
            break;
        }
        prev_obs = step.obs;
    }

    Ok(r_total)
}

impl<E: Env> DefaultEvaluator<E> {
    /// Constructs a new [`DefaultEvaluator`].
    pub fn new(config: &E::Config, seed: i64, n_episodes: usize) -> Result<Self> {
        Ok(Self {
            n_episodes,
            env: E::build(config, seed)?,
        })
    }

    /// Constructs a new [`DefaultEvaluator`] from an already built environment.
    pub fn from_env(env: E, n_episodes: usize) -> Self {
        Self { n_episodes, env }
    }
}
