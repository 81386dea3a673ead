//! Environment.
use super::{Act, Info, Obs, Step};
use crate::record::Record;
use anyhow::Result;

/// Represents a batch of structurally identical environments, typically MDPs.
///
/// Every call operates on all `B` instances at once. Resetting can be restricted to a
/// subset of instances; the remaining instances must not be affected.
pub trait Env {
    /// Configurations.
    type Config: Clone;

    /// Observation of the environment.
    type Obs: Obs;

    /// Action of the environment.
    type Act: Act;

    /// Information in the [`Step`] object.
    type Info: Info;

    /// Builds an environment with a given random seed.
    fn build(config: &Self::Config, seed: i64) -> Result<Self>
    where
        Self: Sized;

    /// The number of environment instances in the batch.
    fn num_envs(&self) -> usize;

    /// Performes an environment step.
    fn step(&mut self, a: &Self::Act) -> Result<(Step<Self>, Record)>
    where
        Self: Sized;

    /// Resets the instances with `is_done[i] == 1`, or all instances if `is_done` is `None`.
    ///
    /// The returned observation covers the whole batch.
    fn reset(&mut self, is_done: Option<&Vec<i8>>) -> Result<Self::Obs>;

    /// Resets all instances with a given index.
    ///
    /// The index is used as a random seed, which is useful when evaluating a trained agent
    /// on a reproducible set of initial states.
    fn reset_with_index(&mut self, ix: usize) -> Result<Self::Obs>;

    /// Performes an environment step and resets the instances whose episode ended.
    fn step_with_reset(&mut self, a: &Self::Act) -> Result<(Step<Self>, Record)>
    where
        Self: Sized,
    {
        let (mut step, record) = self.step(a)?;
        if step.any_done() {
            let is_done = step.done_flags();
            step.init_obs = Some(self.reset(Some(&is_done))?);
        }
        Ok((step, record))
    }
}
