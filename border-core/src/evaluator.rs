//! Evaluate [`Policy`].
use crate::{record::Record, Env, Policy};
use anyhow::Result;
mod default_evaluator;
pub use default_evaluator::{run_batched_episode, DefaultEvaluator};

/// Evaluate [`Policy`].
pub trait Evaluator<E: Env> {
    /// Evaluate [`Policy`].
    ///
    /// The caller of this method needs to handle the internal state of `policy`,
    /// like training/evaluation mode.
    fn evaluate<P: Policy<E>>(&mut self, policy: &mut P) -> Result<Record>;
}
