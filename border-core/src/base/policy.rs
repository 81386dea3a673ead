//! Policy.
use super::Env;

/// A policy on an environment.
///
/// Policy is a mapping from a batch of observations to a batch of actions.
/// The mapping can be either of deterministic or stochastic.
pub trait Policy<E: Env> {
    /// Sample an action given an observation.
    fn sample(&mut self, obs: &E::Obs) -> E::Act;
}
