//! Environment step.
use super::Env;

/// Additional information to `Obs` and `Act`.
pub trait Info {}

impl Info for () {}

/// Represents an action, observation and reward tuple `(a_t, o_t+1, r_t)`
/// with some additional information, for every environment instance of a batch.
///
/// `reward`, `is_terminated` and `is_truncated` have one element per instance.
pub struct Step<E: Env> {
    /// Action.
    pub act: E::Act,

    /// Observation.
    pub obs: E::Obs,

    /// Reward.
    pub reward: Vec<f32>,

    /// Flag denoting if episode is terminated.
    pub is_terminated: Vec<i8>,

    /// Flag denoting if episode is truncated.
    pub is_truncated: Vec<i8>,

    /// Information defined by user.
    pub info: E::Info,

    /// Observation after resetting the finished instances.
    ///
    /// Set by [`Env::step_with_reset`] when at least one instance is done.
    /// Elements of instances with `is_done(i) == false` are those of `obs`.
    pub init_obs: Option<E::Obs>,
}

impl<E: Env> Step<E> {
    /// Constructs a [`Step`] object.
    pub fn new(
        obs: E::Obs,
        act: E::Act,
        reward: Vec<f32>,
        is_terminated: Vec<i8>,
        is_truncated: Vec<i8>,
        info: E::Info,
        init_obs: Option<E::Obs>,
    ) -> Self {
        Step {
            act,
            obs,
            reward,
            is_terminated,
            is_truncated,
            info,
            init_obs,
        }
    }

    /// The number of environment instances.
    pub fn len(&self) -> usize {
        self.reward.len()
    }

    #[inline]
    /// Terminated or truncated, for the `ix`-th instance.
    pub fn is_done(&self, ix: usize) -> bool {
        self.is_terminated[ix] == 1 || self.is_truncated[ix] == 1
    }

    /// Per-instance done flags, suitable for [`Env::reset`].
    pub fn done_flags(&self) -> Vec<i8> {
        self.is_terminated
            .iter()
            .zip(self.is_truncated.iter())
            .map(|(t, u)| t | u)
            .collect()
    }

    /// Returns `true` if any instance is done.
    pub fn any_done(&self) -> bool {
        (0..self.len()).any(|ix| self.is_done(ix))
    }
}
