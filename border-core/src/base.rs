//! Core functionalities.
mod env;
mod policy;
mod step;
pub use env::Env;
pub use policy::Policy;
use std::fmt::Debug;
pub use step::{Info, Step};

/// A batch of observations, one per environment instance.
pub trait Obs: Clone + Debug {
    /// Returns the number of environment instances covered by the observation.
    fn len(&self) -> usize;
}

/// A batch of actions, one per environment instance.
pub trait Act: Clone + Debug {
    /// Returns the number of environment instances covered by the action.
    fn len(&self) -> usize;
}
