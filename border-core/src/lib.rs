#![warn(missing_docs)]
//! Batched environment abstractions for reinforcement learning.
//!
//! An environment in this crate is a batch of `B` structurally identical instances that are
//! stepped together. Every per-step quantity (reward, termination flags, observations) carries
//! the batch dimension, and [`Env::reset`] can reset any subset of the instances.
//!
//! * [`Env`], [`Obs`], [`Act`], [`Info`] - the environment interface
//! * [`Step`] - the tuple emitted at every interaction step
//! * [`Policy`] - mapping from observations to actions
//! * [`Evaluator`], [`DefaultEvaluator`] - running episodes with a policy
//! * [`record`] - key-value containers used for diagnostics
pub mod error;
pub mod record;

mod base;
pub use base::{Act, Env, Info, Obs, Policy, Step};

mod evaluator;
pub use evaluator::{run_batched_episode, DefaultEvaluator, Evaluator};
