//! Scene construction strategies.
//!
//! The default scene holds one cube geometry shared by every environment slot. The
//! domain-randomized scene builds one cube per slot, each with its own color drawn from the
//! random stream of that slot, and merges them into a [`MergedActor`] that behaves like a single
//! batched body.
use crate::{
    pose::IDENTITY_QUAT,
    randomization::random_color,
    sim::{Actor, ActorBuilder, Robot, Simulation},
    BatchedRng, Pose,
};
use anyhow::Result;
use border_core::error::BorderError;
use serde::{Deserialize, Serialize};

/// Color of the cube in the default scene.
pub const CUBE_COLOR: [f32; 4] = [1.0, 0.0, 0.0, 1.0];

/// Color of the goal marker.
pub const GOAL_COLOR: [f32; 4] = [0.0, 1.0, 0.0, 1.0];

/// Scene construction strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SceneVariant {
    /// One cube shared by all slots.
    #[default]
    Default,
    /// One independently colored cube per slot.
    DomainRandomized,
}

/// Single-slot bodies merged into one batched body.
///
/// Row `r` of [`Actor::pose`] is the pose of the part living in slot `scene_idxs()[r]`, and
/// setting the pose of a slot is forwarded to the part of that slot.
pub struct MergedActor<A: Actor> {
    name: String,
    parts: Vec<A>,
    slots: Vec<usize>,
}

impl<A: Actor> MergedActor<A> {
    /// Merges bodies that each live in exactly one distinct slot.
    pub fn merge(parts: Vec<A>, name: impl Into<String>) -> Result<Self> {
        let mut slots = Vec::with_capacity(parts.len());
        for part in parts.iter() {
            match part.scene_idxs().as_slice() {
                [slot] if !slots.contains(slot) => slots.push(*slot),
                idxs => anyhow::bail!(
                    "Cannot merge {:?}: expected one unused slot, got {:?}",
                    part.name(),
                    idxs
                ),
            }
        }
        Ok(Self {
            name: name.into(),
            parts,
            slots,
        })
    }

    /// The merged bodies, in slot order of [`Actor::scene_idxs`].
    pub fn parts(&self) -> &[A] {
        &self.parts
    }

    fn part_of(&self, slot: usize) -> Result<usize> {
        self.slots.iter().position(|&s| s == slot).ok_or_else(|| {
            BorderError::InvalidEnvIndex {
                index: slot,
                num_envs: self.slots.len(),
            }
            .into()
        })
    }
}

impl<A: Actor> Actor for MergedActor<A> {
    fn name(&self) -> &str {
        &self.name
    }

    fn scene_idxs(&self) -> Vec<usize> {
        self.slots.clone()
    }

    fn pose(&self) -> Pose {
        let mut pose = Pose::repeat([0.0; 3], IDENTITY_QUAT, self.parts.len());
        for (r, part) in self.parts.iter().enumerate() {
            let part_pose = part.pose();
            pose.p.row_mut(r).assign(&part_pose.p.row(0));
            pose.q.row_mut(r).assign(&part_pose.q.row(0));
        }
        pose
    }

    /// Fails without writing any slot if the sizes differ or a slot is not merged.
    fn set_pose(&mut self, env_idx: &[usize], pose: &Pose) -> Result<()> {
        if env_idx.len() != pose.len() {
            return Err(BorderError::BatchSizeMismatch {
                name: "pose".to_string(),
                expected: env_idx.len(),
                actual: pose.len(),
            }
            .into());
        }
        let parts = env_idx
            .iter()
            .map(|&i| self.part_of(i))
            .collect::<Result<Vec<_>>>()?;

        for (r, (&i, k)) in env_idx.iter().zip(parts).enumerate() {
            self.parts[k].set_pose(&[i], &pose.select(&[r]))?;
        }
        Ok(())
    }
}

/// The manipulated cube of either scene variant.
pub enum CubeActor<A: Actor> {
    /// One body shared by all slots.
    Shared(A),
    /// One body per slot.
    PerEnv(MergedActor<A>),
}

impl<A: Actor> CubeActor<A> {
    /// Grasp flags of the robot on this cube, per environment.
    pub fn grasped_by<R: Robot>(&self, robot: &R) -> Vec<bool> {
        match self {
            Self::Shared(actor) => robot.is_grasping(actor.name()),
            Self::PerEnv(merged) => {
                let mut flags = vec![false; merged.slots.len()];
                for (part, &slot) in merged.parts.iter().zip(merged.slots.iter()) {
                    let grasped = robot.is_grasping(part.name());
                    if let Some(flag) = flags.get_mut(slot) {
                        *flag = grasped.get(slot).copied().unwrap_or(false);
                    }
                }
                flags
            }
        }
    }
}

impl<A: Actor> Actor for CubeActor<A> {
    fn name(&self) -> &str {
        match self {
            Self::Shared(actor) => actor.name(),
            Self::PerEnv(merged) => merged.name(),
        }
    }

    fn scene_idxs(&self) -> Vec<usize> {
        match self {
            Self::Shared(actor) => actor.scene_idxs(),
            Self::PerEnv(merged) => merged.scene_idxs(),
        }
    }

    fn pose(&self) -> Pose {
        match self {
            Self::Shared(actor) => actor.pose(),
            Self::PerEnv(merged) => merged.pose(),
        }
    }

    fn set_pose(&mut self, env_idx: &[usize], pose: &Pose) -> Result<()> {
        match self {
            Self::Shared(actor) => actor.set_pose(env_idx, pose),
            Self::PerEnv(merged) => merged.set_pose(env_idx, pose),
        }
    }
}

/// Builds one independently colored cube per environment slot.
pub struct DomainRandomizedSceneBuilder {
    half_size: f32,
}

impl DomainRandomizedSceneBuilder {
    /// Builder of cubes with the given half extent.
    pub fn new(half_size: f32) -> Self {
        Self { half_size }
    }

    /// Builds `cube_0 .. cube_{B-1}` and merges them into the body `cube`.
    ///
    /// The color of `cube_i` is drawn from the stream `i` of `rng`. The per-slot cubes are
    /// removed from the state snapshot and only the merged body is registered.
    pub fn build<S: Simulation>(
        &self,
        sim: &mut S,
        rng: &mut BatchedRng,
    ) -> Result<MergedActor<S::Actor>> {
        let num_envs = sim.num_envs();
        let mut cubes = Vec::with_capacity(num_envs);

        for i in 0..num_envs {
            let builder = ActorBuilder::cube(format!("cube_{}", i), self.half_size)
                .color(random_color(rng.stream(i)))
                .scene_idxs(vec![i]);
            let cube = sim.build_actor(builder)?;
            sim.remove_from_state_registry(cube.name());
            cubes.push(cube);
        }

        let merged = MergedActor::merge(cubes, "cube")?;
        log::debug!("Built {} per-environment cubes", merged.parts().len());
        sim.add_to_state_registry(merged.name());

        Ok(merged)
    }
}

/// Builds the cube of the given scene variant.
pub fn build_cube<S: Simulation>(
    variant: SceneVariant,
    sim: &mut S,
    half_size: f32,
    rng: &mut BatchedRng,
) -> Result<CubeActor<S::Actor>> {
    match variant {
        SceneVariant::Default => {
            let builder = ActorBuilder::cube("cube", half_size).color(CUBE_COLOR);
            Ok(CubeActor::Shared(sim.build_actor(builder)?))
        }
        SceneVariant::DomainRandomized => Ok(CubeActor::PerEnv(
            DomainRandomizedSceneBuilder::new(half_size).build(sim, rng)?,
        )),
    }
}

/// Builds the hidden, non-colliding goal marker.
pub fn build_goal_site<S: Simulation>(sim: &mut S, radius: f32) -> Result<S::Actor> {
    let builder = ActorBuilder::sphere("goal_site", radius)
        .color(GOAL_COLOR)
        .kinematic()
        .without_collision();
    let goal_site = sim.build_actor(builder)?;
    sim.hide(goal_site.name());
    Ok(goal_site)
}
