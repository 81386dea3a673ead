//! Per-environment random streams and episode initialization.
use crate::{pose::yaw_quat, Pose, RobotTaskConfig};
use ndarray::Array2;
use rand::{distributions::Uniform, rngs::StdRng, Rng, SeedableRng};
use std::f32::consts::TAU;

/// One independent random stream per environment instance.
///
/// Draws for instance `i` only consume the stream of `i`, so resetting a subset of instances
/// leaves the streams of all other instances untouched.
pub struct BatchedRng {
    rngs: Vec<StdRng>,
}

impl BatchedRng {
    /// Creates `num_envs` streams whose seeds are derived from `seed`.
    pub fn new(num_envs: usize, seed: u64) -> Self {
        Self::from_seeds(&Self::derive_seeds(num_envs, seed))
    }

    /// Creates one stream per given seed.
    pub fn from_seeds(seeds: &[u64]) -> Self {
        Self {
            rngs: seeds.iter().map(|&s| StdRng::seed_from_u64(s)).collect(),
        }
    }

    /// Per-environment seeds derived from a root seed.
    pub fn derive_seeds(num_envs: usize, seed: u64) -> Vec<u64> {
        let mut root = StdRng::seed_from_u64(seed);
        (0..num_envs).map(|_| root.gen()).collect()
    }

    /// Reseeds the streams of `env_idx` with `seeds`, in order.
    pub fn reseed(&mut self, env_idx: &[usize], seeds: &[u64]) {
        debug_assert_eq!(env_idx.len(), seeds.len());
        for (&i, &s) in env_idx.iter().zip(seeds.iter()) {
            self.rngs[i] = StdRng::seed_from_u64(s);
        }
    }

    /// Number of streams.
    pub fn len(&self) -> usize {
        self.rngs.len()
    }

    /// Returns `true` if there are no streams.
    pub fn is_empty(&self) -> bool {
        self.rngs.is_empty()
    }

    /// The stream of instance `i`.
    pub fn stream(&mut self, i: usize) -> &mut StdRng {
        &mut self.rngs[i]
    }
}

/// Initial cube and goal poses of a set of instances.
#[derive(Clone, Debug, PartialEq)]
pub struct EpisodePoses {
    /// Cube poses, one row per reset instance.
    pub cube: Pose,

    /// Goal poses, one row per reset instance. Orientations are identity.
    pub goal: Pose,
}

/// Samples initial cube and goal placements.
#[derive(Clone, Debug)]
pub struct EpisodeRandomizer {
    half_size: f32,
    center: [f32; 2],
    cube_z: f32,
    max_goal_height: f32,
}

impl EpisodeRandomizer {
    /// Creates a randomizer for the given task constants.
    pub fn new(cfg: &RobotTaskConfig) -> Self {
        Self {
            half_size: cfg.cube_spawn_half_size,
            center: cfg.cube_spawn_center,
            cube_z: cfg.cube_half_size,
            max_goal_height: cfg.max_goal_height,
        }
    }

    /// Samples poses for the instances `env_idx`, row `r` belonging to `env_idx[r]`.
    ///
    /// The cube rests flat on the table with a random yaw, its xy offset uniform in the spawn
    /// square. The goal xy is drawn the same way and its height lies in
    /// `[cube_z, cube_z + max_goal_height)`.
    pub fn sample(&self, rng: &mut BatchedRng, env_idx: &[usize]) -> EpisodePoses {
        let b = env_idx.len();
        let xy = Uniform::new_inclusive(-self.half_size, self.half_size);
        let mut cube_p = Array2::zeros((b, 3));
        let mut cube_q = Array2::zeros((b, 4));
        let mut goal_p = Array2::zeros((b, 3));

        for (r, &i) in env_idx.iter().enumerate() {
            let stream = rng.stream(i);

            cube_p[[r, 0]] = stream.sample(&xy) + self.center[0];
            cube_p[[r, 1]] = stream.sample(&xy) + self.center[1];
            cube_p[[r, 2]] = self.cube_z;
            let q = yaw_quat(stream.gen_range(0.0..TAU));
            for (k, v) in q.iter().enumerate() {
                cube_q[[r, k]] = *v;
            }

            goal_p[[r, 0]] = stream.sample(&xy) + self.center[0];
            goal_p[[r, 1]] = stream.sample(&xy) + self.center[1];
            goal_p[[r, 2]] = stream.gen::<f32>() * self.max_goal_height + cube_p[[r, 2]];
        }

        EpisodePoses {
            cube: Pose::from_pq(cube_p, cube_q),
            goal: Pose::from_p(goal_p),
        }
    }
}

/// An opaque RGBA color with channels drawn uniformly from `[0, 1]`.
pub fn random_color(rng: &mut StdRng) -> [f32; 4] {
    let unit = Uniform::new_inclusive(0f32, 1f32);
    [rng.sample(&unit), rng.sample(&unit), rng.sample(&unit), 1.0]
}
