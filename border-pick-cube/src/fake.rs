//! In-memory simulation.
//!
//! [`FakeSim`] implements [`Simulation`] without any physics: bodies keep the poses they are
//! given, joint velocities follow the action, and grasp flags are set explicitly. It records
//! how the task used it (built bodies, cameras, state registry, table resets) so tests can
//! inspect the scene.
use crate::{
    pose::IDENTITY_QUAT,
    sim::{Actor, ActorBuilder, Robot, Simulation},
    CameraConfig, Pose,
};
use anyhow::Result;
use border_core::error::BorderError;
use ndarray::Array2;
use std::{
    cell::{Ref, RefCell},
    collections::{HashMap, HashSet},
    rc::Rc,
};

/// Control time step of [`FakeSim::step`].
pub const DT: f32 = 0.05;

/// Tool center point position of a freshly initialized robot.
pub const TCP_REST_POS: [f32; 3] = [0.0, 0.0, 0.2];

/// Number of joints of the robot model of `robot_uid`.
pub fn robot_dof(robot_uid: &str) -> usize {
    match robot_uid {
        "panda" => 9,
        "widowxai" | "xarm6_robotiq" => 8,
        "so100" => 6,
        "fetch" => 15,
        _ => 7,
    }
}

struct BodyState {
    builder: ActorBuilder,
    slots: Vec<usize>,
    pose: Pose,
}

impl BodyState {
    fn row_of(&self, slot: usize) -> Option<usize> {
        self.slots.iter().position(|&s| s == slot)
    }
}

struct AgentState {
    uid: String,
    base_pose: Pose,
    qpos: Array2<f32>,
    qvel: Array2<f32>,
    tcp: Pose,
    grasping: HashMap<String, Vec<bool>>,
}

impl AgentState {
    fn new(uid: &str, base_pose: Pose, num_envs: usize) -> Self {
        let dof = robot_dof(uid);
        Self {
            uid: uid.to_string(),
            base_pose,
            qpos: Array2::zeros((num_envs, dof)),
            qvel: Array2::zeros((num_envs, dof)),
            tcp: Pose::repeat(TCP_REST_POS, IDENTITY_QUAT, num_envs),
            grasping: HashMap::new(),
        }
    }
}

struct World {
    num_envs: usize,
    agent: AgentState,
    bodies: HashMap<String, BodyState>,
    state_registry: Vec<String>,
    hidden: HashSet<String>,
    cameras: Vec<CameraConfig>,
    table_noise: Option<f32>,
    table_inits: Vec<Vec<usize>>,
    n_steps: usize,
}

impl World {
    fn check_index(&self, i: usize) -> Result<()> {
        if i < self.num_envs {
            Ok(())
        } else {
            Err(BorderError::InvalidEnvIndex {
                index: i,
                num_envs: self.num_envs,
            }
            .into())
        }
    }

    fn register(&mut self, name: &str) {
        if !self.state_registry.iter().any(|n| n == name) {
            self.state_registry.push(name.to_string());
        }
    }
}

/// Handle of a body of [`FakeSim`].
pub struct FakeActor {
    name: String,
    world: Rc<RefCell<World>>,
}

impl Actor for FakeActor {
    fn name(&self) -> &str {
        &self.name
    }

    fn scene_idxs(&self) -> Vec<usize> {
        self.world
            .borrow()
            .bodies
            .get(&self.name)
            .map(|b| b.slots.clone())
            .unwrap_or_default()
    }

    fn pose(&self) -> Pose {
        self.world
            .borrow()
            .bodies
            .get(&self.name)
            .map(|b| b.pose.clone())
            .unwrap_or_else(|| Pose::repeat([0.0; 3], IDENTITY_QUAT, 0))
    }

    fn set_pose(&mut self, env_idx: &[usize], pose: &Pose) -> Result<()> {
        let mut world = self.world.borrow_mut();
        let body = world
            .bodies
            .get_mut(&self.name)
            .ok_or_else(|| anyhow::anyhow!("Unknown body {:?}", self.name))?;
        let mut rows = Vec::with_capacity(env_idx.len());
        for &i in env_idx {
            let r = body.row_of(i).ok_or(BorderError::InvalidEnvIndex {
                index: i,
                num_envs: body.slots.len(),
            })?;
            rows.push(r);
        }
        body.pose.assign_rows(&rows, pose)
    }
}

/// Handle of the robot of [`FakeSim`].
pub struct FakeRobot {
    world: Rc<RefCell<World>>,
}

impl Robot for FakeRobot {
    fn qpos(&self) -> Array2<f32> {
        self.world.borrow().agent.qpos.clone()
    }

    fn qvel(&self) -> Array2<f32> {
        self.world.borrow().agent.qvel.clone()
    }

    fn tcp_pose(&self) -> Pose {
        self.world.borrow().agent.tcp.clone()
    }

    fn is_grasping(&self, object: &str) -> Vec<bool> {
        let world = self.world.borrow();
        world
            .agent
            .grasping
            .get(object)
            .cloned()
            .unwrap_or_else(|| vec![false; world.num_envs])
    }
}

/// Simulation without physics.
pub struct FakeSim {
    world: Rc<RefCell<World>>,
    robot: FakeRobot,
}

impl FakeSim {
    fn world(&self) -> Ref<World> {
        self.world.borrow()
    }

    /// Overwrites the joint velocities of every environment.
    pub fn set_qvel(&mut self, qvel: Array2<f32>) -> Result<()> {
        let mut world = self.world.borrow_mut();
        let expected = world.agent.qvel.dim();
        if qvel.dim() != expected {
            anyhow::bail!("qvel of shape {:?}, expected {:?}", qvel.dim(), expected);
        }
        world.agent.qvel = qvel;
        Ok(())
    }

    /// Moves the tool center point of environment `i`.
    pub fn set_tcp_position(&mut self, i: usize, p: [f32; 3]) -> Result<()> {
        let mut world = self.world.borrow_mut();
        world.check_index(i)?;
        for (k, v) in p.iter().enumerate() {
            world.agent.tcp.p[[i, k]] = *v;
        }
        Ok(())
    }

    /// Sets whether the robot of environment `i` grasps the named body.
    pub fn set_grasping(&mut self, object: &str, i: usize, grasping: bool) -> Result<()> {
        let mut world = self.world.borrow_mut();
        world.check_index(i)?;
        let num_envs = world.num_envs;
        world
            .agent
            .grasping
            .entry(object.to_string())
            .or_insert_with(|| vec![false; num_envs])[i] = grasping;
        Ok(())
    }

    /// Names of all built bodies, sorted.
    pub fn body_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.world().bodies.keys().cloned().collect();
        names.sort();
        names
    }

    /// Description the named body was built from.
    pub fn builder_of(&self, name: &str) -> Option<ActorBuilder> {
        self.world().bodies.get(name).map(|b| b.builder.clone())
    }

    /// Current pose of the named body.
    pub fn pose_of(&self, name: &str) -> Option<Pose> {
        self.world().bodies.get(name).map(|b| b.pose.clone())
    }

    /// Bodies in the state snapshot, in registration order.
    pub fn state_registry(&self) -> Vec<String> {
        self.world().state_registry.clone()
    }

    /// Whether the named body is excluded from rendering.
    pub fn is_hidden(&self, name: &str) -> bool {
        self.world().hidden.contains(name)
    }

    /// Registered cameras.
    pub fn cameras(&self) -> Vec<CameraConfig> {
        self.world().cameras.clone()
    }

    /// Identifier and base pose of the loaded robot.
    pub fn agent(&self) -> (String, Pose) {
        let world = self.world();
        (world.agent.uid.clone(), world.agent.base_pose.clone())
    }

    /// Initial joint noise the table was built with, `None` before it is built.
    pub fn table_noise(&self) -> Option<f32> {
        self.world().table_noise
    }

    /// Environment subsets passed to [`Simulation::initialize_table`], in call order.
    pub fn table_inits(&self) -> Vec<Vec<usize>> {
        self.world().table_inits.clone()
    }

    /// Number of control steps taken.
    pub fn n_steps(&self) -> usize {
        self.world().n_steps
    }
}

impl Simulation for FakeSim {
    type Actor = FakeActor;
    type Robot = FakeRobot;

    fn create(num_envs: usize) -> Result<Self> {
        if num_envs == 0 {
            anyhow::bail!("A simulation needs at least one environment");
        }
        let world = Rc::new(RefCell::new(World {
            num_envs,
            agent: AgentState::new("", Pose::single([0.0; 3], IDENTITY_QUAT), num_envs),
            bodies: HashMap::new(),
            state_registry: vec![],
            hidden: HashSet::new(),
            cameras: vec![],
            table_noise: None,
            table_inits: vec![],
            n_steps: 0,
        }));
        Ok(Self {
            robot: FakeRobot {
                world: world.clone(),
            },
            world,
        })
    }

    fn num_envs(&self) -> usize {
        self.world().num_envs
    }

    fn load_agent(&mut self, robot_uid: &str, base_pose: &Pose) -> Result<()> {
        let mut world = self.world.borrow_mut();
        let num_envs = world.num_envs;
        world.agent = AgentState::new(robot_uid, base_pose.clone(), num_envs);
        Ok(())
    }

    fn robot(&self) -> &Self::Robot {
        &self.robot
    }

    fn build_table(&mut self, robot_init_qpos_noise: f32) -> Result<()> {
        self.world.borrow_mut().table_noise = Some(robot_init_qpos_noise);
        Ok(())
    }

    fn initialize_table(&mut self, env_idx: &[usize]) -> Result<()> {
        let mut world = self.world.borrow_mut();
        if world.table_noise.is_none() {
            anyhow::bail!("The table is not built");
        }
        for &i in env_idx {
            world.check_index(i)?;
        }

        let agent = &mut world.agent;
        for &i in env_idx {
            agent.qpos.row_mut(i).fill(0.0);
            agent.qvel.row_mut(i).fill(0.0);
            for (k, v) in TCP_REST_POS.iter().enumerate() {
                agent.tcp.p[[i, k]] = *v;
            }
            for flags in agent.grasping.values_mut() {
                flags[i] = false;
            }
        }
        world.table_inits.push(env_idx.to_vec());
        Ok(())
    }

    fn build_actor(&mut self, builder: ActorBuilder) -> Result<Self::Actor> {
        let mut world = self.world.borrow_mut();
        if world.bodies.contains_key(&builder.name) {
            anyhow::bail!("Body {:?} already exists", builder.name);
        }
        let slots = match &builder.scene_idxs {
            Some(idxs) => idxs.clone(),
            None => (0..world.num_envs).collect(),
        };
        for &i in slots.iter() {
            world.check_index(i)?;
        }
        if builder.initial_pose.len() != 1 {
            anyhow::bail!("Initial pose of {:?} must be a single row", builder.name);
        }

        let p = builder.initial_pose.p.row(0);
        let q = builder.initial_pose.q.row(0);
        let pose = Pose::repeat([p[0], p[1], p[2]], [q[0], q[1], q[2], q[3]], slots.len());
        let name = builder.name.clone();
        world.bodies.insert(
            name.clone(),
            BodyState {
                builder,
                slots,
                pose,
            },
        );
        world.register(&name);

        Ok(FakeActor {
            name,
            world: self.world.clone(),
        })
    }

    fn hide(&mut self, name: &str) {
        self.world.borrow_mut().hidden.insert(name.to_string());
    }

    fn add_camera(&mut self, camera: &CameraConfig) -> Result<()> {
        let mut world = self.world.borrow_mut();
        if world.cameras.iter().any(|c| c.uid == camera.uid) {
            anyhow::bail!("Camera {:?} already exists", camera.uid);
        }
        world.cameras.push(camera.clone());
        Ok(())
    }

    fn add_to_state_registry(&mut self, name: &str) {
        self.world.borrow_mut().register(name);
    }

    fn remove_from_state_registry(&mut self, name: &str) {
        self.world.borrow_mut().state_registry.retain(|n| n != name);
    }

    /// Joint velocities take the leading action entries, joint positions integrate them, the
    /// first three action entries move the tool center point, and grasped bodies follow it.
    fn step(&mut self, action: &Array2<f32>) -> Result<()> {
        let mut world = self.world.borrow_mut();
        if action.nrows() != world.num_envs {
            return Err(BorderError::BatchSizeMismatch {
                name: "action".to_string(),
                expected: world.num_envs,
                actual: action.nrows(),
            }
            .into());
        }

        let World { agent, bodies, .. } = &mut *world;
        let n = agent.qvel.ncols().min(action.ncols());
        let m = action.ncols().min(3);
        for (i, a) in action.outer_iter().enumerate() {
            agent.qvel.row_mut(i).fill(0.0);
            for k in 0..n {
                agent.qvel[[i, k]] = a[k];
                agent.qpos[[i, k]] += a[k] * DT;
            }
            for k in 0..m {
                agent.tcp.p[[i, k]] += a[k] * DT;
            }
        }

        for (name, flags) in agent.grasping.iter() {
            if let Some(body) = bodies.get_mut(name) {
                for (i, _) in flags.iter().enumerate().filter(|(_, &g)| g) {
                    if let Some(r) = body.row_of(i) {
                        body.pose.p.row_mut(r).assign(&agent.tcp.p.row(i));
                    }
                }
            }
        }

        world.n_steps += 1;
        Ok(())
    }
}
