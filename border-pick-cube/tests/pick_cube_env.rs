use anyhow::Result;
use border_core::{Env, Evaluator, Obs, Policy};
use border_pick_cube::{
    evaluator::EvaluationResult,
    fake::FakeSim,
    reward::StageMeans,
    sim::{Actor, Robot, Simulation},
    PickCubeAct, PickCubeConfig, PickCubeEnv, PickCubeEvaluator, PickCubeObs, RewardMode,
    SceneVariant, MAX_EPISODE_STEPS,
};
use ndarray::Array2;

const ACT_DIM: usize = 8;

type PickCube = PickCubeEnv<FakeSim>;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn zero_act(n: usize) -> PickCubeAct {
    Array2::zeros((n, ACT_DIM)).into()
}

struct ZeroPolicy;

impl Policy<PickCube> for ZeroPolicy {
    fn sample(&mut self, obs: &PickCubeObs) -> PickCubeAct {
        zero_act(obs.len())
    }
}

fn dr_env(num_envs: usize, seed: i64) -> Result<PickCube> {
    let config = PickCubeConfig::default()
        .num_envs(num_envs)
        .variant(SceneVariant::DomainRandomized);
    PickCube::build(&config, seed)
}

fn color_of(env: &PickCube, i: usize) -> [f32; 4] {
    env.sim()
        .builder_of(&format!("cube_{}", i))
        .map(|b| b.color)
        .unwrap()
}

#[test]
fn partial_reset_leaves_other_environments_untouched() -> Result<()> {
    init_logger();
    let mut env = dr_env(8, 42)?;
    env.reset(None)?;
    env.step(&zero_act(8))?;

    let cube_before = env.cube().pose();
    let goal_before = env.goal_site().pose();
    let colors_before: Vec<_> = (0..8).map(|i| color_of(&env, i)).collect();

    let mut is_done = vec![0i8; 8];
    is_done[2] = 1;
    is_done[5] = 1;
    env.reset(Some(&is_done))?;

    let cube_after = env.cube().pose();
    let goal_after = env.goal_site().pose();
    for i in 0..8 {
        if i == 2 || i == 5 {
            assert_ne!(cube_after.p.row(i), cube_before.p.row(i));
            assert_ne!(goal_after.p.row(i), goal_before.p.row(i));
            assert_eq!(env.elapsed_steps()[i], 0);
        } else {
            assert_eq!(cube_after.p.row(i), cube_before.p.row(i));
            assert_eq!(cube_after.q.row(i), cube_before.q.row(i));
            assert_eq!(goal_after.p.row(i), goal_before.p.row(i));
            assert_eq!(env.elapsed_steps()[i], 1);
        }
        assert_eq!(color_of(&env, i), colors_before[i]);
    }
    assert_eq!(env.sim().table_inits().last(), Some(&vec![2, 5]));
    Ok(())
}

#[test]
fn reset_with_no_done_flags_is_a_noop() -> Result<()> {
    let mut env = dr_env(4, 0)?;
    env.reset(None)?;
    let pose = env.cube().pose();
    let n_inits = env.sim().table_inits().len();

    env.reset(Some(&vec![0; 4]))?;
    assert_eq!(env.cube().pose(), pose);
    assert_eq!(env.sim().table_inits().len(), n_inits);
    Ok(())
}

#[test]
fn merged_cube_matches_per_environment_cubes() -> Result<()> {
    let mut env = dr_env(5, 1)?;
    env.reset(None)?;

    let merged = env.cube().pose();
    for i in 0..5 {
        let part = env.sim().pose_of(&format!("cube_{}", i)).unwrap();
        assert_eq!(part.p.row(0), merged.p.row(i));
        assert_eq!(part.q.row(0), merged.q.row(i));
    }

    let registry = env.sim().state_registry();
    assert!(registry.contains(&"cube".to_string()));
    assert!(registry.iter().all(|name| !name.starts_with("cube_")));
    assert!(env.sim().is_hidden("goal_site"));
    Ok(())
}

#[test]
fn reset_with_index_is_reproducible() -> Result<()> {
    let mut env1 = dr_env(3, 0)?;
    let mut env2 = dr_env(3, 123)?;

    env1.reset_with_index(7)?;
    env2.reset_with_index(7)?;
    assert_eq!(env1.cube().pose(), env2.cube().pose());
    assert_eq!(env1.goal_site().pose(), env2.goal_site().pose());

    env2.reset_with_index(8)?;
    assert_ne!(env1.goal_site().pose(), env2.goal_site().pose());
    Ok(())
}

#[test]
fn episodes_are_truncated_after_max_steps() -> Result<()> {
    let mut env = PickCube::build(&PickCubeConfig::default().num_envs(2), 0)?;
    env.reset(None)?;

    for t in 1..=MAX_EPISODE_STEPS {
        let (step, _) = env.step(&zero_act(2))?;
        let expected = (t >= MAX_EPISODE_STEPS) as i8;
        assert_eq!(step.is_truncated, vec![expected; 2]);
        for i in 0..2 {
            assert_eq!(step.is_terminated[i], step.info.success[i] as i8);
        }
    }
    Ok(())
}

/// Grasps the cube of environment 0 and moves the gripper onto the goal.
fn carry_cube_to_goal(env: &mut PickCube) -> Result<()> {
    let goal = env.goal_site().pose().p.row(0).to_vec();
    let sim = env.sim_mut();
    sim.set_grasping("cube", 0, true)?;
    sim.set_tcp_position(0, [goal[0], goal[1], goal[2]])
}

#[test]
fn placing_the_cube_terminates_with_max_reward() -> Result<()> {
    init_logger();
    let mut env = PickCube::build(&PickCubeConfig::default().num_envs(2), 3)?;
    env.reset(None)?;
    carry_cube_to_goal(&mut env)?;

    let (step, record) = env.step(&zero_act(2))?;
    assert!(step.info.success[0]);
    assert_eq!(step.info.is_grasped, vec![true, false]);
    assert_eq!(step.is_terminated[0], 1);
    assert_eq!(step.reward[0], 1.0);

    let obs = &step.obs;
    assert_eq!(obs.is_grasped[0], 1.0);
    assert!(obs
        .obj_to_goal_pos
        .as_ref()
        .unwrap()
        .row(0)
        .iter()
        .all(|v| v.abs() < 1e-6));

    let mut keys: Vec<&str> = record.keys().map(|k| k.as_str()).collect();
    keys.sort_unstable();
    let mut expected: Vec<&str> = EvaluationResult::KEYS
        .iter()
        .chain(StageMeans::KEYS.iter())
        .copied()
        .collect();
    expected.sort_unstable();
    assert_eq!(keys, expected);
    assert_eq!(record.get_flags("success")?, &[true, step.info.success[1]]);
    Ok(())
}

#[test]
fn step_with_reset_restarts_finished_environments() -> Result<()> {
    let mut env = PickCube::build(&PickCubeConfig::default().num_envs(2), 3)?;
    env.reset(None)?;
    carry_cube_to_goal(&mut env)?;

    let (step, _) = env.step_with_reset(&zero_act(2))?;
    assert!(step.is_done(0));
    assert!(step.init_obs.is_some());
    assert_eq!(env.elapsed_steps()[0], 0);
    assert!(!env.sim().robot().is_grasping("cube")[0]);
    Ok(())
}

#[test]
fn reward_modes() -> Result<()> {
    let config = PickCubeConfig::default().num_envs(2);

    let mut sparse = PickCube::build(&config.clone().reward_mode(RewardMode::Sparse), 3)?;
    sparse.reset(None)?;
    carry_cube_to_goal(&mut sparse)?;
    let (step, _) = sparse.step(&zero_act(2))?;
    let expected: Vec<f32> = step.info.success.iter().map(|&s| s as i32 as f32).collect();
    assert_eq!(step.reward, expected);
    assert_eq!(step.reward[0], 1.0);

    let mut dense = PickCube::build(&config.clone().reward_mode(RewardMode::Dense), 3)?;
    dense.reset(None)?;
    carry_cube_to_goal(&mut dense)?;
    let act = Array2::<f32>::zeros((2, ACT_DIM));
    let (step, _) = dense.step(&act.clone().into())?;
    assert_eq!(step.reward[0], 5.0);
    assert_eq!(
        step.reward,
        dense.compute_dense_reward(&step.obs, &act, &step.info).to_vec()
    );
    assert_eq!(
        dense
            .compute_normalized_dense_reward(&step.obs, &act, &step.info)
            .to_vec(),
        step.reward.iter().map(|r| r / 5.0).collect::<Vec<_>>()
    );

    // The given evaluation is used as is: without success there is no override.
    let mut failed = step.info.clone();
    failed.success = vec![false; 2];
    let shaped = dense.compute_dense_reward(&step.obs, &act, &failed);
    assert!(shaped[0] < 5.0);
    let stages = dense.staged_rewards(&step.info);
    assert_eq!(stages.grasp_rate, 0.5);

    let mut none = PickCube::build(&config.reward_mode(RewardMode::None), 3)?;
    none.reset(None)?;
    let (step, _) = none.step(&zero_act(2))?;
    assert_eq!(step.reward, vec![0.0; 2]);
    Ok(())
}

#[test]
fn registered_task_configures_robot() -> Result<()> {
    let config = PickCubeConfig::from_task("PickCubeSO100-v1")?.num_envs(2);
    let mut env = PickCube::build(&config, 0)?;
    let obs = env.reset(None)?;

    assert_eq!(obs.qpos.ncols(), 6);
    assert_eq!(env.task_config().cube_half_size, 0.0125);
    assert_eq!(env.cube().pose().p.column(2).to_vec(), vec![0.0125; 2]);
    assert_eq!(env.cameras()[0].eye, [-0.27, 0.0, 0.4]);
    for r in 0..2 {
        let p = env.cube().pose().p;
        assert!((p[[r, 0]] + 0.46).abs() <= 0.05 + 1e-6);
        assert!((p[[r, 1]] + 0.1).abs() <= 0.05 + 1e-6);
    }
    Ok(())
}

#[test]
fn evaluator_reports_return_and_success_rate() -> Result<()> {
    let env = PickCube::build(&PickCubeConfig::default().num_envs(3), 0)?;
    let mut evaluator = PickCubeEvaluator::new(env, 2);
    let record = evaluator.evaluate(&mut ZeroPolicy)?;

    let success_rate = record.get_scalar("Success rate")?;
    assert!((0.0..=1.0).contains(&success_rate));
    assert!(record.get_scalar("Episode return")? > 0.0);
    assert_eq!(evaluator.env().sim().table_inits().len(), 2);
    Ok(())
}
