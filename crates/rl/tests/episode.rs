mod common;

use physics::{KinematicSim, Quat, SimBackend, Vec3};
use rl::{EnvError, RewardScales, VecEnv};

#[test]
fn reset_restores_default_pose_and_draws_commands() -> anyhow::Result<()> {
    let cfg = common::config(8);
    let mut env = common::env(&cfg);
    let (obs, privileged) = env.reset()?;
    assert_eq!(obs.len(), 8 * 33);
    assert!(privileged.is_none());

    let state = env.state();
    let defaults = cfg.env.default_dof_pos()?;
    for row in 0..8 {
        assert_eq!(state.episode_length[row], 0);
        assert!(state.reset_buf[row]);
        assert_eq!(state.dof_pos_row(row), defaults.as_slice());
        let cmd = state.commands[row];
        assert!((0.2..=0.6).contains(&cmd.x), "vx={}", cmd.x);
        assert_eq!(cmd.y, 0.0);
        assert_eq!(cmd.z, 0.0);
    }
    let backend_pos = env.backend().dofs_position(env.motor_dofs());
    assert_eq!(&backend_pos[..8], defaults.as_slice());
    Ok(())
}

#[test]
fn zero_actions_give_finite_outputs() -> anyhow::Result<()> {
    let cfg = common::config(4);
    let mut env = common::env(&cfg);
    env.reset()?;
    let actions = common::zeros(&env);
    let step = env.step(&actions)?;

    assert_eq!(step.obs.len(), 4 * 33);
    assert!(step.obs.iter().all(|x| x.is_finite()));
    assert!(step.rew.iter().all(|r| r.is_finite()));
    assert!(step.done.iter().all(|&d| !d));
    assert!(step.extras.episode.is_none());
    assert_eq!(step.extras.observations.critic, step.obs);
    // projected gravity of an upright base
    assert_eq!(&step.obs[3..6], &[0.0, 0.0, -1.0]);
    Ok(())
}

#[test]
fn observation_width_mismatch_fails_at_construction() {
    let mut cfg = common::config(2);
    cfg.obs.num_obs = 34;
    assert!(matches!(
        rl::BipedEnv::kinematic(&cfg),
        Err(EnvError::ObservationWidth { expected: 34, actual: 33 })
    ));
}

#[test]
fn unknown_reward_fails_at_construction() {
    let mut cfg = common::config(2);
    cfg.reward.reward_scales.insert("moonwalk", 1.0);
    assert!(matches!(
        rl::BipedEnv::kinematic(&cfg),
        Err(EnvError::UnknownReward(n)) if n == "moonwalk"
    ));
}

#[test]
fn wrongly_sized_action_batch_is_rejected() -> anyhow::Result<()> {
    let cfg = common::config(2);
    let mut env = common::env(&cfg);
    env.reset()?;
    assert!(matches!(
        env.step(&[0.0; 3]),
        Err(EnvError::ActionShape { expected: 16, actual: 3 })
    ));
    Ok(())
}

#[test]
fn pitch_beyond_threshold_terminates_only_that_row() -> anyhow::Result<()> {
    let cfg = common::config(4);
    let mut env = common::env(&cfg);
    env.reset()?;
    let tilted = Quat::from_rotation_y(40_f32.to_radians());
    env.backend_mut().set_base_quat(&[tilted], &[2], false)?;

    let actions = common::zeros(&env);
    let step = env.step(&actions)?;
    assert_eq!(step.done, &[false, false, true, false]);
    assert!(step.extras.episode.is_some());

    let state = env.state();
    assert_eq!(state.episode_length[2], 0);
    assert_eq!(state.episode_length[1], 1);
    assert_eq!(env.backend().base_quat()[2], Quat::IDENTITY);
    Ok(())
}

#[test]
fn roll_beyond_threshold_terminates() -> anyhow::Result<()> {
    let cfg = common::config(2);
    let mut env = common::env(&cfg);
    env.reset()?;
    let rolled = Quat::from_rotation_x(-35_f32.to_radians());
    env.backend_mut().set_base_quat(&[rolled], &[0], false)?;

    let actions = common::zeros(&env);
    let step = env.step(&actions)?;
    assert_eq!(step.done, &[true, false]);
    Ok(())
}

#[test]
fn tilt_below_threshold_keeps_running() -> anyhow::Result<()> {
    let cfg = common::config(1);
    let mut env = common::env(&cfg);
    env.reset()?;
    let tilted = Quat::from_rotation_y(20_f32.to_radians());
    env.backend_mut().set_base_quat(&[tilted], &[0], false)?;

    let actions = common::zeros(&env);
    let step = env.step(&actions)?;
    assert_eq!(step.done, &[false]);
    Ok(())
}

#[test]
fn timeout_fires_one_tick_after_max_length() -> anyhow::Result<()> {
    let mut cfg = common::config(3);
    cfg.env.episode_length_s = 0.1;
    let mut env = common::env(&cfg);
    let max = env.max_episode_length();
    env.reset()?;

    let actions = common::zeros(&env);
    for tick in 1..=max {
        let step = env.step(&actions)?;
        assert!(step.done.iter().all(|&d| !d), "tick {tick}");
    }
    let step = env.step(&actions)?;
    assert!(step.done.iter().all(|&d| d));
    assert!(env.state().episode_length.iter().all(|&l| l == 0));
    Ok(())
}

#[test]
fn episode_sums_are_logged_and_cleared_on_reset() -> anyhow::Result<()> {
    let mut cfg = common::config(2);
    cfg.env.episode_length_s = 0.1;
    cfg.reward.reward_scales = [("survive", 1.0)].into_iter().collect::<RewardScales>();
    let mut env = common::env(&cfg);
    let max = env.max_episode_length();
    env.reset()?;

    let actions = common::zeros(&env);
    for _ in 0..max {
        env.step(&actions)?;
    }
    let before = env.rewards().episode_sum("survive", 0).unwrap_or_default();
    #[allow(clippy::cast_precision_loss)]
    let expected_before = max as f32 * 0.01;
    assert!((before - expected_before).abs() < 1e-5, "sum={before}");

    let step = env.step(&actions)?;
    let log = step.extras.episode.clone().expect("rows were reset");
    let avg = log.get("rew_survive").expect("survive logged");
    assert!((avg - (before + 0.01) / 0.1).abs() < 1e-4, "avg={avg}");
    assert!(log.get("rew_foot_contact_penalty").is_some());
    assert_eq!(env.rewards().episode_sum("survive", 0), Some(0.0));
    assert_eq!(env.rewards().episode_sum("survive", 1), Some(0.0));

    let step = env.step(&actions)?;
    assert!(step.extras.episode.is_none());
    Ok(())
}

#[test]
fn resampling_touches_only_requested_rows() -> anyhow::Result<()> {
    let mut cfg = common::config(5);
    cfg.command.lin_vel_x_range = [-1.0, 1.0];
    cfg.command.lin_vel_y_range = [-1.0, 1.0];
    cfg.command.ang_vel_range = [-1.0, 1.0];
    let mut env = common::env(&cfg);
    env.reset()?;

    let before = command_bits(&env);
    env.resample_commands(&[1, 3])?;
    let after = command_bits(&env);
    for row in [0, 2, 4] {
        assert_eq!(before[row], after[row], "row {row}");
    }
    assert_ne!(before[1], after[1]);
    assert_ne!(before[3], after[3]);

    env.resample_commands(&[])?;
    assert_eq!(command_bits(&env), after);
    Ok(())
}

#[test]
fn latency_executes_previous_actions() -> anyhow::Result<()> {
    let cfg = common::config(1);
    let mut env = common::env(&cfg);
    env.reset()?;
    let defaults = cfg.env.default_dof_pos()?;
    let actions = vec![1.0; 8];
    env.step(&actions)?;
    assert_eq!(env.state().dof_pos_row(0), defaults.as_slice());
    assert_eq!(env.state().last_actions, actions);

    let mut cfg = common::config(1);
    cfg.env.simulate_action_latency = false;
    let mut env = common::env(&cfg);
    env.reset()?;
    env.step(&actions)?;
    let moved = env.state().dof_pos_row(0);
    assert!(moved.iter().zip(&defaults).all(|(q, q0)| q > q0));
    Ok(())
}

#[test]
fn actions_are_clipped() -> anyhow::Result<()> {
    let mut cfg = common::config(1);
    cfg.env.clip_actions = 0.5;
    let mut env = common::env(&cfg);
    env.reset()?;
    let mut actions = vec![0.0; 8];
    actions[0] = 3.0;
    actions[1] = -3.0;
    env.step(&actions)?;
    assert_eq!(env.state().last_actions[0], 0.5);
    assert_eq!(env.state().last_actions[1], -0.5);
    Ok(())
}

#[test]
fn first_reset_treats_feet_as_grounded_and_clears_history() -> anyhow::Result<()> {
    let cfg = common::config(2);
    let mut env = common::env(&cfg);
    env.reset()?;
    assert!(!env.state().feet.initialized);
    assert!(env.state().feet.prev_contact.iter().all(|&c| c == [true, true]));

    let actions = vec![0.5; 16];
    for _ in 0..5 {
        env.step(&actions)?;
    }
    assert!(env.state().feet.initialized);
    assert!(!env.state().hip_history[1].is_all_zero());

    env.reset_idx(&[1])?;
    assert!(env.state().hip_history[1].is_all_zero());
    assert!(!env.state().hip_history[0].is_all_zero());
    Ok(())
}

#[test]
fn same_seed_gives_identical_rollouts() -> anyhow::Result<()> {
    let mut cfg = common::config(4);
    cfg.command.lin_vel_y_range = [-0.5, 0.5];
    let mut a = common::env(&cfg);
    let mut b = common::env(&cfg);
    a.reset()?;
    b.reset()?;

    let mut rng = fastrand::Rng::with_seed(7);
    for _ in 0..25 {
        let actions: Vec<f32> = (0..32).map(|_| rng.f32() * 2.0 - 1.0).collect();
        let (obs_a, rew_a) = {
            let s = a.step(&actions)?;
            (s.obs.to_vec(), s.rew.to_vec())
        };
        let s = b.step(&actions)?;
        assert_eq!(obs_a, s.obs);
        assert_eq!(rew_a, s.rew);
    }
    Ok(())
}

#[test]
fn empty_batch_is_a_no_op() -> anyhow::Result<()> {
    let cfg = common::config(0);
    let mut env = common::env(&cfg);
    let (obs, _) = env.reset()?;
    assert!(obs.is_empty());
    let step = env.step(&[])?;
    assert!(step.rew.is_empty());
    assert!(step.done.is_empty());
    env.reset_idx(&[])?;
    Ok(())
}

fn command_bits(env: &rl::BipedEnv<KinematicSim>) -> Vec<[u32; 3]> {
    env.state()
        .commands
        .iter()
        .map(|c| c.to_array().map(f32::to_bits))
        .collect()
}

#[test]
fn commands_change_only_on_the_resampling_cadence() -> anyhow::Result<()> {
    let mut cfg = common::config(3);
    cfg.env.resampling_time_s = 0.05;
    cfg.command.lin_vel_x_range = [-1.0, 1.0];
    cfg.command.lin_vel_y_range = [-1.0, 1.0];
    cfg.command.ang_vel_range = [-1.0, 1.0];
    let mut env = common::env(&cfg);
    assert_eq!(env.resampling_interval(), 5);
    env.reset()?;

    let actions = common::zeros(&env);
    let mut changed_on = Vec::new();
    for tick in 1..=12 {
        let before = command_bits(&env);
        let step = env.step(&actions)?;
        assert!(step.done.iter().all(|&d| !d), "tick {tick}");
        let after = command_bits(&env);
        if before != after {
            assert!(before.iter().zip(&after).all(|(b, a)| b != a), "tick {tick}");
            changed_on.push(tick);
        }
    }
    assert_eq!(changed_on, vec![5, 10]);
    Ok(())
}

#[test]
fn contact_switch_follows_backend_foot_poses() -> anyhow::Result<()> {
    let mut cfg = common::config(2);
    cfg.reward.reward_scales = [("foot_contact_switch", 100.0), ("foot_contact_penalty", 0.0)]
        .into_iter()
        .collect::<RewardScales>();
    let mut env = common::env(&cfg);
    env.reset()?;
    let actions = common::zeros(&env);
    let feet = [
        env.backend().link_index("Left_FOOT_FE")?,
        env.backend().link_index("Right_FOOT_FE")?,
    ];
    let set_feet = |env: &mut rl::BipedEnv<KinematicSim>, z: f32| -> anyhow::Result<()> {
        env.backend_mut().set_link_offset(feet[0], Vec3::new(0.0, 0.09, z))?;
        env.backend_mut().set_link_offset(feet[1], Vec3::new(0.0, -0.09, z))?;
        Ok(())
    };
    // one unit of the switch term after dt scaling
    let unit = 100.0 * 0.01;

    let grounded = env.step(&actions)?.rew.to_vec();
    assert!(env.state().feet.contact.iter().all(|&c| c == [true, true]));
    assert_eq!(grounded, vec![0.0; 2]);

    set_feet(&mut env, -0.2)?;
    let lifted = env.step(&actions)?.rew.to_vec();
    assert!(env.state().feet.contact.iter().all(|&c| c == [false, false]));
    assert!(lifted.iter().all(|r| (r - unit).abs() < 1e-5), "rew={lifted:?}");
    assert!(env.state().feet.prev_contact.iter().all(|&c| c == [false, false]));

    let stay_lifted = env.step(&actions)?.rew.to_vec();
    assert_eq!(stay_lifted, vec![0.0; 2]);

    set_feet(&mut env, -0.45)?;
    let landed = env.step(&actions)?.rew.to_vec();
    assert!(landed.iter().all(|r| (r - unit).abs() < 1e-5), "rew={landed:?}");
    Ok(())
}

#[test]
fn out_of_range_rows_are_rejected_without_side_effects() -> anyhow::Result<()> {
    let cfg = common::config(2);
    let mut env = common::env(&cfg);
    env.reset()?;
    env.step(&common::zeros(&env))?;
    let commands = command_bits(&env);

    assert!(matches!(
        env.reset_idx(&[0, 5]),
        Err(EnvError::EnvOutOfRange { index: 5, num_envs: 2 })
    ));
    assert_eq!(env.state().episode_length, vec![1, 1]);
    assert!(matches!(
        env.resample_commands(&[2]),
        Err(EnvError::EnvOutOfRange { index: 2, num_envs: 2 })
    ));
    assert_eq!(command_bits(&env), commands);
    Ok(())
}
