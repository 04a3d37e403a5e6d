//! # Biped Locomotion Environment
//!
//! [`BipedEnv`] is the episode state machine. It owns every per-environment
//! buffer, drives a [`SimBackend`] one tick per [`VecEnv::step`], and resets
//! finished rows in place.
//!
//! One tick, in order:
//!
//! 1.  Clip the actions, pick the executed batch (previous actions when
//!     latency is simulated), and send `action * action_scale + q0` as PD
//!     targets.
//! 2.  Advance the backend and read back feet, base and joint state.
//! 3.  Record hip angles, resample commands on the cadence, evaluate
//!     termination.
//! 4.  Evaluate rewards, then roll the contact flags forward.
//! 5.  Assemble observations and reset every terminated row.

use crate::command::CommandSampler;
use crate::config::{EnvConfig, TrainConfig};
use crate::env::{Extras, Observations, Step, VecEnv};
use crate::error::EnvError;
use crate::gait;
use crate::observation::ObservationAssembler;
use crate::reward::{RewardParams, RewardRegistry};
use crate::state::BatchState;
use glam::{Quat, Vec3};
use physics::transform::{
    inv_quat, quat_from_wxyz, quat_to_rpy_degrees, transform_by_quat, transform_quat_by_quat,
};
use physics::{KinematicSim, SimBackend, SimOptions};

/// Environment parameters resolved once at construction.
#[derive(Debug, Clone, Copy)]
struct Limits {
    dt: f32,
    action_scale: f32,
    clip_actions: f32,
    simulate_action_latency: bool,
    max_episode_length: u32,
    resampling_interval: u32,
    episode_length_s: f32,
    pitch_threshold: f32,
    roll_threshold: f32,
}

impl Limits {
    #[allow(clippy::cast_possible_truncation)]
    fn from_config(env: &EnvConfig) -> Self {
        Self {
            dt: env.physics_dt(),
            action_scale: env.action_scale,
            clip_actions: env.clip_actions,
            simulate_action_latency: env.simulate_action_latency,
            max_episode_length: env.max_episode_length(),
            resampling_interval: env.resampling_interval(),
            episode_length_s: env.episode_length_s as f32,
            pitch_threshold: env.termination_if_pitch_greater_than,
            roll_threshold: env.termination_if_roll_greater_than,
        }
    }
}

/// Ground, robot, `num_envs` copies, PD gains and force limits. Returns the
/// motor dof indices in `joint_names` order and the `[left, right]` foot links.
fn setup_scene<B: SimBackend>(
    backend: &mut B,
    cfg: &TrainConfig,
    pos: Vec3,
    quat: Quat,
) -> Result<(Vec<usize>, [usize; 2]), EnvError> {
    let env = &cfg.env;
    let num_actions = env.num_actions;
    backend.add_ground_plane()?;
    backend.load_robot(&env.robot_file, pos, quat)?;
    backend.build(cfg.num_envs)?;

    let motor_dofs = env
        .joint_names
        .iter()
        .map(|name| backend.dof_index(name))
        .collect::<Result<Vec<_>, _>>()?;
    backend.set_dofs_kp(&vec![env.kp; num_actions], &motor_dofs)?;
    backend.set_dofs_kv(&vec![env.kd; num_actions], &motor_dofs)?;
    backend.set_dofs_force_range(
        &vec![-env.clip_actions; num_actions],
        &vec![env.clip_actions; num_actions],
        &motor_dofs,
    )?;
    let foot_links = [
        backend.link_index(&env.foot_links.left)?,
        backend.link_index(&env.foot_links.right)?,
    ];
    Ok((motor_dofs, foot_links))
}

pub struct BipedEnv<B: SimBackend> {
    backend: B,
    limits: Limits,

    motor_dofs: Vec<usize>,
    /// `[left, right]` foot link indices.
    foot_links: [usize; 2],
    base_init_pos: Vec3,
    base_init_quat: Quat,
    inv_base_init_quat: Quat,

    params: RewardParams,
    rewards: RewardRegistry,
    sampler: CommandSampler,
    assembler: ObservationAssembler,

    state: BatchState,
    targets: Vec<f32>,
    obs_buf: Vec<f32>,
    rew_buf: Vec<f32>,
    extras: Extras,
}

impl BipedEnv<KinematicSim> {
    /// Build the environment on a fresh [`KinematicSim`] using the timestep
    /// and substeps of `cfg`.
    ///
    /// # Errors
    /// See [`BipedEnv::new`].
    pub fn kinematic(cfg: &TrainConfig) -> Result<Self, EnvError> {
        let sim = KinematicSim::new(SimOptions {
            dt: cfg.env.physics_dt(),
            substeps: cfg.env.substeps,
        });
        Self::new(cfg, sim)
    }
}

impl<B: SimBackend> BipedEnv<B> {
    /// Validate `cfg`, set up the scene on `backend` and register the reward
    /// terms.
    ///
    /// `backend` must be fresh: this adds the ground plane, loads the robot
    /// and builds `cfg.num_envs` copies.
    ///
    /// # Errors
    /// Any configuration error, an unknown reward name, a joint or link the
    /// robot lacks, or a backend whose timestep differs from `cfg.env.dt`.
    pub fn new(cfg: &TrainConfig, mut backend: B) -> Result<Self, EnvError> {
        cfg.validate()?;
        let env = &cfg.env;
        let num_envs = cfg.num_envs;
        let num_actions = env.num_actions;

        if (backend.dt() - env.physics_dt()).abs() > f32::EPSILON {
            return Err(EnvError::Config(format!(
                "backend timestep {} differs from configured dt {}",
                backend.dt(),
                env.dt
            )));
        }

        let base_init_pos = Vec3::from_array(env.base_init_pos);
        let base_init_quat = quat_from_wxyz(env.base_init_quat);
        let (motor_dofs, foot_links) =
            setup_scene(&mut backend, cfg, base_init_pos, base_init_quat)?;

        let pair = |names: &[String; 2]| -> Result<[usize; 2], EnvError> {
            Ok([env.joint_position(&names[0])?, env.joint_position(&names[1])?])
        };
        let params = RewardParams {
            tracking_sigma: cfg.reward.tracking_sigma,
            base_height_target: cfg.reward.base_height_target,
            hip_aa: pair(&env.gait_joints.hip_aa)?,
            hip_fe: pair(&env.gait_joints.hip_fe)?,
            knee_fe: pair(&env.gait_joints.knee_fe)?,
        };
        let rewards = RewardRegistry::new(&cfg.reward.reward_scales, env.physics_dt(), num_envs)?;
        let assembler =
            ObservationAssembler::new(cfg.obs.num_obs, num_actions, cfg.obs.obs_scales)?;
        let sampler = CommandSampler::new(&cfg.command, cfg.seed);

        let limits = Limits::from_config(env);

        let terms: Vec<&str> = rewards.terms().iter().map(|t| t.name.as_str()).collect();
        tracing::info!(
            num_envs,
            num_actions,
            num_obs = cfg.obs.num_obs,
            max_episode_length = limits.max_episode_length,
            resampling_interval = limits.resampling_interval,
            latency = limits.simulate_action_latency,
            ?terms,
            "biped environment ready"
        );

        let obs_len = num_envs * cfg.obs.num_obs;
        Ok(Self {
            backend,
            limits,
            motor_dofs,
            foot_links,
            base_init_pos,
            base_init_quat,
            inv_base_init_quat: inv_quat(base_init_quat),
            params,
            rewards,
            sampler,
            assembler,
            state: BatchState::new(num_envs, env.default_dof_pos()?),
            targets: vec![0.0; num_envs * num_actions],
            obs_buf: vec![0.0; obs_len],
            rew_buf: vec![0.0; num_envs],
            extras: Extras {
                observations: Observations {
                    critic: vec![0.0; obs_len],
                },
                episode: None,
            },
        })
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Direct backend access, e.g. to script a pose in tests.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    #[must_use]
    pub fn state(&self) -> &BatchState {
        &self.state
    }

    #[must_use]
    pub fn rewards(&self) -> &RewardRegistry {
        &self.rewards
    }

    #[must_use]
    pub fn motor_dofs(&self) -> &[usize] {
        &self.motor_dofs
    }

    #[must_use]
    pub fn max_episode_length(&self) -> u32 {
        self.limits.max_episode_length
    }

    #[must_use]
    pub fn resampling_interval(&self) -> u32 {
        self.limits.resampling_interval
    }

    #[must_use]
    pub fn dt(&self) -> f32 {
        self.limits.dt
    }

    /// Redraw the commands of the listed rows only.
    ///
    /// # Errors
    /// [`EnvError::EnvOutOfRange`] for a row index past the batch; no row is
    /// touched in that case.
    pub fn resample_commands(&mut self, env_ids: &[usize]) -> Result<(), EnvError> {
        self.check_env_ids(env_ids)?;
        self.sampler.resample(&mut self.state.commands, env_ids);
        Ok(())
    }

    /// Reset the listed rows to the initial pose and start a new episode for
    /// each. Writes the per-term episode averages of those rows to
    /// `extras.episode`. An empty list is a no-op.
    ///
    /// # Errors
    /// [`EnvError::EnvOutOfRange`] before anything is written, or a backend
    /// failure while writing the reset state.
    pub fn reset_idx(&mut self, env_ids: &[usize]) -> Result<(), EnvError> {
        if env_ids.is_empty() {
            return Ok(());
        }
        self.check_env_ids(env_ids)?;
        let num_actions = self.state.num_actions;

        for &env in env_ids {
            let contact = gait::initial_contact(&self.state, env);
            self.state.feet.prev_contact[env] = contact;
        }

        let mut positions = Vec::with_capacity(env_ids.len() * num_actions);
        for &env in env_ids {
            let row = env * num_actions..(env + 1) * num_actions;
            self.state.dof_pos[row.clone()].copy_from_slice(&self.state.default_dof_pos);
            self.state.dof_vel[row].fill(0.0);
            positions.extend_from_slice(&self.state.default_dof_pos);
        }
        self.backend
            .set_dofs_position(&positions, &self.motor_dofs, env_ids, true)?;

        for &env in env_ids {
            self.state.base_pos[env] = self.base_init_pos;
            self.state.base_quat[env] = self.base_init_quat;
            self.state.base_lin_vel[env] = Vec3::ZERO;
            self.state.base_ang_vel[env] = Vec3::ZERO;
        }
        self.backend
            .set_base_pos(&vec![self.base_init_pos; env_ids.len()], env_ids, false)?;
        self.backend
            .set_base_quat(&vec![self.base_init_quat; env_ids.len()], env_ids, false)?;
        self.backend.zero_all_dofs_velocity(env_ids)?;

        for &env in env_ids {
            self.state.last_actions[env * num_actions..(env + 1) * num_actions].fill(0.0);
            self.state.episode_length[env] = 0;
            self.state.reset_buf[env] = true;
            self.state.hip_history[env].clear();
        }

        self.extras.episode = Some(
            self.rewards
                .take_episode_log(env_ids, self.limits.episode_length_s),
        );
        self.sampler.resample(&mut self.state.commands, env_ids);
        tracing::debug!(count = env_ids.len(), "environments reset");
        Ok(())
    }

    fn check_env_ids(&self, env_ids: &[usize]) -> Result<(), EnvError> {
        let num_envs = self.state.num_envs;
        match env_ids.iter().find(|&&env| env >= num_envs) {
            Some(&index) => Err(EnvError::EnvOutOfRange { index, num_envs }),
            None => Ok(()),
        }
    }

    fn apply_actions(&mut self, actions: &[f32]) -> Result<(), EnvError> {
        let clip = self.limits.clip_actions;
        for (dst, &a) in self.state.actions.iter_mut().zip(actions) {
            *dst = a.clamp(-clip, clip);
        }
        let executed = if self.limits.simulate_action_latency {
            &self.state.last_actions
        } else {
            &self.state.actions
        };
        let defaults = self.state.default_dof_pos.iter().cycle();
        for ((target, &a), &q0) in self.targets.iter_mut().zip(executed).zip(defaults) {
            *target = a * self.limits.action_scale + q0;
        }
        self.backend
            .control_dofs_position(&self.targets, &self.motor_dofs)?;
        self.backend.step()?;
        Ok(())
    }

    fn read_back(&mut self) {
        let [left, right] = self.foot_links;
        let (left_pos, left_quat) = (self.backend.link_pos(left), self.backend.link_quat(left));
        let (right_pos, right_quat) = (self.backend.link_pos(right), self.backend.link_quat(right));
        gait::update_feet(&mut self.state, (&left_pos, &left_quat), (&right_pos, &right_quat));

        let s = &mut self.state;
        for len in &mut s.episode_length {
            *len += 1;
        }
        s.base_pos = self.backend.base_pos();
        s.base_quat = self.backend.base_quat();
        let lin_vel = self.backend.base_lin_vel();
        let ang_vel = self.backend.base_ang_vel();
        for env in 0..s.num_envs {
            let quat = s.base_quat[env];
            let inv = inv_quat(quat);
            let relative = transform_quat_by_quat(self.inv_base_init_quat, quat);
            s.base_euler[env] = quat_to_rpy_degrees(relative);
            s.base_lin_vel[env] = transform_by_quat(lin_vel[env], inv);
            s.base_ang_vel[env] = transform_by_quat(ang_vel[env], inv);
            s.projected_gravity[env] = transform_by_quat(Vec3::NEG_Z, inv);
        }
        s.dof_pos = self.backend.dofs_position(&self.motor_dofs);
        s.dof_vel = self.backend.dofs_velocity(&self.motor_dofs);
    }

    fn check_termination(&mut self) {
        let limits = self.limits;
        let s = &mut self.state;
        for env in 0..s.num_envs {
            let euler = s.base_euler[env];
            s.reset_buf[env] = s.episode_length[env] > limits.max_episode_length
                || euler.y.abs() > limits.pitch_threshold
                || euler.x.abs() > limits.roll_threshold;
        }
    }
}

impl<B: SimBackend> VecEnv for BipedEnv<B> {
    fn reset(&mut self) -> Result<(&[f32], Option<&[f32]>), EnvError> {
        self.state.reset_buf.fill(true);
        let all: Vec<usize> = (0..self.state.num_envs).collect();
        self.reset_idx(&all)?;
        Ok((self.obs_buf.as_slice(), None))
    }

    fn step(&mut self, actions: &[f32]) -> Result<Step<'_>, EnvError> {
        let expected = self.state.num_envs * self.state.num_actions;
        if actions.len() != expected {
            return Err(EnvError::ActionShape {
                expected,
                actual: actions.len(),
            });
        }
        self.extras.episode = None;
        if self.state.num_envs > 0 {
            self.apply_actions(actions)?;
            self.read_back();
            gait::record_hip_angles(&mut self.state, self.params.hip_fe);

            let interval = self.limits.resampling_interval;
            let due: Vec<usize> = (0..self.state.num_envs)
                .filter(|&env| self.state.episode_length[env] % interval == 0)
                .collect();
            if !due.is_empty() {
                tracing::debug!(count = due.len(), "commands resampled");
                self.sampler.resample(&mut self.state.commands, &due);
            }

            self.check_termination();
            self.rewards
                .compute(&self.state, &self.params, &mut self.rew_buf);
            gait::commit_contacts(&mut self.state);

            self.assembler.assemble(&self.state, &mut self.obs_buf);
            self.state.last_actions.copy_from_slice(&self.state.actions);
            self.extras
                .observations
                .critic
                .copy_from_slice(&self.obs_buf);

            let finished: Vec<usize> = (0..self.state.num_envs)
                .filter(|&env| self.state.reset_buf[env])
                .collect();
            self.reset_idx(&finished)?;
        }
        Ok(Step {
            obs: &self.obs_buf,
            rew: &self.rew_buf,
            done: &self.state.reset_buf,
            extras: &self.extras,
        })
    }

    fn get_observations(&self) -> (&[f32], &Extras) {
        (&self.obs_buf, &self.extras)
    }

    fn num_envs(&self) -> usize {
        self.state.num_envs
    }

    fn num_obs(&self) -> usize {
        self.assembler.num_obs()
    }

    fn num_actions(&self) -> usize {
        self.state.num_actions
    }
}
