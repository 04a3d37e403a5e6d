//! # Reward Registry
//!
//! Each reward term is a plain function of the batched state evaluated for
//! one environment row. Terms are resolved by name once, at construction,
//! from a fixed table ([`lookup`]); an unknown name is a configuration error.
//!
//! The registry stores `raw_scale * dt` per term in its own table, so the
//! configuration it was built from is never modified. Evaluation order is the
//! order of the configured scales, followed by any always-on contact term the
//! configuration did not mention.
//!
//! Terms never mutate state. The contact-switch term compares against the
//! previous tick's contact flags, which the episode state machine rolls
//! forward after evaluation (see [`crate::gait::commit_contacts`]).

use crate::config::RewardScales;
use crate::error::EnvError;
use crate::gait::{direction_consistency, SWING_HEIGHT_THRESHOLD};
use crate::state::{BatchState, LEFT, RIGHT};
use indexmap::IndexMap;

/// Signature shared by every reward term: `(state, params, env) -> value`.
pub type RewardFn = fn(&BatchState, &RewardParams, usize) -> f32;

/// Terms registered even when absent from the configuration, with their
/// default raw scales.
pub const ALWAYS_ON: [(&str, f32); 2] = [
    ("foot_contact_penalty", -1.0),
    ("foot_contact_switch", 0.5),
];

/// Names accepted by [`lookup`].
pub const REWARD_NAMES: [&str; 19] = [
    "tracking_lin_vel",
    "tracking_ang_vel",
    "lin_vel_z",
    "action_rate",
    "similar_to_default",
    "base_height",
    "orientation_stability",
    "survive",
    "penalize_hip_aa",
    "penalize_hip_fe",
    "penalize_hip_fe_diff",
    "penalize_knee_fe_left",
    "penalize_knee_fe_right",
    "penalize_ankle_height",
    "gait_regularity",
    "foot_orientation",
    "step_height_consistency",
    "foot_contact_penalty",
    "foot_contact_switch",
];

/// Constants the terms read besides the batched state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardParams {
    pub tracking_sigma: f32,
    pub base_height_target: f32,
    /// Columns of the hip abduction/adduction joints, `[left, right]`.
    pub hip_aa: [usize; 2],
    /// Columns of the hip flexion/extension joints, `[left, right]`.
    pub hip_fe: [usize; 2],
    /// Columns of the left knee and right shin joints.
    pub knee_fe: [usize; 2],
}

/// Resolve a reward name to its function.
///
/// # Errors
/// [`EnvError::UnknownReward`] for a name outside [`REWARD_NAMES`].
pub fn lookup(name: &str) -> Result<RewardFn, EnvError> {
    let f: RewardFn = match name {
        "tracking_lin_vel" => tracking_lin_vel,
        "tracking_ang_vel" => tracking_ang_vel,
        "lin_vel_z" => lin_vel_z,
        "action_rate" => action_rate,
        "similar_to_default" => similar_to_default,
        "base_height" => base_height,
        "orientation_stability" => orientation_stability,
        "survive" => survive,
        "penalize_hip_aa" => penalize_hip_aa,
        "penalize_hip_fe" => penalize_hip_fe,
        "penalize_hip_fe_diff" => penalize_hip_fe_diff,
        "penalize_knee_fe_left" => penalize_knee_fe_left,
        "penalize_knee_fe_right" => penalize_knee_fe_right,
        "penalize_ankle_height" => penalize_ankle_height,
        "gait_regularity" => gait_regularity,
        "foot_orientation" => foot_orientation,
        "step_height_consistency" => step_height_consistency,
        "foot_contact_penalty" => foot_contact_penalty,
        "foot_contact_switch" => foot_contact_switch,
        _ => return Err(EnvError::UnknownReward(name.to_string())),
    };
    Ok(f)
}

pub struct RewardTerm {
    pub name: String,
    /// Raw scale multiplied by the physics timestep.
    pub scale: f32,
    pub eval: RewardFn,
}

/// Per-term episode averages of the rows reset on one tick, keyed
/// `rew_<term>`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EpisodeLog(IndexMap<String, f32>);

impl EpisodeLog {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<f32> {
        self.0.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub struct RewardRegistry {
    terms: Vec<RewardTerm>,
    /// One running sum per term per environment.
    episode_sums: Vec<Vec<f32>>,
    num_envs: usize,
}

impl RewardRegistry {
    /// Build the term table from raw scales.
    ///
    /// # Errors
    /// [`EnvError::UnknownReward`] for any name without a function.
    pub fn new(scales: &RewardScales, dt: f32, num_envs: usize) -> Result<Self, EnvError> {
        let mut terms = Vec::with_capacity(scales.len() + ALWAYS_ON.len());
        for (name, raw) in scales.iter() {
            terms.push(RewardTerm {
                name: name.to_string(),
                scale: raw * dt,
                eval: lookup(name)?,
            });
        }
        for (name, raw) in ALWAYS_ON {
            if scales.get(name).is_none() {
                terms.push(RewardTerm {
                    name: name.to_string(),
                    scale: raw * dt,
                    eval: lookup(name)?,
                });
            }
        }
        let episode_sums = vec![vec![0.0; num_envs]; terms.len()];
        Ok(Self {
            terms,
            episode_sums,
            num_envs,
        })
    }

    #[must_use]
    pub fn terms(&self) -> &[RewardTerm] {
        &self.terms
    }

    /// Effective (dt-scaled) scale of a term.
    #[must_use]
    pub fn scale(&self, name: &str) -> Option<f32> {
        self.terms.iter().find(|t| t.name == name).map(|t| t.scale)
    }

    /// Running episode sum of one term for one row.
    #[must_use]
    pub fn episode_sum(&self, name: &str, env: usize) -> Option<f32> {
        let k = self.terms.iter().position(|t| t.name == name)?;
        self.episode_sums[k].get(env).copied()
    }

    /// Overwrite `rew_buf` with the scaled sum of all terms and add each
    /// term's contribution to the episode sums.
    pub fn compute(&mut self, state: &BatchState, params: &RewardParams, rew_buf: &mut [f32]) {
        rew_buf.fill(0.0);
        for (term, sums) in self.terms.iter().zip(self.episode_sums.iter_mut()) {
            for env in 0..self.num_envs {
                let r = (term.eval)(state, params, env) * term.scale;
                rew_buf[env] += r;
                sums[env] += r;
            }
        }
    }

    /// Average episode sum over `env_ids` for every term, divided by the
    /// episode length in seconds; the sums of those rows are zeroed.
    #[must_use]
    pub fn take_episode_log(&mut self, env_ids: &[usize], episode_length_s: f32) -> EpisodeLog {
        if env_ids.is_empty() {
            return EpisodeLog::default();
        }
        #[allow(clippy::cast_precision_loss)]
        let count = env_ids.len() as f32;
        let mut entries = IndexMap::with_capacity(self.terms.len());
        for (term, sums) in self.terms.iter().zip(self.episode_sums.iter_mut()) {
            let total: f32 = env_ids.iter().map(|&env| sums[env]).sum();
            entries.insert(format!("rew_{}", term.name), total / count / episode_length_s);
            for &env in env_ids {
                sums[env] = 0.0;
            }
        }
        EpisodeLog(entries)
    }
}

fn relu(x: f32) -> f32 {
    x.max(0.0)
}

fn dof(state: &BatchState, env: usize, column: usize) -> f32 {
    state.dof_pos[env * state.num_actions + column]
}

#[must_use]
pub fn tracking_lin_vel(state: &BatchState, params: &RewardParams, env: usize) -> f32 {
    let cmd = state.commands[env];
    let vel = state.base_lin_vel[env];
    let err = (cmd.x - vel.x).powi(2) + (cmd.y - vel.y).powi(2);
    (-err / params.tracking_sigma).exp()
}

#[must_use]
pub fn tracking_ang_vel(state: &BatchState, params: &RewardParams, env: usize) -> f32 {
    let err = (state.commands[env].z - state.base_ang_vel[env].z).powi(2);
    (-err / params.tracking_sigma).exp()
}

#[must_use]
pub fn lin_vel_z(state: &BatchState, _: &RewardParams, env: usize) -> f32 {
    state.base_lin_vel[env].z.powi(2)
}

#[must_use]
pub fn action_rate(state: &BatchState, _: &RewardParams, env: usize) -> f32 {
    state
        .last_actions_row(env)
        .iter()
        .zip(state.actions_row(env))
        .map(|(prev, cur)| (prev - cur).powi(2))
        .sum()
}

#[must_use]
pub fn similar_to_default(state: &BatchState, _: &RewardParams, env: usize) -> f32 {
    state
        .dof_pos_row(env)
        .iter()
        .zip(&state.default_dof_pos)
        .map(|(q, q0)| (q - q0).abs())
        .sum()
}

#[must_use]
pub fn base_height(state: &BatchState, params: &RewardParams, env: usize) -> f32 {
    (state.base_pos[env].z - params.base_height_target).powi(2)
}

#[must_use]
pub fn orientation_stability(state: &BatchState, _: &RewardParams, env: usize) -> f32 {
    let euler = state.base_euler[env];
    euler.y.to_radians().powi(2) + euler.x.to_radians().powi(2)
}

#[must_use]
pub fn survive(_: &BatchState, _: &RewardParams, _: usize) -> f32 {
    1.0
}

#[must_use]
pub fn penalize_hip_aa(state: &BatchState, params: &RewardParams, env: usize) -> f32 {
    params.hip_aa.iter().map(|&c| dof(state, env, c).abs()).sum()
}

#[must_use]
pub fn penalize_hip_fe(state: &BatchState, params: &RewardParams, env: usize) -> f32 {
    params.hip_fe.iter().map(|&c| dof(state, env, c).abs()).sum()
}

#[must_use]
pub fn penalize_hip_fe_diff(state: &BatchState, params: &RewardParams, env: usize) -> f32 {
    (dof(state, env, params.hip_fe[LEFT]) - dof(state, env, params.hip_fe[RIGHT])).abs()
}

#[must_use]
pub fn penalize_knee_fe_left(state: &BatchState, params: &RewardParams, env: usize) -> f32 {
    relu(0.9 + dof(state, env, params.knee_fe[LEFT]))
}

#[must_use]
pub fn penalize_knee_fe_right(state: &BatchState, params: &RewardParams, env: usize) -> f32 {
    relu(0.9 - dof(state, env, params.knee_fe[RIGHT]))
}

#[must_use]
pub fn penalize_ankle_height(state: &BatchState, _: &RewardParams, env: usize) -> f32 {
    let [left, right] = state.feet.heights[env];
    0.5 * (left + right)
}

/// Anti-phase hip flexion plus a bonus for smooth, periodic swing.
///
/// The swing bonus reads the left hip history oldest to newest, so ring
/// rotation never shows up as a direction change.
#[must_use]
pub fn gait_regularity(state: &BatchState, params: &RewardParams, env: usize) -> f32 {
    let left = dof(state, env, params.hip_fe[LEFT]);
    let right = dof(state, env, params.hip_fe[RIGHT]);
    let phase = (-(left + right).abs() / 0.3).exp();
    let periodicity = 0.5 * direction_consistency(&state.hip_history[env]);
    phase + periodicity
}

/// Flat soles, and both soles tilted alike.
#[must_use]
pub fn foot_orientation(state: &BatchState, _: &RewardParams, env: usize) -> f32 {
    let [left, right] = state.feet.sole_alignment[env];
    let mean = 0.5 * (left + right);
    0.5 * mean + 0.05 * -(left - right).abs()
}

#[must_use]
pub fn step_height_consistency(state: &BatchState, _: &RewardParams, env: usize) -> f32 {
    let [left, right] = state.feet.heights[env];
    (-(left - right).abs() / 0.05).exp()
}

/// 1 in flight. Under single support, the swing height above
/// [`SWING_HEIGHT_THRESHOLD`].
#[must_use]
pub fn foot_contact_penalty(state: &BatchState, _: &RewardParams, env: usize) -> f32 {
    let heights = state.feet.heights[env];
    match state.feet.contact[env].iter().filter(|&&c| c).count() {
        0 => 1.0,
        1 => relu(heights[LEFT].max(heights[RIGHT]) - SWING_HEIGHT_THRESHOLD),
        _ => 0.0,
    }
}

/// 1 when both feet changed contact state since the previous tick.
#[must_use]
pub fn foot_contact_switch(state: &BatchState, _: &RewardParams, env: usize) -> f32 {
    let now = state.feet.contact[env];
    let before = state.feet.prev_contact[env];
    if now[LEFT] != before[LEFT] && now[RIGHT] != before[RIGHT] {
        1.0
    } else {
        0.0
    }
}
