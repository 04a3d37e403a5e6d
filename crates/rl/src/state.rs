//! # Batched Environment State
//!
//! Every per-environment buffer lives in [`BatchState`]. All buffers share
//! the leading dimension `num_envs` and stay index-aligned: row `i` of any
//! buffer always describes the same simulated robot.
//!
//! Joint-sized buffers are flat, row-major `num_envs * num_actions` vectors;
//! use the `*_row` accessors to get one environment's slice.

use glam::{Quat, Vec3};

/// Samples kept per hip in [`HipHistory`].
pub const HIP_HISTORY_LEN: usize = 10;

/// Feet are always indexed left then right.
pub const LEFT: usize = 0;
pub const RIGHT: usize = 1;

/// Rolling window of the last [`HIP_HISTORY_LEN`] hip flexion angles of one
/// robot, per side. New samples overwrite the oldest one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HipHistory {
    samples: [[f32; HIP_HISTORY_LEN]; 2],
    cursor: usize,
}

impl Default for HipHistory {
    fn default() -> Self {
        Self {
            samples: [[0.0; HIP_HISTORY_LEN]; 2],
            cursor: 0,
        }
    }
}

impl HipHistory {
    pub fn push(&mut self, left: f32, right: f32) {
        self.samples[LEFT][self.cursor] = left;
        self.samples[RIGHT][self.cursor] = right;
        self.cursor = (self.cursor + 1) % HIP_HISTORY_LEN;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// True while nothing but zeros has been recorded.
    #[must_use]
    pub fn is_all_zero(&self) -> bool {
        self.samples.iter().flatten().all(|&s| s == 0.0)
    }

    /// One side's samples, oldest first.
    #[must_use]
    pub fn chronological(&self, side: usize) -> [f32; HIP_HISTORY_LEN] {
        let mut out = [0.0; HIP_HISTORY_LEN];
        for (k, slot) in out.iter_mut().enumerate() {
            *slot = self.samples[side][(self.cursor + k) % HIP_HISTORY_LEN];
        }
        out
    }
}

/// Per-foot signals refreshed once per tick from backend link poses.
#[derive(Debug, Clone, Default)]
pub struct FootState {
    /// World height of each foot link, `[left, right]`.
    pub heights: Vec<[f32; 2]>,
    pub quats: Vec<[Quat; 2]>,
    /// Sole normal projected on world-down, `[left, right]`.
    pub sole_alignment: Vec<[f32; 2]>,
    /// Contact flags derived from `heights` this tick.
    pub contact: Vec<[bool; 2]>,
    /// Contact flags of the previous tick, for edge detection.
    pub prev_contact: Vec<[bool; 2]>,
    /// False until the first physics tick has populated the buffers above.
    pub initialized: bool,
}

/// All vectorized buffers owned by the episode state machine.
#[derive(Debug, Clone)]
pub struct BatchState {
    pub num_envs: usize,
    pub num_actions: usize,

    pub base_pos: Vec<Vec3>,
    pub base_quat: Vec<Quat>,
    /// Roll, pitch, yaw in degrees, relative to the initial orientation.
    pub base_euler: Vec<Vec3>,
    /// Base frame.
    pub base_lin_vel: Vec<Vec3>,
    /// Base frame.
    pub base_ang_vel: Vec<Vec3>,
    pub projected_gravity: Vec<Vec3>,

    pub dof_pos: Vec<f32>,
    pub dof_vel: Vec<f32>,
    pub default_dof_pos: Vec<f32>,
    /// Clipped actions of the current tick.
    pub actions: Vec<f32>,
    pub last_actions: Vec<f32>,

    /// `(lin_vel_x, lin_vel_y, ang_vel_yaw)` targets.
    pub commands: Vec<Vec3>,
    pub episode_length: Vec<u32>,
    pub reset_buf: Vec<bool>,

    pub hip_history: Vec<HipHistory>,
    pub feet: FootState,
}

impl BatchState {
    /// Zeroed buffers with identity orientations and gravity pointing down.
    #[must_use]
    pub fn new(num_envs: usize, default_dof_pos: Vec<f32>) -> Self {
        let num_actions = default_dof_pos.len();
        let joints = num_envs * num_actions;
        Self {
            num_envs,
            num_actions,
            base_pos: vec![Vec3::ZERO; num_envs],
            base_quat: vec![Quat::IDENTITY; num_envs],
            base_euler: vec![Vec3::ZERO; num_envs],
            base_lin_vel: vec![Vec3::ZERO; num_envs],
            base_ang_vel: vec![Vec3::ZERO; num_envs],
            projected_gravity: vec![Vec3::NEG_Z; num_envs],
            dof_pos: vec![0.0; joints],
            dof_vel: vec![0.0; joints],
            default_dof_pos,
            actions: vec![0.0; joints],
            last_actions: vec![0.0; joints],
            commands: vec![Vec3::ZERO; num_envs],
            episode_length: vec![0; num_envs],
            reset_buf: vec![true; num_envs],
            hip_history: vec![HipHistory::default(); num_envs],
            feet: FootState {
                heights: vec![[0.0; 2]; num_envs],
                quats: vec![[Quat::IDENTITY; 2]; num_envs],
                sole_alignment: vec![[1.0; 2]; num_envs],
                contact: vec![[false; 2]; num_envs],
                prev_contact: vec![[false; 2]; num_envs],
                initialized: false,
            },
        }
    }

    #[must_use]
    pub fn dof_pos_row(&self, env: usize) -> &[f32] {
        &self.dof_pos[self.row(env)]
    }

    #[must_use]
    pub fn dof_vel_row(&self, env: usize) -> &[f32] {
        &self.dof_vel[self.row(env)]
    }

    #[must_use]
    pub fn actions_row(&self, env: usize) -> &[f32] {
        &self.actions[self.row(env)]
    }

    #[must_use]
    pub fn last_actions_row(&self, env: usize) -> &[f32] {
        &self.last_actions[self.row(env)]
    }

    fn row(&self, env: usize) -> std::ops::Range<usize> {
        env * self.num_actions..(env + 1) * self.num_actions
    }
}
