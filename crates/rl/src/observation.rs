//! # Observation Assembly
//!
//! One row per environment, laid out as
//!
//! | columns        | content                                  |
//! |----------------|------------------------------------------|
//! | `0..3`         | base angular velocity × `ang_vel`        |
//! | `3..6`         | projected gravity                        |
//! | `6..9`         | commands × `[lin_vel, lin_vel, ang_vel]` |
//! | `9..9+A`       | `(q - q0)` × `dof_pos`                   |
//! | `9+A..9+2A`    | `dq` × `dof_vel`                         |
//! | `9+2A..9+3A`   | current clipped actions                  |
//!
//! Base linear velocity is left out of the observation.

use crate::config::ObsScales;
use crate::error::EnvError;
use crate::state::BatchState;
use glam::Vec3;

const BASE_COLUMNS: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObservationAssembler {
    num_obs: usize,
    num_actions: usize,
    scales: ObsScales,
}

impl ObservationAssembler {
    /// Row width for `num_actions` joints.
    #[must_use]
    pub const fn width_for(num_actions: usize) -> usize {
        BASE_COLUMNS + 3 * num_actions
    }

    /// # Errors
    /// [`EnvError::ObservationWidth`] when `num_obs` does not match the
    /// assembled layout.
    pub fn new(num_obs: usize, num_actions: usize, scales: ObsScales) -> Result<Self, EnvError> {
        let actual = Self::width_for(num_actions);
        if num_obs != actual {
            return Err(EnvError::ObservationWidth {
                expected: num_obs,
                actual,
            });
        }
        Ok(Self {
            num_obs,
            num_actions,
            scales,
        })
    }

    #[must_use]
    pub fn num_obs(&self) -> usize {
        self.num_obs
    }

    /// Overwrite `out` (`num_envs * num_obs`) from the current state.
    pub fn assemble(&self, state: &BatchState, out: &mut [f32]) {
        let a = self.num_actions;
        let s = self.scales;
        let command_scale = Vec3::new(s.lin_vel, s.lin_vel, s.ang_vel);
        for (env, row) in out.chunks_exact_mut(self.num_obs).enumerate() {
            let (head, joints) = row.split_at_mut(BASE_COLUMNS);
            let head_vectors = [
                state.base_ang_vel[env] * s.ang_vel,
                state.projected_gravity[env],
                state.commands[env] * command_scale,
            ];
            head.copy_from_slice(bytemuck::cast_slice(&head_vectors));

            let (pos, rest) = joints.split_at_mut(a);
            let (vel, act) = rest.split_at_mut(a);
            let offsets = state.dof_pos_row(env).iter().zip(&state.default_dof_pos);
            for (o, (q, q0)) in pos.iter_mut().zip(offsets) {
                *o = (q - q0) * s.dof_pos;
            }
            for (o, dq) in vel.iter_mut().zip(state.dof_vel_row(env)) {
                *o = dq * s.dof_vel;
            }
            act.copy_from_slice(state.actions_row(env));
        }
    }
}
