//! # Velocity Command Sampling
//!
//! Targets are drawn uniformly and independently per component from the
//! configured ranges. Only the requested rows are touched.

use crate::config::CommandConfig;
use glam::Vec3;

pub struct CommandSampler {
    lin_vel_x: [f32; 2],
    lin_vel_y: [f32; 2],
    ang_vel: [f32; 2],
    rng: fastrand::Rng,
}

impl CommandSampler {
    #[must_use]
    pub fn new(cfg: &CommandConfig, seed: u64) -> Self {
        Self {
            lin_vel_x: cfg.lin_vel_x_range,
            lin_vel_y: cfg.lin_vel_y_range,
            ang_vel: cfg.ang_vel_range,
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    /// Redraw the commands of `env_ids`. An empty slice is a no-op.
    pub fn resample(&mut self, commands: &mut [Vec3], env_ids: &[usize]) {
        for &env in env_ids {
            commands[env] = Vec3::new(
                self.uniform(self.lin_vel_x),
                self.uniform(self.lin_vel_y),
                self.uniform(self.ang_vel),
            );
        }
    }

    fn uniform(&mut self, [lower, upper]: [f32; 2]) -> f32 {
        (upper - lower) * self.rng.f32() + lower
    }
}
