//! # Simulation Backend Contract
//!
//! The environment layer never integrates physics itself. It talks to a
//! backend through [`SimBackend`], which owns all physical state (poses,
//! velocities, contacts) and is the only component allowed to mutate it.
//!
//! Batched buffers are row-major with the environment index leading: a call
//! that reads `D` dofs for `N` environments returns `N * D` values where
//! `out[env * D + k]` belongs to `dofs[k]` of environment `env`.

use crate::error::PhysicsError;
use glam::{Quat, Vec3};
use std::path::Path;

pub trait SimBackend {
    /// Adds a fixed ground plane at `z = 0`.
    ///
    /// # Errors
    /// Fails once the scene has been built.
    fn add_ground_plane(&mut self) -> Result<(), PhysicsError>;

    /// Loads the articulated robot description at `path`, spawned at `pos`
    /// with orientation `quat`.
    ///
    /// # Errors
    /// Fails when the file cannot be read or parsed, or the scene is built.
    fn load_robot(&mut self, path: &Path, pos: Vec3, quat: Quat) -> Result<(), PhysicsError>;

    /// Instantiates `num_envs` independent copies of the scene.
    ///
    /// # Errors
    /// Fails without a robot or when called twice.
    fn build(&mut self, num_envs: usize) -> Result<(), PhysicsError>;

    fn num_envs(&self) -> usize;

    /// Physics timestep of one [`SimBackend::step`] call, in seconds.
    fn dt(&self) -> f32;

    /// Local dof index of the named joint.
    ///
    /// # Errors
    /// [`PhysicsError::UnknownJoint`] when the robot has no such joint.
    fn dof_index(&self, joint: &str) -> Result<usize, PhysicsError>;

    /// Index of the named link.
    ///
    /// # Errors
    /// [`PhysicsError::UnknownLink`] when the robot has no such link.
    fn link_index(&self, link: &str) -> Result<usize, PhysicsError>;

    /// Proportional gain per listed dof, shared by all environments.
    ///
    /// # Errors
    /// Fails on length mismatch or unknown dof index.
    fn set_dofs_kp(&mut self, kp: &[f32], dofs: &[usize]) -> Result<(), PhysicsError>;

    /// Derivative gain per listed dof, shared by all environments.
    ///
    /// # Errors
    /// Fails on length mismatch or unknown dof index.
    fn set_dofs_kv(&mut self, kv: &[f32], dofs: &[usize]) -> Result<(), PhysicsError>;

    /// Actuator force limits per listed dof.
    ///
    /// # Errors
    /// Fails on length mismatch or unknown dof index.
    fn set_dofs_force_range(
        &mut self,
        lower: &[f32],
        upper: &[f32],
        dofs: &[usize],
    ) -> Result<(), PhysicsError>;

    /// Sets position targets (`N * dofs.len()` values) for the PD controllers.
    ///
    /// # Errors
    /// Fails on length mismatch or before the scene is built.
    fn control_dofs_position(
        &mut self,
        targets: &[f32],
        dofs: &[usize],
    ) -> Result<(), PhysicsError>;

    /// Advances every environment by exactly one physics tick.
    ///
    /// # Errors
    /// Backend failures are fatal for the caller; nothing is retried.
    fn step(&mut self) -> Result<(), PhysicsError>;

    fn base_pos(&self) -> Vec<Vec3>;
    fn base_quat(&self) -> Vec<Quat>;
    /// World-frame linear velocity of the base.
    fn base_lin_vel(&self) -> Vec<Vec3>;
    /// World-frame angular velocity of the base.
    fn base_ang_vel(&self) -> Vec<Vec3>;

    fn dofs_position(&self, dofs: &[usize]) -> Vec<f32>;
    fn dofs_velocity(&self, dofs: &[usize]) -> Vec<f32>;

    fn link_pos(&self, link: usize) -> Vec<Vec3>;
    fn link_quat(&self, link: usize) -> Vec<Quat>;

    /// Writes dof positions for the listed environment rows only.
    /// `positions` holds `envs.len() * dofs.len()` values.
    ///
    /// # Errors
    /// Fails on shape mismatch or an out-of-range row.
    fn set_dofs_position(
        &mut self,
        positions: &[f32],
        dofs: &[usize],
        envs: &[usize],
        zero_velocity: bool,
    ) -> Result<(), PhysicsError>;

    /// Writes base positions for the listed rows.
    ///
    /// # Errors
    /// Fails on shape mismatch or an out-of-range row.
    fn set_base_pos(
        &mut self,
        pos: &[Vec3],
        envs: &[usize],
        zero_velocity: bool,
    ) -> Result<(), PhysicsError>;

    /// Writes base orientations for the listed rows.
    ///
    /// # Errors
    /// Fails on shape mismatch or an out-of-range row.
    fn set_base_quat(
        &mut self,
        quat: &[Quat],
        envs: &[usize],
        zero_velocity: bool,
    ) -> Result<(), PhysicsError>;

    /// Zeroes base and joint velocities of the listed rows.
    ///
    /// # Errors
    /// Fails on an out-of-range row.
    fn zero_all_dofs_velocity(&mut self, envs: &[usize]) -> Result<(), PhysicsError>;
}
