//! # Kinematic Reference Backend
//!
//! [`KinematicSim`] is a small batched CPU implementation of [`SimBackend`].
//! It does not resolve contacts or articulated dynamics: joints track their
//! PD targets independently, the base follows its own velocity, and links
//! ride rigidly on the base. That is enough to drive an environment end to
//! end in tests, benchmarks and headless smoke runs.

use crate::backend::SimBackend;
use crate::error::PhysicsError;
use crate::integrator::{integrate_base, integrate_dof};
use crate::robot::RobotDescription;
use crate::transform::quat_from_wxyz;
use crate::types::{BaseBody, DofParams, SimOptions};
use glam::{Quat, Vec3};
use std::path::Path;

/// Batched kinematic simulation container
pub struct KinematicSim {
    options: SimOptions,
    ground_plane: bool,
    robot: Option<RobotDescription>,
    spawn: BaseBody,
    num_envs: usize,
    built: bool,

    // Per-dof parameters, shared by all environments
    dof_params: Vec<DofParams>,

    // Per-link rigid attachment to the base
    link_offsets: Vec<Vec3>,
    link_quats: Vec<Quat>,

    // Per-environment state
    bodies: Vec<BaseBody>,
    dof_pos: Vec<f32>,
    dof_vel: Vec<f32>,
    dof_target: Vec<f32>,
}

impl KinematicSim {
    /// Create an empty scene
    #[must_use]
    pub fn new(options: SimOptions) -> Self {
        Self {
            options,
            ground_plane: false,
            robot: None,
            spawn: BaseBody::at_rest(Vec3::ZERO, Quat::IDENTITY),
            num_envs: 0,
            built: false,
            dof_params: Vec::new(),
            link_offsets: Vec::new(),
            link_quats: Vec::new(),
            bodies: Vec::new(),
            dof_pos: Vec::new(),
            dof_vel: Vec::new(),
            dof_target: Vec::new(),
        }
    }

    /// Load a robot from an in-memory description instead of a file.
    ///
    /// # Errors
    /// Fails once the scene has been built.
    pub fn load_robot_description(
        &mut self,
        desc: RobotDescription,
        pos: Vec3,
        quat: Quat,
    ) -> Result<(), PhysicsError> {
        if self.built {
            return Err(PhysicsError::AlreadyBuilt);
        }
        self.dof_params = desc
            .joints
            .iter()
            .map(|j| DofParams {
                limit_lower: j.lower,
                limit_upper: j.upper,
                ..DofParams::default()
            })
            .collect();
        self.link_offsets = desc
            .links
            .iter()
            .map(|l| Vec3::from_array(l.offset))
            .collect();
        self.link_quats = desc.links.iter().map(|l| quat_from_wxyz(l.quat)).collect();
        self.spawn = BaseBody::at_rest(pos, quat);
        tracing::debug!(
            robot = %desc.name,
            dofs = desc.joints.len(),
            links = desc.links.len(),
            "robot loaded"
        );
        self.robot = Some(desc);
        Ok(())
    }

    #[must_use]
    pub fn num_dofs(&self) -> usize {
        self.dof_params.len()
    }

    #[must_use]
    pub fn options(&self) -> SimOptions {
        self.options
    }

    /// Parameters of one dof (gains, force range and limits).
    #[must_use]
    pub fn dof_params(&self, dof: usize) -> Option<&DofParams> {
        self.dof_params.get(dof)
    }

    /// Overwrite the base velocities of one environment.
    ///
    /// # Errors
    /// Fails on an out-of-range row.
    pub fn set_base_velocity(
        &mut self,
        env: usize,
        lin_vel: Vec3,
        ang_vel: Vec3,
    ) -> Result<(), PhysicsError> {
        self.check_env(env)?;
        self.bodies[env].lin_vel = lin_vel;
        self.bodies[env].ang_vel = ang_vel;
        Ok(())
    }

    /// Move a link relative to the base, e.g. to script foot trajectories.
    ///
    /// # Errors
    /// Fails on an unknown link index.
    pub fn set_link_offset(&mut self, link: usize, offset: Vec3) -> Result<(), PhysicsError> {
        let slot = self
            .link_offsets
            .get_mut(link)
            .ok_or_else(|| PhysicsError::UnknownLink(link.to_string()))?;
        *slot = offset;
        Ok(())
    }

    fn check_built(&self) -> Result<(), PhysicsError> {
        if self.built {
            Ok(())
        } else {
            Err(PhysicsError::NotBuilt)
        }
    }

    fn check_env(&self, env: usize) -> Result<(), PhysicsError> {
        if env < self.num_envs {
            Ok(())
        } else {
            Err(PhysicsError::EnvOutOfRange { index: env, num_envs: self.num_envs })
        }
    }

    fn check_dofs(&self, dofs: &[usize]) -> Result<(), PhysicsError> {
        let num_dofs = self.num_dofs();
        match dofs.iter().find(|&&d| d >= num_dofs) {
            Some(&index) => Err(PhysicsError::DofOutOfRange { index, num_dofs }),
            None => Ok(()),
        }
    }

    fn check_len(expected: usize, actual: usize) -> Result<(), PhysicsError> {
        if expected == actual {
            Ok(())
        } else {
            Err(PhysicsError::ShapeMismatch { expected, actual })
        }
    }

    fn check_rows(&self, envs: &[usize]) -> Result<(), PhysicsError> {
        envs.iter().try_for_each(|&env| self.check_env(env))
    }

    fn gather(&self, data: &[f32], dofs: &[usize]) -> Vec<f32> {
        let n = self.num_dofs();
        let mut out = Vec::with_capacity(self.num_envs * dofs.len());
        for env in 0..self.num_envs {
            out.extend(dofs.iter().map(|&d| data[env * n + d]));
        }
        out
    }

    fn set_per_dof(
        &mut self,
        values: &[f32],
        dofs: &[usize],
        apply: impl Fn(&mut DofParams, f32),
    ) -> Result<(), PhysicsError> {
        Self::check_len(dofs.len(), values.len())?;
        self.check_dofs(dofs)?;
        for (&dof, &value) in dofs.iter().zip(values) {
            apply(&mut self.dof_params[dof], value);
        }
        Ok(())
    }
}

impl SimBackend for KinematicSim {
    fn add_ground_plane(&mut self) -> Result<(), PhysicsError> {
        if self.built {
            return Err(PhysicsError::AlreadyBuilt);
        }
        self.ground_plane = true;
        Ok(())
    }

    fn load_robot(&mut self, path: &Path, pos: Vec3, quat: Quat) -> Result<(), PhysicsError> {
        let desc = RobotDescription::from_path(path)?;
        self.load_robot_description(desc, pos, quat)
    }

    fn build(&mut self, num_envs: usize) -> Result<(), PhysicsError> {
        if self.built {
            return Err(PhysicsError::AlreadyBuilt);
        }
        if self.robot.is_none() {
            return Err(PhysicsError::NoRobot);
        }
        let n = self.num_dofs();
        self.num_envs = num_envs;
        self.bodies = vec![self.spawn; num_envs];
        self.dof_pos = vec![0.0; num_envs * n];
        self.dof_vel = vec![0.0; num_envs * n];
        self.dof_target = vec![0.0; num_envs * n];
        self.built = true;
        tracing::info!(num_envs, dofs = n, "kinematic scene built");
        Ok(())
    }

    fn num_envs(&self) -> usize {
        self.num_envs
    }

    fn dt(&self) -> f32 {
        self.options.dt
    }

    fn dof_index(&self, joint: &str) -> Result<usize, PhysicsError> {
        self.robot
            .as_ref()
            .ok_or(PhysicsError::NoRobot)?
            .joint_index(joint)
            .ok_or_else(|| PhysicsError::UnknownJoint(joint.to_string()))
    }

    fn link_index(&self, link: &str) -> Result<usize, PhysicsError> {
        self.robot
            .as_ref()
            .ok_or(PhysicsError::NoRobot)?
            .link_index(link)
            .ok_or_else(|| PhysicsError::UnknownLink(link.to_string()))
    }

    fn set_dofs_kp(&mut self, kp: &[f32], dofs: &[usize]) -> Result<(), PhysicsError> {
        self.set_per_dof(kp, dofs, |p, v| p.kp = v)
    }

    fn set_dofs_kv(&mut self, kv: &[f32], dofs: &[usize]) -> Result<(), PhysicsError> {
        self.set_per_dof(kv, dofs, |p, v| p.kv = v)
    }

    fn set_dofs_force_range(
        &mut self,
        lower: &[f32],
        upper: &[f32],
        dofs: &[usize],
    ) -> Result<(), PhysicsError> {
        self.set_per_dof(lower, dofs, |p, v| p.force_lower = v)?;
        self.set_per_dof(upper, dofs, |p, v| p.force_upper = v)
    }

    fn control_dofs_position(
        &mut self,
        targets: &[f32],
        dofs: &[usize],
    ) -> Result<(), PhysicsError> {
        self.check_built()?;
        self.check_dofs(dofs)?;
        Self::check_len(self.num_envs * dofs.len(), targets.len())?;
        let n = self.num_dofs();
        for (env, row) in targets.chunks(dofs.len().max(1)).enumerate().take(self.num_envs) {
            for (&dof, &target) in dofs.iter().zip(row) {
                self.dof_target[env * n + dof] = target;
            }
        }
        Ok(())
    }

    fn step(&mut self) -> Result<(), PhysicsError> {
        self.check_built()?;
        let substeps = self.options.substeps.max(1);
        #[allow(clippy::cast_precision_loss)]
        let h = self.options.dt / substeps as f32;
        let n = self.num_dofs();

        for _ in 0..substeps {
            for (i, params) in self.dof_params.iter().enumerate() {
                for env in 0..self.num_envs {
                    let k = env * n + i;
                    integrate_dof(
                        &mut self.dof_pos[k],
                        &mut self.dof_vel[k],
                        self.dof_target[k],
                        params,
                        h,
                    );
                }
            }
            for body in &mut self.bodies {
                integrate_base(body, h, self.ground_plane);
            }
        }
        Ok(())
    }

    fn base_pos(&self) -> Vec<Vec3> {
        self.bodies.iter().map(|b| b.pos).collect()
    }

    fn base_quat(&self) -> Vec<Quat> {
        self.bodies.iter().map(|b| b.quat).collect()
    }

    fn base_lin_vel(&self) -> Vec<Vec3> {
        self.bodies.iter().map(|b| b.lin_vel).collect()
    }

    fn base_ang_vel(&self) -> Vec<Vec3> {
        self.bodies.iter().map(|b| b.ang_vel).collect()
    }

    fn dofs_position(&self, dofs: &[usize]) -> Vec<f32> {
        self.gather(&self.dof_pos, dofs)
    }

    fn dofs_velocity(&self, dofs: &[usize]) -> Vec<f32> {
        self.gather(&self.dof_vel, dofs)
    }

    fn link_pos(&self, link: usize) -> Vec<Vec3> {
        let offset = self.link_offsets.get(link).copied().unwrap_or(Vec3::ZERO);
        self.bodies.iter().map(|b| b.pos + b.quat * offset).collect()
    }

    fn link_quat(&self, link: usize) -> Vec<Quat> {
        let local = self.link_quats.get(link).copied().unwrap_or(Quat::IDENTITY);
        self.bodies.iter().map(|b| b.quat * local).collect()
    }

    fn set_dofs_position(
        &mut self,
        positions: &[f32],
        dofs: &[usize],
        envs: &[usize],
        zero_velocity: bool,
    ) -> Result<(), PhysicsError> {
        self.check_built()?;
        self.check_dofs(dofs)?;
        self.check_rows(envs)?;
        Self::check_len(envs.len() * dofs.len(), positions.len())?;
        let n = self.num_dofs();
        for (row, &env) in envs.iter().enumerate() {
            for (k, &dof) in dofs.iter().enumerate() {
                let value = positions[row * dofs.len() + k];
                self.dof_pos[env * n + dof] = value;
                self.dof_target[env * n + dof] = value;
                if zero_velocity {
                    self.dof_vel[env * n + dof] = 0.0;
                }
            }
        }
        Ok(())
    }

    fn set_base_pos(
        &mut self,
        pos: &[Vec3],
        envs: &[usize],
        zero_velocity: bool,
    ) -> Result<(), PhysicsError> {
        self.check_built()?;
        self.check_rows(envs)?;
        Self::check_len(envs.len(), pos.len())?;
        for (&env, &p) in envs.iter().zip(pos) {
            let body = &mut self.bodies[env];
            body.pos = p;
            if zero_velocity {
                body.lin_vel = Vec3::ZERO;
                body.ang_vel = Vec3::ZERO;
            }
        }
        Ok(())
    }

    fn set_base_quat(
        &mut self,
        quat: &[Quat],
        envs: &[usize],
        zero_velocity: bool,
    ) -> Result<(), PhysicsError> {
        self.check_built()?;
        self.check_rows(envs)?;
        Self::check_len(envs.len(), quat.len())?;
        for (&env, &q) in envs.iter().zip(quat) {
            let body = &mut self.bodies[env];
            body.quat = q.normalize();
            if zero_velocity {
                body.lin_vel = Vec3::ZERO;
                body.ang_vel = Vec3::ZERO;
            }
        }
        Ok(())
    }

    fn zero_all_dofs_velocity(&mut self, envs: &[usize]) -> Result<(), PhysicsError> {
        self.check_built()?;
        self.check_rows(envs)?;
        let n = self.num_dofs();
        for &env in envs {
            self.bodies[env].lin_vel = Vec3::ZERO;
            self.bodies[env].ang_vel = Vec3::ZERO;
            self.dof_vel[env * n..(env + 1) * n].fill(0.0);
        }
        Ok(())
    }
}

impl Default for KinematicSim {
    fn default() -> Self {
        Self::new(SimOptions::default())
    }
}
