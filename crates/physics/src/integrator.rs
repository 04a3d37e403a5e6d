//! # Kinematic Integration
//!
//! Numerical update rules used by [`crate::KinematicSim`]: PD-driven joints
//! with unit inertia, and a base that simply follows its own velocity.

use crate::types::{BaseBody, DofParams};
use glam::Quat;

/// Advance one joint by `dt` towards `target` (semi-implicit Euler).
///
/// The drive torque is clamped to the actuator force range, and the joint is
/// stopped dead when it reaches a position limit.
pub fn integrate_dof(pos: &mut f32, vel: &mut f32, target: f32, params: &DofParams, dt: f32) {
    let torque = (params.kp * (target - *pos) - params.kv * *vel)
        .clamp(params.force_lower, params.force_upper);
    *vel += torque * dt;
    *pos += *vel * dt;

    if *pos < params.limit_lower {
        *pos = params.limit_lower;
        *vel = 0.0;
    } else if *pos > params.limit_upper {
        *pos = params.limit_upper;
        *vel = 0.0;
    }
}

/// Advance the base pose by its current velocity.
///
/// With a ground plane the base is kept at or above `z = 0` and loses any
/// downward velocity on contact.
pub fn integrate_base(body: &mut BaseBody, dt: f32, ground_plane: bool) {
    body.pos += body.lin_vel * dt;

    let rotation = body.ang_vel * dt;
    if rotation.length_squared() > 0.0 {
        body.quat = (Quat::from_scaled_axis(rotation) * body.quat).normalize();
    }

    if ground_plane && body.pos.z < 0.0 {
        body.pos.z = 0.0;
        body.lin_vel.z = body.lin_vel.z.max(0.0);
    }
}
