//! Frame utilities for base and link orientations
//!
//! Orientations are `glam::Quat` internally. Configuration files and robot
//! descriptions store them as `[w, x, y, z]`, the order most robotics tooling
//! uses, so conversion happens at the edges only.

use glam::{EulerRot, Quat, Vec3};

/// Build a quaternion from `[w, x, y, z]` components.
#[must_use]
pub fn quat_from_wxyz(q: [f32; 4]) -> Quat {
    Quat::from_xyzw(q[1], q[2], q[3], q[0])
}

/// Return the quaternion as `[w, x, y, z]`.
#[must_use]
pub fn quat_to_wxyz(q: Quat) -> [f32; 4] {
    [q.w, q.x, q.y, q.z]
}

/// Inverse rotation. Input is assumed to be unit length.
#[must_use]
pub fn inv_quat(q: Quat) -> Quat {
    q.conjugate()
}

/// Rotate vector `v` by `q`.
#[must_use]
pub fn transform_by_quat(v: Vec3, q: Quat) -> Vec3 {
    q * v
}

/// Apply rotation `u` on top of `v`, i.e. `u * v`.
#[must_use]
pub fn transform_quat_by_quat(v: Quat, u: Quat) -> Quat {
    u * v
}

/// Convert to roll, pitch and yaw in degrees (Z-Y-X intrinsic convention).
///
/// The result is packed as `(x = roll, y = pitch, z = yaw)`. Pitch saturates
/// at +-90 degrees on the gimbal singularity.
#[must_use]
pub fn quat_to_rpy_degrees(q: Quat) -> Vec3 {
    let (yaw, pitch, roll) = q.to_euler(EulerRot::ZYX);
    Vec3::new(roll.to_degrees(), pitch.to_degrees(), yaw.to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    #[test]
    fn test_wxyz_roundtrip_keeps_identity() {
        let q = quat_from_wxyz([1.0, 0.0, 0.0, 0.0]);
        assert_eq!(q, Quat::IDENTITY);
        assert_eq!(quat_to_wxyz(q), [1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_pitch_only() {
        let q = Quat::from_rotation_y(30_f32.to_radians());
        let rpy = quat_to_rpy_degrees(q);
        assert!(rpy.x.abs() < EPS, "roll={}", rpy.x);
        assert!((rpy.y - 30.0).abs() < EPS, "pitch={}", rpy.y);
        assert!(rpy.z.abs() < EPS, "yaw={}", rpy.z);
    }

    #[test]
    fn test_roll_only() {
        let q = Quat::from_rotation_x(-15_f32.to_radians());
        let rpy = quat_to_rpy_degrees(q);
        assert!((rpy.x + 15.0).abs() < EPS, "roll={}", rpy.x);
        assert!(rpy.y.abs() < EPS);
    }

    #[test]
    fn test_combined_rotation_separates_axes() {
        let q = Quat::from_rotation_z(50_f32.to_radians())
            * Quat::from_rotation_y(-20_f32.to_radians())
            * Quat::from_rotation_x(10_f32.to_radians());
        let rpy = quat_to_rpy_degrees(q);
        assert!((rpy.x - 10.0).abs() < 1e-3, "roll={}", rpy.x);
        assert!((rpy.y + 20.0).abs() < 1e-3, "pitch={}", rpy.y);
        assert!((rpy.z - 50.0).abs() < 1e-3, "yaw={}", rpy.z);
    }

    #[test]
    fn test_inverse_undoes_rotation() {
        let q = Quat::from_rotation_z(0.7) * Quat::from_rotation_x(0.2);
        let v = Vec3::new(0.3, -1.2, 2.0);
        let back = transform_by_quat(transform_by_quat(v, q), inv_quat(q));
        assert!((back - v).length() < EPS);
    }

    #[test]
    fn test_quat_composition_order() {
        let v = Quat::from_rotation_x(0.5);
        let u = Quat::from_rotation_z(1.0);
        let composed = transform_quat_by_quat(v, u);
        let p = Vec3::Y;
        let expected = u * (v * p);
        assert!((composed * p - expected).length() < EPS);
    }
}
