use glam::{Quat, Vec3};

/// Global options of a simulated scene.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SimOptions {
    /// Duration of one [`crate::SimBackend::step`] in seconds.
    pub dt: f32,
    /// Integration substeps per tick.
    pub substeps: usize,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self { dt: 0.01, substeps: 2 }
    }
}

/// Root body of one robot instance.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BaseBody {
    pub pos: Vec3,
    pub quat: Quat,
    /// World frame.
    pub lin_vel: Vec3,
    /// World frame.
    pub ang_vel: Vec3,
}

impl BaseBody {
    #[must_use]
    pub const fn at_rest(pos: Vec3, quat: Quat) -> Self {
        Self {
            pos,
            quat,
            lin_vel: Vec3::ZERO,
            ang_vel: Vec3::ZERO,
        }
    }
}

/// PD drive and limits of one dof, shared by every environment.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DofParams {
    pub kp: f32,
    pub kv: f32,
    pub force_lower: f32,
    pub force_upper: f32,
    pub limit_lower: f32,
    pub limit_upper: f32,
}

impl Default for DofParams {
    fn default() -> Self {
        Self {
            kp: 0.0,
            kv: 0.0,
            force_lower: f32::NEG_INFINITY,
            force_upper: f32::INFINITY,
            limit_lower: f32::NEG_INFINITY,
            limit_upper: f32::INFINITY,
        }
    }
}
