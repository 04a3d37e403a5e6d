//! # Contact and Gait Estimation
//!
//! Turns continuous foot-link poses into the discrete signals the reward
//! terms consume: per-foot contact flags, sole alignment with the ground, and
//! hip-swing periodicity.

use crate::state::{BatchState, HipHistory, HIP_HISTORY_LEN, LEFT};
use glam::{Quat, Vec3};

/// A foot lower than this is in contact with the ground.
pub const CONTACT_HEIGHT: f32 = 0.05;
/// Swing height above which single support counts as hopping.
pub const SWING_HEIGHT_THRESHOLD: f32 = 0.10;
/// Sole normal in the foot frame.
pub const SOLE_NORMAL_LOCAL: Vec3 = Vec3::NEG_Z;
const WORLD_DOWN: Vec3 = Vec3::NEG_Z;

#[must_use]
pub fn contact_flags(heights: [f32; 2]) -> [bool; 2] {
    heights.map(|h| h < CONTACT_HEIGHT)
}

/// `+1` for a flat sole facing the ground, `-1` upside down.
#[must_use]
pub fn sole_alignment(foot_quat: Quat) -> f32 {
    (foot_quat * SOLE_NORMAL_LOCAL).dot(WORLD_DOWN)
}

/// Fraction of consecutive hip-angle deltas that keep the same direction.
///
/// Over the chronological left-hip window, takes the first differences and
/// averages `max(sign(d_i) * sign(d_i+1), 0)` over adjacent pairs. Returns 0
/// for a window that holds only zeros.
#[must_use]
pub fn direction_consistency(history: &HipHistory) -> f32 {
    if history.is_all_zero() {
        return 0.0;
    }
    let samples = history.chronological(LEFT);
    let mut deltas = [0.0_f32; HIP_HISTORY_LEN - 1];
    for (k, d) in deltas.iter_mut().enumerate() {
        *d = samples[k + 1] - samples[k];
    }
    let agreeing: f32 = deltas
        .windows(2)
        .map(|w| (sign(w[0]) * sign(w[1])).max(0.0))
        .sum();
    #[allow(clippy::cast_precision_loss)]
    let pairs = (deltas.len() - 1) as f32;
    agreeing / pairs
}

/// Sign with `sign(0) == 0`.
fn sign(x: f32) -> f32 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Refresh foot heights, orientations, sole alignment and contact flags from
/// the world poses of the `[left, right]` foot links.
pub fn update_feet(state: &mut BatchState, left: (&[Vec3], &[Quat]), right: (&[Vec3], &[Quat])) {
    let feet = &mut state.feet;
    for env in 0..state.num_envs {
        let heights = [left.0[env].z, right.0[env].z];
        let quats = [left.1[env], right.1[env]];
        feet.heights[env] = heights;
        feet.quats[env] = quats;
        feet.sole_alignment[env] = quats.map(sole_alignment);
        feet.contact[env] = contact_flags(heights);
    }
    feet.initialized = true;
}

/// Carry this tick's contact flags over as the previous-tick flags. Runs
/// after reward evaluation so edge-detecting terms see both ticks.
pub fn commit_contacts(state: &mut BatchState) {
    let feet = &mut state.feet;
    feet.prev_contact.copy_from_slice(&feet.contact);
}

/// Contact flags a freshly reset row starts from. Until the first tick has
/// reported foot heights, both feet count as grounded.
#[must_use]
pub fn initial_contact(state: &BatchState, env: usize) -> [bool; 2] {
    if state.feet.initialized {
        contact_flags(state.feet.heights[env])
    } else {
        contact_flags([0.0; 2])
    }
}

/// Append the current hip flexion angles of every row to its history.
pub fn record_hip_angles(state: &mut BatchState, hip_fe: [usize; 2]) {
    for env in 0..state.num_envs {
        let row = env * state.num_actions;
        let left = state.dof_pos[row + hip_fe[0]];
        let right = state.dof_pos[row + hip_fe[1]];
        state.hip_history[env].push(left, right);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_threshold_is_strict() {
        assert_eq!(contact_flags([0.049, 0.05]), [true, false]);
    }

    #[test]
    fn flat_foot_is_fully_aligned() {
        assert!((sole_alignment(Quat::IDENTITY) - 1.0).abs() < 1e-6);
        let flipped = Quat::from_rotation_x(std::f32::consts::PI);
        assert!((sole_alignment(flipped) + 1.0).abs() < 1e-6);
        let tilted = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        assert!(sole_alignment(tilted).abs() < 1e-6);
    }

    #[test]
    #[allow(clippy::cast_precision_loss)]
    fn monotonic_swing_is_fully_consistent() {
        let mut h = HipHistory::default();
        for k in 1..=10 {
            h.push(0.1 * k as f32, 0.0);
        }
        assert!((direction_consistency(&h) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn alternating_swing_scores_zero() {
        let mut h = HipHistory::default();
        for k in 0..10 {
            h.push(if k % 2 == 0 { 0.2 } else { -0.2 }, 0.0);
        }
        assert_eq!(direction_consistency(&h), 0.0);
    }

    #[test]
    fn empty_history_scores_zero() {
        assert_eq!(direction_consistency(&HipHistory::default()), 0.0);
    }

    #[test]
    fn commit_copies_current_contacts() {
        let mut s = BatchState::new(2, vec![0.0; 2]);
        s.feet.contact = vec![[true, false], [false, true]];
        commit_contacts(&mut s);
        assert_eq!(s.feet.prev_contact, vec![[true, false], [false, true]]);
    }
}
