//! # Environment Configuration
//!
//! JSON configuration split the way training scripts split it: `env`,
//! `obs`, `reward` and `command` sections plus the batch size and seed.
//!
//! Required keys have no fallback. The few defaults that exist are listed on
//! the fields that carry them.

use crate::error::EnvError;
use crate::observation::ObservationAssembler;
use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Top-level configuration of a batched locomotion environment.
#[derive(Debug, Clone, Deserialize)]
pub struct TrainConfig {
    pub num_envs: usize,
    /// Seed for command sampling. Defaults to 0.
    #[serde(default)]
    pub seed: u64,
    pub env: EnvConfig,
    pub obs: ObsConfig,
    pub reward: RewardConfig,
    pub command: CommandConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnvConfig {
    pub num_actions: usize,
    /// Robot description handed to the backend.
    pub robot_file: PathBuf,
    pub joint_names: Vec<String>,
    pub default_joint_angles: HashMap<String, f32>,
    pub kp: f32,
    pub kd: f32,
    pub base_init_pos: [f32; 3],
    /// `[w, x, y, z]`
    pub base_init_quat: [f32; 4],
    /// Episode and resampling durations are kept in double precision so tick
    /// counts round the same way as the decimal values in the file.
    pub episode_length_s: f64,
    pub resampling_time_s: f64,
    /// Degrees.
    pub termination_if_pitch_greater_than: f32,
    /// Degrees.
    pub termination_if_roll_greater_than: f32,
    pub action_scale: f32,
    pub clip_actions: f32,
    /// Execute the previous tick's action instead of the current one.
    /// Defaults to `true`.
    #[serde(default = "default_true")]
    pub simulate_action_latency: bool,
    /// Defaults to 0.01 s.
    #[serde(default = "default_dt")]
    pub dt: f64,
    /// Defaults to 2.
    #[serde(default = "default_substeps")]
    pub substeps: usize,
    #[serde(default)]
    pub foot_links: FootLinks,
    #[serde(default)]
    pub gait_joints: GaitJoints,
}

/// Links whose world pose defines foot height and sole orientation.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FootLinks {
    pub left: String,
    pub right: String,
}

impl Default for FootLinks {
    fn default() -> Self {
        Self {
            left: "Left_FOOT_FE".to_string(),
            right: "Right_FOOT_FE".to_string(),
        }
    }
}

/// Joints read by the gait-shaping reward terms, as `[left, right]` pairs.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct GaitJoints {
    pub hip_aa: [String; 2],
    pub hip_fe: [String; 2],
    pub knee_fe: [String; 2],
}

impl Default for GaitJoints {
    fn default() -> Self {
        Self {
            hip_aa: ["Left_HIP_AA".to_string(), "Right_HIP_AA".to_string()],
            hip_fe: ["Left_THIGH_FE".to_string(), "Right_THIGH_FE".to_string()],
            knee_fe: ["Left_KNEE_FE".to_string(), "Right_SHIN_FE".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObsConfig {
    pub num_obs: usize,
    pub obs_scales: ObsScales,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct ObsScales {
    /// Scales the linear part of the command. Defaults to 1.0.
    #[serde(default = "default_one")]
    pub lin_vel: f32,
    pub ang_vel: f32,
    pub dof_pos: f32,
    pub dof_vel: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RewardConfig {
    pub tracking_sigma: f32,
    pub base_height_target: f32,
    #[serde(default)]
    pub reward_scales: RewardScales,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandConfig {
    pub num_commands: usize,
    pub lin_vel_x_range: [f32; 2],
    pub lin_vel_y_range: [f32; 2],
    pub ang_vel_range: [f32; 2],
}

/// Reward name to raw (per-second) scale, in declaration order.
///
/// Declaration order is evaluation order, which keeps reward sums
/// reproducible bit for bit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RewardScales(IndexMap<String, f32>);

impl RewardScales {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f32> {
        self.0.get(name).copied()
    }

    /// Overwrites an existing entry in place, otherwise appends.
    pub fn insert(&mut self, name: impl Into<String>, scale: f32) {
        self.0.insert(name.into(), scale);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.0.iter().map(|(n, s)| (n.as_str(), *s))
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

impl<S: Into<String>> FromIterator<(S, f32)> for RewardScales {
    fn from_iter<I: IntoIterator<Item = (S, f32)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(name, scale)| (name.into(), scale)).collect())
    }
}

impl<'de> Deserialize<'de> for RewardScales {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ScalesVisitor;

        impl<'de> Visitor<'de> for ScalesVisitor {
            type Value = RewardScales;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map from reward name to scale")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut scales = IndexMap::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, scale)) = map.next_entry::<String, f32>()? {
                    match scales.entry(name) {
                        Entry::Occupied(e) => {
                            return Err(de::Error::custom(format!(
                                "duplicate reward `{}`",
                                e.key()
                            )));
                        }
                        Entry::Vacant(e) => {
                            e.insert(scale);
                        }
                    }
                }
                Ok(RewardScales(scales))
            }
        }

        deserializer.deserialize_map(ScalesVisitor)
    }
}

fn default_true() -> bool {
    true
}

fn default_dt() -> f64 {
    0.01
}

fn default_substeps() -> usize {
    2
}

fn default_one() -> f32 {
    1.0
}

impl TrainConfig {
    /// Parse a configuration. The result is not validated yet.
    ///
    /// # Errors
    /// [`EnvError::Parse`] on malformed JSON or missing required keys.
    pub fn from_json(json: &str) -> Result<Self, EnvError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a configuration file. A relative `robot_file` is resolved
    /// against the directory containing the configuration.
    ///
    /// # Errors
    /// I/O and parse failures.
    pub fn from_path(path: &Path) -> Result<Self, EnvError> {
        let json = std::fs::read_to_string(path)?;
        let mut cfg = Self::from_json(&json)?;
        if cfg.env.robot_file.is_relative() {
            if let Some(dir) = path.parent() {
                cfg.env.robot_file = dir.join(&cfg.env.robot_file);
            }
        }
        Ok(cfg)
    }

    /// Check cross-field consistency. Called by the environment constructor.
    ///
    /// # Errors
    /// The first inconsistency found, as an [`EnvError`].
    pub fn validate(&self) -> Result<(), EnvError> {
        let env = &self.env;
        if env.num_actions != env.joint_names.len() {
            return Err(EnvError::Config(format!(
                "num_actions is {} but {} joint names are listed",
                env.num_actions,
                env.joint_names.len()
            )));
        }
        env.default_dof_pos()?;
        for (name, value) in [
            ("dt", env.dt),
            ("episode_length_s", env.episode_length_s),
            ("resampling_time_s", env.resampling_time_s),
            ("reward.tracking_sigma", f64::from(self.reward.tracking_sigma)),
        ] {
            if value.is_nan() || value <= 0.0 {
                return Err(EnvError::Config(format!("{name} must be positive, got {value}")));
            }
        }
        if env.clip_actions < 0.0 {
            return Err(EnvError::Config("clip_actions must not be negative".to_string()));
        }

        let expected = ObservationAssembler::width_for(env.num_actions);
        if self.obs.num_obs != expected {
            return Err(EnvError::ObservationWidth {
                expected: self.obs.num_obs,
                actual: expected,
            });
        }

        let cmd = &self.command;
        if cmd.num_commands != 3 {
            return Err(EnvError::Config(format!(
                "num_commands must be 3 (vx, vy, yaw rate), got {}",
                cmd.num_commands
            )));
        }
        for (name, [lower, upper]) in [
            ("lin_vel_x_range", cmd.lin_vel_x_range),
            ("lin_vel_y_range", cmd.lin_vel_y_range),
            ("ang_vel_range", cmd.ang_vel_range),
        ] {
            if lower > upper {
                return Err(EnvError::Config(format!("{name} has lower bound above upper bound")));
            }
        }

        for (name, scale) in self.reward.reward_scales.iter() {
            if scale == 0.0 {
                tracing::warn!(
                    reward = name,
                    "reward scale is zero; term is evaluated but contributes nothing"
                );
            }
        }
        Ok(())
    }
}

impl EnvConfig {
    /// Default pose in `joint_names` order.
    ///
    /// # Errors
    /// [`EnvError::MissingDefaultAngle`] for a joint without an entry.
    pub fn default_dof_pos(&self) -> Result<Vec<f32>, EnvError> {
        self.joint_names
            .iter()
            .map(|name| {
                self.default_joint_angles
                    .get(name)
                    .copied()
                    .ok_or_else(|| EnvError::MissingDefaultAngle(name.clone()))
            })
            .collect()
    }

    /// Episode length in ticks, rounded up.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn max_episode_length(&self) -> u32 {
        (self.episode_length_s / self.dt).ceil() as u32
    }

    /// Ticks between command resamples, at least 1.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn resampling_interval(&self) -> u32 {
        ((self.resampling_time_s / self.dt).round() as u32).max(1)
    }

    /// Physics timestep handed to the backend.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn physics_dt(&self) -> f32 {
        self.dt as f32
    }

    /// Position of `joint` in the actuated joint list.
    ///
    /// # Errors
    /// [`EnvError::UnknownJoint`] when it is not actuated.
    pub fn joint_position(&self, joint: &str) -> Result<usize, EnvError> {
        self.joint_names
            .iter()
            .position(|n| n == joint)
            .ok_or_else(|| EnvError::UnknownJoint(joint.to_string()))
    }
}
