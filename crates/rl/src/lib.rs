#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
//! # Dodo Locomotion Environment
//!
//! A batched reinforcement learning environment for a small biped. It wraps
//! any [`physics::SimBackend`] and turns raw simulator state into
//! observations, commands, terminations and a shaped multi-term reward.
//!
//! ## Key Components
//!
//! -   **Episode state machine:** [`BipedEnv`] owns the [`BatchState`], steps
//!     the backend, evaluates termination and resets finished rows.
//! -   **Reward registry:** [`RewardRegistry`] maps configured reward names
//!     to plain functions, scales them by `dt` and keeps per-episode sums.
//! -   **Contact and gait estimation:** the [`gait`] module derives contact
//!     flags, sole alignment and hip-swing periodicity.
//! -   **Commands and observations:** [`CommandSampler`] draws velocity
//!     targets; [`ObservationAssembler`] packs the policy input.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rl::{BipedEnv, TrainConfig, VecEnv};
//!
//! let cfg = TrainConfig::from_path("assets/dodo_config.json".as_ref())?;
//! let mut env = BipedEnv::kinematic(&cfg)?;
//! env.reset()?;
//! let actions = vec![0.0; env.num_envs() * env.num_actions()];
//! let step = env.step(&actions)?;
//! ```

pub mod command;
pub mod config;
pub mod env;
pub mod error;
pub mod gait;
pub mod locomotion;
pub mod observation;
pub mod reward;
pub mod state;

pub use command::CommandSampler;
pub use config::{RewardScales, TrainConfig};
pub use env::{Extras, Step, VecEnv};
pub use error::EnvError;
pub use locomotion::BipedEnv;
pub use observation::ObservationAssembler;
pub use reward::{EpisodeLog, RewardParams, RewardRegistry};
pub use state::BatchState;
